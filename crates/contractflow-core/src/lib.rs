//! Bulk contract generation core
//!
//! Everything between "a template and a spreadsheet were uploaded" and
//! "a zip archive is ready for download":
//!
//! - [`template`]: template intake and field discovery
//! - [`dataset`]: CSV intake into ordered rows
//! - [`mapping`]: template field to dataset column mapping
//! - [`generation`]: sequential per-row document generation
//! - [`summary`]: summarization prompt, cleanup and rendering
//! - [`bundle`]: zip packaging of the results
//! - [`pipeline`]: the full generate, summarize, bundle run
//! - [`workflow`]: the four-step upload/map/review state
//!
//! External services are reached through the [`DocumentGenerator`] and
//! [`Summarizer`] traits; HTTP implementations live in
//! `contractflow-providers`.

pub mod bundle;
pub mod dataset;
pub mod error;
pub mod generation;
pub mod mapping;
pub mod pipeline;
pub mod summary;
pub mod template;
pub mod workflow;

pub use bundle::{bundle_documents, BUNDLE_CONTENT_TYPE, BUNDLE_FILENAME, SUMMARY_ENTRY};
pub use dataset::{Dataset, Row};
pub use error::{
    BundleError, DatasetError, GenerationError, PipelineError, ProviderError, SummaryError,
    TemplateError, WorkflowError,
};
pub use generation::{
    generate_documents, DocumentGenerator, GeneratedDocument, GenerationReport, RowFailure,
};
pub use mapping::{FieldMapping, FieldValues};
pub use pipeline::{run, RunOutcome, RunRequest};
pub use summary::{
    classify_line, describe_agreement, render, summarize, LineKind, SummaryBlock, SummarySections,
    Summarizer, SECTION_HEADERS,
};
pub use template::{FieldSource, Template, DEFAULT_FIELDS};
pub use workflow::{Confirmation, Step, Workflow};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
