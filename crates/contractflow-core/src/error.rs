//! Error types for every stage of a run

use thiserror::Error;

use crate::generation::RowFailure;
use crate::workflow::Step;

/// Failure reported by an external service (document generation or
/// summarization).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-success HTTP status with whatever body the provider sent back.
    #[error("Provider returned status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Provider returned no content: {0}")]
    EmptyResponse(String),

    #[error("Failed to decode provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// HTTP status code reported by the provider, if it got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template file is empty")]
    Empty,

    #[error("Invalid template encoding: {0}")]
    InvalidEncoding(String),
}

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset has no header row")]
    MissingHeaders,

    #[error("Dataset has headers but no data rows")]
    NoRows,

    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("No rows to generate")]
    NoRows,

    #[error("No contracts were generated successfully ({} rows failed)", failures.len())]
    NoDocuments { failures: Vec<RowFailure> },
}

#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("Nothing to summarize")]
    EmptyInput,

    #[error("Summarization failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Summarizer returned an empty summary")]
    EmptySummary,
}

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("No documents provided for bundling")]
    NoDocuments,

    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Any failure that aborts a whole run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Bundle(#[from] BundleError),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Expected to be at step '{expected}', but the workflow is at '{actual}'")]
    WrongStep { expected: Step, actual: Step },

    #[error("Unknown column '{0}'")]
    UnknownColumn(String),

    #[error("Unknown template field '{0}'")]
    UnknownField(String),
}
