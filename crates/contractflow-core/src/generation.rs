//! Per-row document generation
//!
//! Rows are generated one at a time, in order. A failing row is logged and
//! skipped; the run only fails when no row succeeds.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::Row;
use crate::error::{GenerationError, ProviderError};
use crate::mapping::{FieldMapping, FieldValues};
use crate::template::Template;

/// External document-generation service
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    /// Fill the base64-encoded template with `values` and return the
    /// rendered document bytes.
    async fn generate(
        &self,
        template_base64: &str,
        values: &FieldValues,
    ) -> Result<Vec<u8>, ProviderError>;
}

/// A filled document and the row it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    /// 0-based index into the dataset rows
    pub row_index: usize,
    pub values: FieldValues,
    pub bytes: Vec<u8>,
}

/// A row that could not be generated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailure {
    pub row_index: usize,
    pub message: String,
    /// Provider status code, when the provider answered at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

/// Outcome of a generation pass with at least one success
#[derive(Debug, Clone)]
pub struct GenerationReport {
    /// Successful documents in row order
    pub documents: Vec<GeneratedDocument>,
    pub failures: Vec<RowFailure>,
    pub total_rows: usize,
}

impl GenerationReport {
    pub fn generated(&self) -> usize {
        self.documents.len()
    }

    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failed_rows(&self) -> Vec<usize> {
        self.failures.iter().map(|f| f.row_index).collect()
    }
}

/// Generate one document per row.
///
/// The template is encoded once and sent with every request. Each row's
/// payload holds every field in `fields`, filled through `mapping`.
pub async fn generate_documents<G, F>(
    generator: &G,
    template: &Template,
    fields: &[F],
    mapping: &FieldMapping,
    rows: &[Row],
) -> Result<GenerationReport, GenerationError>
where
    G: DocumentGenerator + ?Sized,
    F: AsRef<str>,
{
    if rows.is_empty() {
        return Err(GenerationError::NoRows);
    }

    let total = rows.len();
    info!("Processing {} contracts...", total);

    let template_base64 = template.to_base64();
    let mut documents = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        let values = mapping.payload(fields, row);
        info!("Generating contract {}/{}...", row_index + 1, total);
        debug!(row = row_index, ?values, "Document values");

        match generator.generate(&template_base64, &values).await {
            Ok(bytes) => documents.push(GeneratedDocument {
                row_index,
                values,
                bytes,
            }),
            Err(e) => {
                warn!(row = row_index, error = %e, "Failed to generate contract {}", row_index + 1);
                failures.push(RowFailure {
                    row_index,
                    message: e.to_string(),
                    status: e.status(),
                });
            }
        }
    }

    if documents.is_empty() {
        return Err(GenerationError::NoDocuments { failures });
    }

    info!(
        "Successfully generated {} of {} contracts",
        documents.len(),
        total
    );

    Ok(GenerationReport {
        documents,
        failures,
        total_rows: total,
    })
}
