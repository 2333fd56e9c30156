//! Zip packaging of generated documents
//!
//! Document `i` (1-based, input order) becomes `contract_{i}.pdf`; the
//! summary, when present, becomes `AI_Summary.txt`.

use std::io::{Cursor, Write};

use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::BundleError;

/// MIME type of the archive
pub const BUNDLE_CONTENT_TYPE: &str = "application/zip";

/// Download filename of the archive
pub const BUNDLE_FILENAME: &str = "contracts.zip";

/// Archive entry holding the summary text
pub const SUMMARY_ENTRY: &str = "AI_Summary.txt";

/// Entry name of the `index`-th document (0-based input)
pub fn document_entry_name(index: usize) -> String {
    format!("contract_{}.pdf", index + 1)
}

/// Build the download archive.
///
/// The algorithm:
/// 1. If there are no documents, fail (even with a summary)
/// 2. Write each document as a numbered entry, in order
/// 3. Append the summary entry for any non-empty summary, whitespace included
pub fn bundle_documents<D>(documents: &[D], summary: Option<&str>) -> Result<Vec<u8>, BundleError>
where
    D: AsRef<[u8]>,
{
    if documents.is_empty() {
        return Err(BundleError::NoDocuments);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (i, document) in documents.iter().enumerate() {
        zip.start_file(document_entry_name(i), options)?;
        zip.write_all(document.as_ref())?;
    }

    if let Some(summary) = summary.filter(|s| !s.is_empty()) {
        zip.start_file(SUMMARY_ENTRY, options)?;
        zip.write_all(summary.as_bytes())?;
    }

    let archive = zip.finish()?.into_inner();
    info!(
        documents = documents.len(),
        bytes = archive.len(),
        "Bundled contracts"
    );
    Ok(archive)
}
