//! A complete run: generate every row, summarize one agreement, bundle

use chrono::{DateTime, Utc};
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::bundle::bundle_documents;
use crate::dataset::Dataset;
use crate::error::PipelineError;
use crate::generation::{generate_documents, DocumentGenerator, RowFailure};
use crate::mapping::{FieldMapping, FieldValues};
use crate::summary::{describe_agreement, summarize, Summarizer};
use crate::template::Template;

/// Everything a run needs. The mapping is frozen by moving it in here.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub template: Template,
    pub dataset: Dataset,
    pub mapping: FieldMapping,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: Uuid,
    /// Zip archive ready for download
    pub bundle: Vec<u8>,
    pub summary: String,
    pub generated: usize,
    pub failures: Vec<RowFailure>,
    pub total_rows: usize,
    pub completed_at: DateTime<Utc>,
}

/// Run generation, summarization and bundling in sequence.
///
/// The summary is built from the first successfully generated row. Any
/// stage that fails outright aborts the run; individual row failures do not.
pub async fn run<G, S>(
    generator: &G,
    summarizer: &S,
    request: RunRequest,
) -> Result<RunOutcome, PipelineError>
where
    G: DocumentGenerator + ?Sized,
    S: Summarizer + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("run", %run_id, template = %request.template.name());

    async move {
        let RunRequest {
            template,
            dataset,
            mapping,
        } = request;

        let report = generate_documents(
            generator,
            &template,
            template.fields(),
            &mapping,
            dataset.rows(),
        )
        .await?;

        // generate_documents never returns an empty success
        let sample = sample_text(&template, &report.documents[0].values);
        let summary = summarize(summarizer, &sample).await?;

        let documents: Vec<&[u8]> = report
            .documents
            .iter()
            .map(|d| d.bytes.as_slice())
            .collect();
        let bundle = bundle_documents(&documents, Some(summary.as_str()))?;

        info!(
            generated = report.generated(),
            failed = report.failures.len(),
            "Run complete"
        );

        Ok(RunOutcome {
            run_id,
            bundle,
            summary,
            generated: report.generated(),
            failures: report.failures,
            total_rows: report.total_rows,
            completed_at: Utc::now(),
        })
    }
    .instrument(span)
    .await
}

/// Agreement text handed to the summarizer. Never empty, even when the
/// sample row has no recognizable or non-empty values.
fn sample_text(template: &Template, values: &FieldValues) -> String {
    let described = describe_agreement(values);
    if !described.trim().is_empty() {
        return described;
    }
    format!(
        "Contract generated from template {}\nFields: {}",
        template.name(),
        template.fields().join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GenerationError, SummaryError};
    use crate::generation::tests::{rows, FakeGenerator};
    use crate::summary::tests::FakeSummarizer;
    use crate::template::tests::docx_with_body;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn request(names: &[&str]) -> RunRequest {
        let template = Template::from_bytes("template.pdf", b"tpl".to_vec()).unwrap();
        let dataset = Dataset::from_rows(rows(names)).unwrap();
        let mapping = FieldMapping::auto(template.fields(), dataset.headers());
        RunRequest {
            template,
            dataset,
            mapping,
        }
    }

    fn entry_count(bundle: &[u8]) -> usize {
        zip::ZipArchive::new(Cursor::new(bundle)).unwrap().len()
    }

    #[tokio::test]
    async fn test_full_run() {
        let generator = FakeGenerator::failing(&[]);
        let summarizer = FakeSummarizer::replying("OVERVIEW\n\nA deal.");
        let outcome = run(&generator, &summarizer, request(&["Acme", "Globex"]))
            .await
            .unwrap();

        assert_eq!(outcome.generated, 2);
        assert_eq!(outcome.total_rows, 2);
        assert!(outcome.failures.is_empty());
        // two contracts plus the summary
        assert_eq!(entry_count(&outcome.bundle), 3);

        let prompts = summarizer.prompts.lock().unwrap();
        assert!(prompts[0].contains("Contract between Acme and "));
    }

    #[tokio::test]
    async fn test_partial_run_bundles_successes_only() {
        let generator = FakeGenerator::failing(&[0, 2]);
        let summarizer = FakeSummarizer::replying("OVERVIEW\n\nA deal.");
        let outcome = run(&generator, &summarizer, request(&["a", "b", "c", "d"]))
            .await
            .unwrap();

        assert_eq!(outcome.generated, 2);
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(entry_count(&outcome.bundle), 3);

        // sample comes from the first success (row 1)
        let prompts = summarizer.prompts.lock().unwrap();
        assert!(prompts[0].contains("Contract between b and "));
    }

    #[tokio::test]
    async fn test_unmapped_extracted_fields_still_summarized() {
        let docx = docx_with_body("<w:p><w:r><w:t>Between {{party}} and us</w:t></w:r></w:p>");
        let template = Template::from_bytes("party.docx", docx).unwrap();
        let dataset = Dataset::parse_csv(b"Other\nx\ny\n").unwrap();
        let mapping = FieldMapping::auto(template.fields(), dataset.headers());
        assert!(mapping.is_empty());

        let generator = FakeGenerator::failing(&[]);
        let summarizer = FakeSummarizer::replying("OVERVIEW\n\nA deal.");
        let outcome = run(
            &generator,
            &summarizer,
            RunRequest {
                template,
                dataset,
                mapping,
            },
        )
        .await
        .unwrap();

        assert_eq!(outcome.generated, 2);
        assert_eq!(entry_count(&outcome.bundle), 3);
        let prompts = summarizer.prompts.lock().unwrap();
        assert!(prompts[0].contains("Contract generated from template party.docx"));
        assert!(prompts[0].contains("Fields: party"));
    }

    #[tokio::test]
    async fn test_total_failure_produces_no_archive() {
        let generator = FakeGenerator::failing(&[0, 1]);
        let summarizer = FakeSummarizer::replying("unused");
        let err = run(&generator, &summarizer, request(&["a", "b"]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Generation(GenerationError::NoDocuments { .. })
        ));
        assert!(summarizer.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summary_failure_aborts_run() {
        let generator = FakeGenerator::failing(&[]);
        let err = run(&generator, &FakeSummarizer::failing(), request(&["a"]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Summary(SummaryError::Provider(_))));
    }
}
