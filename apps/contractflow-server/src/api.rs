//! API handlers for the ContractFlow server
//!
//! Request and response bodies are JSON; binary payloads (templates,
//! generated PDFs) travel as base64 strings. The bundle endpoint is the only
//! one answering with raw bytes.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use contractflow_core::{
    bundle_documents, generate_documents, render, summarize, Dataset, FieldMapping, FieldSource,
    Row, RowFailure, SummaryBlock, SummarySections, Template, BUNDLE_CONTENT_TYPE,
    BUNDLE_FILENAME,
};

use crate::error::ServerError;
use crate::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contractflow-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Template upload request body
#[derive(Deserialize)]
pub struct TemplateRequest {
    /// Original file name, e.g. "lease.docx"
    #[serde(default = "default_template_name")]
    pub name: String,
    pub data_base64: String,
}

fn default_template_name() -> String {
    "template.docx".to_string()
}

#[derive(Serialize)]
pub struct TemplateResponse {
    pub success: bool,
    pub name: String,
    pub fields: Vec<String>,
    pub field_source: FieldSource,
}

/// Handler: POST /api/template
pub async fn handle_template(
    Json(req): Json<TemplateRequest>,
) -> Result<Json<TemplateResponse>, ServerError> {
    let template = Template::from_base64(req.name, &req.data_base64)?;
    info!(
        "Template uploaded: name={}, fields={}",
        template.name(),
        template.fields().len()
    );

    Ok(Json(TemplateResponse {
        success: true,
        name: template.name().to_string(),
        fields: template.fields().to_vec(),
        field_source: template.field_source(),
    }))
}

/// Dataset upload request body
#[derive(Deserialize)]
pub struct DatasetRequest {
    /// Raw CSV text, header row first
    pub csv: String,
    /// Template fields to auto-map against the headers
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

#[derive(Serialize)]
pub struct DatasetResponse {
    pub success: bool,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<FieldMapping>,
}

/// Handler: POST /api/dataset
pub async fn handle_dataset(
    Json(req): Json<DatasetRequest>,
) -> Result<Json<DatasetResponse>, ServerError> {
    let dataset = Dataset::parse_csv(req.csv.as_bytes())?;
    info!(
        "Dataset uploaded: columns={}, rows={}",
        dataset.headers().len(),
        dataset.len()
    );

    let mapping = req
        .fields
        .map(|fields| FieldMapping::auto(&fields, dataset.headers()));
    let headers = dataset.headers().to_vec();
    let row_count = dataset.len();

    Ok(Json(DatasetResponse {
        success: true,
        headers,
        rows: dataset.into_rows(),
        row_count,
        mapping,
    }))
}

/// Mapping request body
#[derive(Deserialize)]
pub struct MappingRequest {
    pub fields: Vec<String>,
    pub headers: Vec<String>,
    /// Manual choices applied on top of the auto-mapping. `null` or an empty
    /// string leaves the field unmapped.
    #[serde(default)]
    pub overrides: BTreeMap<String, Option<String>>,
}

#[derive(Serialize)]
pub struct MappingResponse {
    pub success: bool,
    pub mapping: FieldMapping,
    pub unmapped: Vec<String>,
}

/// Handler: POST /api/mapping
pub async fn handle_mapping(
    Json(req): Json<MappingRequest>,
) -> Result<Json<MappingResponse>, ServerError> {
    if let Some(column) = req
        .overrides
        .values()
        .flatten()
        .find(|c| !c.is_empty() && !req.headers.contains(*c))
    {
        return Err(ServerError::InvalidRequest(format!(
            "Unknown column '{}'",
            column
        )));
    }

    let mut mapping = FieldMapping::auto(&req.fields, &req.headers);
    for (field, column) in req.overrides {
        match column.filter(|c| !c.is_empty()) {
            Some(column) => mapping.assign(field, column),
            None => mapping.clear(&field),
        }
    }

    let unmapped = mapping
        .unmapped(&req.fields)
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(Json(MappingResponse {
        success: true,
        mapping,
        unmapped,
    }))
}

/// Bulk generation request body
#[derive(Deserialize)]
pub struct GenerateRequest {
    pub template_base64: String,
    #[serde(default = "default_template_name")]
    pub template_name: String,
    /// Fields to send for every row; the template's own fields when empty
    #[serde(default)]
    pub fields: Vec<String>,
    pub rows: Vec<Row>,
    pub mapping: FieldMapping,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    /// Documents produced
    pub count: usize,
    /// Rows submitted
    pub total: usize,
    /// Zero-based indexes of rows that failed
    pub failed_rows: Vec<usize>,
    pub failures: Vec<RowFailure>,
    /// Base64 PDFs in row order
    pub pdfs: Vec<String>,
}

/// Handler: POST /api/generate-contracts
pub async fn handle_generate_contracts(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, ServerError> {
    let template = Template::from_base64(req.template_name, &req.template_base64)?;
    let fields = if req.fields.is_empty() {
        template.fields().to_vec()
    } else {
        req.fields
    };
    info!(
        "Generate request: template={}, rows={}, fields={}",
        template.name(),
        req.rows.len(),
        fields.len()
    );

    let report = generate_documents(
        state.generator.as_ref(),
        &template,
        &fields,
        &req.mapping,
        &req.rows,
    )
    .await?;

    info!(
        "Generated {}/{} contracts",
        report.generated(),
        report.total_rows
    );

    Ok(Json(GenerateResponse {
        success: true,
        count: report.generated(),
        total: report.total_rows,
        failed_rows: report.failed_rows(),
        pdfs: report
            .documents
            .iter()
            .map(|d| BASE64.encode(&d.bytes))
            .collect(),
        failures: report.failures,
    }))
}

/// Summary request body
#[derive(Deserialize)]
pub struct SummarizeRequest {
    pub contract_text: String,
}

#[derive(Serialize)]
pub struct SummarizeResponse {
    pub success: bool,
    pub summary: String,
    /// Header/paragraph split for display
    pub blocks: Vec<SummaryBlock>,
    /// Expected section headers the summary lacks
    pub missing_sections: Vec<&'static str>,
}

/// Handler: POST /api/summarize
pub async fn handle_summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ServerError> {
    debug!("Summarize request: {} chars", req.contract_text.len());

    let summary = summarize(state.summarizer.as_ref(), &req.contract_text).await?;
    let blocks = render(&summary);
    let missing_sections = SummarySections::parse(&summary).missing();

    Ok(Json(SummarizeResponse {
        success: true,
        summary,
        blocks,
        missing_sections,
    }))
}

/// Bundle request body
#[derive(Deserialize)]
pub struct BundleRequest {
    /// Base64 PDFs, archived in this order
    pub pdfs: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Handler: POST /api/bundle-zip
pub async fn handle_bundle_zip(Json(req): Json<BundleRequest>) -> Result<Response, ServerError> {
    let documents = req
        .pdfs
        .iter()
        .enumerate()
        .map(|(i, pdf)| {
            BASE64.decode(pdf.trim()).map_err(|e| {
                ServerError::InvalidRequest(format!("PDF {} is not valid base64: {}", i + 1, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let archive = bundle_documents(&documents, req.summary.as_deref())?;
    info!(
        "Bundled {} contracts ({} bytes)",
        documents.len(),
        archive.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, BUNDLE_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", BUNDLE_FILENAME),
            ),
        ],
        archive,
    )
        .into_response())
}
