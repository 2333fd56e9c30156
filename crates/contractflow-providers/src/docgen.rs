//! Foxit document generation client
//!
//! `POST {base}/document-generation/api/GenerateDocumentBase64` with the
//! template and field values; the filled PDF comes back base64-encoded.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use contractflow_core::{DocumentGenerator, FieldValues, ProviderError};

use crate::config::DocGenConfig;
use crate::{build_http_client, status_error, transport_error};

const GENERATE_PATH: &str = "/document-generation/api/GenerateDocumentBase64";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    output_format: &'a str,
    document_values: &'a FieldValues,
    base64_file_string: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    base64_file_string: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct DocGenClient {
    http: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
}

impl DocGenClient {
    pub fn new(config: &DocGenConfig, timeout: std::time::Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: format!("{}{}", config.base_url.trim_end_matches('/'), GENERATE_PATH),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl DocumentGenerator for DocGenClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, fields = values.len()))]
    async fn generate(
        &self,
        template_base64: &str,
        values: &FieldValues,
    ) -> Result<Vec<u8>, ProviderError> {
        debug!("Calling document generation API");

        let response = self
            .http
            .post(&self.endpoint)
            .header("client_id", &self.client_id)
            .header("client_secret", &self.client_secret)
            .json(&GenerateRequest {
                output_format: "pdf",
                document_values: values,
                base64_file_string: template_base64,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!(error = %err, "Document generation error");
            return Err(err);
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let encoded = body
            .base64_file_string
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                let reason = body
                    .message
                    .unwrap_or_else(|| "No PDF returned from API".to_string());
                error!(reason = %reason, "API returned no PDF");
                ProviderError::EmptyResponse(reason)
            })?;

        BASE64
            .decode(encoded.trim())
            .map_err(|e| ProviderError::Decode(format!("invalid base64 document: {e}")))
    }
}
