//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use contractflow_core::{ProviderError, Summarizer};

use crate::config::GeminiConfig;
use crate::{build_http_client, status_error, transport_error};

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [PartOut<'a>; 1],
}

#[derive(Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Deserialize)]
struct PartIn {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated
    fn into_text(self) -> Result<String, ProviderError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .map(|r| format!("no candidates returned (blocked: {r})"))
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(ProviderError::EmptyResponse(reason));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(
                "candidate contained no text".to_string(),
            ));
        }
        Ok(text)
    }
}

pub struct GeminiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, timeout: std::time::Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client(timeout)?,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        debug!("Calling Gemini API");

        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&GenerateContentRequest {
                contents: [Content {
                    parts: [PartOut { text: prompt }],
                }],
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let err = status_error(response).await;
            error!(error = %err, "Gemini API error");
            return Err(err);
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        body.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> GeminiClient {
        let config = GeminiConfig {
            base_url: server.uri(),
            api_key: "test-key".into(),
            model: "gemini-test".into(),
        };
        GeminiClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_complete_joins_parts() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .and(body_json(json!({
                "contents": [{ "parts": [{ "text": "Summarize this" }] }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "OVERVIEW\n" }, { "text": "A lease." }] }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server).complete("Summarize this").await.unwrap();
        assert_eq!(text, "OVERVIEW\nA lease.");
    }

    #[tokio::test]
    async fn test_rate_limit_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let err = client(&server).complete("x").await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert_eq!(
            err,
            ProviderError::Status {
                status: 429,
                detail: "quota exceeded".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_blocked_prompt() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).complete("x").await.unwrap_err();
        assert_eq!(
            err,
            ProviderError::EmptyResponse("no candidates returned (blocked: SAFETY)".into())
        );
    }

    #[tokio::test]
    async fn test_candidate_without_text() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "parts": [] } }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).complete("x").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse(_)));
    }

    #[test]
    fn test_endpoint_includes_model() {
        let config = GeminiConfig {
            base_url: "https://generativelanguage.googleapis.com/".into(),
            api_key: "k".into(),
            model: "gemini-2.0-flash".into(),
        };
        let client = GeminiClient::new(&config, Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
