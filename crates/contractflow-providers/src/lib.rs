//! Provider clients for ContractFlow
//!
//! Implements the core's service seams over HTTP:
//!
//! - [`DocGenClient`]: `DocumentGenerator` backed by the Foxit document
//!   generation API (`GenerateDocumentBase64`)
//! - [`GeminiClient`]: `Summarizer` backed by the Gemini
//!   `generateContent` API
//!
//! Both are configured from the environment via [`ProviderConfig::from_env`].
//! Neither retries: a failed call is reported once with the provider's status
//! and body.

pub mod config;
pub mod docgen;
pub mod gemini;

pub use config::{DocGenConfig, GeminiConfig, ProviderConfig};
pub use docgen::DocGenClient;
pub use gemini::GeminiClient;

use std::time::Duration;

use contractflow_core::ProviderError;
use reqwest::Client;

const USER_AGENT: &str = concat!("contractflow/", env!("CARGO_PKG_VERSION"));

/// Shared reqwest client settings
fn build_http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Config(format!("failed to build HTTP client: {e}")))
}

/// Turn a non-success response into [`ProviderError::Status`], keeping the
/// body as detail.
async fn status_error(response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let detail = response
        .text()
        .await
        .ok()
        .filter(|body| !body.trim().is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    ProviderError::Status {
        status: status.as_u16(),
        detail,
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transport(format!("request timed out: {err}"))
    } else {
        ProviderError::Transport(err.to_string())
    }
}
