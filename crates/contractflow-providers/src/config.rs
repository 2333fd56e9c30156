//! Provider settings from environment variables

use std::fmt;
use std::time::Duration;

use contractflow_core::ProviderError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Document generation API credentials
#[derive(Clone)]
pub struct DocGenConfig {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for DocGenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocGenConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Gemini API settings
#[derive(Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub docgen: DocGenConfig,
    pub gemini: GeminiConfig,
    /// Per-request timeout for both providers
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Load from environment variables
    ///
    /// Required: `FOXIT_DOCGEN_BASE_URL`, `FOXIT_DOCGEN_CLIENT_ID`,
    /// `FOXIT_DOCGEN_CLIENT_SECRET`, `GEMINI_API_KEY`.
    /// Optional: `GEMINI_BASE_URL`, `GEMINI_MODEL`, `PROVIDER_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| {
                ProviderError::Config(format!("missing environment variable {key}"))
            })
        };

        let timeout_secs = match get("PROVIDER_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ProviderError::Config(format!("PROVIDER_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            docgen: DocGenConfig {
                base_url: required("FOXIT_DOCGEN_BASE_URL")?,
                client_id: required("FOXIT_DOCGEN_CLIENT_ID")?,
                client_secret: required("FOXIT_DOCGEN_CLIENT_SECRET")?,
            },
            gemini: GeminiConfig {
                base_url: get("GEMINI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                api_key: required("GEMINI_API_KEY")?,
                model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            },
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn complete() -> HashMap<String, String> {
        vars(&[
            ("FOXIT_DOCGEN_BASE_URL", "https://docgen.example"),
            ("FOXIT_DOCGEN_CLIENT_ID", "id"),
            ("FOXIT_DOCGEN_CLIENT_SECRET", "secret"),
            ("GEMINI_API_KEY", "key"),
        ])
    }

    #[test]
    fn test_defaults_applied() {
        let env = complete();
        let config = ProviderConfig::from_lookup(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.gemini.base_url, DEFAULT_GEMINI_BASE_URL);
        assert_eq!(config.gemini.model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_missing_required_variable() {
        let mut env = complete();
        env.insert("GEMINI_API_KEY".into(), "  ".into());
        let err = ProviderConfig::from_lookup(|k| env.get(k).cloned()).unwrap_err();

        assert_eq!(
            err,
            ProviderError::Config("missing environment variable GEMINI_API_KEY".into())
        );
    }

    #[test]
    fn test_bad_timeout() {
        let mut env = complete();
        env.insert("PROVIDER_TIMEOUT_SECS".into(), "soon".into());
        assert!(ProviderConfig::from_lookup(|k| env.get(k).cloned()).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let env = complete();
        let config = ProviderConfig::from_lookup(|k| env.get(k).cloned()).unwrap();
        let printed = format!("{:?}", config);

        assert!(!printed.contains("secret\""));
        assert!(!printed.contains("\"key\""));
        assert!(printed.contains("<redacted>"));
    }
}
