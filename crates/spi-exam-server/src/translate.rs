//! Translation collaborator client.
//!
//! The translation feature is an opaque hosted service: the server only
//! knows `translate(text, target_language) -> text`. The client is
//! constructed when the configured API key environment variable is set;
//! otherwise translation endpoints answer that the feature is unavailable.

use serde::{Deserialize, Serialize};

use crate::config::TranslatorConfig;
use crate::error::{ExamError, Result};

/// Client for the hosted translation service.
#[derive(Clone)]
pub struct TranslateClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl std::fmt::Debug for TranslateClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // api_key intentionally omitted
        f.debug_struct("TranslateClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Wire format of a translation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateRequest<'a> {
    text: &'a str,
    target_language: &'a str,
}

/// Wire format of a translation response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

impl TranslateClient {
    /// Creates a client for the given endpoint and API key.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds a client from configuration, reading the API key from the
    /// configured environment variable.
    ///
    /// Returns `None` when the variable is unset or blank, meaning the
    /// translation feature stays disabled.
    #[must_use]
    pub fn from_env(config: &TranslatorConfig) -> Option<Self> {
        let api_key = std::env::var(&config.api_key_env).ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        Some(Self::new(&config.endpoint, api_key))
    }

    /// Translates `text` into `target_language`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::TranslateFailed` for transport errors, non-2xx
    /// responses, and undecodable response bodies.
    pub async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TranslateRequest {
                text,
                target_language,
            })
            .send()
            .await
            .map_err(|e| ExamError::translate_failed("transport", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExamError::translate_failed(status.to_string(), body));
        }

        let body: TranslateResponse = response
            .json()
            .await
            .map_err(|e| ExamError::translate_failed("decode", e.to_string()))?;
        Ok(body.translated_text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = TranslateRequest {
            text: "反対の意味の言葉を選びなさい。",
            target_language: "en",
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""targetLanguage":"en""#));
        assert!(json.contains("反対"));
    }

    #[test]
    fn test_response_wire_format() {
        let json = r#"{"translatedText": "Choose the word with the opposite meaning."}"#;
        let response: TranslateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.translated_text,
            "Choose the word with the opposite meaning."
        );
    }

    #[test]
    fn test_from_env_missing_key_disables_client() {
        let config = TranslatorConfig {
            endpoint: "https://example.com/translate".to_string(),
            api_key_env: "EXAM_TEST_TRANSLATOR_KEY_UNSET".to_string(),
        };
        assert!(TranslateClient::from_env(&config).is_none());
    }

    #[test]
    fn test_from_env_with_key() {
        let config = TranslatorConfig {
            endpoint: "https://example.com/translate".to_string(),
            api_key_env: "EXAM_TEST_TRANSLATOR_KEY_SET".to_string(),
        };
        std::env::set_var(&config.api_key_env, "secret");

        let client = TranslateClient::from_env(&config);
        assert!(client.is_some());

        std::env::remove_var(&config.api_key_env);
    }

    #[test]
    fn test_debug_hides_api_key() {
        let client = TranslateClient::new("https://example.com/translate", "super-secret");
        let debug = format!("{client:?}");
        assert!(debug.contains("endpoint"));
        assert!(!debug.contains("super-secret"));
    }
}
