//! Gemini backend
//!
//! Calls the `generateContent` REST endpoint with a blocking `ureq` agent.
//! One request per call; no retries here, the classifier's model list is
//! the retry policy.

use super::backend::ClassificationBackend;
use crate::config::ClassifierConfig;
use crate::error::BackendError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct GeminiBackend {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

impl GeminiBackend {
    pub fn new(api_key: &str, config: &ClassifierConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build();
        Self {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn url_for(&self, model: &str) -> String {
        format!("{}/{}:generateContent", self.endpoint, model)
    }
}

impl ClassificationBackend for GeminiBackend {
    fn generate(&self, prompt: &str, model: &str) -> Result<Option<String>, BackendError> {
        let request = GenerateRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = self
            .agent
            .post(&self.url_for(model))
            .set("x-goog-api-key", &self.api_key)
            .send_json(&request);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(classify_status(model, code, &body));
            }
            Err(transport) => {
                return Err(BackendError::Unavailable(transport.to_string()));
            }
        };

        let parsed: GenerateResponse =
            response.into_json().map_err(|e| BackendError::Request {
                model: model.to_string(),
                reason: format!("invalid response body: {e}"),
            })?;

        if let Some(error) = parsed.error {
            return Err(BackendError::Request {
                model: model.to_string(),
                reason: error.message,
            });
        }

        let text = parsed.first_text();
        debug!("Model {} answered {:?}", model, text);
        Ok(text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// 401/403 mean the credential itself is rejected, so no model will work.
fn classify_status(model: &str, code: u16, body: &str) -> BackendError {
    match code {
        401 | 403 => BackendError::Unavailable(format!("credential rejected (HTTP {code})")),
        _ => BackendError::Request {
            model: model.to_string(),
            reason: format!("HTTP {code}: {}", truncate(body, 200)),
        },
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, trimmed; `None` if blank
    fn first_text(&self) -> Option<String> {
        let candidate = self.candidates.as_ref()?.first()?;
        let text: String = candidate
            .content
            .as_ref()?
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_text_joins_parts() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":" 機能"},{"text":"要望\n"}]}}]}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.first_text(), Some("機能要望".to_string()));
    }

    #[test]
    fn test_blank_or_missing_text_is_none() {
        let blank: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#).unwrap();
        assert_eq!(blank.first_text(), None);

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(empty.first_text(), None);

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(blocked.first_text(), None);
    }

    #[test]
    fn test_status_mapping() {
        assert!(classify_status("m", 403, "").is_service_level());
        assert!(classify_status("m", 401, "").is_service_level());
        assert!(!classify_status("m", 404, "model not found").is_service_level());
        assert!(!classify_status("m", 429, "").is_service_level());
    }

    #[test]
    fn test_url_includes_model() {
        let config = ClassifierConfig {
            endpoint: "http://localhost:9/v1beta/models/".to_string(),
            ..ClassifierConfig::default()
        };
        let backend = GeminiBackend::new("key", &config);
        assert_eq!(
            backend.url_for("gemini-pro"),
            "http://localhost:9/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn test_unreachable_host_is_service_level() {
        let config = ClassifierConfig {
            endpoint: "http://127.0.0.1:9/v1beta/models".to_string(),
            timeout_secs: 2,
            ..ClassifierConfig::default()
        };
        let backend = GeminiBackend::new("key", &config);
        let err = backend.generate("prompt", "gemini-pro").unwrap_err();
        assert!(err.is_service_level());
    }
}
