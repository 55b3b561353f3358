// Error types for chatlens
//
// Analysis itself never fails on external-service problems; these errors
// cover loading, configuration and the seams that are later degraded.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatlensError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Line {line}: cannot parse timestamp '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a single call to the classification service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// This request failed; other models may still answer
    #[error("request to model '{model}' failed: {reason}")]
    Request { model: String, reason: String },

    /// The service cannot be used at all (unreachable, credential rejected)
    #[error("classification service unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn is_service_level(&self) -> bool {
        matches!(self, BackendError::Unavailable(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("analyzer failure: {0}")]
    Analyzer(String),
}

pub type Result<T> = std::result::Result<T, ChatlensError>;
