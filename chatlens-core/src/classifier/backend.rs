//! Classification backend trait
//!
//! The capability the classifier needs from an external service: given a
//! prompt and a model identifier, return free text or nothing.

use crate::error::BackendError;

/// Backend trait for external classification
///
/// `Ok(None)` means the model answered with nothing usable (empty or
/// whitespace-only text). Errors distinguish a failed request, after which
/// the next model is tried, from an unavailable service, after which no
/// further calls are made for the batch.
pub trait ClassificationBackend: Send + Sync {
    fn generate(&self, prompt: &str, model: &str) -> Result<Option<String>, BackendError>;

    /// Backend identifier for logging/debugging
    fn name(&self) -> &str;
}
