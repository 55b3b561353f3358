use crate::types::*;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Version constants for cache invalidation
pub mod versions {
    pub const CHATLENS_VERSION: &str = "0.1.0";
    pub const CLASSIFICATION_VERSION: &str = "1.0.0";
}

/// Identity of one classified batch (messages + filter + config + backend)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BatchCacheKey {
    pub batch_hash: String,
    pub filter: Option<DateRange>,
    pub config_hash: String,
    /// Which classifier produced the result ("rules" or a service name)
    pub backend: String,
    pub chatlens_version: String,
    pub classification_version: String,
}

impl BatchCacheKey {
    pub fn new(
        batch_hash: String,
        filter: Option<DateRange>,
        config_hash: String,
        backend: &str,
    ) -> Self {
        Self {
            batch_hash,
            filter,
            config_hash,
            backend: backend.to_string(),
            chatlens_version: versions::CHATLENS_VERSION.to_string(),
            classification_version: versions::CLASSIFICATION_VERSION.to_string(),
        }
    }

    /// Compute cache key hash for storage
    pub fn to_cache_hash(&self) -> String {
        use sha2::{Digest, Sha256};
        let filter = match &self.filter {
            Some(range) => format!("{}..{}", range.start, range.end),
            None => "*".to_string(),
        };
        let mut hasher = Sha256::new();
        for field in [
            self.batch_hash.as_str(),
            filter.as_str(),
            self.config_hash.as_str(),
            self.backend.as_str(),
            self.chatlens_version.as_str(),
            self.classification_version.as_str(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Cached classification of a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationCacheValue {
    pub outcome: ClassificationOutcome,
    pub created_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub cache_version: String,
}

impl ClassificationCacheValue {
    pub fn new(outcome: ClassificationOutcome, processing_time_ms: u64) -> Self {
        Self {
            outcome,
            created_at: Utc::now(),
            processing_time_ms,
            cache_version: versions::CHATLENS_VERSION.to_string(),
        }
    }
}

/// In-process cache holding the classification of the current batch only.
///
/// A lookup with a different key (new filter, new data, new config)
/// drops the held entry wholesale; entries are replaced, never patched.
#[derive(Debug, Default)]
pub struct SessionCache {
    entry: Option<(BatchCacheKey, ClassificationCacheValue)>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &BatchCacheKey) -> Option<&ClassificationCacheValue> {
        let stale = matches!(&self.entry, Some((held, _)) if held != key);
        if stale {
            debug!("Batch changed, invalidating session classification cache");
            self.entry = None;
        }
        self.entry.as_ref().map(|(_, value)| value)
    }

    pub fn store(&mut self, key: BatchCacheKey, value: ClassificationCacheValue) {
        self.entry = Some((key, value));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }
}
