use crate::cache::{BatchCacheKey, ClassificationCacheValue};
use crate::types::Message;
use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Persistent storage for batch classification results
pub trait ClassificationStorage: Send + Sync {
    fn get_classification(&self, key: &BatchCacheKey) -> Result<Option<ClassificationCacheValue>>;
    fn store_classification(&self, key: &BatchCacheKey, value: &ClassificationCacheValue) -> Result<()>;
}

/// File-based storage implementation using local cache directory
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: impl AsRef<Path>) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(cache_dir.join("classification"))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn classification_path(&self, key: &BatchCacheKey) -> PathBuf {
        self.cache_dir
            .join("classification")
            .join(format!("{}.json", key.to_cache_hash()))
    }
}

impl ClassificationStorage for FileStorage {
    fn get_classification(&self, key: &BatchCacheKey) -> Result<Option<ClassificationCacheValue>> {
        let path = self.classification_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let json_str = fs::read_to_string(&path)?;
        let value: ClassificationCacheValue = serde_json::from_str(&json_str)
            .map_err(|e| anyhow!("Failed to deserialize cached classification: {}", e))?;
        Ok(Some(value))
    }

    fn store_classification(&self, key: &BatchCacheKey, value: &ClassificationCacheValue) -> Result<()> {
        let json_str = serde_json::to_string_pretty(value)
            .map_err(|e| anyhow!("Failed to serialize classification: {}", e))?;
        fs::write(self.classification_path(key), json_str)?;
        Ok(())
    }
}

/// No-op storage implementation that disables persistent caching
#[derive(Debug, Default)]
pub struct NoOpStorage;

impl NoOpStorage {
    pub fn new() -> Self {
        Self
    }
}

impl ClassificationStorage for NoOpStorage {
    fn get_classification(&self, _key: &BatchCacheKey) -> Result<Option<ClassificationCacheValue>> {
        Ok(None) // Always cache miss
    }

    fn store_classification(&self, _key: &BatchCacheKey, _value: &ClassificationCacheValue) -> Result<()> {
        Ok(())
    }
}

/// Hash of a message batch: every field of every message, in order
pub fn calculate_batch_hash(messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(messages.len().to_le_bytes());
    for message in messages {
        hasher.update(message.timestamp.to_string().as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.user_id.as_bytes());
        hasher.update([0x1f]);
        hasher.update(message.text.as_bytes());
        hasher.update([0x1e]);
    }
    format!("{:x}", hasher.finalize())
}

/// Calculate hash for configuration data (part of the batch cache key)
pub fn calculate_config_hash<T: serde::Serialize>(config: &T) -> Result<String> {
    let config_json = serde_json::to_string(config)
        .map_err(|e| anyhow!("Failed to serialize config for hashing: {}", e))?;

    let mut hasher = Sha256::new();
    hasher.update(config_json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::types::{Category, ClassificationOutcome};
    use chrono::NaiveDate;

    fn message(day: u32, text: &str) -> Message {
        let ts = NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        Message::new(ts, "u1", text)
    }

    #[test]
    fn test_batch_hash_consistency() {
        let batch = vec![message(1, "ログインできない"), message(2, "保存したい")];
        assert_eq!(calculate_batch_hash(&batch), calculate_batch_hash(&batch.clone()));
    }

    #[test]
    fn test_batch_hash_uniqueness() {
        let a = vec![message(1, "ab"), message(2, "c")];
        let b = vec![message(1, "a"), message(2, "bc")];
        let c = vec![message(2, "c"), message(1, "ab")];
        assert_ne!(calculate_batch_hash(&a), calculate_batch_hash(&b));
        assert_ne!(calculate_batch_hash(&a), calculate_batch_hash(&c));
    }

    #[test]
    fn test_config_hash_tracks_changes() {
        let base = AnalysisConfig::default();
        let mut changed = AnalysisConfig::default();
        changed.taxonomy.other = "雑談".to_string();
        assert_eq!(
            calculate_config_hash(&base).unwrap(),
            calculate_config_hash(&AnalysisConfig::default()).unwrap()
        );
        assert_ne!(
            calculate_config_hash(&base).unwrap(),
            calculate_config_hash(&changed).unwrap()
        );
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let key = BatchCacheKey::new("batch".to_string(), None, "config".to_string(), "rules");

        assert!(storage.get_classification(&key).unwrap().is_none());

        let value = ClassificationCacheValue::new(
            ClassificationOutcome {
                categories: vec![Category::ErrorTrouble, Category::Other],
                fallback_classified: 2,
                ..ClassificationOutcome::default()
            },
            3,
        );
        storage.store_classification(&key, &value).unwrap();

        let loaded = storage.get_classification(&key).unwrap().expect("stored value");
        assert_eq!(loaded.outcome, value.outcome);
    }

    #[test]
    fn test_corrupt_entry_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        let key = BatchCacheKey::new("batch".to_string(), None, "config".to_string(), "rules");
        std::fs::write(storage.classification_path(&key), "{not json").unwrap();
        assert!(storage.get_classification(&key).is_err());
    }

    #[test]
    fn test_noop_storage_always_misses() {
        let storage = NoOpStorage::new();
        let key = BatchCacheKey::new("batch".to_string(), None, "config".to_string(), "rules");
        let value = ClassificationCacheValue::new(ClassificationOutcome::default(), 0);
        storage.store_classification(&key, &value).unwrap();
        assert!(storage.get_classification(&key).unwrap().is_none());
    }
}
