// Chatlens Core Library
//
// Keyword ranking, category classification and aggregation of chat logs.
// `AnalysisPipeline` is the main entry point; the modules below can also be
// used on their own.

pub mod aggregate;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod keywords;
pub mod loader;
pub mod processor;
pub mod storage;
pub mod tokenizer;
pub mod types;

// Re-export main types and functions for easy use
pub use types::*;
pub use aggregate::{aggregate, annotate, count_categories};
pub use classifier::{classify, fallback_classify, normalize_label, CategoryClassifier};
pub use config::AnalysisConfig;
pub use error::{BackendError, ChatlensError, TokenizeError};
pub use keywords::{extract_keywords, KeywordRanker};
pub use loader::{filter_messages, load_messages};
pub use processor::{AnalysisPipeline, StepProfiler};
pub use export::{listing, paginate, write_records_csv};
pub use storage::{ClassificationStorage, FileStorage, NoOpStorage};
pub use tokenizer::{default_analyzer, MorphAnalyzer};
