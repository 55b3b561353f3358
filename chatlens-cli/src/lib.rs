// All analysis functionality is in chatlens-core
// This CLI acts as a thin wrapper around the core library

// CLI-specific modules
pub mod display;
pub mod paths;
pub mod range;

// Re-export core types for convenience
pub use chatlens_core::*;

// Re-export CLI utilities
pub use paths::{default_cache_dir, get_data_dir, select_storage};
pub use range::resolve_range;
