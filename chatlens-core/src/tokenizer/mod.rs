//! Tokenizer adapters
//!
//! Wraps a morphological analyzer behind one trait so the keyword ranker
//! only sees `(surface, base form, part of speech)` triples.
//!
//! ## Available Analyzers
//!
//! - `ScriptAnalyzer` - dictionary-free, splits on Unicode script runs
//! - `LinderaAnalyzer` - Lindera with the embedded IPADIC dictionary (`ipadic` feature)

pub mod script;

#[cfg(feature = "ipadic")]
pub mod lindera;

pub use script::ScriptAnalyzer;

#[cfg(feature = "ipadic")]
pub use self::lindera::LinderaAnalyzer;

use crate::error::TokenizeError;
use crate::types::Token;

/// Analyzer trait - turns one message into tokens
///
/// Implementations must be deterministic: the same text always yields the
/// same tokens in the same order.
pub trait MorphAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<Token>, TokenizeError>;

    /// Analyzer identifier for logging/debugging
    fn name(&self) -> &str;
}

/// Reject text the analyzers cannot handle safely.
///
/// NUL and other control characters (except ordinary whitespace) mark the
/// message as malformed.
pub fn check_input(text: &str) -> Result<(), TokenizeError> {
    if let Some(c) = text.chars().find(|c| c.is_control() && !c.is_whitespace()) {
        return Err(TokenizeError::MalformedInput(format!(
            "control character U+{:04X}",
            c as u32
        )));
    }
    Ok(())
}

/// Best analyzer compiled into this build
pub fn default_analyzer() -> anyhow::Result<Box<dyn MorphAnalyzer>> {
    #[cfg(feature = "ipadic")]
    {
        Ok(Box::new(LinderaAnalyzer::new()?))
    }
    #[cfg(not(feature = "ipadic"))]
    {
        Ok(Box::new(ScriptAnalyzer::new()))
    }
}
