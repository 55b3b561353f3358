//! Dictionary-free analyzer based on Unicode script runs.
//!
//! Japanese has no spaces, but script changes are a usable proxy for word
//! boundaries in support chat: kanji compounds, katakana loanwords and Latin
//! product names are content words, hiragana runs are mostly particles and
//! inflections. There is no lemmatization, so base form equals surface
//! (Latin words are lower-cased).

use super::{check_input, MorphAnalyzer};
use crate::error::TokenizeError;
use crate::types::{PartOfSpeech, Token};
use once_cell::sync::Lazy;
use regex::Regex;

static SCRIPT_RUN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?P<han>[\p{Han}々〆ヶ]+)|(?P<kata>[\p{Katakana}ー]+)|(?P<hira>[\p{Hiragana}ー]+)|(?P<latin>\p{Latin}[\p{Latin}0-9_\-]*)|(?P<num>[0-9０-９]+(?:[.,][0-9]+)*)|(?P<sym>\S)",
    )
    .expect("Invalid script run regex")
});

#[derive(Debug, Default)]
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl MorphAnalyzer for ScriptAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Token>, TokenizeError> {
        check_input(text)?;

        let tokens = SCRIPT_RUN_REGEX
            .captures_iter(text)
            .filter_map(|caps| {
                let (pos, m) = if let Some(m) = caps.name("han") {
                    (PartOfSpeech::Noun, m)
                } else if let Some(m) = caps.name("kata") {
                    (PartOfSpeech::Noun, m)
                } else if let Some(m) = caps.name("latin") {
                    return Some(Token::new(
                        m.as_str(),
                        m.as_str().to_lowercase(),
                        PartOfSpeech::Noun,
                    ));
                } else if let Some(m) = caps.name("hira") {
                    (PartOfSpeech::Other, m)
                } else if let Some(m) = caps.name("num") {
                    (PartOfSpeech::Numeral, m)
                } else {
                    (PartOfSpeech::Symbol, caps.name("sym")?)
                };
                Some(Token::new(m.as_str(), m.as_str(), pos))
            })
            .collect();

        Ok(tokens)
    }

    fn name(&self) -> &str {
        "script"
    }
}
