//! Lindera analyzer with the embedded IPADIC dictionary.
//!
//! IPADIC feature layout: index 0 is the coarse part of speech, index 6 the
//! base form (`*` when the dictionary has none).

use super::{check_input, MorphAnalyzer};
use crate::error::TokenizeError;
use crate::types::{PartOfSpeech, Token};
use anyhow::Result;
use lindera::{
    dictionary::{load_dictionary_from_kind, DictionaryKind},
    mode::Mode,
    segmenter::Segmenter,
    tokenizer::Tokenizer as LinderaTokenizer,
};

const BASE_FORM_INDEX: usize = 6;

pub struct LinderaAnalyzer {
    tokenizer: LinderaTokenizer,
}

impl LinderaAnalyzer {
    pub fn new() -> Result<Self> {
        let dictionary = load_dictionary_from_kind(DictionaryKind::IPADIC)?;
        let segmenter = Segmenter::new(Mode::Normal, dictionary, None);
        let tokenizer = LinderaTokenizer::new(segmenter);
        Ok(Self { tokenizer })
    }
}

impl MorphAnalyzer for LinderaAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Token>, TokenizeError> {
        check_input(text)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut tokens = self
            .tokenizer
            .tokenize(text)
            .map_err(|e| TokenizeError::Analyzer(e.to_string()))?;

        let mut result = Vec::with_capacity(tokens.len());
        for token in tokens.iter_mut() {
            let surface = token.text.to_string();
            let details = token.details();

            let part_of_speech = details
                .first()
                .map(|pos| PartOfSpeech::from_ipadic(pos))
                .unwrap_or(PartOfSpeech::Other);

            let base_form = match details.get(BASE_FORM_INDEX) {
                Some(base) if !base.is_empty() && *base != "*" => base.to_string(),
                _ => surface.clone(),
            };

            result.push(Token {
                surface,
                base_form,
                part_of_speech,
            });
        }
        Ok(result)
    }

    fn name(&self) -> &str {
        "lindera-ipadic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs_are_lemmatized() {
        let analyzer = LinderaAnalyzer::new().unwrap();
        let tokens = analyzer.analyze("ファイルを保存した").unwrap();
        let verb = tokens
            .iter()
            .find(|t| t.part_of_speech == PartOfSpeech::Verb)
            .expect("verb token");
        assert_eq!(verb.base_form, "する");
        assert!(tokens
            .iter()
            .any(|t| t.base_form == "ファイル" && t.part_of_speech == PartOfSpeech::Noun));
    }
}
