// Keyword ranking
//
// Counts base forms of content words across a batch of messages and returns
// the most frequent ones with their share of the returned selection.

use crate::config::KeywordConfig;
use crate::tokenizer::MorphAnalyzer;
use crate::types::{KeywordEntry, KeywordRanking, PartOfSpeech};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

pub struct KeywordRanker<'a> {
    analyzer: &'a dyn MorphAnalyzer,
    parts_of_speech: HashSet<PartOfSpeech>,
    stopwords: HashSet<&'a str>,
    min_length: usize,
}

impl<'a> KeywordRanker<'a> {
    pub fn new(config: &'a KeywordConfig, analyzer: &'a dyn MorphAnalyzer) -> Self {
        Self {
            analyzer,
            parts_of_speech: config.parts_of_speech.iter().copied().collect(),
            stopwords: config.stopword_set(),
            min_length: config.min_length,
        }
    }

    fn keep(&self, part_of_speech: PartOfSpeech, base_form: &str) -> bool {
        self.parts_of_speech.contains(&part_of_speech)
            && !self.stopwords.contains(base_form)
            && base_form.chars().count() >= self.min_length
    }

    /// Rank the `top_n` most frequent qualifying base forms.
    ///
    /// Equal counts keep first-seen order. A message that fails to tokenize
    /// is skipped and counted in `skipped_messages`.
    pub fn rank<S: AsRef<str>>(&self, messages: &[S], top_n: usize) -> KeywordRanking {
        // Insertion-ordered counts; `index` maps a base form to its slot
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut skipped_messages = 0;

        for (i, message) in messages.iter().enumerate() {
            let tokens = match self.analyzer.analyze(message.as_ref()) {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("Skipping message {} in keyword ranking: {}", i, e);
                    skipped_messages += 1;
                    continue;
                }
            };

            for token in tokens {
                if !self.keep(token.part_of_speech, &token.base_form) {
                    continue;
                }
                match index.get(&token.base_form) {
                    Some(&slot) => counts[slot].1 += 1,
                    None => {
                        index.insert(token.base_form.clone(), counts.len());
                        counts.push((token.base_form, 1));
                    }
                }
            }
        }

        let candidate_count = counts.len();

        // Stable sort keeps first-seen order among ties
        counts.sort_by(|a, b| b.1.cmp(&a.1));
        counts.truncate(top_n);

        let total: usize = counts.iter().map(|(_, c)| c).sum();
        let denominator = total.max(1) as f64;

        let entries: Vec<KeywordEntry> = counts
            .into_iter()
            .map(|(keyword, count)| KeywordEntry {
                keyword,
                count,
                percentage: round_one_decimal(count as f64 / denominator * 100.0),
            })
            .collect();

        debug!(
            "Ranked {} of {} candidate keywords ({} analyzer)",
            entries.len(),
            candidate_count,
            self.analyzer.name()
        );

        KeywordRanking {
            entries,
            skipped_messages,
            candidate_count,
        }
    }
}

/// Convenience wrapper returning only the ranked entries.
pub fn extract_keywords<S: AsRef<str>>(
    analyzer: &dyn MorphAnalyzer,
    config: &KeywordConfig,
    messages: &[S],
    top_n: usize,
) -> Vec<KeywordEntry> {
    KeywordRanker::new(config, analyzer).rank(messages, top_n).entries
}

/// Exact halves go to the even neighbour (6.25 -> 6.2, 93.75 -> 93.8)
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
