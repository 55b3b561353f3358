use chrono::{NaiveDate, NaiveDateTime, Utc, DateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

// ===== INPUT TYPES =====

/// One row of the chat-log dataset. Never mutated after loading; the
/// classifier attaches categories through `AnnotatedMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub timestamp: NaiveDateTime,
    pub user_id: String,
    pub text: String,
}

impl Message {
    pub fn new(timestamp: NaiveDateTime, user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            user_id: user_id.into(),
            text: text.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A message paired with the category assigned to it, if classification ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedMessage {
    #[serde(flatten)]
    pub message: Message,
    pub category: Option<Category>,
}

impl AnnotatedMessage {
    pub fn unclassified(message: Message) -> Self {
        Self {
            message,
            category: None,
        }
    }

    pub fn with_category(message: Message, category: Category) -> Self {
        Self {
            message,
            category: Some(category),
        }
    }
}

// ===== TOKENS =====

/// Coarse part-of-speech classes. Only the first level of the analyzer's
/// feature list is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartOfSpeech {
    Noun,
    Verb,
    Adjective,
    Adverb,
    Particle,
    AuxiliaryVerb,
    Symbol,
    Numeral,
    Other,
}

impl PartOfSpeech {
    /// Map the first IPADIC feature (e.g. `名詞`) to a part of speech.
    pub fn from_ipadic(feature: &str) -> Self {
        match feature {
            "名詞" => PartOfSpeech::Noun,
            "動詞" => PartOfSpeech::Verb,
            "形容詞" => PartOfSpeech::Adjective,
            "副詞" => PartOfSpeech::Adverb,
            "助詞" => PartOfSpeech::Particle,
            "助動詞" => PartOfSpeech::AuxiliaryVerb,
            "記号" => PartOfSpeech::Symbol,
            _ => PartOfSpeech::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub surface: String,
    pub base_form: String,
    pub part_of_speech: PartOfSpeech,
}

impl Token {
    pub fn new(surface: impl Into<String>, base_form: impl Into<String>, part_of_speech: PartOfSpeech) -> Self {
        Self {
            surface: surface.into(),
            base_form: base_form.into(),
            part_of_speech,
        }
    }
}

// ===== KEYWORDS =====

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub count: usize,
    /// Share of the returned selection, rounded to one decimal
    pub percentage: f64,
}

/// Result of a ranking pass, with the bookkeeping the plain entry list drops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordRanking {
    pub entries: Vec<KeywordEntry>,
    /// Messages whose tokenization failed and were left out of the counts
    pub skipped_messages: usize,
    /// Distinct base forms that passed the filters, before truncation
    pub candidate_count: usize,
}

// ===== CATEGORIES =====

/// The closed taxonomy. Display labels are configurable (see `TaxonomyConfig`);
/// the variants themselves are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "operation-how-to")]
    OperationHowTo,
    #[serde(rename = "feature-location")]
    FeatureLocation,
    #[serde(rename = "error/trouble")]
    ErrorTrouble,
    #[serde(rename = "feature-request")]
    FeatureRequest,
    #[serde(rename = "other")]
    Other,
}

impl Category {
    /// Canonical taxonomy order
    pub const ALL: [Category; 5] = [
        Category::OperationHowTo,
        Category::FeatureLocation,
        Category::ErrorTrouble,
        Category::FeatureRequest,
        Category::Other,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Category::OperationHowTo => "operation-how-to",
            Category::FeatureLocation => "feature-location",
            Category::ErrorTrouble => "error/trouble",
            Category::FeatureRequest => "feature-request",
            Category::Other => "other",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Category::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Sparse per-category tally. Categories with no messages are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts(BTreeMap<Category, usize>);

impl CategoryCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, category: Category) {
        *self.0.entry(category).or_insert(0) += 1;
    }

    pub fn get(&self, category: Category) -> Option<usize> {
        self.0.get(&category).copied()
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        self.0.iter().map(|(c, n)| (*c, *n))
    }

    pub fn as_map(&self) -> &BTreeMap<Category, usize> {
        &self.0
    }
}

impl FromIterator<(Category, usize)> for CategoryCounts {
    fn from_iter<I: IntoIterator<Item = (Category, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|(_, n)| *n > 0).collect())
    }
}

// ===== CLASSIFICATION OUTCOME =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// No credential configured, every message went through the rule engine
    OfflineMode,
    /// Every model failed for a single message
    MessageFallback,
    /// The external service as a whole failed; remaining messages fell back
    ServiceUnavailable,
    /// A message could not be tokenized and was left out of keyword counts
    TokenizationSkipped,
    /// Cache read or write failed; processing continued without it
    CacheUnavailable,
}

/// Non-fatal note surfaced to the caller. Never aborts a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    /// One category per input message, same order
    pub categories: Vec<Category>,
    pub diagnostics: Vec<Diagnostic>,
    /// First model that answered during this batch
    pub preferred_model: Option<String>,
    pub ai_classified: usize,
    pub fallback_classified: usize,
}

// ===== REPORT =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Everything the presentation layer consumes for one filtered batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub range: Option<DateRange>,
    pub message_count: usize,
    pub keywords: Vec<KeywordEntry>,
    pub skipped_messages: usize,
    pub category_counts: CategoryCounts,
    pub records: Vec<AnnotatedMessage>,
    pub diagnostics: Vec<Diagnostic>,
    pub preferred_model: Option<String>,
    pub from_cache: bool,
}
