use crate::error::ChatlensError;
use crate::types::{Category, PartOfSpeech};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// Default value functions for serde
fn default_top_n() -> usize {
    10
}

fn default_min_length() -> usize {
    2 // base forms of a single character are noise
}

fn default_parts_of_speech() -> Vec<PartOfSpeech> {
    vec![PartOfSpeech::Noun, PartOfSpeech::Verb]
}

fn default_stopwords() -> Vec<String> {
    [
        "する", "ある", "いる", "なる", "できる", "れる", "られる", "せる", "させる",
        "こと", "もの", "ため", "よう", "それ", "これ", "あれ", "どれ", "ここ", "そこ",
        "さん", "とき", "ところ", "みたい", "わけ", "はず", "なに", "いう", "思う",
        "ください", "お願い", "です", "ます",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-1.5-flash".to_string(),
        "gemini-1.5-pro".to_string(),
        "gemini-pro".to_string(),
    ]
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/models".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_prompt_template() -> String {
    "以下のユーザーメッセージを、下記の5カテゴリのいずれか1つに分類してください。\n\
     カテゴリ名のみを返してください。\n\
     \n\
     カテゴリ:\n\
     {categories}\n\
     \n\
     メッセージ: \"{message}\"\n\
     \n\
     分類結果:"
        .to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_range_days() -> i64 {
    60
}

/// Upper bound for `dashboard.default_range_days` (about a century)
pub const MAX_RANGE_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub keywords: KeywordConfig,
    #[serde(default)]
    pub taxonomy: TaxonomyConfig,
    /// Ordered cue rules for the deterministic classifier; first match wins
    #[serde(default = "default_fallback_rules")]
    pub fallback_rules: Vec<FallbackRule>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordConfig::default(),
            taxonomy: TaxonomyConfig::default(),
            fallback_rules: default_fallback_rules(),
            classifier: ClassifierConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Number of keywords to return
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Minimum base-form length in characters
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Parts of speech whose base forms are counted
    #[serde(default = "default_parts_of_speech")]
    pub parts_of_speech: Vec<PartOfSpeech>,
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            min_length: default_min_length(),
            parts_of_speech: default_parts_of_speech(),
            stopwords: default_stopwords(),
        }
    }
}

impl KeywordConfig {
    pub fn stopword_set(&self) -> HashSet<&str> {
        self.stopwords.iter().map(String::as_str).collect()
    }
}

/// Display labels of the five categories. These are the strings the
/// classification service is asked to return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyConfig {
    pub operation_how_to: String,
    pub feature_location: String,
    pub error_trouble: String,
    pub feature_request: String,
    pub other: String,
}

impl Default for TaxonomyConfig {
    fn default() -> Self {
        Self {
            operation_how_to: "操作方法".to_string(),
            feature_location: "機能の場所".to_string(),
            error_trouble: "エラー/トラブル".to_string(),
            feature_request: "機能要望".to_string(),
            other: "その他".to_string(),
        }
    }
}

impl TaxonomyConfig {
    pub fn label(&self, category: Category) -> &str {
        match category {
            Category::OperationHowTo => &self.operation_how_to,
            Category::FeatureLocation => &self.feature_location,
            Category::ErrorTrouble => &self.error_trouble,
            Category::FeatureRequest => &self.feature_request,
            Category::Other => &self.other,
        }
    }

    /// Labels in canonical taxonomy order
    pub fn labels(&self) -> impl Iterator<Item = (Category, &str)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.label(c)))
    }

    /// Numbered list used inside the classification prompt
    pub fn prompt_listing(&self) -> String {
        self.labels()
            .enumerate()
            .map(|(i, (_, label))| format!("{}. {}", i + 1, label))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub category: Category,
    /// Substrings that select this category
    pub cues: Vec<String>,
}

impl FallbackRule {
    pub fn new(category: Category, cues: &[&str]) -> Self {
        Self {
            category,
            cues: cues.iter().map(|s| s.to_string()).collect(),
        }
    }
}

pub fn default_fallback_rules() -> Vec<FallbackRule> {
    vec![
        FallbackRule::new(
            Category::OperationHowTo,
            &["どこ", "どうやって", "やり方", "教え", "方法"],
        ),
        FallbackRule::new(
            Category::FeatureLocation,
            &["ボタン", "メニュー", "場所", "見つからない", "設定"],
        ),
        FallbackRule::new(
            Category::ErrorTrouble,
            &["エラー", "できない", "失敗", "真っ白", "接続"],
        ),
        FallbackRule::new(
            Category::FeatureRequest,
            &["欲しい", "追加", "改善", "オフにしたい", "自動保存"],
        ),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Models tried in priority order for every message
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Base URL of the generateContent API (model name is appended)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Prompt with `{categories}` and `{message}` placeholders
    #[serde(default = "default_prompt_template")]
    pub prompt_template: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            prompt_template: default_prompt_template(),
        }
    }
}

impl ClassifierConfig {
    pub fn render_prompt(&self, taxonomy: &TaxonomyConfig, message: &str) -> String {
        self.prompt_template
            .replace("{categories}", &taxonomy.prompt_listing())
            .replace("{message}", message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Records per page in the message listing
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Width of the date window used when no range is given
    #[serde(default = "default_range_days")]
    pub default_range_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_range_days: default_range_days(),
        }
    }
}

impl AnalysisConfig {
    /// Load config from file path (functional approach)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: AnalysisConfig =
            serde_yaml::from_str(content).map_err(ChatlensError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}, using defaults: {}", p, e);
                Self::default()
            }),
            None => Self::default(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ChatlensError> {
        if self.classifier.models.is_empty() {
            return Err(ChatlensError::Config(
                "classifier.models must name at least one model".to_string(),
            ));
        }
        if self.keywords.top_n == 0 {
            return Err(ChatlensError::Config("keywords.top_n must be positive".to_string()));
        }
        if !(0..=MAX_RANGE_DAYS).contains(&self.dashboard.default_range_days) {
            return Err(ChatlensError::Config(format!(
                "dashboard.default_range_days must be between 0 and {MAX_RANGE_DAYS}"
            )));
        }
        if self.dashboard.page_size == 0 {
            return Err(ChatlensError::Config("dashboard.page_size must be positive".to_string()));
        }

        let mut seen = HashSet::new();
        for (category, label) in self.taxonomy.labels() {
            if label.trim().is_empty() {
                return Err(ChatlensError::Config(format!(
                    "taxonomy label for '{category}' is empty"
                )));
            }
            if !seen.insert(label) {
                return Err(ChatlensError::Config(format!(
                    "taxonomy label '{label}' is used twice"
                )));
            }
        }

        for (i, rule) in self.fallback_rules.iter().enumerate() {
            if rule.cues.iter().all(|c| c.is_empty()) {
                return Err(ChatlensError::Config(format!(
                    "fallback rule {} ({}) has no cues",
                    i + 1,
                    rule.category
                )));
            }
        }
        Ok(())
    }
}
