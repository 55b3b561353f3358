//! Category classification
//!
//! Every message ends up in exactly one of the five taxonomy categories.
//! With a backend configured, each message is offered to the models in
//! priority order and the first non-empty answer is normalized against the
//! taxonomy. Without a backend, or whenever the backend cannot produce an
//! answer, the deterministic `FallbackRuleEngine` decides. Classification
//! never returns an error: degradations are reported as `Diagnostic`s.

pub mod backend;
pub mod fallback;
pub mod gemini;

pub use backend::ClassificationBackend;
pub use fallback::{fallback_classify, FallbackRuleEngine};
pub use gemini::GeminiBackend;

use crate::config::{AnalysisConfig, ClassifierConfig, TaxonomyConfig};
use crate::error::BackendError;
use crate::types::{Category, ClassificationOutcome, Diagnostic, DiagnosticKind};
use tracing::{debug, info, warn};

pub struct CategoryClassifier {
    taxonomy: TaxonomyConfig,
    settings: ClassifierConfig,
    fallback: FallbackRuleEngine,
    backend: Option<Box<dyn ClassificationBackend>>,
}

impl CategoryClassifier {
    pub fn new(config: &AnalysisConfig, backend: Option<Box<dyn ClassificationBackend>>) -> Self {
        Self {
            taxonomy: config.taxonomy.clone(),
            settings: config.classifier.clone(),
            fallback: FallbackRuleEngine::from_config(&config.fallback_rules),
            backend,
        }
    }

    /// Deterministic-only classifier; never contacts a service
    pub fn offline(config: &AnalysisConfig) -> Self {
        Self::new(config, None)
    }

    /// Gemini-backed classifier when a non-blank credential is supplied,
    /// otherwise the offline classifier
    pub fn from_credential(config: &AnalysisConfig, credential: Option<&str>) -> Self {
        Self::from_credential_with(config, credential, |key, settings| {
            Box::new(GeminiBackend::new(key, settings))
        })
    }

    /// Like `from_credential`, with the backend built by `make_backend`.
    /// The factory is only invoked for a non-blank credential.
    pub fn from_credential_with<F>(config: &AnalysisConfig, credential: Option<&str>, make_backend: F) -> Self
    where
        F: FnOnce(&str, &ClassifierConfig) -> Box<dyn ClassificationBackend>,
    {
        match credential.map(str::trim).filter(|c| !c.is_empty()) {
            Some(key) => Self::new(config, Some(make_backend(key, &config.classifier))),
            None => Self::offline(config),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.backend.is_none()
    }

    /// Identifier used in cache keys and logs
    pub fn backend_name(&self) -> &str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("rules")
    }

    pub fn classify<S: AsRef<str>>(&self, messages: &[S]) -> ClassificationOutcome {
        let mut outcome = ClassificationOutcome {
            categories: Vec::with_capacity(messages.len()),
            ..ClassificationOutcome::default()
        };
        if messages.is_empty() {
            return outcome;
        }

        let Some(backend) = self.backend.as_deref() else {
            outcome.categories = self.fallback.classify_all(messages);
            outcome.fallback_classified = messages.len();
            outcome.diagnostics.push(Diagnostic::new(
                DiagnosticKind::OfflineMode,
                format!(
                    "No API key configured; {} messages classified with keyword rules",
                    messages.len()
                ),
            ));
            return outcome;
        };

        let mut unanswered = 0usize;
        let mut service_down = false;

        for (i, message) in messages.iter().enumerate() {
            let text = message.as_ref();

            if service_down {
                outcome.categories.push(self.fallback.classify(text));
                outcome.fallback_classified += 1;
                continue;
            }

            match self.ask_models(backend, text) {
                Ok(Some((raw, model))) => {
                    if outcome.preferred_model.is_none() {
                        info!("Working model found: {}", model);
                        outcome.preferred_model = Some(model);
                    }
                    let category = normalize_label(&self.taxonomy, &raw);
                    debug!("Message {} -> {} (raw {:?})", i, category, raw);
                    outcome.categories.push(category);
                    outcome.ai_classified += 1;
                }
                Ok(None) => {
                    debug!("Message {}: no model answered, using keyword rules", i);
                    outcome.categories.push(self.fallback.classify(text));
                    outcome.fallback_classified += 1;
                    unanswered += 1;
                }
                Err(e) => {
                    let remaining = messages.len() - i;
                    warn!(
                        "{}; classifying remaining {} messages with keyword rules",
                        e, remaining
                    );
                    outcome.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::ServiceUnavailable,
                        format!(
                            "Classification service error ({e}); {remaining} messages classified with keyword rules"
                        ),
                    ));
                    service_down = true;
                    outcome.categories.push(self.fallback.classify(text));
                    outcome.fallback_classified += 1;
                }
            }
        }

        if unanswered > 0 {
            outcome.diagnostics.push(Diagnostic::new(
                DiagnosticKind::MessageFallback,
                format!("{unanswered} messages got no answer from any model and were classified with keyword rules"),
            ));
        }

        outcome
    }

    /// Try each model in order. `Ok(None)` when none answered; `Err` only
    /// for service-level failures.
    fn ask_models(
        &self,
        backend: &dyn ClassificationBackend,
        text: &str,
    ) -> Result<Option<(String, String)>, BackendError> {
        let prompt = self.settings.render_prompt(&self.taxonomy, text);

        for model in &self.settings.models {
            match backend.generate(&prompt, model) {
                Ok(Some(raw)) if !raw.trim().is_empty() => {
                    return Ok(Some((raw, model.clone())));
                }
                Ok(_) => debug!("Model {} returned an empty answer", model),
                Err(e) if e.is_service_level() => return Err(e),
                Err(e) => debug!("{}", e),
            }
        }
        Ok(None)
    }
}

/// Map a free-text answer onto the taxonomy.
///
/// Exact label match first, then the first label (taxonomy order) contained
/// in the answer, otherwise `Other`.
pub fn normalize_label(taxonomy: &TaxonomyConfig, raw: &str) -> Category {
    let answer = raw.trim();

    if let Some((category, _)) = taxonomy.labels().find(|(_, label)| *label == answer) {
        return category;
    }

    taxonomy
        .labels()
        .find(|(_, label)| answer.contains(label))
        .map(|(category, _)| category)
        .unwrap_or(Category::Other)
}

/// One category per message; external calls only when `credential` is set.
pub fn classify<S: AsRef<str>>(
    config: &AnalysisConfig,
    messages: &[S],
    credential: Option<&str>,
) -> Vec<Category> {
    CategoryClassifier::from_credential(config, credential)
        .classify(messages)
        .categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Answers per model from a fixed table and records every call.
    struct ScriptedBackend {
        answers: HashMap<String, Result<Option<String>, BackendError>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedBackend {
        fn new(answers: &[(&str, Result<Option<&str>, BackendError>)]) -> (Self, Arc<Mutex<Vec<String>>>) {
            let calls = Arc::new(Mutex::new(Vec::new()));
            let backend = Self {
                answers: answers
                    .iter()
                    .map(|(m, r)| (m.to_string(), r.clone().map(|o| o.map(str::to_string))))
                    .collect(),
                calls: Arc::clone(&calls),
            };
            (backend, calls)
        }
    }

    impl ClassificationBackend for ScriptedBackend {
        fn generate(&self, _prompt: &str, model: &str) -> Result<Option<String>, BackendError> {
            self.calls.lock().unwrap().push(model.to_string());
            self.answers.get(model).cloned().unwrap_or(Ok(None))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn request_error(model: &str) -> BackendError {
        BackendError::Request {
            model: model.to_string(),
            reason: "HTTP 404".to_string(),
        }
    }

    fn config_with_models(models: &[&str]) -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.classifier.models = models.iter().map(|m| m.to_string()).collect();
        config
    }

    #[test]
    fn test_normalize_exact_label() {
        let taxonomy = TaxonomyConfig::default();
        assert_eq!(normalize_label(&taxonomy, "機能要望"), Category::FeatureRequest);
        assert_eq!(normalize_label(&taxonomy, "  その他\n"), Category::Other);
    }

    #[test]
    fn test_normalize_recovers_embedded_label() {
        let taxonomy = TaxonomyConfig::default();
        assert_eq!(normalize_label(&taxonomy, "1. 操作方法です"), Category::OperationHowTo);
        assert_eq!(
            normalize_label(&taxonomy, "分類結果: エラー/トラブル"),
            Category::ErrorTrouble
        );
    }

    #[test]
    fn test_normalize_unknown_defaults_to_other() {
        let taxonomy = TaxonomyConfig::default();
        assert_eq!(normalize_label(&taxonomy, "質問"), Category::Other);
        assert_eq!(normalize_label(&taxonomy, ""), Category::Other);
    }

    #[test]
    fn test_offline_uses_rules_for_every_message() {
        let config = AnalysisConfig::default();
        let messages = ["ボタンの位置がわからない", "エラーが出て接続できない", "自動保存機能が欲しい"];
        let outcome = CategoryClassifier::offline(&config).classify(&messages);
        assert_eq!(
            outcome.categories,
            vec![Category::FeatureLocation, Category::ErrorTrouble, Category::FeatureRequest]
        );
        assert_eq!(outcome.fallback_classified, 3);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::OfflineMode);
    }

    #[test]
    fn test_blank_credential_is_offline() {
        let config = AnalysisConfig::default();
        assert!(CategoryClassifier::from_credential(&config, None).is_offline());
        assert!(CategoryClassifier::from_credential(&config, Some("  ")).is_offline());
        assert!(!CategoryClassifier::from_credential(&config, Some("key")).is_offline());
    }

    #[test]
    fn test_empty_batch_makes_no_calls() {
        let config = config_with_models(&["a", "b"]);
        let (backend, calls) = ScriptedBackend::new(&[("a", Ok(Some("その他")))]);
        let classifier = CategoryClassifier::new(&config, Some(Box::new(backend)));
        let empty: Vec<String> = Vec::new();
        let outcome = classifier.classify(&empty);
        assert!(outcome.categories.is_empty());
        assert!(outcome.diagnostics.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_model_fallback_order_and_preferred_model() {
        let config = config_with_models(&["flash", "pro", "legacy"]);
        let (backend, calls) = ScriptedBackend::new(&[
            ("flash", Err(request_error("flash"))),
            ("pro", Ok(Some("機能の場所"))),
        ]);
        let classifier = CategoryClassifier::new(&config, Some(Box::new(backend)));
        let outcome = classifier.classify(&["保存ボタンはどこ？"]);

        assert_eq!(outcome.categories, vec![Category::FeatureLocation]);
        assert_eq!(outcome.preferred_model.as_deref(), Some("pro"));
        assert_eq!(outcome.ai_classified, 1);
        assert_eq!(*calls.lock().unwrap(), vec!["flash", "pro"]);
    }

    #[test]
    fn test_all_models_empty_falls_back_per_message() {
        let config = config_with_models(&["a", "b"]);
        let (backend, calls) = ScriptedBackend::new(&[("a", Ok(None)), ("b", Ok(Some("   ")))]);
        let classifier = CategoryClassifier::new(&config, Some(Box::new(backend)));
        let outcome = classifier.classify(&["接続に失敗する", "ありがとう"]);

        assert_eq!(outcome.categories, vec![Category::ErrorTrouble, Category::Other]);
        assert_eq!(outcome.fallback_classified, 2);
        assert_eq!(outcome.preferred_model, None);
        assert_eq!(calls.lock().unwrap().len(), 4);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::MessageFallback);
    }

    #[test]
    fn test_service_outage_stops_calls_and_degrades() {
        let config = config_with_models(&["a", "b"]);
        let (backend, calls) =
            ScriptedBackend::new(&[("a", Err(BackendError::Unavailable("connection refused".into())))]);
        let classifier = CategoryClassifier::new(&config, Some(Box::new(backend)));
        let messages = ["どうやって印刷する？", "エラーになる", "ダークモード追加希望"];
        let outcome = classifier.classify(&messages);

        assert_eq!(
            outcome.categories,
            vec![Category::OperationHowTo, Category::ErrorTrouble, Category::FeatureRequest]
        );
        assert_eq!(*calls.lock().unwrap(), vec!["a"]);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::ServiceUnavailable);
        assert_eq!(outcome.fallback_classified, 3);
    }

    #[test]
    fn test_verbose_answer_is_normalized() {
        let config = config_with_models(&["a", "b"]);
        let (backend, _calls) = ScriptedBackend::new(&[("a", Ok(Some("1. 操作方法です")))]);
        let classifier = CategoryClassifier::new(&config, Some(Box::new(backend)));
        let outcome = classifier.classify(&["ログインのやり方"]);
        assert_eq!(outcome.categories, vec![Category::OperationHowTo]);
    }

    #[test]
    fn test_invalid_answer_becomes_other() {
        let config = config_with_models(&["a", "b"]);
        let (backend, _calls) = ScriptedBackend::new(&[("a", Ok(Some("Question")))]);
        let classifier = CategoryClassifier::new(&config, Some(Box::new(backend)));
        let outcome = classifier.classify(&["エラーが出る"]);
        assert_eq!(outcome.categories, vec![Category::Other]);
        assert_eq!(outcome.ai_classified, 1);
    }

    #[test]
    fn test_free_function_offline_matches_rules() {
        let config = AnalysisConfig::default();
        let messages = ["設定画面はどこ", "真っ白になる", "こんにちは"];
        let expected: Vec<Category> = messages.iter().map(|m| fallback_classify(m)).collect();
        assert_eq!(classify(&config, &messages, None), expected);
        assert_eq!(classify(&config, &messages, None), classify(&config, &messages, None));
    }

    #[test]
    fn test_counts_calls_per_message() {
        // Every message restarts at the top-priority model
        let config = config_with_models(&["a", "b"]);
        let count = Arc::new(AtomicUsize::new(0));

        struct Counting(Arc<AtomicUsize>);
        impl ClassificationBackend for Counting {
            fn generate(&self, _prompt: &str, model: &str) -> Result<Option<String>, BackendError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                if model == "b" {
                    Ok(Some("機能要望".to_string()))
                } else {
                    Ok(None)
                }
            }
            fn name(&self) -> &str {
                "counting"
            }
        }

        let classifier = CategoryClassifier::new(&config, Some(Box::new(Counting(Arc::clone(&count)))));
        let outcome = classifier.classify(&["x", "y", "z"]);
        assert_eq!(outcome.categories, vec![Category::FeatureRequest; 3]);
        assert_eq!(count.load(Ordering::SeqCst), 6);
    }
}
