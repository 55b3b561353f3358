use crate::aggregate::{aggregate, annotate};
use crate::cache::{BatchCacheKey, ClassificationCacheValue, SessionCache};
use crate::classifier::CategoryClassifier;
use crate::config::AnalysisConfig;
use crate::keywords::KeywordRanker;
use crate::loader::filter_messages;
use crate::storage::{calculate_batch_hash, calculate_config_hash, ClassificationStorage, NoOpStorage};
use crate::tokenizer::{default_analyzer, MorphAnalyzer};
use crate::types::*;
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Per-stage wall clock timings, collected when profiling is enabled
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        debug!("{} took {}ms", step_name, elapsed.as_millis());
        self.timings.push((step_name.to_string(), elapsed));
        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    /// One line per step: name, milliseconds and share of the total
    pub fn summary_lines(&self) -> Vec<String> {
        if !self.enabled || self.timings.is_empty() {
            return Vec::new();
        }
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();
        let total_secs = total.as_secs_f64().max(f64::EPSILON);

        let mut lines: Vec<String> = self
            .timings
            .iter()
            .map(|(step, duration)| {
                format!(
                    "{:.<35} {:.0}ms ({:.1}%)",
                    step,
                    duration.as_millis(),
                    duration.as_secs_f64() / total_secs * 100.0
                )
            })
            .collect();
        lines.push(format!("{:.<35} {:.0}ms", "Total", total.as_millis()));
        lines
    }
}

/// Filter → keywords → classification → aggregation for one batch.
///
/// Holds the session cache, so re-running the same batch (same data, same
/// filter, same config) reuses the previous classification instead of
/// calling the service again. Changing the filter invalidates it.
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    config_hash: String,
    analyzer: Box<dyn MorphAnalyzer>,
    classifier: CategoryClassifier,
    storage: Box<dyn ClassificationStorage>,
    session: SessionCache,
}

impl AnalysisPipeline {
    /// Create pipeline with full dependency injection
    pub fn new_with_dependencies(
        config: AnalysisConfig,
        analyzer: Box<dyn MorphAnalyzer>,
        classifier: CategoryClassifier,
        storage: Box<dyn ClassificationStorage>,
    ) -> Result<Self> {
        config.validate()?;
        // Only the settings that influence classification belong in the key
        let config_hash =
            calculate_config_hash(&(&config.taxonomy, &config.fallback_rules, &config.classifier))?;
        Ok(Self {
            config,
            config_hash,
            analyzer,
            classifier,
            storage,
            session: SessionCache::new(),
        })
    }

    /// Default analyzer, classifier chosen by credential, no persistent cache
    pub fn new(config: AnalysisConfig, credential: Option<&str>) -> Result<Self> {
        let analyzer = default_analyzer().context("Failed to initialize morphological analyzer")?;
        let classifier = CategoryClassifier::from_credential(&config, credential);
        Self::new_with_dependencies(config, analyzer, classifier, Box::new(NoOpStorage::new()))
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn classifier(&self) -> &CategoryClassifier {
        &self.classifier
    }

    pub fn invalidate_cache(&mut self) {
        self.session.invalidate();
    }

    pub fn run(&mut self, messages: &[Message], range: Option<DateRange>) -> Result<AnalysisReport> {
        self.run_with_profiler(messages, range, &mut StepProfiler::new(false))
    }

    pub fn run_with_profiler(
        &mut self,
        messages: &[Message],
        range: Option<DateRange>,
        profiler: &mut StepProfiler,
    ) -> Result<AnalysisReport> {
        let batch = profiler.time_step("Date Filter", || match &range {
            Some(range) => filter_messages(messages, range),
            None => messages.to_vec(),
        });
        info!(
            "Analyzing {} of {} messages with {} classifier",
            batch.len(),
            messages.len(),
            self.classifier.backend_name()
        );

        let texts: Vec<&str> = batch.iter().map(|m| m.text.as_str()).collect();
        let mut diagnostics = Vec::new();

        let ranking = profiler.time_step("Keyword Ranking", || {
            KeywordRanker::new(&self.config.keywords, self.analyzer.as_ref())
                .rank(&texts, self.config.keywords.top_n)
        });
        if ranking.skipped_messages > 0 {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::TokenizationSkipped,
                format!(
                    "{} message(s) could not be tokenized and were left out of keyword counts",
                    ranking.skipped_messages
                ),
            ));
        }

        let (outcome, from_cache) =
            profiler.time_step("Classification", || self.classify_batch(&batch, range, &mut diagnostics));

        let (records, category_counts) = profiler.time_step("Aggregation", || {
            let records = annotate(batch, &outcome.categories);
            let counts = aggregate(&records);
            (records, counts)
        });

        let mut all_diagnostics = outcome.diagnostics;
        all_diagnostics.extend(diagnostics);

        Ok(AnalysisReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            range,
            message_count: records.len(),
            keywords: ranking.entries,
            skipped_messages: ranking.skipped_messages,
            category_counts,
            records,
            diagnostics: all_diagnostics,
            preferred_model: outcome.preferred_model,
            from_cache,
        })
    }

    /// Session cache, then persistent storage, then the classifier.
    ///
    /// Storage problems never fail the batch; they become a cache miss and a
    /// `CacheUnavailable` diagnostic.
    fn classify_batch(
        &mut self,
        batch: &[Message],
        range: Option<DateRange>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> (ClassificationOutcome, bool) {
        let key = BatchCacheKey::new(
            calculate_batch_hash(batch),
            range,
            self.config_hash.clone(),
            self.classifier.backend_name(),
        );

        if let Some(cached) = self.session.get(&key) {
            debug!("Session cache hit for batch {}", &key.batch_hash[..12]);
            return (cached.outcome.clone(), true);
        }

        match self.storage.get_classification(&key) {
            Ok(Some(cached)) => {
                info!(
                    "Cache hit: reusing classification from {}",
                    cached.created_at.format("%Y-%m-%d %H:%M:%S")
                );
                let outcome = cached.outcome.clone();
                self.session.store(key, cached);
                return (outcome, true);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Classification cache read failed, continuing without it: {}", e);
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::CacheUnavailable,
                    format!("cache read failed: {e}"),
                ));
            }
        }

        let start = Instant::now();
        let texts: Vec<&str> = batch.iter().map(|m| m.text.as_str()).collect();
        let outcome = self.classifier.classify(&texts);
        let value = ClassificationCacheValue::new(outcome.clone(), start.elapsed().as_millis() as u64);

        // A batch degraded by an outage is retried on the next run
        let degraded = outcome
            .diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::ServiceUnavailable);
        if !degraded {
            if let Err(e) = self.storage.store_classification(&key, &value) {
                warn!("Classification cache write failed: {}", e);
                diagnostics.push(Diagnostic::new(
                    DiagnosticKind::CacheUnavailable,
                    format!("cache write failed: {e}"),
                ));
            }
        }

        self.session.store(key, value);
        (outcome, false)
    }
}
