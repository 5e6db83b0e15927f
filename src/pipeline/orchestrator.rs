//! Pipeline orchestrator and builder for an analysis run.
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use prometheus::Registry;
use serde::Serialize;
use tracing::info;

use crate::classification::{LexiconSentimentClassifier, SentimentClassifier, SentimentPolicy};
use crate::clustering::{EmbeddingTopicModel, TopicModel};
use crate::config::Config;
use crate::dataset::{LoadStats, RawCorpus};
use crate::model::{Branch, Review};
use crate::observability::metrics::Metrics;
use crate::util::retry::RetryConfig;

use super::RunContext;
use super::aggregate::{AnalysisReport, build_report};
use super::dedup::{DedupStage, HashDedupStage};
use super::filter::{LengthPolicy, apply_length_policy};
use super::preprocess::{CleaningStats, PreprocessStage, TextCleaner, TextPreprocessStage};
use super::select::{SampledCorpus, sample_reviews};
use super::sentiment::{
    AnnotatedCorpus, AnnotationFailure, AnnotationSettings, ClassifierSentimentStage,
    SentimentStage,
};
use super::topic::{ModelTopicStage, TopicDiscovery, TopicSettings, TopicStage, TopicStatus};

/// Per-branch topic outcome as reported in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicBranchSummary {
    pub branch: Branch,
    pub documents: usize,
    pub topics: usize,
    #[serde(flatten)]
    pub status: TopicStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: uuid::Uuid,
    pub seed: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub classifier: &'static str,
    pub topic_model: Option<&'static str>,
    pub sentiment_policy: SentimentPolicy,
    pub load: LoadStats,
    pub cleaning: CleaningStats,
    pub reviews_after_cleaning: usize,
    pub sample_size: usize,
    pub annotated: usize,
    pub annotation_failures: Vec<AnnotationFailure>,
    pub topic_branches: Vec<TopicBranchSummary>,
}

/// Everything a run produced. Each field is an immutable stage snapshot.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub context: RunContext,
    /// Cleaned, filtered and deduplicated reviews.
    pub reviews: Vec<Review>,
    /// The sample with sentiment and topic ids filled in.
    pub annotated: AnnotatedCorpus,
    pub topics: TopicDiscovery,
    pub report: AnalysisReport,
    pub summary: RunSummary,
}

/// Core pipeline orchestrator that coordinates all stages.
pub struct PipelineOrchestrator {
    config: Arc<Config>,
    stages: PipelineStages,
    metrics: Arc<Metrics>,
    classifier_name: &'static str,
    topic_model_name: &'static str,
    skip_topics: bool,
}

/// Container for all pipeline stages.
struct PipelineStages {
    preprocess: Arc<dyn PreprocessStage>,
    dedup: Arc<dyn DedupStage>,
    sentiment: Arc<dyn SentimentStage>,
    topic: Arc<dyn TopicStage>,
}

/// Builder pattern for constructing [`PipelineOrchestrator`].
pub struct PipelineBuilder {
    config: Arc<Config>,
    metrics: Option<Arc<Metrics>>,
    classifier: Option<Arc<dyn SentimentClassifier>>,
    topic_model: Option<Arc<dyn TopicModel>>,
    preprocess: Option<Arc<dyn PreprocessStage>>,
    dedup: Option<Arc<dyn DedupStage>>,
    skip_topics: bool,
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            metrics: None,
            classifier: None,
            topic_model: None,
            preprocess: None,
            dedup: None,
            skip_topics: false,
        }
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn SentimentClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    #[must_use]
    pub fn with_topic_model(mut self, model: Arc<dyn TopicModel>) -> Self {
        self.topic_model = Some(model);
        self
    }

    #[must_use]
    pub fn with_preprocess_stage(mut self, stage: Arc<dyn PreprocessStage>) -> Self {
        self.preprocess = Some(stage);
        self
    }

    #[must_use]
    pub fn with_dedup_stage(mut self, stage: Arc<dyn DedupStage>) -> Self {
        self.dedup = Some(stage);
        self
    }

    #[must_use]
    pub fn skip_topics(mut self, skip: bool) -> Self {
        self.skip_topics = skip;
        self
    }

    /// Fills unset capabilities with the offline defaults: the lexicon
    /// classifier and the TF-IDF topic model.
    ///
    /// # Errors
    /// Fails when metrics cannot be registered or the cleaner cannot be built.
    pub fn build(self) -> Result<PipelineOrchestrator> {
        let config = self.config;
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => Arc::new(Metrics::new(Arc::new(Registry::new()))?),
        };
        let retry = RetryConfig::new(
            config.capability_max_retries().max(1),
            config.capability_backoff_base_ms(),
            config.capability_backoff_cap_ms(),
        );

        let classifier = self
            .classifier
            .unwrap_or_else(|| Arc::new(LexiconSentimentClassifier::new()));
        let topic_model = self
            .topic_model
            .unwrap_or_else(|| Arc::new(EmbeddingTopicModel::default()));
        let classifier_name = classifier.name();
        let topic_model_name = topic_model.name();

        let preprocess = match self.preprocess {
            Some(stage) => stage,
            None => Arc::new(
                TextPreprocessStage::new(TextCleaner::new(config.extra_stopwords())?)
                    .with_language_thresholds(config.language_thresholds()),
            ),
        };
        let dedup = self
            .dedup
            .unwrap_or_else(|| Arc::new(HashDedupStage::new()));

        let sentiment = Arc::new(ClassifierSentimentStage::new(
            classifier,
            AnnotationSettings {
                policy: config.sentiment_policy(),
                char_budget: config.sentiment_char_budget().get(),
                timeout: config.capability_timeout(),
                retry,
            },
            Arc::clone(&metrics),
        ));
        let topic = Arc::new(ModelTopicStage::new(
            topic_model,
            TopicSettings {
                sentiment: config.topic_sentiment(),
                max_documents: config.topic_max_documents().get(),
                min_documents: config.topic_min_documents(),
                target_topics: config.topic_target_count().map(std::num::NonZeroUsize::get),
                timeout: config.capability_timeout(),
                retry,
            },
            Arc::clone(&metrics),
        ));

        Ok(PipelineOrchestrator {
            config,
            stages: PipelineStages {
                preprocess,
                dedup,
                sentiment,
                topic,
            },
            metrics,
            classifier_name,
            topic_model_name,
            skip_topics: self.skip_topics,
        })
    }
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Runs every stage over `corpus`.
    ///
    /// Per-review classifier failures and per-branch topic failures are
    /// recorded in the outcome. Anything else aborts the run.
    ///
    /// # Errors
    /// Fails on a stage error or when the sample is larger than the cleaned
    /// corpus ([`super::PipelineError::SampleTooLarge`]).
    #[allow(clippy::cast_precision_loss)]
    pub async fn run(&self, corpus: RawCorpus) -> Result<AnalysisOutcome> {
        let started_at = Utc::now();
        let timer = Instant::now();
        let run = RunContext::new(self.config.seed());
        let load = corpus.stats;

        info!(
            run_id = %run.run_id,
            seed = run.seed,
            rows = corpus.reviews.len(),
            "starting analysis run"
        );
        self.metrics
            .reviews_loaded
            .inc_by(corpus.reviews.len() as f64);

        let stage_timer = Instant::now();
        let cleaned = self
            .stages
            .preprocess
            .preprocess(&run, corpus)
            .await
            .context("preprocess stage failed")?;
        let filtered = apply_length_policy(cleaned, LengthPolicy::from_config(&self.config));
        self.metrics
            .preprocess_duration
            .observe(stage_timer.elapsed().as_secs_f64());

        let stage_timer = Instant::now();
        let deduplicated = self
            .stages
            .dedup
            .deduplicate(&run, filtered)
            .await
            .context("dedup stage failed")?;
        self.metrics
            .dedup_duration
            .observe(stage_timer.elapsed().as_secs_f64());

        let cleaning = deduplicated.stats;
        self.metrics
            .reviews_dropped
            .inc_by((cleaning.dropped_total() - cleaning.dropped_duplicates) as f64);
        self.metrics
            .reviews_duplicated
            .inc_by(cleaning.dropped_duplicates as f64);
        self.metrics
            .reviews_surviving
            .set(deduplicated.reviews.len() as f64);
        info!(
            run_id = %run.run_id,
            surviving = deduplicated.reviews.len(),
            dropped = cleaning.dropped_total(),
            "cleaning finished"
        );

        let sample_size = self.config.sentiment_sample_size().get();
        let sample = SampledCorpus {
            run_id: run.run_id,
            seed: run.seed,
            reviews: sample_reviews(&deduplicated.reviews, sample_size, run.seed)?,
        };
        self.metrics.reviews_sampled.inc_by(sample_size as f64);

        let annotated = self
            .stages
            .sentiment
            .annotate(&run, sample)
            .await
            .context("sentiment stage failed")?;

        let topics = if self.skip_topics {
            TopicDiscovery::empty(run.run_id)
        } else {
            self.stages
                .topic
                .discover(&run, &annotated)
                .await
                .context("topic stage failed")?
        };
        let annotated = topics.apply(&annotated);

        let labelled: Vec<Review> = annotated.labelled().cloned().collect();
        let report = build_report(
            &deduplicated.reviews,
            &labelled,
            &topics,
            self.config.report_top_topics(),
        );

        let summary = RunSummary {
            run_id: run.run_id,
            seed: run.seed,
            started_at,
            finished_at: Utc::now(),
            classifier: self.classifier_name,
            topic_model: (!self.skip_topics).then_some(self.topic_model_name),
            sentiment_policy: self.config.sentiment_policy(),
            load,
            cleaning,
            reviews_after_cleaning: deduplicated.reviews.len(),
            sample_size,
            annotated: labelled.len(),
            annotation_failures: annotated.failures.clone(),
            topic_branches: topics
                .branches
                .iter()
                .map(|branch| TopicBranchSummary {
                    branch: branch.branch,
                    documents: branch.document_count,
                    topics: branch.topics.iter().filter(|t| !t.id.is_noise()).count(),
                    status: branch.status.clone(),
                })
                .collect(),
        };

        self.metrics
            .run_duration
            .observe(timer.elapsed().as_secs_f64());
        info!(
            run_id = %run.run_id,
            annotated = summary.annotated,
            failures = summary.annotation_failures.len(),
            elapsed_ms = timer.elapsed().as_millis(),
            "analysis run finished"
        );

        Ok(AnalysisOutcome {
            context: run,
            reviews: deduplicated.reviews,
            annotated,
            topics,
            report,
            summary,
        })
    }
}
