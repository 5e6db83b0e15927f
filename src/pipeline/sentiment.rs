use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::classification::{SentimentClassifier, SentimentPolicy};
use crate::model::Review;
use crate::observability::metrics::Metrics;
use crate::util::retry::{RetryConfig, retry_with_timeout};
use crate::util::text::truncate_chars;

use super::RunContext;
use super::select::SampledCorpus;

/// A sampled review the classifier could not label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationFailure {
    pub review_id: i64,
    pub attempts: usize,
    pub error: String,
}

/// The sample with sentiment filled in. Reviews that failed keep
/// `sentiment: None` and appear in `failures`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedCorpus {
    pub run_id: Uuid,
    pub reviews: Vec<Review>,
    pub failures: Vec<AnnotationFailure>,
}

impl AnnotatedCorpus {
    /// Reviews that received a label.
    pub fn labelled(&self) -> impl Iterator<Item = &Review> {
        self.reviews.iter().filter(|review| review.sentiment.is_some())
    }
}

#[async_trait]
pub trait SentimentStage: Send + Sync {
    async fn annotate(
        &self,
        run: &RunContext,
        sample: SampledCorpus,
    ) -> anyhow::Result<AnnotatedCorpus>;
}

#[derive(Debug, Clone, Copy)]
pub struct AnnotationSettings {
    pub policy: SentimentPolicy,
    /// Characters of raw text passed to the classifier.
    pub char_budget: usize,
    pub timeout: Duration,
    pub(crate) retry: RetryConfig,
}

pub struct ClassifierSentimentStage {
    classifier: Arc<dyn SentimentClassifier>,
    settings: AnnotationSettings,
    metrics: Arc<Metrics>,
}

impl ClassifierSentimentStage {
    #[must_use]
    pub fn new(
        classifier: Arc<dyn SentimentClassifier>,
        settings: AnnotationSettings,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            classifier,
            settings,
            metrics,
        }
    }

    async fn annotate_one(&self, review: &mut Review) -> Result<(), AnnotationFailure> {
        let input = truncate_chars(&review.text, self.settings.char_budget);
        let classifier = Arc::clone(&self.classifier);
        let started = Instant::now();

        let (result, attempts) = retry_with_timeout(
            self.settings.retry,
            self.settings.timeout,
            "sentiment.classify",
            move || {
                let classifier = Arc::clone(&classifier);
                async move { classifier.classify(input).await }
            },
        )
        .await;

        self.metrics
            .sentiment_call_duration
            .observe(started.elapsed().as_secs_f64());
        if attempts > 1 {
            #[allow(clippy::cast_precision_loss)]
            self.metrics.capability_retries.inc_by((attempts - 1) as f64);
        }

        let failure = |error: String| AnnotationFailure {
            review_id: review.review_id,
            attempts,
            error,
        };
        let raw = result.map_err(|e| failure(format!("{e:#}")))?;
        let label = self
            .settings
            .policy
            .map(&raw)
            .map_err(|e| failure(e.to_string()))?;

        review.sentiment = Some(label);
        Ok(())
    }
}

#[async_trait]
impl SentimentStage for ClassifierSentimentStage {
    async fn annotate(
        &self,
        run: &RunContext,
        sample: SampledCorpus,
    ) -> anyhow::Result<AnnotatedCorpus> {
        let mut reviews = sample.reviews;
        let mut failures = Vec::new();

        for review in &mut reviews {
            match self.annotate_one(review).await {
                Ok(()) => self.metrics.sentiment_annotated.inc(),
                Err(failure) => {
                    warn!(
                        run_id = %run.run_id,
                        review_id = failure.review_id,
                        attempts = failure.attempts,
                        error = %failure.error,
                        "sentiment annotation failed"
                    );
                    self.metrics.sentiment_failed.inc();
                    failures.push(failure);
                }
            }
        }

        debug!(
            run_id = %run.run_id,
            classifier = self.classifier.name(),
            annotated = reviews.len() - failures.len(),
            failed = failures.len(),
            "sentiment annotation finished"
        );

        Ok(AnnotatedCorpus {
            run_id: run.run_id,
            reviews,
            failures,
        })
    }
}
