use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::clustering::TopicModel;
use crate::model::{Branch, Review, TopicId, TopicSummary};
use crate::observability::metrics::Metrics;
use crate::util::retry::{RetryConfig, retry_with_timeout};

use super::RunContext;
use super::select::cap_reviews;
use super::sentiment::AnnotatedCorpus;

/// Outcome of topic discovery for one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopicStatus {
    Completed,
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchTopics {
    pub branch: Branch,
    pub document_count: usize,
    /// `(review_id, topic)` for every document that was clustered.
    pub assignments: Vec<(i64, TopicId)>,
    pub topics: Vec<TopicSummary>,
    #[serde(flatten)]
    pub status: TopicStatus,
}

impl BranchTopics {
    fn without_fit(branch: Branch, document_count: usize, status: TopicStatus) -> Self {
        Self {
            branch,
            document_count,
            assignments: Vec::new(),
            topics: Vec::new(),
            status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDiscovery {
    pub run_id: Uuid,
    pub branches: Vec<BranchTopics>,
}

impl TopicDiscovery {
    #[must_use]
    pub fn empty(run_id: Uuid) -> Self {
        Self {
            run_id,
            branches: Vec::new(),
        }
    }

    /// Topic id per clustered review.
    #[must_use]
    pub fn topic_by_review(&self) -> FxHashMap<i64, TopicId> {
        self.branches
            .iter()
            .flat_map(|branch| branch.assignments.iter().copied())
            .collect()
    }

    /// Writes topic ids into a fresh copy of the annotated reviews.
    #[must_use]
    pub fn apply(&self, annotated: &AnnotatedCorpus) -> AnnotatedCorpus {
        let topics = self.topic_by_review();
        let reviews = annotated
            .reviews
            .iter()
            .map(|review| Review {
                topic: topics.get(&review.review_id).copied(),
                ..review.clone()
            })
            .collect();
        AnnotatedCorpus {
            run_id: annotated.run_id,
            reviews,
            failures: annotated.failures.clone(),
        }
    }
}

#[async_trait]
pub trait TopicStage: Send + Sync {
    async fn discover(
        &self,
        run: &RunContext,
        annotated: &AnnotatedCorpus,
    ) -> anyhow::Result<TopicDiscovery>;
}

#[derive(Debug, Clone, Copy)]
pub struct TopicSettings {
    /// Only reviews with this label are clustered. `None` clusters all
    /// labelled reviews.
    pub sentiment: Option<crate::model::SentimentLabel>,
    pub max_documents: usize,
    pub min_documents: usize,
    pub target_topics: Option<usize>,
    pub timeout: Duration,
    pub(crate) retry: RetryConfig,
}

pub struct ModelTopicStage {
    model: Arc<dyn TopicModel>,
    settings: TopicSettings,
    metrics: Arc<Metrics>,
}

impl ModelTopicStage {
    #[must_use]
    pub fn new(model: Arc<dyn TopicModel>, settings: TopicSettings, metrics: Arc<Metrics>) -> Self {
        Self {
            model,
            settings,
            metrics,
        }
    }

    fn documents_for(&self, annotated: &AnnotatedCorpus, branch: Branch) -> Vec<Review> {
        annotated
            .labelled()
            .filter(|review| review.branch == branch)
            .filter(|review| {
                self.settings
                    .sentiment
                    .is_none_or(|label| review.sentiment == Some(label))
            })
            .cloned()
            .collect()
    }

    async fn discover_branch(
        &self,
        run: &RunContext,
        branch: Branch,
        documents: Vec<Review>,
    ) -> BranchTopics {
        let documents = cap_reviews(documents, self.settings.max_documents, run.seed);
        let count = documents.len();
        if count == 0 || count < self.settings.min_documents {
            self.metrics.topic_branches_skipped.inc();
            info!(
                run_id = %run.run_id,
                branch = %branch,
                documents = count,
                min = self.settings.min_documents,
                "skipping topic discovery for branch"
            );
            return BranchTopics::without_fit(
                branch,
                count,
                TopicStatus::Skipped {
                    reason: format!(
                        "{count} documents, at least {} required",
                        self.settings.min_documents.max(1)
                    ),
                },
            );
        }

        let texts: Vec<String> = documents.iter().map(|r| r.cleaned.clone()).collect();
        let model = Arc::clone(&self.model);
        let texts_ref = &texts;
        let seed = run.seed;
        let target = self.settings.target_topics;
        let started = Instant::now();

        let (result, attempts) = retry_with_timeout(
            self.settings.retry,
            self.settings.timeout,
            "topic.fit",
            move || {
                let model = Arc::clone(&model);
                async move {
                    let fit = model.fit(texts_ref, seed, target).await?;
                    fit.validate(texts_ref.len())?;
                    Ok::<_, anyhow::Error>(fit)
                }
            },
        )
        .await;
        self.metrics
            .topic_fit_duration
            .observe(started.elapsed().as_secs_f64());
        if attempts > 1 {
            #[allow(clippy::cast_precision_loss)]
            self.metrics.capability_retries.inc_by((attempts - 1) as f64);
        }

        match result {
            Ok(fit) => {
                self.metrics.topic_fits_completed.inc();
                let assignments = documents
                    .iter()
                    .map(|review| review.review_id)
                    .zip(fit.assignments)
                    .collect();
                BranchTopics {
                    branch,
                    document_count: count,
                    assignments,
                    topics: fit.topics,
                    status: TopicStatus::Completed,
                }
            }
            Err(error) => {
                self.metrics.topic_fits_failed.inc();
                warn!(
                    run_id = %run.run_id,
                    branch = %branch,
                    attempts,
                    error = %error,
                    "topic discovery failed for branch"
                );
                BranchTopics::without_fit(
                    branch,
                    count,
                    TopicStatus::Failed {
                        error: format!("{error:#}"),
                    },
                )
            }
        }
    }
}

#[async_trait]
impl TopicStage for ModelTopicStage {
    async fn discover(
        &self,
        run: &RunContext,
        annotated: &AnnotatedCorpus,
    ) -> anyhow::Result<TopicDiscovery> {
        let mut branches = Vec::with_capacity(Branch::ALL.len());
        for branch in Branch::ALL {
            let documents = self.documents_for(annotated, branch);
            branches.push(self.discover_branch(run, branch, documents).await);
        }

        #[allow(clippy::cast_precision_loss)]
        self.metrics.topics_discovered.set(
            branches
                .iter()
                .flat_map(|b| &b.topics)
                .filter(|t| !t.id.is_noise())
                .count() as f64,
        );

        Ok(TopicDiscovery {
            run_id: run.run_id,
            branches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::TopicFit;
    use crate::model::{SentimentLabel, VisitorType};
    use prometheus::Registry;

    /// Puts every document in topic 0 except the first, which is noise.
    struct FixedModel {
        fail_for: Option<usize>,
    }

    #[async_trait]
    impl TopicModel for FixedModel {
        async fn fit(
            &self,
            documents: &[String],
            _seed: u64,
            _target: Option<usize>,
        ) -> anyhow::Result<TopicFit> {
            if self.fail_for == Some(documents.len()) {
                anyhow::bail!("model exploded");
            }
            let mut assignments = vec![TopicId(0); documents.len()];
            assignments[0] = TopicId::NOISE;
            Ok(TopicFit {
                topics: vec![
                    TopicSummary {
                        id: TopicId::NOISE,
                        count: 1,
                        name: "-1_noise".into(),
                    },
                    TopicSummary {
                        id: TopicId(0),
                        count: documents.len() - 1,
                        name: "0_queue".into(),
                    },
                ],
                assignments,
            })
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn review(id: i64, branch: Branch, sentiment: SentimentLabel) -> Review {
        Review {
            review_id: id,
            rating: 1,
            year_month: None,
            reviewer_location: None,
            branch,
            text: "queue".into(),
            language: "en".into(),
            cleaned: "queue".into(),
            char_length: 5,
            word_count: 1,
            visitor: VisitorType::Tourist,
            sentiment: Some(sentiment),
            topic: None,
        }
    }

    fn stage(fail_for: Option<usize>) -> ModelTopicStage {
        ModelTopicStage::new(
            Arc::new(FixedModel { fail_for }),
            TopicSettings {
                sentiment: Some(SentimentLabel::Negative),
                max_documents: 500,
                min_documents: 3,
                target_topics: None,
                timeout: Duration::from_secs(1),
                retry: RetryConfig::new(1, 0, 0),
            },
            Arc::new(Metrics::new(Arc::new(Registry::new())).expect("metrics register")),
        )
    }

    fn corpus() -> AnnotatedCorpus {
        let mut reviews = Vec::new();
        for id in 0..4 {
            reviews.push(review(id, Branch::HongKong, SentimentLabel::Negative));
        }
        reviews.push(review(10, Branch::HongKong, SentimentLabel::Positive));
        for id in 20..22 {
            reviews.push(review(id, Branch::California, SentimentLabel::Negative));
        }
        for id in 30..35 {
            reviews.push(review(id, Branch::Paris, SentimentLabel::Negative));
        }
        AnnotatedCorpus {
            run_id: Uuid::nil(),
            reviews,
            failures: Vec::new(),
        }
    }

    #[tokio::test]
    async fn discovers_per_branch_with_skip_and_failure_isolation() {
        let discovery = stage(Some(5))
            .discover(&RunContext::new(42), &corpus())
            .await
            .expect("discovery runs");

        let hong_kong = &discovery.branches[0];
        assert_eq!(hong_kong.branch, Branch::HongKong);
        assert_eq!(hong_kong.status, TopicStatus::Completed);
        assert_eq!(hong_kong.document_count, 4);
        assert_eq!(hong_kong.assignments[0], (0, TopicId::NOISE));

        let california = &discovery.branches[1];
        assert!(matches!(california.status, TopicStatus::Skipped { .. }));

        let paris = &discovery.branches[2];
        assert!(matches!(paris.status, TopicStatus::Failed { .. }));
        assert!(paris.assignments.is_empty());
    }

    #[tokio::test]
    async fn apply_writes_topics_onto_reviews() {
        let annotated = corpus();
        let discovery = stage(None)
            .discover(&RunContext::new(42), &annotated)
            .await
            .expect("discovery runs");

        let with_topics = discovery.apply(&annotated);
        let topic_of = |id: i64| {
            with_topics
                .reviews
                .iter()
                .find(|r| r.review_id == id)
                .and_then(|r| r.topic)
        };
        assert_eq!(topic_of(0), Some(TopicId::NOISE));
        assert_eq!(topic_of(1), Some(TopicId(0)));
        assert_eq!(topic_of(10), None);
        assert_eq!(topic_of(20), None);
        assert!(annotated.reviews.iter().all(|r| r.topic.is_none()));
    }
}
