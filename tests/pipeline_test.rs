// レビュー分析パイプラインの end-to-end テスト。
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use review_insight::analysis::synthetic_corpus;
use review_insight::classification::{RawSentiment, SentimentClassifier};
use review_insight::clustering::{TopicFit, TopicModel};
use review_insight::config::Config;
use review_insight::dataset::RawCorpus;
use review_insight::model::{Branch, RawReview, SentimentLabel, TopicId, TopicSummary, VisitorType};
use review_insight::pipeline::topic::TopicStatus;
use review_insight::pipeline::{PipelineError, PipelineOrchestrator};

/// Stars from keywords so expected labels are known up front.
struct KeywordClassifier;

#[async_trait]
impl SentimentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> anyhow::Result<RawSentiment> {
        if text.contains("boom") {
            anyhow::bail!("classifier crashed");
        }
        let stars = if text.contains("loved") || text.contains("great") {
            5
        } else if text.contains("awful") {
            1
        } else {
            3
        };
        Ok(RawSentiment::Stars(stars))
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// First document is noise, the rest split into two topics.
struct SplitTopicModel;

#[async_trait]
impl TopicModel for SplitTopicModel {
    async fn fit(
        &self,
        documents: &[String],
        _seed: u64,
        _target_topics: Option<usize>,
    ) -> anyhow::Result<TopicFit> {
        let assignments: Vec<TopicId> = (0..documents.len())
            .map(|idx| match idx {
                0 => TopicId::NOISE,
                idx if idx % 3 == 0 => TopicId(1),
                _ => TopicId(0),
            })
            .collect();
        let count = |id: TopicId| assignments.iter().filter(|a| **a == id).count();
        let topics = [TopicId::NOISE, TopicId(0), TopicId(1)]
            .into_iter()
            .map(|id| TopicSummary {
                id,
                count: count(id),
                name: format!("{}_queue_wait", id.0),
            })
            .collect();
        Ok(TopicFit {
            assignments,
            topics,
        })
    }

    fn name(&self) -> &'static str {
        "split"
    }
}

fn config(vars: &[(&str, &str)]) -> Config {
    let vars: Vec<(&str, Option<&str>)> = vars
        .iter()
        .map(|(name, value)| (*name, Some(*value)))
        .chain([("CAPABILITY_BACKOFF_BASE_MS", Some("1"))])
        .collect();
    temp_env::with_vars(vars, Config::from_env).expect("config loads")
}

fn raw(id: i64, branch: Branch, location: Option<&str>, text: Option<&str>) -> RawReview {
    RawReview {
        review_id: id,
        rating: 4,
        year_month: None,
        reviewer_location: location.map(str::to_string),
        review_text: text.map(str::to_string),
        branch,
    }
}

/// Letter-only token unique per index, so cleaned texts never collide.
fn marker(idx: usize) -> String {
    let a = char::from(b'a' + u8::try_from(idx % 26).expect("fits"));
    let b = char::from(b'a' + u8::try_from(idx / 26).expect("fits"));
    format!("zz{a}{b}")
}

#[tokio::test]
async fn cleaning_scenario_keeps_one_row_without_url_or_punctuation() {
    let corpus = RawCorpus::from_reviews(vec![
        raw(1, Branch::Paris, Some("France"), Some("I loved the park!!! http://x.com")),
        raw(2, Branch::Paris, Some("France"), Some("")),
        raw(3, Branch::Paris, Some("Germany"), Some("I loved the park!!! http://x.com")),
    ]);
    let orchestrator = PipelineOrchestrator::builder(config(&[("SENTIMENT_SAMPLE_SIZE", "1")]))
        .with_classifier(Arc::new(KeywordClassifier))
        .skip_topics(true)
        .build()
        .expect("pipeline builds");

    let outcome = orchestrator.run(corpus).await.expect("run succeeds");

    assert_eq!(outcome.reviews.len(), 1);
    let survivor = &outcome.reviews[0];
    assert_eq!(survivor.review_id, 1);
    assert_eq!(survivor.cleaned, "loved");
    assert!(!survivor.cleaned.contains("http"));
    assert_eq!(survivor.visitor, VisitorType::Local);
    assert_eq!(outcome.summary.cleaning.dropped_null_text, 1);
    assert_eq!(outcome.summary.cleaning.dropped_duplicates, 1);
    assert_eq!(outcome.annotated.reviews[0].sentiment, Some(SentimentLabel::Positive));
    assert!(outcome.topics.branches.is_empty());
    assert!(outcome.summary.topic_model.is_none());
}

#[tokio::test]
async fn visitor_classification_and_length_limit_hold_after_cleaning() {
    let long_text = "great ride ".repeat(200);
    let corpus = RawCorpus::from_reviews(vec![
        raw(1, Branch::Paris, Some("France"), Some("Lovely castle and great parade")),
        raw(2, Branch::Paris, Some("Germany"), Some("Awful queues at every attraction")),
        raw(3, Branch::HongKong, None, Some("Small but charming, great staff")),
        raw(4, Branch::California, Some("United States"), Some(long_text.as_str())),
    ]);
    let orchestrator = PipelineOrchestrator::builder(config(&[("SENTIMENT_SAMPLE_SIZE", "3")]))
        .with_classifier(Arc::new(KeywordClassifier))
        .skip_topics(true)
        .build()
        .expect("pipeline builds");

    let outcome = orchestrator.run(corpus).await.expect("run succeeds");

    assert_eq!(outcome.summary.cleaning.dropped_too_long, 1);
    assert!(outcome.reviews.iter().all(|r| r.char_length <= 1734));
    let visitor_of = |id: i64| {
        outcome
            .reviews
            .iter()
            .find(|r| r.review_id == id)
            .map(|r| r.visitor)
    };
    assert_eq!(visitor_of(1), Some(VisitorType::Local));
    assert_eq!(visitor_of(2), Some(VisitorType::Tourist));
    assert_eq!(visitor_of(3), Some(VisitorType::Tourist));
}

#[tokio::test]
async fn sentiment_percentages_sum_to_hundred_for_each_group() {
    let words = ["great fireworks", "awful queues", "average food"];
    let mut reviews = Vec::new();
    for (b, branch) in Branch::ALL.into_iter().enumerate() {
        for i in 0..10 {
            let idx = b * 10 + i;
            let location = if i % 2 == 0 { branch.home_country() } else { "Australia" };
            let text = format!("{} {}", words[idx % words.len()], marker(idx));
            reviews.push(raw(
                i64::try_from(idx).expect("fits"),
                branch,
                Some(location),
                Some(&text),
            ));
        }
    }
    let orchestrator = PipelineOrchestrator::builder(config(&[("SENTIMENT_SAMPLE_SIZE", "30")]))
        .with_classifier(Arc::new(KeywordClassifier))
        .skip_topics(true)
        .build()
        .expect("pipeline builds");

    let outcome = orchestrator
        .run(RawCorpus::from_reviews(reviews))
        .await
        .expect("run succeeds");

    assert_eq!(outcome.summary.annotated, 30);
    let rows = &outcome.report.sentiment_by_visitor;
    assert_eq!(rows.len(), 6);
    for row in rows {
        assert_eq!(row.total, 5, "{row:?}");
        let sum = row.positive_pct + row.neutral_pct + row.negative_pct;
        assert!((sum - 100.0).abs() <= 0.02, "{row:?}");
    }
    let ratings: usize = outcome
        .report
        .rating_distribution
        .iter()
        .filter(|row| row.rating == 4)
        .map(|row| row.count)
        .sum();
    assert_eq!(ratings, 30);
}

#[tokio::test]
async fn topic_frequency_excludes_noise_and_reports_per_branch_status() {
    let mut reviews = Vec::new();
    for i in 0..12 {
        let text = format!("awful wait {}", marker(i));
        reviews.push(raw(
            i64::try_from(i).expect("fits"),
            Branch::HongKong,
            Some("Hong Kong"),
            Some(&text),
        ));
    }
    reviews.push(raw(100, Branch::Paris, Some("France"), Some("awful smell")));
    let orchestrator = PipelineOrchestrator::builder(config(&[
        ("SENTIMENT_SAMPLE_SIZE", "13"),
        ("TOPIC_MIN_DOCUMENTS", "5"),
    ]))
    .with_classifier(Arc::new(KeywordClassifier))
    .with_topic_model(Arc::new(SplitTopicModel))
    .build()
    .expect("pipeline builds");

    let outcome = orchestrator
        .run(RawCorpus::from_reviews(reviews))
        .await
        .expect("run succeeds");

    let frequency = &outcome.report.topic_frequency;
    assert!(!frequency.is_empty());
    assert!(frequency.iter().all(|row| !row.topic_id.is_noise()));
    assert!(frequency.iter().all(|row| row.branch == Branch::HongKong));
    let share: f64 = frequency.iter().map(|row| row.share_pct).sum();
    assert!((share - 100.0).abs() <= 0.02);

    let status_of = |branch: Branch| {
        outcome
            .summary
            .topic_branches
            .iter()
            .find(|b| b.branch == branch)
            .map(|b| b.status.clone())
    };
    assert_eq!(status_of(Branch::HongKong), Some(TopicStatus::Completed));
    assert!(matches!(status_of(Branch::Paris), Some(TopicStatus::Skipped { .. })));
    assert!(
        outcome
            .annotated
            .reviews
            .iter()
            .filter(|r| r.branch == Branch::HongKong)
            .all(|r| r.topic.is_some())
    );
    assert_eq!(outcome.summary.topic_model, Some("split"));
}

#[tokio::test]
async fn classifier_failures_are_recorded_without_aborting_the_run() {
    let corpus = RawCorpus::from_reviews(vec![
        raw(1, Branch::Paris, Some("France"), Some("great parade")),
        raw(2, Branch::Paris, Some("France"), Some("boom goes the parade")),
        raw(3, Branch::Paris, Some("France"), Some("awful parade")),
    ]);
    let orchestrator = PipelineOrchestrator::builder(config(&[
        ("SENTIMENT_SAMPLE_SIZE", "3"),
        ("CAPABILITY_MAX_RETRIES", "2"),
    ]))
    .with_classifier(Arc::new(KeywordClassifier))
    .skip_topics(true)
    .build()
    .expect("pipeline builds");

    let outcome = orchestrator.run(corpus).await.expect("run succeeds");

    assert_eq!(outcome.summary.annotated, 2);
    assert_eq!(outcome.summary.annotation_failures.len(), 1);
    assert_eq!(outcome.summary.annotation_failures[0].review_id, 2);
    assert!(
        outcome
            .report
            .sentiment_by_visitor
            .iter()
            .map(|row| row.total)
            .sum::<usize>()
            == 2
    );
    assert!((orchestrator.metrics().sentiment_failed.get() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn oversized_sample_fails_the_run() {
    let corpus = RawCorpus::from_reviews(vec![
        raw(1, Branch::Paris, Some("France"), Some("great parade")),
        raw(2, Branch::Paris, Some("France"), Some("awful parade")),
    ]);
    let orchestrator = PipelineOrchestrator::builder(config(&[("SENTIMENT_SAMPLE_SIZE", "5")]))
        .with_classifier(Arc::new(KeywordClassifier))
        .build()
        .expect("pipeline builds");

    let error = orchestrator.run(corpus).await.expect_err("sample too large");

    assert!(matches!(
        error.downcast_ref::<PipelineError>(),
        Some(PipelineError::SampleTooLarge {
            requested: 5,
            available: 2
        })
    ));
}

#[tokio::test]
async fn synthetic_corpus_runs_with_default_capabilities() {
    let orchestrator = PipelineOrchestrator::builder(config(&[
        ("SENTIMENT_SAMPLE_SIZE", "150"),
        ("TOPIC_SENTIMENT", "all"),
        ("TOPIC_MIN_DOCUMENTS", "5"),
    ]))
    .build()
    .expect("pipeline builds");

    let outcome = orchestrator
        .run(synthetic_corpus(600))
        .await
        .expect("run succeeds");

    let mut seen = HashSet::new();
    for review in &outcome.reviews {
        assert!(
            review
                .cleaned
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == ' ')
        );
        assert!(!review.cleaned.contains("  "));
        assert!(seen.insert(review.cleaned.clone()), "duplicate survived");
    }
    assert_eq!(outcome.annotated.reviews.len(), 150);
    assert_eq!(outcome.summary.classifier, "lexicon");
    assert_eq!(outcome.topics.branches.len(), Branch::ALL.len());
    for branch in &outcome.topics.branches {
        if branch.status == TopicStatus::Completed {
            assert_eq!(branch.assignments.len(), branch.document_count);
        }
    }
    assert!(
        outcome
            .report
            .topic_frequency
            .iter()
            .all(|row| !row.topic_id.is_noise())
    );
}
