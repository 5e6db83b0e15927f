//! Reporting tables built from annotated reviews and discovered topics.
//!
//! Every percentage is `count / total * 100`, rounded to two decimals. A
//! group with no members reports zero rather than NaN.
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{Branch, Review, SentimentLabel, TopicId, VisitorType};

use super::topic::TopicDiscovery;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LabelCounts {
    positive: usize,
    neutral: usize,
    negative: usize,
}

impl LabelCounts {
    fn add(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Negative => self.negative += 1,
        }
    }

    fn total(self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentByVisitorRow {
    pub branch: Branch,
    pub visitor: VisitorType,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub total: usize,
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentByYearRow {
    pub branch: Branch,
    /// Review year, or `missing` when the dataset has no date.
    pub year: String,
    pub visitor: VisitorType,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub total: usize,
    pub positive_pct: f64,
    pub neutral_pct: f64,
    pub negative_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicFrequencyRow {
    pub branch: Branch,
    pub rank: usize,
    pub topic_id: TopicId,
    pub name: String,
    pub count: usize,
    /// Share of the branch's non-noise documents.
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingDistributionRow {
    pub branch: Branch,
    pub rating: u8,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub sentiment_by_visitor: Vec<SentimentByVisitorRow>,
    pub sentiment_by_year: Vec<SentimentByYearRow>,
    pub topic_frequency: Vec<TopicFrequencyRow>,
    pub rating_distribution: Vec<RatingDistributionRow>,
}

/// Builds all reporting tables.
///
/// `cleaned` is the full deduplicated corpus (rating distribution);
/// `annotated` is the labelled sample (sentiment tables).
#[must_use]
pub fn build_report(
    cleaned: &[Review],
    annotated: &[Review],
    topics: &TopicDiscovery,
    top_topics: usize,
) -> AnalysisReport {
    AnalysisReport {
        sentiment_by_visitor: sentiment_by_visitor(annotated),
        sentiment_by_year: sentiment_by_year(annotated),
        topic_frequency: topic_frequency(topics, top_topics),
        rating_distribution: rating_distribution(cleaned),
    }
}

#[allow(clippy::cast_precision_loss)]
fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 * 100.0 / total as f64 * 100.0).round() / 100.0
}

/// One row per branch and visitor type, including empty groups.
#[must_use]
pub fn sentiment_by_visitor(annotated: &[Review]) -> Vec<SentimentByVisitorRow> {
    let mut counts: BTreeMap<(Branch, VisitorType), LabelCounts> = BTreeMap::new();
    for branch in Branch::ALL {
        for visitor in VisitorType::ALL {
            counts.insert((branch, visitor), LabelCounts::default());
        }
    }
    for review in annotated {
        if let Some(label) = review.sentiment {
            counts
                .entry((review.branch, review.visitor))
                .or_default()
                .add(label);
        }
    }

    counts
        .into_iter()
        .map(|((branch, visitor), c)| {
            let total = c.total();
            SentimentByVisitorRow {
                branch,
                visitor,
                positive: c.positive,
                neutral: c.neutral,
                negative: c.negative,
                total,
                positive_pct: percentage(c.positive, total),
                neutral_pct: percentage(c.neutral, total),
                negative_pct: percentage(c.negative, total),
            }
        })
        .collect()
}

/// One row per branch and visitor type for every observed year, including
/// empty groups.
#[must_use]
pub fn sentiment_by_year(annotated: &[Review]) -> Vec<SentimentByYearRow> {
    let years: BTreeSet<Option<i32>> = annotated
        .iter()
        .filter(|review| review.sentiment.is_some())
        .map(Review::year)
        .collect();
    let mut counts: BTreeMap<(Branch, Option<i32>, VisitorType), LabelCounts> = BTreeMap::new();
    for branch in Branch::ALL {
        for &year in &years {
            for visitor in VisitorType::ALL {
                counts.insert((branch, year, visitor), LabelCounts::default());
            }
        }
    }
    for review in annotated {
        if let Some(label) = review.sentiment {
            counts
                .entry((review.branch, review.year(), review.visitor))
                .or_default()
                .add(label);
        }
    }

    counts
        .into_iter()
        .map(|((branch, year, visitor), c)| {
            let total = c.total();
            SentimentByYearRow {
                branch,
                year: year.map_or_else(|| "missing".to_string(), |y| y.to_string()),
                visitor,
                positive: c.positive,
                neutral: c.neutral,
                negative: c.negative,
                total,
                positive_pct: percentage(c.positive, total),
                neutral_pct: percentage(c.neutral, total),
                negative_pct: percentage(c.negative, total),
            }
        })
        .collect()
}

/// Top `limit` non-noise topics per branch by document count.
#[must_use]
pub fn topic_frequency(topics: &TopicDiscovery, limit: usize) -> Vec<TopicFrequencyRow> {
    let mut rows = Vec::new();
    for branch in &topics.branches {
        let mut real: Vec<_> = branch.topics.iter().filter(|t| !t.id.is_noise()).collect();
        real.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.id.cmp(&b.id)));
        let clustered: usize = real.iter().map(|t| t.count).sum();

        rows.extend(
            real.into_iter()
                .take(limit)
                .enumerate()
                .map(|(rank, topic)| TopicFrequencyRow {
                    branch: branch.branch,
                    rank: rank + 1,
                    topic_id: topic.id,
                    name: topic.name.clone(),
                    count: topic.count,
                    share_pct: percentage(topic.count, clustered),
                }),
        );
    }
    rows
}

/// One row per branch and star rating 1-5.
#[must_use]
pub fn rating_distribution(reviews: &[Review]) -> Vec<RatingDistributionRow> {
    let mut counts: BTreeMap<Branch, [usize; 5]> = BTreeMap::new();
    for branch in Branch::ALL {
        counts.insert(branch, [0; 5]);
    }
    for review in reviews {
        if (1..=5).contains(&review.rating) {
            counts.entry(review.branch).or_insert([0; 5])[usize::from(review.rating) - 1] += 1;
        }
    }

    counts
        .into_iter()
        .flat_map(|(branch, buckets)| {
            let total: usize = buckets.iter().sum();
            (1_u8..=5).map(move |rating| {
                let count = buckets[usize::from(rating) - 1];
                RatingDistributionRow {
                    branch,
                    rating,
                    count,
                    pct: percentage(count, total),
                }
            })
        })
        .collect()
}
