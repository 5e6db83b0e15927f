//! Writes the report tables of one run to a directory.
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::model::{Branch, Review, SentimentLabel, TopicId, VisitorType};
use crate::observability::metrics::Metrics;

use super::AnalysisOutcome;

/// Paths written by [`write_report`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
struct AnnotatedReviewRow<'a> {
    review_id: i64,
    branch: Branch,
    year_month: String,
    visitor: VisitorType,
    rating: u8,
    language: &'a str,
    sentiment: Option<SentimentLabel>,
    topic: Option<TopicId>,
    cleaned: &'a str,
}

impl<'a> From<&'a Review> for AnnotatedReviewRow<'a> {
    fn from(review: &'a Review) -> Self {
        Self {
            review_id: review.review_id,
            branch: review.branch,
            year_month: review
                .year_month
                .map_or_else(|| "missing".to_string(), |ym| ym.to_string()),
            visitor: review.visitor,
            rating: review.rating,
            language: &review.language,
            sentiment: review.sentiment,
            topic: review.topic,
            cleaned: &review.cleaned,
        }
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize {}", path.display()))?;
    fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))
}

/// Writes every table of `outcome` under `directory`, creating it if needed.
///
/// # Errors
/// Fails when the directory or any file cannot be written.
pub fn write_report(
    outcome: &AnalysisOutcome,
    directory: &Path,
    metrics: Option<&Metrics>,
) -> Result<ReportFiles> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create report directory {}", directory.display()))?;
    let path = |name: &str| directory.join(name);
    let mut files = Vec::new();

    let report = &outcome.report;
    let target = path("sentiment_by_visitor.csv");
    write_csv(&target, &report.sentiment_by_visitor)?;
    files.push(target);

    let target = path("sentiment_by_year.csv");
    write_csv(&target, &report.sentiment_by_year)?;
    files.push(target);

    let target = path("topic_frequency.csv");
    write_csv(&target, &report.topic_frequency)?;
    files.push(target);

    let target = path("rating_distribution.csv");
    write_csv(&target, &report.rating_distribution)?;
    files.push(target);

    let target = path("annotated_reviews.csv");
    write_csv(
        &target,
        outcome.annotated.reviews.iter().map(AnnotatedReviewRow::from),
    )?;
    files.push(target);

    let target = path("topics.json");
    write_json(&target, &outcome.topics)?;
    files.push(target);

    let target = path("summary.json");
    write_json(&target, &outcome.summary)?;
    files.push(target);

    if let Some(metrics) = metrics {
        let target = path("metrics.prom");
        fs::write(&target, metrics.render())
            .with_context(|| format!("failed to write {}", target.display()))?;
        files.push(target);
    }

    info!(
        run_id = %outcome.context.run_id,
        directory = %directory.display(),
        files = files.len(),
        "report written"
    );

    Ok(ReportFiles {
        directory: directory.to_path_buf(),
        files,
    })
}
