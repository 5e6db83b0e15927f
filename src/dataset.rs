//! Review dataset loading.
//!
//! The public review dump is Latin-1 encoded, so every field that is not valid
//! UTF-8 is decoded byte-for-byte as Latin-1 instead of rejecting the row.
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ByteRecord, ReaderBuilder};
use thiserror::Error;
use tracing::{info, warn};

use crate::model::{Branch, RawReview, YearMonth};

const COL_REVIEW_ID: &str = "Review_ID";
const COL_RATING: &str = "Rating";
const COL_YEAR_MONTH: &str = "Year_Month";
const COL_LOCATION: &str = "Reviewer_Location";
const COL_TEXT: &str = "Review_Text";
const COL_BRANCH: &str = "Branch";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset is missing required column {0}")]
    MissingColumn(&'static str),
}

/// Rows loaded once per run. Read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCorpus {
    pub reviews: Vec<RawReview>,
    pub stats: LoadStats,
}

impl RawCorpus {
    #[must_use]
    pub fn from_reviews(reviews: Vec<RawReview>) -> Self {
        let rows_read = reviews.len();
        Self {
            reviews,
            stats: LoadStats {
                rows_read,
                skipped_rows: 0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadStats {
    pub rows_read: usize,
    pub skipped_rows: usize,
}

/// Loads the review CSV at `path`.
///
/// # Errors
/// Fails when the file cannot be opened, a required column is missing, or the
/// CSV itself is unreadable. Individual malformed rows are skipped.
pub fn load_reviews(path: &Path) -> Result<RawCorpus> {
    let file = File::open(path)
        .with_context(|| format!("failed to open dataset at {}", path.display()))?;
    let corpus = read_reviews(BufReader::new(file))
        .with_context(|| format!("failed to read dataset at {}", path.display()))?;
    info!(
        path = %path.display(),
        rows = corpus.stats.rows_read,
        skipped = corpus.stats.skipped_rows,
        "dataset loaded"
    );
    Ok(corpus)
}

/// Reads review rows from any CSV source.
///
/// # Errors
/// Fails on a missing required column or an unreadable CSV stream.
pub fn read_reviews<R: Read>(source: R) -> Result<RawCorpus> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);
    let headers = reader
        .byte_headers()
        .context("failed to read CSV header")?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut reviews = Vec::new();
    let mut stats = LoadStats::default();
    let mut record = ByteRecord::new();
    let mut line = 1_usize;

    while reader
        .read_byte_record(&mut record)
        .with_context(|| format!("failed to read CSV record after line {line}"))?
    {
        line += 1;
        stats.rows_read += 1;
        match columns.parse(&record) {
            Ok(review) => reviews.push(review),
            Err(reason) => {
                stats.skipped_rows += 1;
                warn!(line, reason = %reason, "skipping malformed review row");
            }
        }
    }

    Ok(RawCorpus { reviews, stats })
}

struct Columns {
    review_id: usize,
    rating: usize,
    year_month: usize,
    location: usize,
    text: usize,
    branch: usize,
}

impl Columns {
    fn resolve(headers: &ByteRecord) -> Result<Self, DatasetError> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| decode_field(h).trim_start_matches('\u{feff}').trim().to_string())
            .collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))
        };

        Ok(Self {
            review_id: find(COL_REVIEW_ID)?,
            rating: find(COL_RATING)?,
            year_month: find(COL_YEAR_MONTH)?,
            location: find(COL_LOCATION)?,
            text: find(COL_TEXT)?,
            branch: find(COL_BRANCH)?,
        })
    }

    fn parse(&self, record: &ByteRecord) -> Result<RawReview, String> {
        let field = |idx: usize, name: &str| {
            record
                .get(idx)
                .map(decode_field)
                .ok_or_else(|| format!("missing field {name}"))
        };

        let review_id = field(self.review_id, COL_REVIEW_ID)?
            .trim()
            .parse::<i64>()
            .map_err(|e| format!("invalid {COL_REVIEW_ID}: {e}"))?;
        let rating = field(self.rating, COL_RATING)?
            .trim()
            .parse::<u8>()
            .map_err(|e| format!("invalid {COL_RATING}: {e}"))?;
        if !(1..=5).contains(&rating) {
            return Err(format!("{COL_RATING} out of range: {rating}"));
        }
        let branch = field(self.branch, COL_BRANCH)?.parse::<Branch>()?;
        let year_month = YearMonth::parse(&field(self.year_month, COL_YEAR_MONTH)?);

        Ok(RawReview {
            review_id,
            rating,
            year_month,
            reviewer_location: non_empty(field(self.location, COL_LOCATION)?),
            review_text: non_empty(field(self.text, COL_TEXT)?),
            branch,
        })
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        // Latin-1 maps each byte to the code point of the same value.
        Err(_) => bytes.iter().copied().map(char::from).collect(),
    }
}
