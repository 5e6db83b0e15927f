//! Review table types shared by every pipeline stage.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the analysed parks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "Disneyland_HongKong")]
    HongKong,
    #[serde(rename = "Disneyland_California")]
    California,
    #[serde(rename = "Disneyland_Paris")]
    Paris,
}

impl Branch {
    pub const ALL: [Branch; 3] = [Branch::HongKong, Branch::California, Branch::Paris];

    /// Dataset spelling of the branch.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Branch::HongKong => "Disneyland_HongKong",
            Branch::California => "Disneyland_California",
            Branch::Paris => "Disneyland_Paris",
        }
    }

    /// Home country used for visitor classification. Must match the
    /// reviewer location spelling of the dataset exactly.
    #[must_use]
    pub fn home_country(self) -> &'static str {
        match self {
            Branch::HongKong => "Hong Kong",
            Branch::California => "United States",
            Branch::Paris => "France",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Branch {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "Disneyland_HongKong" => Ok(Branch::HongKong),
            "Disneyland_California" => Ok(Branch::California),
            "Disneyland_Paris" => Ok(Branch::Paris),
            other => Err(format!("unknown branch: {other}")),
        }
    }
}

/// `Year_Month` column value such as `2019-4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Parses `YYYY-M`. The dataset writes `missing` for unknown dates, which
    /// yields `None` like any other unparsable value.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        let year = year.parse::<i32>().ok()?;
        let month = month.parse::<u32>().ok()?;
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.year, self.month)
    }
}

/// A row as loaded from the dataset, before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReview {
    pub review_id: i64,
    pub rating: u8,
    pub year_month: Option<YearMonth>,
    pub reviewer_location: Option<String>,
    pub review_text: Option<String>,
    pub branch: Branch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VisitorType {
    Local,
    Tourist,
}

impl VisitorType {
    pub const ALL: [VisitorType; 2] = [VisitorType::Local, VisitorType::Tourist];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VisitorType::Local => "Local",
            VisitorType::Tourist => "Tourist",
        }
    }
}

impl fmt::Display for VisitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Negative => "Negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "neutral" => Ok(SentimentLabel::Neutral),
            "negative" => Ok(SentimentLabel::Negative),
            other => Err(format!("unknown sentiment label: {other}")),
        }
    }
}

/// Cluster id produced by topic discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicId(pub i32);

impl TopicId {
    /// Documents the clustering could not confidently assign.
    pub const NOISE: TopicId = TopicId(-1);

    #[must_use]
    pub fn is_noise(self) -> bool {
        self == Self::NOISE
    }
}

impl fmt::Display for TopicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of a topic summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    pub id: TopicId,
    pub count: usize,
    pub name: String,
}

/// A cleaned review. Derived fields are filled by the stages that own them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub review_id: i64,
    pub rating: u8,
    pub year_month: Option<YearMonth>,
    pub reviewer_location: Option<String>,
    pub branch: Branch,
    pub text: String,
    pub language: String,
    pub cleaned: String,
    pub char_length: usize,
    pub word_count: usize,
    pub visitor: VisitorType,
    pub sentiment: Option<SentimentLabel>,
    pub topic: Option<TopicId>,
}

impl Review {
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.year_month.map(|ym| ym.year)
    }
}
