use async_trait::async_trait;
use rayon::prelude::*;
use regex::Regex;
use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;
use uuid::Uuid;

use crate::dataset::RawCorpus;
use crate::language_detection::LanguageThresholds;
use crate::model::{RawReview, Review};
use crate::util::text::word_count;

use super::RunContext;
use super::stopwords::stopword_set;
use super::visitor::classify_visitor;

/// Drop counters accumulated by the cleaning, filtering and dedup stages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningStats {
    pub input_rows: usize,
    pub dropped_null_text: usize,
    pub dropped_empty_after_cleaning: usize,
    pub dropped_too_long: usize,
    pub dropped_too_short: usize,
    pub dropped_duplicates: usize,
}

impl CleaningStats {
    #[must_use]
    pub fn dropped_total(&self) -> usize {
        self.dropped_null_text
            + self.dropped_empty_after_cleaning
            + self.dropped_too_long
            + self.dropped_too_short
            + self.dropped_duplicates
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedCorpus {
    pub run_id: Uuid,
    pub reviews: Vec<Review>,
    pub stats: CleaningStats,
}

#[async_trait]
pub trait PreprocessStage: Send + Sync {
    async fn preprocess(&self, run: &RunContext, corpus: RawCorpus)
    -> anyhow::Result<CleanedCorpus>;
}

/// Text normaliser producing the `cleaned` column.
///
/// Steps run in a fixed order: HTML removal, URL removal, accent folding,
/// lowercasing, apostrophe deletion, non-letter replacement and stopword
/// removal. The output contains only `a-z` and single spaces.
#[derive(Debug, Clone)]
pub struct TextCleaner {
    markup: Regex,
    urls: Regex,
    stopwords: FxHashSet<String>,
}

impl TextCleaner {
    /// # Errors
    /// Fails only if the built-in patterns do not compile.
    pub fn new(extra_stopwords: &[String]) -> anyhow::Result<Self> {
        Ok(Self {
            markup: Regex::new(r"<[^>]*>|&[A-Za-z]+;|&#[0-9]+;")?,
            urls: Regex::new(r"(?i)\b(?:https?://|www\.)\S+")?,
            stopwords: stopword_set(extra_stopwords),
        })
    }

    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        let without_markup = self.markup.replace_all(text, " ");
        let without_urls = self.urls.replace_all(&without_markup, " ");

        let folded = without_urls
            .nfkd()
            .filter(|c| !is_combining_mark(*c))
            .collect::<String>()
            .to_lowercase();

        let letters: String = folded
            .chars()
            .filter(|c| !matches!(c, '\'' | '\u{2019}' | '`'))
            .map(|c| if c.is_ascii_lowercase() { c } else { ' ' })
            .collect();

        letters
            .split_whitespace()
            .filter(|token| !self.stopwords.contains(*token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct TextPreprocessStage {
    cleaner: TextCleaner,
    language: LanguageThresholds,
}

impl TextPreprocessStage {
    #[must_use]
    pub fn new(cleaner: TextCleaner) -> Self {
        Self {
            cleaner,
            language: LanguageThresholds::default(),
        }
    }

    #[must_use]
    pub fn with_language_thresholds(mut self, thresholds: LanguageThresholds) -> Self {
        self.language = thresholds;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    NullText,
    EmptyAfterCleaning,
}

#[async_trait]
impl PreprocessStage for TextPreprocessStage {
    async fn preprocess(
        &self,
        run: &RunContext,
        corpus: RawCorpus,
    ) -> anyhow::Result<CleanedCorpus> {
        let input_rows = corpus.reviews.len();
        let cleaner = self.cleaner.clone();
        let language = self.language;

        // 正規化と言語判定はCPUバウンドなのでブロッキングスレッドで並列に回す
        let outcomes = tokio::task::spawn_blocking(move || {
            corpus
                .reviews
                .into_par_iter()
                .map(|raw| preprocess_review(raw, &cleaner, &language))
                .collect::<Vec<_>>()
        })
        .await?;

        let mut stats = CleaningStats {
            input_rows,
            ..CleaningStats::default()
        };
        let mut reviews = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Ok(review) => reviews.push(review),
                Err(Rejection::NullText) => stats.dropped_null_text += 1,
                Err(Rejection::EmptyAfterCleaning) => stats.dropped_empty_after_cleaning += 1,
            }
        }

        debug!(
            run_id = %run.run_id,
            kept = reviews.len(),
            null_text = stats.dropped_null_text,
            empty = stats.dropped_empty_after_cleaning,
            "preprocessed reviews"
        );

        Ok(CleanedCorpus {
            run_id: run.run_id,
            reviews,
            stats,
        })
    }
}

fn preprocess_review(
    raw: RawReview,
    cleaner: &TextCleaner,
    language: &LanguageThresholds,
) -> Result<Review, Rejection> {
    let text = raw.review_text.ok_or(Rejection::NullText)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Rejection::NullText);
    }

    let cleaned = cleaner.clean(trimmed);
    if cleaned.is_empty() {
        return Err(Rejection::EmptyAfterCleaning);
    }

    let visitor = classify_visitor(raw.reviewer_location.as_deref(), raw.branch);

    Ok(Review {
        review_id: raw.review_id,
        rating: raw.rating,
        year_month: raw.year_month,
        reviewer_location: raw.reviewer_location,
        branch: raw.branch,
        language: language.detect(trimmed),
        char_length: trimmed.chars().count(),
        word_count: word_count(trimmed),
        text: trimmed.to_string(),
        cleaned,
        visitor,
        sentiment: None,
        topic: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Branch, VisitorType};
    use rstest::rstest;

    fn cleaner() -> TextCleaner {
        TextCleaner::new(&[]).expect("patterns compile")
    }

    fn raw(id: i64, text: Option<&str>) -> RawReview {
        RawReview {
            review_id: id,
            rating: 4,
            year_month: None,
            reviewer_location: Some("France".to_string()),
            review_text: text.map(str::to_string),
            branch: Branch::Paris,
        }
    }

    #[rstest]
    #[case("I loved the park!!! http://x.com", "loved")]
    #[case("<b>Great</b> rides &amp; food", "great rides food")]
    #[case("Café crème was délicieux", "cafe creme delicieux")]
    #[case("We didn't wait, it's FAST", "wait fast")]
    #[case("Visit www.example.com/tickets for queues", "visit queues")]
    #[case("Space Mountain 2 times", "space mountain times")]
    fn clean_normalises_text(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(cleaner().clean(input), expected);
    }

    #[test]
    fn clean_output_contains_only_letters_and_single_spaces() {
        let cleaned = cleaner().clean("Ünïcode!!  tabs\tand\nnewlines -- 100% ★★★★ fun");
        assert!(cleaned.chars().all(|c| c.is_ascii_lowercase() || c == ' '));
        assert!(!cleaned.contains("  "));
        assert_eq!(cleaned, cleaned.trim());
    }

    #[test]
    fn extra_stopwords_are_removed() {
        let cleaner = TextCleaner::new(&["castle".to_string()]).expect("patterns compile");
        assert_eq!(cleaner.clean("The castle fireworks"), "fireworks");
    }

    #[tokio::test]
    async fn drops_null_and_empty_reviews() {
        let stage = TextPreprocessStage::new(cleaner());
        let corpus = RawCorpus::from_reviews(vec![
            raw(1, Some("I loved the park!!! http://x.com")),
            raw(2, None),
            raw(3, Some("the and of")),
            raw(4, Some("   ")),
        ]);

        let result = stage
            .preprocess(&RunContext::new(42), corpus)
            .await
            .expect("preprocess succeeds");

        assert_eq!(result.reviews.len(), 1);
        assert_eq!(result.reviews[0].review_id, 1);
        assert_eq!(result.reviews[0].visitor, VisitorType::Local);
        assert_eq!(result.stats.input_rows, 4);
        assert_eq!(result.stats.dropped_null_text, 2);
        assert_eq!(result.stats.dropped_empty_after_cleaning, 1);
    }

    #[tokio::test]
    async fn language_thresholds_come_from_the_stage() {
        let stage = TextPreprocessStage::new(cleaner()).with_language_thresholds(
            LanguageThresholds {
                min_chars: 500,
                min_confidence: 0.5,
            },
        );
        let corpus = RawCorpus::from_reviews(vec![raw(
            1,
            Some("The queues were long but the fireworks at night made the whole trip worth it."),
        )]);

        let result = stage
            .preprocess(&RunContext::new(1), corpus)
            .await
            .expect("preprocess succeeds");

        assert_eq!(result.reviews[0].language, crate::language_detection::UNDETERMINED);
    }

    #[tokio::test]
    async fn records_length_on_trimmed_raw_text() {
        let stage = TextPreprocessStage::new(cleaner());
        let corpus = RawCorpus::from_reviews(vec![raw(1, Some("  Très bien!  "))]);

        let result = stage
            .preprocess(&RunContext::new(1), corpus)
            .await
            .expect("preprocess succeeds");

        let review = &result.reviews[0];
        assert_eq!(review.text, "Très bien!");
        assert_eq!(review.char_length, 10);
        assert_eq!(review.word_count, 2);
    }
}
