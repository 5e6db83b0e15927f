//! Offline lexicon classifier emitting a 1-5 star rating.
//!
//! Scores are summed over tokens with intensifiers and a short negation
//! window, squashed into `[-1, 1]` and bucketed into stars.
use async_trait::async_trait;
use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use unicode_segmentation::UnicodeSegmentation;

use super::{RawSentiment, SentimentClassifier};

const POSITIVE: &[(&str, f32)] = &[
    ("amazing", 3.0),
    ("awesome", 3.0),
    ("beautiful", 2.5),
    ("best", 3.0),
    ("brilliant", 3.0),
    ("clean", 1.5),
    ("enjoy", 2.0),
    ("enjoyed", 2.0),
    ("excellent", 3.0),
    ("fantastic", 3.0),
    ("friendly", 2.0),
    ("fun", 2.0),
    ("good", 1.5),
    ("great", 2.5),
    ("happy", 2.0),
    ("helpful", 2.0),
    ("love", 3.0),
    ("loved", 3.0),
    ("lovely", 2.5),
    ("magic", 2.5),
    ("magical", 3.0),
    ("memorable", 2.0),
    ("nice", 1.5),
    ("perfect", 3.0),
    ("recommend", 2.0),
    ("short", 0.5),
    ("smooth", 1.5),
    ("spectacular", 3.0),
    ("wonderful", 3.0),
    ("worth", 1.5),
];

const NEGATIVE: &[(&str, f32)] = &[
    ("angry", -2.5),
    ("annoying", -2.0),
    ("awful", -3.0),
    ("bad", -2.0),
    ("boring", -2.0),
    ("broken", -2.0),
    ("closed", -1.0),
    ("crowded", -1.5),
    ("dirty", -2.5),
    ("disappointed", -2.5),
    ("disappointing", -2.5),
    ("expensive", -1.5),
    ("horrible", -3.0),
    ("long", -0.5),
    ("mess", -2.0),
    ("overpriced", -2.0),
    ("packed", -1.0),
    ("poor", -2.0),
    ("rude", -2.5),
    ("terrible", -3.0),
    ("tired", -1.0),
    ("unfriendly", -2.0),
    ("waste", -2.5),
    ("worse", -2.5),
    ("worst", -3.0),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "nothing", "nor", "dont", "don't", "didn't", "didnt", "isn't", "isnt",
    "wasn't", "wasnt", "weren't", "werent", "won't", "wouldn't", "can't", "cannot", "hardly",
];

const MODIFIERS: &[(&str, f32)] = &[
    ("very", 1.5),
    ("really", 1.4),
    ("extremely", 1.8),
    ("incredibly", 1.8),
    ("so", 1.3),
    ("super", 1.5),
    ("absolutely", 1.7),
    ("slightly", 0.6),
    ("somewhat", 0.7),
    ("bit", 0.7),
];

static SCORES: Lazy<FxHashMap<&'static str, f32>> =
    Lazy::new(|| POSITIVE.iter().chain(NEGATIVE).copied().collect());

static INTENSITY: Lazy<FxHashMap<&'static str, f32>> =
    Lazy::new(|| MODIFIERS.iter().copied().collect());

/// Normalisation constant for `score / sqrt(score^2 + alpha)`.
const ALPHA: f32 = 15.0;

#[derive(Debug, Clone)]
pub struct LexiconSentimentClassifier {
    negation_window: usize,
}

impl Default for LexiconSentimentClassifier {
    fn default() -> Self {
        Self { negation_window: 3 }
    }
}

impl LexiconSentimentClassifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_negation_window(mut self, window: usize) -> Self {
        self.negation_window = window;
        self
    }

    /// Compound polarity in `[-1, 1]`.
    #[must_use]
    pub fn polarity(&self, text: &str) -> f32 {
        let mut total = 0.0_f32;
        let mut modifier = 1.0_f32;
        let mut since_negation: Option<usize> = None;

        for token in text.unicode_words() {
            let token = token.to_lowercase();

            if NEGATIONS.contains(&token.as_str()) {
                since_negation = Some(0);
                continue;
            }
            if let Some(intensity) = INTENSITY.get(token.as_str()) {
                modifier = *intensity;
                continue;
            }

            if let Some(base) = SCORES.get(token.as_str()) {
                let mut score = base * modifier;
                if since_negation.is_some_and(|n| n < self.negation_window) {
                    score = -score * 0.8;
                }
                total += score;
                modifier = 1.0;
            }

            since_negation = since_negation.map(|n| n + 1);
        }

        total / (total * total + ALPHA).sqrt()
    }

    /// Buckets a polarity into a 1-5 star rating.
    #[must_use]
    pub fn stars(polarity: f32) -> u8 {
        match polarity {
            p if p <= -0.5 => 1,
            p if p < -0.05 => 2,
            p if p <= 0.05 => 3,
            p if p < 0.5 => 4,
            _ => 5,
        }
    }
}

#[async_trait]
impl SentimentClassifier for LexiconSentimentClassifier {
    async fn classify(&self, text: &str) -> anyhow::Result<RawSentiment> {
        Ok(RawSentiment::Stars(Self::stars(self.polarity(text))))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}
