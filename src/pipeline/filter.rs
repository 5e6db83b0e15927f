use std::num::NonZeroUsize;

use tracing::debug;

use crate::config::Config;

use super::preprocess::CleanedCorpus;

/// Length bounds applied after cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthPolicy {
    /// Inclusive upper bound on trimmed raw-text characters.
    pub max_chars: usize,
    /// Minimum raw-text word count. `None` disables the lower bound.
    pub min_words: Option<NonZeroUsize>,
}

impl LengthPolicy {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_chars: config.max_review_chars(),
            min_words: config.min_review_words(),
        }
    }
}

/// Drops outliers by length, returning a new snapshot.
#[must_use]
pub fn apply_length_policy(corpus: CleanedCorpus, policy: LengthPolicy) -> CleanedCorpus {
    let mut stats = corpus.stats;
    let mut reviews = Vec::with_capacity(corpus.reviews.len());

    for review in corpus.reviews {
        if review.char_length > policy.max_chars {
            stats.dropped_too_long += 1;
            continue;
        }
        if policy
            .min_words
            .is_some_and(|min| review.word_count < min.get())
        {
            stats.dropped_too_short += 1;
            continue;
        }
        reviews.push(review);
    }

    debug!(
        run_id = %corpus.run_id,
        kept = reviews.len(),
        too_long = stats.dropped_too_long,
        too_short = stats.dropped_too_short,
        "applied length policy"
    );

    CleanedCorpus {
        run_id: corpus.run_id,
        reviews,
        stats,
    }
}
