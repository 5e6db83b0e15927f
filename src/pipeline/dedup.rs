use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::debug;
use uuid::Uuid;

use crate::model::Review;
use crate::util::text::hash_text;

use super::RunContext;
use super::preprocess::{CleanedCorpus, CleaningStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicatedCorpus {
    pub run_id: Uuid,
    pub reviews: Vec<Review>,
    pub stats: CleaningStats,
}

#[async_trait]
pub trait DedupStage: Send + Sync {
    async fn deduplicate(
        &self,
        run: &RunContext,
        corpus: CleanedCorpus,
    ) -> anyhow::Result<DeduplicatedCorpus>;
}

/// Exact dedup on the cleaned text. The first occurrence in input order wins.
///
/// Reviews are bucketed by a 64-bit hash and the text is compared on a hit,
/// so a hash collision never drops a distinct review.
#[derive(Debug, Clone)]
pub struct HashDedupStage {
    hasher: fn(&str) -> u64,
}

impl HashDedupStage {
    #[must_use]
    pub fn new() -> Self {
        Self { hasher: hash_text }
    }

    #[cfg(test)]
    pub(crate) fn with_hasher(hasher: fn(&str) -> u64) -> Self {
        Self { hasher }
    }
}

impl Default for HashDedupStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DedupStage for HashDedupStage {
    async fn deduplicate(
        &self,
        run: &RunContext,
        corpus: CleanedCorpus,
    ) -> anyhow::Result<DeduplicatedCorpus> {
        // hash -> indices into `reviews`
        let mut seen: FxHashMap<u64, Vec<usize>> = FxHashMap::default();
        let mut stats = corpus.stats;
        let mut reviews: Vec<Review> = Vec::with_capacity(corpus.reviews.len());

        for review in corpus.reviews {
            let bucket = seen.entry((self.hasher)(&review.cleaned)).or_default();
            if bucket
                .iter()
                .any(|&kept| reviews[kept].cleaned == review.cleaned)
            {
                stats.dropped_duplicates += 1;
            } else {
                bucket.push(reviews.len());
                reviews.push(review);
            }
        }

        debug!(
            run_id = %run.run_id,
            kept = reviews.len(),
            duplicates = stats.dropped_duplicates,
            "deduplicated reviews"
        );

        Ok(DeduplicatedCorpus {
            run_id: run.run_id,
            reviews,
            stats,
        })
    }
}
