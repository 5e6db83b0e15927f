use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use uuid::Uuid;

use crate::model::Review;

use super::PipelineError;

/// Fixed-size random subset of the cleaned reviews handed to sentiment
/// annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledCorpus {
    pub run_id: Uuid,
    pub seed: u64,
    pub reviews: Vec<Review>,
}

/// Draws exactly `size` reviews without replacement.
///
/// Selected reviews keep their input order. The same `(reviews, size, seed)`
/// always yields the same subset.
///
/// # Errors
/// Returns [`PipelineError::SampleTooLarge`] when fewer than `size` reviews
/// are available.
pub fn sample_reviews(
    reviews: &[Review],
    size: usize,
    seed: u64,
) -> Result<Vec<Review>, PipelineError> {
    if size > reviews.len() {
        return Err(PipelineError::SampleTooLarge {
            requested: size,
            available: reviews.len(),
        });
    }

    Ok(sampled_indices(reviews.len(), size, seed)
        .into_iter()
        .map(|idx| reviews[idx].clone())
        .collect())
}

/// Caps `reviews` at `max` by seeded sampling. Shorter inputs pass through.
#[must_use]
pub fn cap_reviews(reviews: Vec<Review>, max: usize, seed: u64) -> Vec<Review> {
    if reviews.len() <= max {
        return reviews;
    }

    let keep = sampled_indices(reviews.len(), max, seed);
    let mut selected = Vec::with_capacity(max);
    let mut keep = keep.into_iter().peekable();
    for (idx, review) in reviews.into_iter().enumerate() {
        if keep.peek() == Some(&idx) {
            keep.next();
            selected.push(review);
        }
    }
    selected
}

fn sampled_indices(len: usize, amount: usize, seed: u64) -> Vec<usize> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = index::sample(&mut rng, len, amount).into_vec();
    indices.sort_unstable();
    indices
}
