//! 計測・評価用のユーティリティ群。
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::dataset::RawCorpus;
use crate::model::{Branch, RawReview, YearMonth};

const OPENINGS: [&str; 6] = [
    "We visited with the kids and",
    "First time at the park and",
    "Went on a weekday,",
    "Our family trip was great but",
    "Honestly",
    "Visited during the holidays and",
];

const BODIES: [&str; 10] = [
    "the queues for every ride were far too long",
    "the fireworks show was absolutely magical",
    "food prices were ridiculous for what you get",
    "staff were friendly and helpful all day",
    "the fast pass system saved us hours of waiting",
    "several attractions were closed for maintenance",
    "the parade was wonderful and the kids loved it",
    "the hotel shuttle was slow and crowded",
    "the castle looked stunning at night",
    "it was dirty and the toilets were a disgrace",
];

const CLOSINGS: [&str; 5] = [
    "Would come back again!",
    "Not worth the money.",
    "Overall an okay day.",
    "Best day of the holiday <br/> highly recommend.",
    "More info at https://example.com/tips",
];

const LOCATIONS: [&str; 8] = [
    "Hong Kong",
    "United States",
    "France",
    "United Kingdom",
    "Australia",
    "Germany",
    "Philippines",
    "India",
];

/// 合成レビューを生成する。
///
/// 同じ `count` なら常に同じ行を返す。本文には URL とマークアップを混ぜ、
/// 約 5% は重複、約 2% は本文なしにする。
#[must_use]
pub fn synthetic_reviews(count: usize) -> Vec<RawReview> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut reviews: Vec<RawReview> = Vec::with_capacity(count);

    for idx in 0..count {
        let branch = Branch::ALL[rng.random_range(0..Branch::ALL.len())];
        let review_text = if rng.random_bool(0.02) {
            None
        } else if idx > 0 && rng.random_bool(0.05) {
            reviews[rng.random_range(0..idx)].review_text.clone()
        } else {
            let sentences = rng.random_range(1..=3);
            let mut text = OPENINGS[rng.random_range(0..OPENINGS.len())].to_string();
            for _ in 0..sentences {
                text.push(' ');
                text.push_str(BODIES[rng.random_range(0..BODIES.len())]);
                text.push('.');
            }
            text.push(' ');
            text.push_str(CLOSINGS[rng.random_range(0..CLOSINGS.len())]);
            Some(text)
        };

        reviews.push(RawReview {
            review_id: i64::try_from(idx).unwrap_or(i64::MAX),
            rating: rng.random_range(1..=5),
            year_month: rng.random_bool(0.9).then(|| YearMonth {
                year: rng.random_range(2012..=2019),
                month: rng.random_range(1..=12),
            }),
            reviewer_location: Some(LOCATIONS[rng.random_range(0..LOCATIONS.len())].to_string()),
            review_text,
            branch,
        });
    }

    reviews
}

#[must_use]
pub fn synthetic_corpus(count: usize) -> RawCorpus {
    RawCorpus::from_reviews(synthetic_reviews(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_reviews_are_deterministic() {
        let first = synthetic_reviews(64);
        let second = synthetic_reviews(64);

        assert_eq!(first.len(), 64);
        assert_eq!(first, second);
        assert!(first.iter().any(|r| r.review_text.is_some()));
    }
}
