use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};

/// Seeded K-Means over dense vectors (embeddings).
///
/// The same data, `k` and seed always produce the same centroids and
/// assignments.
pub struct KMeans {
    pub centroids: Vec<Vec<f32>>,
    pub assignments: Vec<usize>,
    pub distances: Vec<f32>,
}

impl KMeans {
    /// Runs K-Means clustering.
    ///
    /// # Arguments
    /// * `data` - List of data points (vectors).
    /// * `k` - Number of clusters, capped at the number of points.
    /// * `max_iterations` - Maximum number of iterations.
    /// * `seed` - Seed for centroid initialisation and empty-cluster reseeding.
    #[must_use]
    pub fn fit(data: &[Vec<f32>], k: usize, max_iterations: usize, seed: u64) -> Self {
        if data.is_empty() || k == 0 {
            return Self {
                centroids: vec![],
                assignments: vec![],
                distances: vec![],
            };
        }

        let k = k.min(data.len());
        let dim = data[0].len();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut centroids = plus_plus_init(data, k, &mut rng);

        let mut assignments = vec![0; data.len()];
        let mut changes = true;
        let mut iterations = 0;

        while changes && iterations < max_iterations {
            changes = false;
            iterations += 1;

            // E-step
            let new_assignments: Vec<usize> = data
                .iter()
                .map(|point| nearest(point, &centroids).0)
                .collect();

            if new_assignments != assignments || iterations == 1 {
                assignments = new_assignments;
                changes = true;
            }

            // M-step
            let mut sums = vec![vec![0.0_f32; dim]; k];
            let mut counts = vec![0_usize; k];

            for (point, &cluster) in data.iter().zip(&assignments) {
                for (sum, value) in sums[cluster].iter_mut().zip(point) {
                    *sum += value;
                }
                counts[cluster] += 1;
            }

            for (cluster, centroid) in centroids.iter_mut().enumerate() {
                if counts[cluster] > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    let count = counts[cluster] as f32;
                    for (value, sum) in centroid.iter_mut().zip(&sums[cluster]) {
                        *value = sum / count;
                    }
                } else if let Some(random_point) = data.choose(&mut rng) {
                    centroid.clone_from(random_point);
                }
            }
        }

        let distances = data
            .iter()
            .zip(&assignments)
            .map(|(point, &cluster)| distance_sq(point, &centroids[cluster]).sqrt())
            .collect();

        Self {
            centroids,
            assignments,
            distances,
        }
    }
}

/// k-means++ seeding: each further centroid is drawn with probability
/// proportional to its squared distance from the closest centroid so far.
fn plus_plus_init(data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let first = rng.random_range(0..data.len());
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[first].clone());
    let mut nearest_sq: Vec<f32> = data
        .iter()
        .map(|point| distance_sq(point, &centroids[0]))
        .collect();

    while centroids.len() < k {
        // All weights zero means every point coincides with a centroid.
        let next = match WeightedIndex::new(&nearest_sq) {
            Ok(weights) => weights.sample(rng),
            Err(_) => rng.random_range(0..data.len()),
        };
        let centroid = data[next].clone();
        for (best, point) in nearest_sq.iter_mut().zip(data) {
            *best = best.min(distance_sq(point, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> (usize, f32) {
    let mut best = (0, f32::MAX);
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist_sq = distance_sq(point, centroid);
        if dist_sq < best.1 {
            best = (idx, dist_sq);
        }
    }
    best
}

fn distance_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}
