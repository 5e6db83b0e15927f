use anyhow::Result;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Seeded sparse random projection (Achlioptas) to `n_components` dimensions.
///
/// Each projected row is L2-normalised so k-means works on cosine geometry.
/// Zero input rows stay zero.
///
/// # Errors
/// Fails when the rows do not share one dimension.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn sparse_random_projection(
    data: &[Vec<f32>],
    n_components: usize,
    seed: u64,
) -> Result<Vec<Vec<f32>>> {
    let Some(first) = data.first() else {
        return Ok(Vec::new());
    };
    let dim = first.len();
    if n_components == 0 || dim <= n_components {
        return Ok(data.iter().map(|row| normalized(row.clone())).collect());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let scale = (3.0_f32 / n_components as f32).sqrt();
    let projection = Array2::from_shape_fn((dim, n_components), |_| {
        let draw: f32 = rng.random();
        if draw < 1.0 / 6.0 {
            scale
        } else if draw < 2.0 / 6.0 {
            -scale
        } else {
            0.0
        }
    });

    let flat: Vec<f32> = data.iter().flatten().copied().collect();
    let input = Array2::from_shape_vec((data.len(), dim), flat)?;
    let projected = input.dot(&projection);

    Ok(projected
        .rows()
        .into_iter()
        .map(|row| normalized(row.to_vec()))
        .collect())
}

fn normalized(mut row: Vec<f32>) -> Vec<f32> {
    let norm = row.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut row {
            *value /= norm;
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Vec<Vec<f32>> {
        (0..6)
            .map(|i| (0..40).map(|j| ((i * 7 + j) % 5) as f32).collect())
            .collect()
    }

    #[test]
    fn projects_to_requested_dimension_deterministically() {
        let first = sparse_random_projection(&data(), 8, 42).expect("projects");
        let second = sparse_random_projection(&data(), 8, 42).expect("projects");

        assert_eq!(first.len(), 6);
        assert!(first.iter().all(|row| row.len() == 8));
        assert_eq!(first, second);
    }

    #[test]
    fn small_inputs_pass_through_normalised() {
        let rows = vec![vec![3.0, 4.0], vec![0.0, 0.0]];
        let projected = sparse_random_projection(&rows, 8, 1).expect("projects");
        assert_eq!(projected[0], vec![0.6, 0.8]);
        assert_eq!(projected[1], vec![0.0, 0.0]);
    }

    #[test]
    fn ragged_rows_fail() {
        let rows = vec![vec![1.0; 20], vec![1.0; 19]];
        assert!(sparse_random_projection(&rows, 4, 1).is_err());
    }
}
