//! Principal component reduction for small embedding matrices.
//!
//! Histories are short (tens of rows) while embeddings are wide (hundreds of
//! columns), so the decomposition works on the `n × n` Gram matrix of the
//! centred rows instead of the `d × d` covariance. The eigenvectors of the
//! Gram matrix scaled by the square roots of their eigenvalues are exactly
//! the principal component scores.

use nalgebra::{DMatrix, SymmetricEigen};
use persona_core::{Embedding, EngineError};

/// Eigenvalues at or below this fraction of the largest carry no direction.
const RELATIVE_EIGEN_FLOOR: f64 = 1e-12;

/// Which branch produced a reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionPath {
    /// One row: raw components truncated / zero-padded.
    SingleSample,
    /// Total variance below epsilon: raw components truncated / zero-padded.
    Degenerate,
    /// Principal component scores, zero-padded past the available rank.
    Decomposed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reduction {
    pub rows: Vec<Embedding>,
    pub path: ReductionPath,
}

/// First `target_dims` raw components, zero-padded if the vector is shorter.
pub fn truncate_pad(row: &[f32], target_dims: usize) -> Embedding {
    let mut out: Embedding = row.iter().take(target_dims).copied().collect();
    out.resize(target_dims, 0.0);
    out
}

/// Reduce `rows` to `target_dims` columns.
///
/// All rows must share one width; `context` names the matrix in the error.
pub fn reduce(
    rows: &[Embedding],
    target_dims: usize,
    variance_epsilon: f64,
    context: &str,
) -> Result<Reduction, EngineError> {
    let Some(first) = rows.first() else {
        return Ok(Reduction {
            rows: Vec::new(),
            path: ReductionPath::Decomposed,
        });
    };
    let width = first.len();
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(EngineError::dimension_mismatch(
                format!("{} row {}", context, i),
                width,
                row.len(),
            ));
        }
    }

    let passthrough = |path| Reduction {
        rows: rows.iter().map(|r| truncate_pad(r, target_dims)).collect(),
        path,
    };

    if rows.len() == 1 {
        return Ok(passthrough(ReductionPath::SingleSample));
    }

    let n = rows.len();
    let x = DMatrix::<f64>::from_fn(n, width, |i, j| rows[i][j] as f64);
    let mean = x.row_mean();
    let centred = DMatrix::<f64>::from_fn(n, width, |i, j| x[(i, j)] - mean[j]);

    // Population variance summed over columns.
    let total_variance = centred.norm_squared() / n as f64;
    if total_variance.is_nan() || total_variance < variance_epsilon {
        tracing::warn!(
            "Degenerate projection input in {} ({} rows, total variance {:.3e}); using raw components",
            context,
            n,
            total_variance
        );
        return Ok(passthrough(ReductionPath::Degenerate));
    }

    let gram = &centred * centred.transpose();
    let eigen = SymmetricEigen::new(gram);

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let components = target_dims.min(n).min(width);
    let largest = eigen.eigenvalues[order[0]].max(0.0);
    let mut scores = DMatrix::<f64>::zeros(n, target_dims);

    for (col, &idx) in order.iter().take(components).enumerate() {
        let lambda = eigen.eigenvalues[idx];
        if lambda <= 0.0 || lambda <= largest * RELATIVE_EIGEN_FLOOR {
            continue;
        }
        let mut u = eigen.eigenvectors.column(idx).clone_owned();
        // Deterministic sign: the largest-magnitude entry is positive.
        let pivot = u
            .iter()
            .fold(0.0f64, |m, &v| if v.abs() > m.abs() { v } else { m });
        if pivot < 0.0 {
            u.neg_mut();
        }
        scores.set_column(col, &(u * lambda.sqrt()));
    }

    Ok(Reduction {
        rows: scores
            .row_iter()
            .map(|r| r.iter().map(|&v| v as f32).collect())
            .collect(),
        path: ReductionPath::Decomposed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt()
    }

    #[test]
    fn test_single_row_truncates_and_pads() {
        let r = reduce(&[vec![1.0, 2.0]], 3, 1e-8, "t").unwrap();
        assert_eq!(r.path, ReductionPath::SingleSample);
        assert_eq!(r.rows, vec![vec![1.0, 2.0, 0.0]]);

        let r = reduce(&[vec![1.0, 2.0, 3.0, 4.0]], 3, 1e-8, "t").unwrap();
        assert_eq!(r.rows, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_identical_rows_are_degenerate() {
        let row = vec![0.5, -0.25, 0.75, 1.0];
        let r = reduce(&[row.clone(), row.clone(), row], 3, 1e-8, "t").unwrap();
        assert_eq!(r.path, ReductionPath::Degenerate);
        assert!(r.rows.iter().all(|x| x == &vec![0.5, -0.25, 0.75]));
    }

    #[test]
    fn test_two_rows_use_one_component() {
        let a = vec![0.0, 0.0, 0.0, 0.0];
        let b = vec![3.0, 4.0, 0.0, 0.0];
        let r = reduce(&[a, b], 3, 1e-8, "t").unwrap();
        assert_eq!(r.path, ReductionPath::Decomposed);
        assert_eq!(r.rows.len(), 2);
        for row in &r.rows {
            assert_eq!(row.len(), 3);
            assert!((row[0].abs() - 2.5).abs() < 1e-5);
            assert_eq!(row[1], 0.0);
            assert_eq!(row[2], 0.0);
        }
        assert!((r.rows[0][0] + r.rows[1][0]).abs() < 1e-5);
    }

    #[test]
    fn test_collinear_rows() {
        let rows: Vec<Embedding> = (0..4).map(|i| vec![i as f32; 3]).collect();
        let r = reduce(&rows, 2, 1e-8, "t").unwrap();
        let step = 3f32.sqrt();
        for i in 1..4 {
            let delta = (r.rows[i][0] - r.rows[i - 1][0]).abs();
            assert!((delta - step).abs() < 1e-4);
            assert!(r.rows[i][1].abs() < 1e-4);
        }
    }

    #[test]
    fn test_pairwise_distances_preserved_within_rank() {
        let rows = vec![
            vec![0.1, 0.9, -0.3, 0.2, 0.0],
            vec![-0.4, 0.2, 0.8, 0.1, 0.3],
            vec![0.7, -0.5, 0.1, -0.6, 0.2],
        ];
        let r = reduce(&rows, 3, 1e-8, "t").unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let before = dist(&rows[i], &rows[j]);
                let after = dist(&r.rows[i], &r.rows[j]);
                assert!((before - after).abs() < 1e-4, "{} vs {}", before, after);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let rows = vec![
            vec![0.3, 0.1, 0.0, 0.9],
            vec![0.2, -0.7, 0.4, 0.1],
            vec![-0.5, 0.3, 0.3, 0.3],
            vec![0.0, 0.0, 1.0, -0.2],
        ];
        let a = reduce(&rows, 3, 1e-8, "t").unwrap();
        let b = reduce(&rows, 3, 1e-8, "t").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_width_mismatch_is_error() {
        let err = reduce(&[vec![1.0, 2.0], vec![1.0]], 3, 1e-8, "history").unwrap_err();
        assert_eq!(err, EngineError::dimension_mismatch("history row 1", 2, 1));
    }

    #[test]
    fn test_scores_match_svd_of_centred_matrix() {
        let (n, d) = (5, 8);
        let rows: Vec<Embedding> = (0..n)
            .map(|i| (0..d).map(|j| ((i * 5 + j * 3) as f32 * 0.41).sin()).collect())
            .collect();
        let r = reduce(&rows, 3, 1e-8, "t").unwrap();
        assert_eq!(r.path, ReductionPath::Decomposed);

        let x = DMatrix::<f64>::from_fn(n, d, |i, j| rows[i][j] as f64);
        let mean = x.row_mean();
        let centred = DMatrix::<f64>::from_fn(n, d, |i, j| x[(i, j)] - mean[j]);
        let svd = centred.svd(true, false);
        let u = svd.u.unwrap();
        let mut by_sigma: Vec<usize> = (0..svd.singular_values.len()).collect();
        by_sigma.sort_by(|&a, &b| {
            svd.singular_values[b]
                .partial_cmp(&svd.singular_values[a])
                .unwrap()
        });

        for (col, &k) in by_sigma.iter().take(3).enumerate() {
            let sigma = svd.singular_values[k];
            for i in 0..n {
                let expected = (u[(i, k)] * sigma).abs();
                let got = (r.rows[i][col] as f64).abs();
                assert!((expected - got).abs() < 1e-4, "row {} col {}", i, col);
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let r = reduce(&[], 3, 1e-8, "t").unwrap();
        assert!(r.rows.is_empty());
    }
}
