use crate::decomposition::lanczos::{norm, LanczosState};
use crate::error::{DiscoveryError, Result};
use crate::progress::{Progress, ProgressEvent, TracingProgress};
use crate::sparse::SparseMatrix;
use crate::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What to do when verification keeps fewer vectors than the requested rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RankPolicy {
    /// Report the reduced rank and project into fewer columns.
    #[default]
    Warn,
    /// Fail with [`DiscoveryError::RankDeficient`].
    Strict,
}

/// Scaling applied to each projected coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Weighting {
    /// `sigma_i * <row, v_i>`
    #[default]
    SingularValue,
    /// `<row, v_i>`, an orthogonal projection.
    None,
}

/// A Ritz vector of `A^T A` together with how well it survived verification.
#[derive(Clone, Debug)]
pub struct EigenCandidate {
    /// Generation order, 0 being the largest Ritz value.
    pub index: usize,
    pub vector: Vector,
    pub ritz_value: f64,
    /// Rayleigh quotient of `vector` under `A^T A`.
    pub eigenvalue: f64,
    /// Cosine of the angle between `vector` and `A^T A vector`.
    pub cos_angle: f64,
}

impl EigenCandidate {
    pub fn is_accepted(&self, max_error: f64, min_eigenvalue: f64) -> bool {
        (1.0 - self.cos_angle).abs() < max_error && self.eigenvalue > min_eigenvalue
    }
}

/// An accepted right singular vector.
#[derive(Clone, Debug)]
pub struct SingularVector {
    /// 0 is the dominant direction.
    pub index: usize,
    pub vector: Vector,
    /// Singular value, the square root of the verified eigenvalue.
    pub weight: f64,
}

/// Truncated SVD of a sparse matrix via Lanczos iteration on `A^T A`.
///
/// The Krylov basis is grown `oversampling` vectors past `rank`, every Ritz
/// vector is checked against the Gram operator, and the first `rank`
/// candidates that pass are kept.
#[derive(Clone, Debug)]
pub struct TruncatedSVD {
    pub singular_vectors: Option<Vec<SingularVector>>,
    pub candidates: Option<Vec<EigenCandidate>>,
    rank: usize,
    oversampling: usize,
    max_error: f64,
    min_eigenvalue: f64,
    rank_policy: RankPolicy,
    progress: Arc<dyn Progress>,
}

impl TruncatedSVD {
    pub fn new(rank: usize) -> Self {
        Self {
            singular_vectors: None,
            candidates: None,
            rank,
            oversampling: 10,
            max_error: 0.05,
            min_eigenvalue: 0.0,
            rank_policy: RankPolicy::Warn,
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn oversampling(mut self, oversampling: usize) -> Self {
        self.oversampling = oversampling;
        self
    }

    pub fn max_error(mut self, max_error: f64) -> Self {
        self.max_error = max_error;
        self
    }

    pub fn min_eigenvalue(mut self, min_eigenvalue: f64) -> Self {
        self.min_eigenvalue = min_eigenvalue;
        self
    }

    pub fn rank_policy(mut self, rank_policy: RankPolicy) -> Self {
        self.rank_policy = rank_policy;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn compute(&mut self, a: &SparseMatrix) -> Result<()> {
        if a.nrows() == 0 || a.ncols() == 0 {
            return Err(DiscoveryError::InvalidParameter(
                "Input matrix must have at least one row and one column".to_string(),
            ));
        }
        if self.rank == 0 {
            return Err(DiscoveryError::InvalidParameter("rank must be > 0".to_string()));
        }
        let max_rank = a.nrows().min(a.ncols());
        if self.rank > max_rank {
            return Err(DiscoveryError::InvalidParameter(format!(
                "rank={} cannot be larger than min(num_rows, num_cols)={}",
                self.rank, max_rank
            )));
        }
        if !(self.max_error > 0.0) {
            return Err(DiscoveryError::InvalidParameter(format!(
                "max_error must be > 0, got {}",
                self.max_error
            )));
        }

        let basis_size = (self.rank + self.oversampling).min(a.ncols());
        let initial = Vector::from_elem(a.ncols(), 1.0 / (a.ncols() as f64).sqrt());
        let state = LanczosState::solve(a, initial, basis_size, self.progress.as_ref())?;

        let mut candidates = Vec::with_capacity(state.basis.len());
        for (index, (ritz_value, vector)) in state.ritz_pairs()?.into_iter().enumerate() {
            candidates.push(verify(a, index, ritz_value, vector)?);
        }

        let singular_vectors = self.select(&candidates)?;
        self.candidates = Some(candidates);
        self.singular_vectors = Some(singular_vectors);
        Ok(())
    }

    fn select(&self, candidates: &[EigenCandidate]) -> Result<Vec<SingularVector>> {
        let mut accepted: Vec<&EigenCandidate> = Vec::new();
        for candidate in candidates {
            if candidate.is_accepted(self.max_error, self.min_eigenvalue) {
                accepted.push(candidate);
            } else {
                self.progress.report(ProgressEvent::CandidateRejected {
                    index: candidate.index,
                    cos_angle: candidate.cos_angle,
                    eigenvalue: candidate.eigenvalue,
                });
            }
        }
        accepted.sort_by_key(|candidate| candidate.index);

        if accepted.is_empty() {
            return Err(DiscoveryError::NoSingularVectors {
                candidates: candidates.len(),
            });
        }
        if accepted.len() < self.rank {
            match self.rank_policy {
                RankPolicy::Strict => {
                    return Err(DiscoveryError::RankDeficient {
                        requested: self.rank,
                        accepted: accepted.len(),
                    });
                }
                RankPolicy::Warn => self.progress.report(ProgressEvent::RankReduced {
                    requested: self.rank,
                    accepted: accepted.len(),
                }),
            }
        }

        let singular_vectors = accepted
            .into_iter()
            .take(self.rank)
            .enumerate()
            .map(|(ordinal, candidate)| {
                let weight = candidate.eigenvalue.sqrt();
                self.progress.report(ProgressEvent::SingularValue {
                    ordinal,
                    value: weight,
                });
                SingularVector {
                    index: ordinal,
                    vector: candidate.vector.clone(),
                    weight,
                }
            })
            .collect();
        Ok(singular_vectors)
    }

    pub fn singular_values(&self) -> Option<Vector> {
        self.singular_vectors
            .as_ref()
            .map(|vectors| vectors.iter().map(|v| v.weight).collect())
    }

    /// Number of accepted directions, which may be below the requested rank.
    pub fn accepted_rank(&self) -> Option<usize> {
        self.singular_vectors.as_ref().map(Vec::len)
    }

    pub fn project_rows_onto_feature_space(&self, a: &SparseMatrix) -> Result<Matrix> {
        self.project_rows(a, Weighting::SingularValue)
    }

    /// Projects every row of `a` onto the accepted singular directions.
    pub fn project_rows(&self, a: &SparseMatrix, weighting: Weighting) -> Result<Matrix> {
        let singular_vectors = self
            .singular_vectors
            .as_ref()
            .ok_or(DiscoveryError::NotFitted("TruncatedSVD"))?;

        if let Some(first) = singular_vectors.first() {
            if a.ncols() != first.vector.len() {
                return Err(DiscoveryError::DimensionMismatch {
                    expected: first.vector.len(),
                    found: a.ncols(),
                });
            }
        }

        let mut projection = Matrix::zeros((a.nrows(), singular_vectors.len()));
        for row in 0..a.nrows() {
            for (column, singular_vector) in singular_vectors.iter().enumerate() {
                let scale = match weighting {
                    Weighting::SingularValue => singular_vector.weight,
                    Weighting::None => 1.0,
                };
                projection[[row, column]] = scale * a.row_dot(row, &singular_vector.vector)?;
            }
        }
        Ok(projection)
    }

    pub fn fit_transform(&mut self, a: &SparseMatrix) -> Result<Matrix> {
        self.compute(a)?;
        self.project_rows_onto_feature_space(a)
    }
}

fn verify(
    a: &SparseMatrix,
    index: usize,
    ritz_value: f64,
    vector: Vector,
) -> Result<EigenCandidate> {
    let image = a.times_squared(&vector)?;
    let image_norm = norm(&image);
    let vector_norm = norm(&vector);

    let (eigenvalue, cos_angle) = if image_norm > 0.0 && vector_norm > 0.0 {
        let dot = image.dot(&vector);
        (
            dot / (vector_norm * vector_norm),
            dot / (image_norm * vector_norm),
        )
    } else {
        (0.0, 0.0)
    };

    Ok(EigenCandidate {
        index,
        vector,
        ritz_value,
        eigenvalue,
        cos_angle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::testing::RecordingProgress;
    use ndarray::array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn outer(u: &Vector, v: &Vector) -> Matrix {
        let mut m = Matrix::zeros((u.len(), v.len()));
        for i in 0..u.len() {
            for j in 0..v.len() {
                m[[i, j]] = u[i] * v[j];
            }
        }
        m
    }

    #[test]
    fn test_truncated_svd_basic() {
        let a = SparseMatrix::from_dense(&array![
            [1.0, 2.0, 3.0],
            [4.0, 5.0, 6.0],
            [7.0, 8.0, 10.0],
            [10.0, 11.0, 12.0]
        ]);

        let mut svd = TruncatedSVD::new(2);
        let transformed = svd.fit_transform(&a).unwrap();

        assert_eq!(transformed.nrows(), 4);
        assert!(transformed.ncols() >= 1 && transformed.ncols() <= 2);
        assert!(svd.singular_vectors.is_some());
        assert!(svd.candidates.is_some());
        assert!(svd.singular_values().unwrap().iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_rank_one_direction_is_recovered() {
        let u = array![1.0, 2.0, 3.0, 0.5];
        let v = array![2.0, 0.0, 1.0, 1.0, 3.0];
        let a = SparseMatrix::from_dense(&outer(&u, &v));

        let mut svd = TruncatedSVD::new(1);
        svd.compute(&a).unwrap();

        let singular_vectors = svd.singular_vectors.as_ref().unwrap();
        assert_eq!(singular_vectors.len(), 1);
        let direction = &singular_vectors[0].vector;
        let cosine = direction.dot(&v).abs() / (norm(direction) * norm(&v));
        assert!(cosine > 0.99);

        let expected_sigma = norm(&u) * norm(&v);
        assert!((singular_vectors[0].weight - expected_sigma).abs() / expected_sigma < 1e-6);
    }

    #[test]
    fn test_truncated_svd_single_component() {
        let a = SparseMatrix::from_dense(&array![
            [1.0, 2.0, 3.0],
            [2.0, 4.0, 6.0],
            [3.0, 6.0, 9.0]
        ]);

        let mut svd = TruncatedSVD::new(1);
        let transformed = svd.fit_transform(&a).unwrap();

        assert_eq!(transformed.shape(), &[3, 1]);
        // sigma = |(1, 2, 3)|^2
        assert!((svd.singular_values().unwrap()[0] - 14.0).abs() < 1e-6);
    }

    #[test]
    fn test_accepted_vectors_satisfy_eigen_relation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let dense = Matrix::random_using((20, 8), Uniform::new(0.0, 1.0), &mut rng);
        let a = SparseMatrix::from_dense(&dense);

        let mut svd = TruncatedSVD::new(3);
        svd.compute(&a).unwrap();

        for singular_vector in svd.singular_vectors.as_ref().unwrap() {
            let image = a.times_squared(&singular_vector.vector).unwrap();
            let cosine = image.dot(&singular_vector.vector)
                / (norm(&image) * norm(&singular_vector.vector));
            assert!((1.0 - cosine).abs() < 0.05);
            let eigenvalue = singular_vector.weight * singular_vector.weight;
            assert!((norm(&image) - eigenvalue).abs() / eigenvalue < 0.05);
        }
    }

    #[test]
    fn test_singular_values_of_diagonal_matrix() {
        let a = SparseMatrix::from_dense(&array![
            [3.0, 0.0, 0.0],
            [0.0, 2.0, 0.0],
            [0.0, 0.0, 1.0],
            [0.0, 0.0, 0.0]
        ]);

        let mut svd = TruncatedSVD::new(3);
        svd.compute(&a).unwrap();

        let sigma = svd.singular_values().unwrap();
        assert_eq!(sigma.len(), 3);
        assert!((sigma[0] - 3.0).abs() < 1e-8);
        assert!((sigma[1] - 2.0).abs() < 1e-8);
        assert!((sigma[2] - 1.0).abs() < 1e-8);
    }

    #[test]
    fn test_full_rank_projection_preserves_distances() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let dense = Matrix::random_using((6, 4), Uniform::new(0.0, 1.0), &mut rng);
        let a = SparseMatrix::from_dense(&dense);

        let mut svd = TruncatedSVD::new(4);
        svd.compute(&a).unwrap();
        assert_eq!(svd.accepted_rank(), Some(4));
        let projected = svd.project_rows(&a, Weighting::None).unwrap();

        for i in 0..dense.nrows() {
            for j in 0..dense.nrows() {
                let original = (&dense.row(i) - &dense.row(j)).mapv(|x| x * x).sum().sqrt();
                let reduced = (&projected.row(i) - &projected.row(j)).mapv(|x| x * x).sum().sqrt();
                assert!((original - reduced).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_pruned_rank_warns_by_default() {
        let u = array![1.0, 2.0, 3.0, 0.5];
        let v = array![2.0, 0.0, 1.0, 1.0, 3.0];
        let a = SparseMatrix::from_dense(&outer(&u, &v));
        let progress = Arc::new(RecordingProgress::default());

        let mut svd = TruncatedSVD::new(2).progress(progress.clone());
        let projected = svd.fit_transform(&a).unwrap();

        assert_eq!(svd.accepted_rank(), Some(1));
        assert_eq!(projected.shape(), &[4, 1]);
        assert!(progress.events().contains(&ProgressEvent::RankReduced {
            requested: 2,
            accepted: 1
        }));
    }

    #[test]
    fn test_pruned_rank_fails_when_strict() {
        let u = array![1.0, 2.0, 3.0, 0.5];
        let v = array![2.0, 0.0, 1.0, 1.0, 3.0];
        let a = SparseMatrix::from_dense(&outer(&u, &v));

        let mut svd = TruncatedSVD::new(2).rank_policy(RankPolicy::Strict);
        assert!(matches!(
            svd.compute(&a),
            Err(DiscoveryError::RankDeficient { requested: 2, accepted: 1 })
        ));
        assert!(svd.singular_vectors.is_none());
    }

    #[test]
    fn test_no_accepted_candidates_fails() {
        let a = SparseMatrix::from_dense(&array![[3.0, 0.0], [0.0, 2.0]]);
        let progress = Arc::new(RecordingProgress::default());

        let mut svd = TruncatedSVD::new(1)
            .min_eigenvalue(1e6)
            .progress(progress.clone());
        assert!(matches!(
            svd.compute(&a),
            Err(DiscoveryError::NoSingularVectors { candidates: 2 })
        ));
        assert!(svd.singular_vectors.is_none());

        let rejected = progress
            .events()
            .into_iter()
            .filter(|event| matches!(event, ProgressEvent::CandidateRejected { .. }))
            .count();
        assert_eq!(rejected, 2);
    }

    #[test]
    fn test_min_eigenvalue_rejects_small_candidates() {
        let a = SparseMatrix::from_dense(&array![[3.0, 0.0], [0.0, 2.0]]);
        let progress = Arc::new(RecordingProgress::default());

        let mut svd = TruncatedSVD::new(1)
            .min_eigenvalue(5.0)
            .progress(progress.clone());
        svd.compute(&a).unwrap();

        let sigma = svd.singular_values().unwrap();
        assert_eq!(sigma.len(), 1);
        assert!((sigma[0] - 3.0).abs() < 1e-6);

        let rejected: Vec<usize> = progress
            .events()
            .into_iter()
            .filter_map(|event| match event {
                ProgressEvent::CandidateRejected { index, eigenvalue, .. } => {
                    assert!((eigenvalue - 4.0).abs() < 1e-6);
                    Some(index)
                }
                _ => None,
            })
            .collect();
        assert_eq!(rejected, vec![1]);

        let candidates = svd.candidates.as_ref().unwrap();
        assert!(candidates[0].is_accepted(0.05, 5.0));
        assert!(!candidates[1].is_accepted(0.05, 5.0));
    }

    #[test]
    fn test_truncated_svd_invalid_rank() {
        let a = SparseMatrix::from_dense(&array![[1.0, 2.0], [3.0, 4.0]]);
        assert!(TruncatedSVD::new(5).compute(&a).is_err());
        assert!(TruncatedSVD::new(0).compute(&a).is_err());
    }

    #[test]
    fn test_zero_matrix_fails() {
        let a = SparseMatrix::from_dense(&Matrix::zeros((3, 3)));
        assert!(TruncatedSVD::new(1).compute(&a).is_err());
    }

    #[test]
    fn test_truncated_svd_transform_without_fit() {
        let a = SparseMatrix::from_dense(&array![[1.0, 2.0], [3.0, 4.0]]);
        let svd = TruncatedSVD::new(1);
        assert!(matches!(
            svd.project_rows_onto_feature_space(&a),
            Err(DiscoveryError::NotFitted(_))
        ));
    }

    #[test]
    fn test_truncated_svd_dimension_mismatch() {
        let train = SparseMatrix::from_dense(&array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let test = SparseMatrix::from_dense(&array![[1.0, 2.0], [3.0, 4.0]]);

        let mut svd = TruncatedSVD::new(1);
        svd.compute(&train).unwrap();
        assert!(svd.project_rows_onto_feature_space(&test).is_err());
    }
}
