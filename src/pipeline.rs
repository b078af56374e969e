//! SVD, projection, k-means and per-cluster reporting wired together.

use crate::cluster::{ClosestPoint, KMeans};
use crate::config::{DiscoveryParams, RunConfig};
use crate::decomposition::TruncatedSVD;
use crate::error::{DiscoveryError, Result};
use crate::loader::{load_labels, load_occurrences, PatternLabels};
use crate::progress::Progress;
use crate::sparse::SparseMatrix;
use crate::Matrix;
use std::sync::Arc;

/// The patterns reported for one cluster, farthest first.
#[derive(Clone, Debug)]
pub struct ClusterReport {
    pub index: usize,
    pub closest: Vec<ClosestPoint>,
}

#[derive(Clone, Debug)]
pub struct DiscoveryReport {
    pub requested_rank: usize,
    pub accepted_rank: usize,
    pub singular_values: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// Final assignment of every row.
    pub assignments: Vec<usize>,
    pub projection: Matrix,
    pub clusters: Vec<ClusterReport>,
}

/// Loads both input files named in `config`, then runs [`discover`].
pub fn run(config: &RunConfig, progress: Arc<dyn Progress>) -> Result<DiscoveryReport> {
    config.validate()?;
    let (occurrences_path, labels_path) = match (&config.occurrences_path, &config.labels_path) {
        (Some(occurrences), Some(labels)) => (occurrences, labels),
        _ => {
            return Err(DiscoveryError::InvalidParameter(
                "both input paths are required".into(),
            ))
        }
    };

    let labels = load_labels(labels_path, config.num_patterns)?;
    tracing::info!(labels = labels.len(), path = %labels_path.display(), "loaded pattern labels");

    let matrix = load_occurrences(occurrences_path, config.num_patterns, config.num_entity_pairs)?;
    tracing::info!(
        rows = matrix.nrows(),
        cols = matrix.ncols(),
        nnz = matrix.nnz(),
        "loaded co-occurrence matrix"
    );

    discover(&matrix, &labels, &config.params, progress)
}

/// Runs the numerical pipeline on an in-memory matrix.
pub fn discover(
    matrix: &SparseMatrix,
    labels: &PatternLabels,
    params: &DiscoveryParams,
    progress: Arc<dyn Progress>,
) -> Result<DiscoveryReport> {
    params.validate()?;

    let mut svd = TruncatedSVD::new(params.rank)
        .oversampling(params.oversampling)
        .max_error(params.max_error)
        .min_eigenvalue(params.min_eigenvalue)
        .rank_policy(params.rank_policy)
        .progress(progress.clone());
    svd.compute(matrix)?;
    let projection = svd.project_rows(matrix, params.weighting)?;

    let mut kmeans = KMeans::new(params.num_clusters)
        .max_iter(params.max_iterations)
        .tolerance(params.tolerance)
        .distance(params.distance.measure())
        .progress(progress);
    if let Some(seed) = params.seed {
        kmeans = kmeans.random_state(seed);
    }
    kmeans.fit(&projection)?;
    let assignments = kmeans.predict(&projection)?;

    let clusters = (0..params.num_clusters)
        .map(|index| {
            let closest = kmeans.closest_points(
                &projection,
                index,
                params.num_closest_points_per_cluster,
                labels,
            )?;
            Ok(ClusterReport { index, closest })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DiscoveryReport {
        requested_rank: params.rank,
        accepted_rank: projection.ncols(),
        singular_values: svd.singular_values().map(|s| s.to_vec()).unwrap_or_default(),
        iterations: kmeans.n_iter(),
        converged: kmeans.converged(),
        assignments,
        projection,
        clusters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use ndarray::array;

    fn labels_for(rows: usize) -> PatternLabels {
        (0..rows).map(|row| (row, format!("pattern-{row}"))).collect()
    }

    fn two_group_matrix() -> SparseMatrix {
        SparseMatrix::from_dense(&array![
            [3.0, 1.0, 0.0, 0.0],
            [3.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 2.0],
            [0.0, 0.0, 1.0, 2.0]
        ])
    }

    #[test]
    fn test_identical_rows_share_a_cluster() {
        let params = DiscoveryParams {
            rank: 2,
            num_clusters: 2,
            max_iterations: 20,
            num_closest_points_per_cluster: 4,
            ..DiscoveryParams::default()
        };

        for seed in 0..8 {
            let params = DiscoveryParams {
                seed: Some(seed),
                ..params.clone()
            };
            let report =
                discover(&two_group_matrix(), &labels_for(4), &params, Arc::new(SilentProgress))
                    .unwrap();

            assert_eq!(report.accepted_rank, 2);
            assert_eq!(report.projection.shape(), &[4, 2]);
            assert_eq!(report.assignments[0], report.assignments[1]);
            assert_eq!(report.assignments[2], report.assignments[3]);
            assert_ne!(report.assignments[0], report.assignments[2]);
        }
    }

    #[test]
    fn test_report_shape() {
        let params = DiscoveryParams {
            rank: 2,
            num_clusters: 2,
            num_closest_points_per_cluster: 3,
            seed: Some(1),
            ..DiscoveryParams::default()
        };
        let progress = Arc::new(SilentProgress);
        let report = discover(&two_group_matrix(), &labels_for(4), &params, progress).unwrap();

        assert_eq!(report.clusters.len(), 2);
        for (index, cluster) in report.clusters.iter().enumerate() {
            assert_eq!(cluster.index, index);
            assert_eq!(cluster.closest.len(), 3);
            for pair in cluster.closest.windows(2) {
                assert!(pair[0].distance >= pair[1].distance);
            }
            // the nearest pattern is printed last
            let nearest = cluster.closest.last().unwrap();
            assert_eq!(report.assignments[nearest.row], index);
        }
        assert_eq!(report.singular_values.len(), 2);
        assert!(report.singular_values[0] >= report.singular_values[1]);
    }

    #[test]
    fn test_missing_label_is_surfaced() {
        let params = DiscoveryParams {
            rank: 2,
            num_clusters: 2,
            num_closest_points_per_cluster: 4,
            seed: Some(0),
            ..DiscoveryParams::default()
        };
        let err = discover(&two_group_matrix(), &labels_for(3), &params, Arc::new(SilentProgress))
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::MissingLabel { row: 3 }));
    }

    #[test]
    fn test_invalid_params_rejected_before_work() {
        let params = DiscoveryParams {
            num_clusters: 0,
            ..DiscoveryParams::default()
        };
        let progress = Arc::new(SilentProgress);
        let result = discover(&two_group_matrix(), &labels_for(4), &params, progress);
        assert!(result.is_err());
    }
}
