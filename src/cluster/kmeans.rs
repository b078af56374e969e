use crate::cluster::top_k::{ClosestPoint, TopKReporter};
use crate::distance::{CosineDistance, DistanceMeasure};
use crate::error::{DiscoveryError, Result};
use crate::loader::PatternLabels;
use crate::progress::{Progress, ProgressEvent, TracingProgress};
use crate::{Matrix, Vector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

/// A cluster representative with its squared length cached for distance evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct Centroid {
    pub index: usize,
    pub vector: Vector,
    length_squared: f64,
}

impl Centroid {
    pub fn new(index: usize, vector: Vector) -> Self {
        let length_squared = vector.dot(&vector);
        Self {
            index,
            vector,
            length_squared,
        }
    }

    pub fn length_squared(&self) -> f64 {
        self.length_squared
    }
}

/// Outcome of one assign/update round.
struct LloydStep {
    centroids: Vec<Centroid>,
    assignments: Vec<usize>,
    inertia: f64,
    average_change: f64,
}

/// Lloyd's k-means over the rows of a dense matrix with a pluggable distance.
///
/// Initial centroids are `n_clusters` rows drawn uniformly without
/// replacement. A cluster that receives no rows keeps its previous centroid.
/// Iteration stops once the mean centroid shift drops below `tolerance` or
/// after `max_iter` rounds.
#[derive(Clone, Debug)]
pub struct KMeans {
    pub cluster_centers: Option<Vec<Centroid>>,
    pub labels: Option<Vec<usize>>,
    /// Sum of row-to-centroid distances measured in each assign step.
    pub inertia_history: Option<Vec<f64>>,
    n_iter: usize,
    converged: bool,
    n_clusters: usize,
    max_iter: usize,
    tolerance: f64,
    random_state: Option<u64>,
    distance: Arc<dyn DistanceMeasure>,
    progress: Arc<dyn Progress>,
}

impl KMeans {
    pub fn new(n_clusters: usize) -> Self {
        Self {
            cluster_centers: None,
            labels: None,
            inertia_history: None,
            n_iter: 0,
            converged: false,
            n_clusters,
            max_iter: 100,
            tolerance: 1e-5,
            random_state: None,
            distance: Arc::new(CosineDistance),
            progress: Arc::new(TracingProgress),
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.random_state = Some(random_state);
        self
    }

    pub fn distance(mut self, distance: Arc<dyn DistanceMeasure>) -> Self {
        self.distance = distance;
        self
    }

    pub fn progress(mut self, progress: Arc<dyn Progress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Iterations run by the last `fit`.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(DiscoveryError::InvalidParameter(
                "Input matrix must have at least one row and one column".to_string(),
            ));
        }
        if self.n_clusters == 0 {
            return Err(DiscoveryError::InvalidParameter(
                "n_clusters must be > 0".to_string(),
            ));
        }
        if x.nrows() < self.n_clusters {
            return Err(DiscoveryError::InvalidParameter(format!(
                "num_rows={} should be >= n_clusters={}",
                x.nrows(),
                self.n_clusters
            )));
        }
        if self.max_iter == 0 {
            return Err(DiscoveryError::InvalidParameter(
                "max_iter must be > 0".to_string(),
            ));
        }

        let mut rng = match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut centroids = self.initialize_centroids(x, &mut rng);
        self.progress.report(ProgressEvent::CentroidsInitialised {
            clusters: self.n_clusters,
        });

        let mut labels = Vec::new();
        let mut inertia_history = Vec::with_capacity(self.max_iter);
        let mut converged = false;
        let mut iteration = 0;

        while iteration < self.max_iter {
            iteration += 1;
            let step = self.lloyd_step(x, &centroids, iteration);
            self.progress.report(ProgressEvent::Iteration {
                iteration,
                average_change: step.average_change,
                inertia: step.inertia,
            });

            centroids = step.centroids;
            labels = step.assignments;
            inertia_history.push(step.inertia);

            if step.average_change < self.tolerance {
                converged = true;
                break;
            }
        }

        self.progress.report(ProgressEvent::ClusteringFinished {
            iterations: iteration,
            converged,
        });

        self.cluster_centers = Some(centroids);
        self.labels = Some(labels);
        self.inertia_history = Some(inertia_history);
        self.n_iter = iteration;
        self.converged = converged;

        Ok(())
    }

    pub fn fit_predict(&mut self, x: &Matrix) -> Result<Vec<usize>> {
        self.fit(x)?;
        self.predict(x)
    }

    /// Index of the nearest centroid for every row of `x`.
    pub fn predict(&self, x: &Matrix) -> Result<Vec<usize>> {
        let centroids = self.fitted_centroids(x)?;
        Ok(x
            .outer_iter()
            .map(|row| self.nearest(centroids, row).0)
            .collect())
    }

    /// The `how_many` rows of `x` nearest centroid `centroid_index`, farthest first.
    pub fn closest_rows(
        &self,
        x: &Matrix,
        centroid_index: usize,
        how_many: usize,
    ) -> Result<Vec<(usize, f64)>> {
        let centroid = self.centroid(x, centroid_index)?;
        let reporter = TopKReporter::new(x, self.distance.as_ref());
        Ok(reporter.closest_rows(centroid.vector.view(), how_many))
    }

    pub fn closest_points(
        &self,
        x: &Matrix,
        centroid_index: usize,
        how_many: usize,
        labels: &PatternLabels,
    ) -> Result<Vec<ClosestPoint>> {
        let centroid = self.centroid(x, centroid_index)?;
        let reporter = TopKReporter::new(x, self.distance.as_ref());
        reporter.closest_points(centroid.vector.view(), how_many, labels)
    }

    fn centroid(&self, x: &Matrix, centroid_index: usize) -> Result<&Centroid> {
        self.fitted_centroids(x)?
            .get(centroid_index)
            .ok_or(DiscoveryError::InvalidCentroid {
                index: centroid_index,
                clusters: self.n_clusters,
            })
    }

    fn fitted_centroids(&self, x: &Matrix) -> Result<&[Centroid]> {
        let centroids = self
            .cluster_centers
            .as_ref()
            .ok_or(DiscoveryError::NotFitted("KMeans"))?;

        if let Some(first) = centroids.first() {
            if x.ncols() != first.vector.len() {
                return Err(DiscoveryError::DimensionMismatch {
                    expected: first.vector.len(),
                    found: x.ncols(),
                });
            }
        }
        Ok(centroids)
    }

    /// Reservoir sampling over the row stream.
    fn initialize_centroids(&self, x: &Matrix, rng: &mut ChaCha8Rng) -> Vec<Centroid> {
        let mut reservoir: Vec<usize> = (0..self.n_clusters).collect();
        for row in self.n_clusters..x.nrows() {
            let slot = rng.gen_range(0..=row);
            if slot < self.n_clusters {
                reservoir[slot] = row;
            }
        }

        reservoir
            .into_iter()
            .enumerate()
            .map(|(index, row)| Centroid::new(index, x.row(row).to_owned()))
            .collect()
    }

    fn nearest(&self, centroids: &[Centroid], row: ndarray::ArrayView1<f64>) -> (usize, f64) {
        let mut nearest = 0;
        let mut closest = f64::INFINITY;
        for (n, centroid) in centroids.iter().enumerate() {
            let distance = self.distance.distance_with_length_squared(
                centroid.length_squared,
                centroid.vector.view(),
                row,
            );
            if distance < closest {
                closest = distance;
                nearest = n;
            }
        }
        (nearest, closest)
    }

    fn lloyd_step(&self, x: &Matrix, centroids: &[Centroid], iteration: usize) -> LloydStep {
        let k = centroids.len();
        let mut sums = vec![Vector::zeros(x.ncols()); k];
        let mut counts = vec![0usize; k];
        let mut assignments = Vec::with_capacity(x.nrows());
        let mut inertia = 0.0;

        for row in x.outer_iter() {
            let (nearest, distance) = self.nearest(centroids, row);
            if distance.is_finite() {
                inertia += distance;
            }
            sums[nearest] += &row;
            counts[nearest] += 1;
            assignments.push(nearest);
        }

        let mut next = Vec::with_capacity(k);
        let mut total_change = 0.0;
        for (n, (sum, count)) in sums.into_iter().zip(counts).enumerate() {
            let centroid = if count == 0 {
                self.progress.report(ProgressEvent::EmptyCluster {
                    iteration,
                    cluster: n,
                });
                centroids[n].clone()
            } else {
                Centroid::new(n, sum / count as f64)
            };
            let shift = &centroids[n].vector - &centroid.vector;
            total_change += shift.dot(&shift).sqrt();
            next.push(centroid);
        }

        LloydStep {
            centroids: next,
            assignments,
            inertia,
            average_change: total_change / k as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::{EuclideanDistance, SquaredEuclideanDistance};
    use crate::progress::testing::RecordingProgress;
    use ndarray::array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use std::collections::HashSet;

    #[test]
    fn test_kmeans_basic() {
        let x = array![
            [1.0, 1.0],
            [1.5, 2.0],
            [3.0, 4.0],
            [5.0, 7.0],
            [3.5, 5.0],
            [4.5, 5.0],
            [3.5, 4.5]
        ];

        let mut kmeans = KMeans::new(2)
            .distance(Arc::new(EuclideanDistance))
            .random_state(42);
        kmeans.fit(&x).unwrap();

        let labels = kmeans.labels.as_ref().unwrap();
        assert_eq!(labels.len(), x.nrows());
        assert_eq!(kmeans.cluster_centers.as_ref().unwrap().len(), 2);
        assert!(kmeans.n_iter() >= 1 && kmeans.n_iter() <= 100);
    }

    #[test]
    fn test_kmeans_separates_obvious_groups() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.0],
            [0.0, 0.1],
            [10.0, 10.0],
            [10.1, 10.0],
            [10.0, 10.1]
        ];

        for seed in 0..10 {
            let mut kmeans = KMeans::new(2)
                .distance(Arc::new(SquaredEuclideanDistance))
                .random_state(seed);
            let labels = kmeans.fit_predict(&x).unwrap();
            assert_eq!(labels[0], labels[1]);
            assert_eq!(labels[0], labels[2]);
            assert_eq!(labels[3], labels[4]);
            assert_eq!(labels[3], labels[5]);
            assert_ne!(labels[0], labels[3]);
            assert!(kmeans.converged());
        }
    }

    #[test]
    fn test_inertia_is_non_increasing() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let x = Matrix::random_using((200, 3), Uniform::new(-5.0, 5.0), &mut rng);

        let mut kmeans = KMeans::new(6)
            .distance(Arc::new(SquaredEuclideanDistance))
            .max_iter(50)
            .random_state(17);
        kmeans.fit(&x).unwrap();

        let history = kmeans.inertia_history.as_ref().unwrap();
        assert_eq!(history.len(), kmeans.n_iter());
        for pair in history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-7, "{} > {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn test_empty_cluster_keeps_previous_centroid() {
        let x = array![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let progress = Arc::new(RecordingProgress::default());
        let kmeans = KMeans::new(2)
            .distance(Arc::new(EuclideanDistance))
            .progress(progress.clone());
        let centroids = vec![
            Centroid::new(0, array![0.0, 0.0]),
            Centroid::new(1, array![100.0, 100.0]),
        ];

        let step = kmeans.lloyd_step(&x, &centroids, 1);

        assert_eq!(step.centroids.len(), 2);
        assert_eq!(step.centroids[1], centroids[1]);
        assert!(step.centroids[0].vector.iter().all(|v| v.is_finite()));
        assert!((step.centroids[0].vector[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(step.assignments, vec![0, 0, 0]);
        assert!(progress.events().contains(&ProgressEvent::EmptyCluster {
            iteration: 1,
            cluster: 1
        }));
    }

    #[test]
    fn test_initial_centroids_are_distinct_rows() {
        let x = Matrix::from_shape_fn((30, 2), |(i, j)| (i * 2 + j) as f64);
        let kmeans = KMeans::new(5);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let centroids = kmeans.initialize_centroids(&x, &mut rng);

        assert_eq!(centroids.len(), 5);
        let rows: HashSet<usize> = centroids
            .iter()
            .map(|c| (c.vector[0] / 2.0) as usize)
            .collect();
        assert_eq!(rows.len(), 5);
        for (index, centroid) in centroids.iter().enumerate() {
            assert_eq!(centroid.index, index);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let x = Matrix::random_using((60, 4), Uniform::new(0.0, 1.0), &mut rng);

        let mut first = KMeans::new(4).random_state(99);
        let mut second = KMeans::new(4).random_state(99);
        first.fit(&x).unwrap();
        second.fit(&x).unwrap();
        assert_eq!(first.cluster_centers, second.cluster_centers);
        assert_eq!(first.labels, second.labels);
    }

    #[test]
    fn test_max_iter_bounds_iterations() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let x = Matrix::random_using((100, 3), Uniform::new(0.0, 1.0), &mut rng);
        let mut kmeans = KMeans::new(8).max_iter(1).random_state(4);
        kmeans.fit(&x).unwrap();
        assert_eq!(kmeans.n_iter(), 1);
        assert_eq!(kmeans.cluster_centers.as_ref().unwrap().len(), 8);
    }

    #[test]
    fn test_closest_rows_for_centroid() {
        let x = array![[1.0, 0.0], [0.9, 0.1], [0.0, 1.0], [0.1, 0.9]];
        let mut kmeans = KMeans::new(2).random_state(3);
        kmeans.fit(&x).unwrap();

        let closest = kmeans.closest_rows(&x, 0, 2).unwrap();
        assert_eq!(closest.len(), 2);
        assert!(closest[0].1 >= closest[1].1);
        assert!(matches!(
            kmeans.closest_rows(&x, 2, 2),
            Err(DiscoveryError::InvalidCentroid { index: 2, clusters: 2 })
        ));
    }

    #[test]
    fn test_kmeans_invalid_clusters() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        assert!(KMeans::new(0).fit(&x).is_err());
    }

    #[test]
    fn test_kmeans_insufficient_samples() {
        let x = array![[1.0, 2.0]];
        let mut kmeans = KMeans::new(2);
        assert!(kmeans.fit(&x).is_err());
    }

    #[test]
    fn test_kmeans_predict_without_fit() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let kmeans = KMeans::new(2);
        assert!(matches!(kmeans.predict(&x), Err(DiscoveryError::NotFitted(_))));
    }

    #[test]
    fn test_kmeans_dimension_mismatch() {
        let x_train = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let x_test = array![[1.0, 2.0], [3.0, 4.0]];

        let mut kmeans = KMeans::new(2).random_state(0);
        kmeans.fit(&x_train).unwrap();
        assert!(kmeans.predict(&x_test).is_err());
    }
}
