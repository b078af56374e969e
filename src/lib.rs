//! Latent relation discovery between textual patterns and entity pairs.
//!
//! A sparse pattern × entity-pair co-occurrence matrix is reduced to a dense
//! low-rank embedding with a Lanczos-based truncated SVD, the embedded rows
//! are grouped with k-means, and the patterns nearest each centroid are
//! reported as the members of a discovered relation.

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod cluster;
pub mod config;
pub mod decomposition;
pub mod distance;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod progress;
pub mod sparse;

pub use cluster::{BoundedHeap, Centroid, ClosestPoint, KMeans, TopKReporter};
pub use config::{DiscoveryParams, RunConfig};
pub use decomposition::{EigenCandidate, RankPolicy, SingularVector, TruncatedSVD, Weighting};
pub use distance::{
    CosineDistance, DistanceKind, DistanceMeasure, EuclideanDistance, ManhattanDistance,
    SquaredEuclideanDistance,
};
pub use error::{DiscoveryError, Result};
pub use loader::PatternLabels;
pub use pipeline::{discover, run, ClusterReport, DiscoveryReport};
pub use progress::{Progress, ProgressEvent, SilentProgress, TracingProgress};
pub use sparse::{SparseMatrix, SparseMatrixBuilder};

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;
