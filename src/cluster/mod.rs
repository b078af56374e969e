//! Clustering of the projected rows and nearest-row reporting.
//!
//! - `KMeans`: Lloyd's algorithm with a pluggable [`DistanceMeasure`](crate::DistanceMeasure)
//! - `TopKReporter`: the rows closest to a point, kept in a bounded max-heap
//!
//! # Examples
//!
//! ```rust
//! use relation_discovery::{KMeans, PatternLabels, SquaredEuclideanDistance};
//! use ndarray::array;
//! use std::sync::Arc;
//!
//! let x = array![
//!     [1.0, 1.0],
//!     [1.5, 2.0],
//!     [8.0, 8.0],
//!     [8.5, 9.0]
//! ];
//! let labels: PatternLabels = ["a", "b", "c", "d"]
//!     .iter()
//!     .enumerate()
//!     .map(|(row, label)| (row, label.to_string()))
//!     .collect();
//!
//! let mut kmeans = KMeans::new(2)
//!     .distance(Arc::new(SquaredEuclideanDistance))
//!     .max_iter(20)
//!     .random_state(7);
//! kmeans.fit(&x).unwrap();
//!
//! for point in kmeans.closest_points(&x, 0, 2, &labels).unwrap() {
//!     println!("\t{}", point);
//! }
//! ```

mod kmeans;
mod top_k;

pub use kmeans::{Centroid, KMeans};
pub use top_k::{BoundedHeap, ClosestPoint, TopKReporter};
