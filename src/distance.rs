//! Distance measures used by the clustering stage.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::DiscoveryError;

/// A distance between two vectors of equal length.
///
/// `distance_with_length_squared` lets callers hoist `|centroid|^2` out of
/// the per-row loop. Measures that cannot use it fall back to `distance`.
pub trait DistanceMeasure: fmt::Debug + Send + Sync {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64;

    fn distance_with_length_squared(
        &self,
        _centroid_length_squared: f64,
        centroid: ArrayView1<f64>,
        v: ArrayView1<f64>,
    ) -> f64 {
        self.distance(centroid, v)
    }

    fn name(&self) -> &'static str;
}

/// `1 - cos(a, b)`. A zero-length vector is treated as orthogonal to everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct CosineDistance;

impl CosineDistance {
    fn from_parts(dot: f64, length_squared_a: f64, length_squared_b: f64) -> f64 {
        let denominator = (length_squared_a * length_squared_b).sqrt();
        if denominator == 0.0 {
            return 1.0;
        }
        // rounding can push |cos| a hair past 1
        let cosine = (dot / denominator).clamp(-1.0, 1.0);
        1.0 - cosine
    }
}

impl DistanceMeasure for CosineDistance {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        Self::from_parts(a.dot(&b), a.dot(&a), b.dot(&b))
    }

    fn distance_with_length_squared(
        &self,
        centroid_length_squared: f64,
        centroid: ArrayView1<f64>,
        v: ArrayView1<f64>,
    ) -> f64 {
        Self::from_parts(centroid.dot(&v), centroid_length_squared, v.dot(&v))
    }

    fn name(&self) -> &'static str {
        "cosine"
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SquaredEuclideanDistance;

impl DistanceMeasure for SquaredEuclideanDistance {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum()
    }

    fn distance_with_length_squared(
        &self,
        centroid_length_squared: f64,
        centroid: ArrayView1<f64>,
        v: ArrayView1<f64>,
    ) -> f64 {
        let expanded = centroid_length_squared - 2.0 * centroid.dot(&v) + v.dot(&v);
        expanded.max(0.0)
    }

    fn name(&self) -> &'static str {
        "squared-euclidean"
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EuclideanDistance;

impl DistanceMeasure for EuclideanDistance {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        SquaredEuclideanDistance.distance(a, b).sqrt()
    }

    fn distance_with_length_squared(
        &self,
        centroid_length_squared: f64,
        centroid: ArrayView1<f64>,
        v: ArrayView1<f64>,
    ) -> f64 {
        SquaredEuclideanDistance
            .distance_with_length_squared(centroid_length_squared, centroid, v)
            .sqrt()
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// L1 distance. Has no expanded form, so the accelerated path is the plain one.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManhattanDistance;

impl DistanceMeasure for ManhattanDistance {
    fn distance(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
    }

    fn name(&self) -> &'static str {
        "manhattan"
    }
}

/// Name-based selection of a built-in measure, for configuration and the CLI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum DistanceKind {
    #[default]
    Cosine,
    Euclidean,
    SquaredEuclidean,
    Manhattan,
}

impl DistanceKind {
    pub fn measure(self) -> Arc<dyn DistanceMeasure> {
        match self {
            DistanceKind::Cosine => Arc::new(CosineDistance),
            DistanceKind::Euclidean => Arc::new(EuclideanDistance),
            DistanceKind::SquaredEuclidean => Arc::new(SquaredEuclideanDistance),
            DistanceKind::Manhattan => Arc::new(ManhattanDistance),
        }
    }
}

impl fmt::Display for DistanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.measure().name())
    }
}

impl FromStr for DistanceKind {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "squared-euclidean" | "squared_euclidean" => Ok(Self::SquaredEuclidean),
            "manhattan" => Ok(Self::Manhattan),
            other => Err(DiscoveryError::InvalidParameter(format!(
                "unsupported distance measure '{other}'"
            ))),
        }
    }
}
