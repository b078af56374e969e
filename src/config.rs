//! Run parameters. Defaults fit the R30 entity-pair/pattern tuple data set.

use crate::decomposition::{RankPolicy, Weighting};
use crate::distance::DistanceKind;
use crate::error::{DiscoveryError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Hyperparameters of the decomposition, clustering and reporting stages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryParams {
    pub rank: usize,
    /// Extra Lanczos vectors computed beyond `rank`.
    pub oversampling: usize,
    /// Largest accepted `|1 - cos|` between a candidate and its image.
    pub max_error: f64,
    pub min_eigenvalue: f64,
    pub rank_policy: RankPolicy,
    pub weighting: Weighting,
    pub distance: DistanceKind,
    pub num_clusters: usize,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub num_closest_points_per_cluster: usize,
    pub seed: Option<u64>,
}

impl Default for DiscoveryParams {
    fn default() -> Self {
        Self {
            rank: 50,
            oversampling: 10,
            max_error: 0.05,
            min_eigenvalue: 0.0,
            rank_policy: RankPolicy::Warn,
            weighting: Weighting::SingularValue,
            distance: DistanceKind::Cosine,
            num_clusters: 10,
            max_iterations: 100,
            tolerance: 1e-5,
            num_closest_points_per_cluster: 20,
            seed: None,
        }
    }
}

impl DiscoveryParams {
    pub fn validate(&self) -> Result<()> {
        if self.rank == 0 {
            return Err(DiscoveryError::InvalidParameter("rank must be > 0".into()));
        }
        if self.num_clusters == 0 {
            return Err(DiscoveryError::InvalidParameter("num_clusters must be > 0".into()));
        }
        if self.max_iterations == 0 {
            return Err(DiscoveryError::InvalidParameter("max_iterations must be > 0".into()));
        }
        if !(self.max_error > 0.0) {
            return Err(DiscoveryError::InvalidParameter("max_error must be > 0".into()));
        }
        if !(self.tolerance > 0.0) {
            return Err(DiscoveryError::InvalidParameter("tolerance must be > 0".into()));
        }
        Ok(())
    }
}

/// Everything a run needs: input files, matrix dimensions and [`DiscoveryParams`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub occurrences_path: Option<PathBuf>,
    pub labels_path: Option<PathBuf>,
    pub num_entity_pairs: usize,
    pub num_patterns: usize,
    #[serde(flatten)]
    pub params: DiscoveryParams,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            occurrences_path: None,
            labels_path: None,
            num_entity_pairs: 7853,
            num_patterns: 58702,
            params: DiscoveryParams::default(),
        }
    }
}

impl RunConfig {
    /// Reads a JSON config. Absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| DiscoveryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.occurrences_path.is_none() {
            return Err(DiscoveryError::InvalidParameter(
                "occurrences_path is required".into(),
            ));
        }
        if self.labels_path.is_none() {
            return Err(DiscoveryError::InvalidParameter("labels_path is required".into()));
        }
        if self.num_entity_pairs == 0 || self.num_patterns == 0 {
            return Err(DiscoveryError::InvalidParameter(
                "num_entity_pairs and num_patterns must be > 0".into(),
            ));
        }
        self.params.validate()
    }
}
