// Command-line argument parsing for the relation-discovery binary.

use clap::Parser;
use relation_discovery::{DistanceKind, RankPolicy, Result, RunConfig, Weighting};
use std::path::PathBuf;

/// Discover latent relations by clustering patterns in a truncated SVD embedding.
#[derive(Parser, Debug)]
#[command(name = "relation-discovery")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON file with run parameters; flags below override it
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Entity-pair/pattern co-occurrence table
    #[arg(long = "occurrences")]
    pub occurrences: Option<PathBuf>,

    /// Pattern label table
    #[arg(long = "labels")]
    pub labels: Option<PathBuf>,

    #[arg(long = "num-entity-pairs")]
    pub num_entity_pairs: Option<usize>,

    #[arg(long = "num-patterns")]
    pub num_patterns: Option<usize>,

    /// Target rank of the truncated SVD
    #[arg(short = 'r', long = "rank")]
    pub rank: Option<usize>,

    #[arg(long = "oversampling")]
    pub oversampling: Option<usize>,

    #[arg(long = "max-error")]
    pub max_error: Option<f64>,

    /// Smallest eigenvalue a verified candidate may have
    #[arg(long = "min-eigenvalue")]
    pub min_eigenvalue: Option<f64>,

    #[arg(long = "rank-policy", value_enum)]
    pub rank_policy: Option<RankPolicy>,

    #[arg(long = "weighting", value_enum)]
    pub weighting: Option<Weighting>,

    #[arg(short = 'd', long = "distance", value_enum)]
    pub distance: Option<DistanceKind>,

    /// Number of clusters (k)
    #[arg(short = 'k', long = "clusters")]
    pub num_clusters: Option<usize>,

    #[arg(long = "max-iterations")]
    pub max_iterations: Option<usize>,

    #[arg(long = "tolerance")]
    pub tolerance: Option<f64>,

    /// Patterns printed per cluster
    #[arg(short = 'n', long = "closest")]
    pub num_closest: Option<usize>,

    /// Seed for centroid initialisation
    #[arg(long = "seed")]
    pub seed: Option<u64>,
}

impl Cli {
    pub fn into_config(self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };

        if self.occurrences.is_some() {
            config.occurrences_path = self.occurrences;
        }
        if self.labels.is_some() {
            config.labels_path = self.labels;
        }
        if let Some(value) = self.num_entity_pairs {
            config.num_entity_pairs = value;
        }
        if let Some(value) = self.num_patterns {
            config.num_patterns = value;
        }

        let params = &mut config.params;
        if let Some(value) = self.rank {
            params.rank = value;
        }
        if let Some(value) = self.oversampling {
            params.oversampling = value;
        }
        if let Some(value) = self.max_error {
            params.max_error = value;
        }
        if let Some(value) = self.min_eigenvalue {
            params.min_eigenvalue = value;
        }
        if let Some(value) = self.rank_policy {
            params.rank_policy = value;
        }
        if let Some(value) = self.weighting {
            params.weighting = value;
        }
        if let Some(value) = self.distance {
            params.distance = value;
        }
        if let Some(value) = self.num_clusters {
            params.num_clusters = value;
        }
        if let Some(value) = self.max_iterations {
            params.max_iterations = value;
        }
        if let Some(value) = self.tolerance {
            params.tolerance = value;
        }
        if let Some(value) = self.num_closest {
            params.num_closest_points_per_cluster = value;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }

        config.validate()?;
        Ok(config)
    }
}
