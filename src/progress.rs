//! Progress reporting handed to each component instead of a global logger.

use std::fmt;

/// Milestones emitted by the decomposition and clustering stages.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    LanczosStarted { basis_size: usize, num_cols: usize },
    LanczosStep { step: usize, alpha: f64, beta: f64 },
    /// The Krylov space stopped growing before the requested basis size.
    LanczosBreakdown { step: usize, beta: f64 },
    CandidateRejected { index: usize, cos_angle: f64, eigenvalue: f64 },
    SingularValue { ordinal: usize, value: f64 },
    RankReduced { requested: usize, accepted: usize },
    CentroidsInitialised { clusters: usize },
    Iteration { iteration: usize, average_change: f64, inertia: f64 },
    EmptyCluster { iteration: usize, cluster: usize },
    ClusteringFinished { iterations: usize, converged: bool },
}

pub trait Progress: fmt::Debug + Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Forwards every event to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingProgress;

impl Progress for TracingProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::LanczosStarted { basis_size, num_cols } => {
                tracing::info!(basis_size, num_cols, "starting Lanczos iteration");
            }
            ProgressEvent::LanczosStep { step, alpha, beta } => {
                tracing::debug!(step, alpha, beta, "Lanczos step");
            }
            ProgressEvent::LanczosBreakdown { step, beta } => {
                tracing::info!(step, beta, "Krylov subspace exhausted, stopping early");
            }
            ProgressEvent::CandidateRejected { index, cos_angle, eigenvalue } => {
                tracing::debug!(index, cos_angle, eigenvalue, "rejected eigen candidate");
            }
            ProgressEvent::SingularValue { ordinal, value } => {
                tracing::info!("Eigenvalue {}: {}", ordinal, value);
            }
            ProgressEvent::RankReduced { requested, accepted } => {
                tracing::warn!(
                    requested,
                    accepted,
                    "verification pruned candidates, projecting into fewer dimensions"
                );
            }
            ProgressEvent::CentroidsInitialised { clusters } => {
                tracing::info!("Picked {} initial centroids", clusters);
            }
            ProgressEvent::Iteration { iteration, average_change, inertia } => {
                tracing::info!(average_change, inertia, "Running Iteration {}", iteration);
            }
            ProgressEvent::EmptyCluster { iteration, cluster } => {
                tracing::debug!(iteration, cluster, "cluster received no rows, keeping centroid");
            }
            ProgressEvent::ClusteringFinished { iterations, converged } => {
                tracing::info!(iterations, converged, "k-means finished");
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn report(&self, _event: ProgressEvent) {}
}
