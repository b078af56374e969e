//! Error types shared by every stage of a discovery run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading data, decomposing the matrix or clustering.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed input in {source_name} at line {line}: {message}")]
    Parse {
        source_name: String,
        line: usize,
        message: String,
    },

    #[error("{what} index {index} out of bounds (limit {bound}){}", line_suffix(.line))]
    IndexOutOfBounds {
        what: &'static str,
        index: usize,
        bound: usize,
        line: Option<usize>,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("initial Lanczos vector lies in the null space of the Gram operator")]
    DegenerateSeed,

    #[error("eigenpair verification rejected all {candidates} candidates")]
    NoSingularVectors { candidates: usize },

    #[error("verification accepted {accepted} singular vectors, {requested} were requested")]
    RankDeficient { requested: usize, accepted: usize },

    #[error("eigen decomposition failed: {0}")]
    EigenDecomposition(String),

    #[error("{0} not fitted")]
    NotFitted(&'static str),

    #[error("no label for row {row}")]
    MissingLabel { row: usize },

    #[error("centroid index {index} out of range for {clusters} clusters")]
    InvalidCentroid { index: usize, clusters: usize },

    #[error("invalid configuration file: {0}")]
    Config(#[from] serde_json::Error),
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {line}"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
