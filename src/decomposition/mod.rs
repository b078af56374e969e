//! Low-rank decomposition of the sparse co-occurrence matrix.
//!
//! `TruncatedSVD` computes the dominant right singular vectors of a
//! [`SparseMatrix`](crate::SparseMatrix) with Lanczos iteration on the Gram
//! operator `A^T A`, which is never formed explicitly. The Krylov basis is
//! oversampled and every candidate eigenpair is verified before it is kept,
//! since Lanczos produces spurious copies of converged eigenvalues.
//!
//! # Examples
//!
//! ```rust
//! use relation_discovery::{SparseMatrix, TruncatedSVD};
//! use ndarray::array;
//!
//! let a = SparseMatrix::from_dense(&array![
//!     [3.0, 1.0, 0.0, 0.0],
//!     [3.0, 1.0, 0.0, 0.0],
//!     [0.0, 0.0, 1.0, 2.0],
//!     [0.0, 0.0, 1.0, 2.0]
//! ]);
//!
//! let mut svd = TruncatedSVD::new(2).oversampling(10);
//! let projected = svd.fit_transform(&a).unwrap();
//!
//! assert_eq!(projected.nrows(), 4);
//! println!("Singular values: {:?}", svd.singular_values().unwrap());
//! ```

mod lanczos;
mod truncated_svd;

pub use truncated_svd::{EigenCandidate, RankPolicy, SingularVector, TruncatedSVD, Weighting};
