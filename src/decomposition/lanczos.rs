use crate::error::{DiscoveryError, Result};
use crate::progress::{Progress, ProgressEvent};
use crate::sparse::SparseMatrix;
use crate::{Matrix, Vector};
use std::cmp::Ordering;

/// Below this the next Lanczos vector is numerically inside the current basis.
const BREAKDOWN_TOLERANCE: f64 = 1e-10;
const MAX_QL_ITERATIONS: usize = 60;

/// Orthonormal Krylov basis of the Gram operator plus its tridiagonal projection.
///
/// The operator is scaled by `1 / scale_factor` while iterating; eigenvalues
/// of the tridiagonal matrix are multiplied back by it.
#[derive(Clone, Debug)]
pub(crate) struct LanczosState {
    pub basis: Vec<Vector>,
    pub diagonal: Vec<f64>,
    pub off_diagonal: Vec<f64>,
    pub scale_factor: f64,
}

impl LanczosState {
    /// Runs up to `basis_size` steps of Lanczos on `A^T A` starting at `initial`.
    pub fn solve(
        a: &SparseMatrix,
        initial: Vector,
        basis_size: usize,
        progress: &dyn Progress,
    ) -> Result<Self> {
        if basis_size == 0 {
            return Err(DiscoveryError::InvalidParameter(
                "Lanczos basis size must be > 0".to_string(),
            ));
        }

        progress.report(ProgressEvent::LanczosStarted {
            basis_size,
            num_cols: a.ncols(),
        });

        let mut basis: Vec<Vector> = Vec::with_capacity(basis_size);
        basis.push(initial);
        let mut diagonal: Vec<f64> = Vec::with_capacity(basis_size);
        let mut off_diagonal: Vec<f64> = Vec::with_capacity(basis_size.saturating_sub(1));
        let mut scale_factor = 0.0;

        for step in 0..basis_size {
            let mut next = a.times_squared(&basis[step])?;
            if step == 0 {
                scale_factor = norm(&next);
                if !scale_factor.is_finite() || scale_factor <= 0.0 {
                    return Err(DiscoveryError::DegenerateSeed);
                }
            }
            next.mapv_inplace(|x| x / scale_factor);

            let alpha = basis[step].dot(&next);
            next.scaled_add(-alpha, &basis[step]);
            if step > 0 {
                next.scaled_add(-off_diagonal[step - 1], &basis[step - 1]);
            }
            for previous in &basis {
                let overlap = previous.dot(&next);
                next.scaled_add(-overlap, previous);
            }
            diagonal.push(alpha);

            if step + 1 == basis_size {
                progress.report(ProgressEvent::LanczosStep { step, alpha, beta: 0.0 });
                break;
            }

            let beta = norm(&next);
            progress.report(ProgressEvent::LanczosStep { step, alpha, beta });
            if !alpha.is_finite() || !beta.is_finite() || beta < BREAKDOWN_TOLERANCE {
                progress.report(ProgressEvent::LanczosBreakdown { step, beta });
                break;
            }

            next.mapv_inplace(|x| x / beta);
            off_diagonal.push(beta);
            basis.push(next);
        }

        Ok(Self {
            basis,
            diagonal,
            off_diagonal,
            scale_factor,
        })
    }

    /// Ritz pairs `(eigenvalue, unit vector)` ordered by decreasing eigenvalue.
    pub fn ritz_pairs(&self) -> Result<Vec<(f64, Vector)>> {
        let (eigenvalues, eigenvectors) = tridiagonal_eigen(&self.diagonal, &self.off_diagonal)?;

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&i, &j| {
            eigenvalues[j]
                .partial_cmp(&eigenvalues[i])
                .unwrap_or(Ordering::Equal)
        });

        let num_cols = self.basis[0].len();
        let mut pairs = Vec::with_capacity(order.len());
        for column in order {
            let mut ritz = Vector::zeros(num_cols);
            for (row, basis_vector) in self.basis.iter().enumerate() {
                ritz.scaled_add(eigenvectors[[row, column]], basis_vector);
            }
            let length = norm(&ritz);
            if length > 0.0 {
                ritz.mapv_inplace(|x| x / length);
            }
            pairs.push((eigenvalues[column] * self.scale_factor, ritz));
        }
        Ok(pairs)
    }
}

pub(crate) fn norm(v: &Vector) -> f64 {
    v.dot(v).sqrt()
}

/// Eigen decomposition of a symmetric tridiagonal matrix by implicit-shift QL.
///
/// Returns eigenvalues in no particular order and a matrix whose column `j`
/// is the eigenvector for eigenvalue `j`.
pub(crate) fn tridiagonal_eigen(
    diagonal: &[f64],
    off_diagonal: &[f64],
) -> Result<(Vec<f64>, Matrix)> {
    let n = diagonal.len();
    if off_diagonal.len() + 1 != n && !(n == 0 && off_diagonal.is_empty()) {
        return Err(DiscoveryError::DimensionMismatch {
            expected: n.saturating_sub(1),
            found: off_diagonal.len(),
        });
    }

    let mut d = diagonal.to_vec();
    // e[i] couples i and i + 1; the trailing slot is scratch
    let mut e = off_diagonal.to_vec();
    e.push(0.0);
    let mut z = Matrix::eye(n);

    for l in 0..n {
        let mut iterations = 0;
        loop {
            let mut m = l;
            while m + 1 < n {
                let dd = d[m].abs() + d[m + 1].abs();
                if e[m].abs() <= f64::EPSILON * dd {
                    break;
                }
                m += 1;
            }
            if m == l {
                break;
            }

            iterations += 1;
            if iterations > MAX_QL_ITERATIONS {
                return Err(DiscoveryError::EigenDecomposition(format!(
                    "QL iteration did not converge for eigenvalue {l}"
                )));
            }

            let mut g = (d[l + 1] - d[l]) / (2.0 * e[l]);
            let mut r = g.hypot(1.0);
            g = d[m] - d[l] + e[l] / (g + r.copysign(g));
            let mut s = 1.0;
            let mut c = 1.0;
            let mut p = 0.0;
            let mut deflated = false;

            for i in (l..m).rev() {
                let f = s * e[i];
                let b = c * e[i];
                r = f.hypot(g);
                e[i + 1] = r;
                if r == 0.0 {
                    d[i + 1] -= p;
                    e[m] = 0.0;
                    deflated = true;
                    break;
                }
                s = f / r;
                c = g / r;
                g = d[i + 1] - p;
                r = (d[i] - g) * s + 2.0 * c * b;
                p = s * r;
                d[i + 1] = g + p;
                g = c * r - b;

                for k in 0..n {
                    let upper = z[[k, i + 1]];
                    z[[k, i + 1]] = s * z[[k, i]] + c * upper;
                    z[[k, i]] = c * z[[k, i]] - s * upper;
                }
            }

            if deflated {
                continue;
            }
            d[l] -= p;
            e[l] = g;
            e[m] = 0.0;
        }
    }

    Ok((d, z))
}
