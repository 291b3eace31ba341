//! First principal component of a standardized matrix.
//!
//! The principal axis is the unit eigenvector of the population covariance
//! matrix `XᵀX / N` with the largest eigenvalue. Eigen solvers return that
//! vector with an arbitrary sign; callers must orient it explicitly (see
//! [`super::orient`]).

use super::error::IndexError;
use nalgebra::{DMatrix, SymmetricEigen};

/// PC1 of a sample: axis, per-row scores and variance share.
#[derive(Debug, Clone)]
pub struct PrincipalComponent {
    /// Unit-length axis, one weight per input column.
    pub loadings: Vec<f64>,
    /// Projection of every row onto the axis.
    pub scores: Vec<f64>,
    /// Variance captured by the component.
    pub eigenvalue: f64,
    /// `eigenvalue / trace`: share of total variance explained.
    pub explained_variance_ratio: f64,
}

/// Extract the first principal component of a column-centred N x k matrix.
pub fn first_principal_component(x: &DMatrix<f64>) -> Result<PrincipalComponent, IndexError> {
    let n = x.nrows();
    if n < 2 {
        return Err(IndexError::TooFewRows { rows: n });
    }
    if x.ncols() == 0 {
        return Err(IndexError::NoFactors);
    }

    let covariance = (x.transpose() * x) / n as f64;
    let eigen = SymmetricEigen::new(covariance);

    let (best, eigenvalue) = eigen
        .eigenvalues
        .iter()
        .copied()
        .enumerate()
        .try_fold(None::<(usize, f64)>, |best, (i, v)| {
            if !v.is_finite() {
                return Err(IndexError::Decomposition(format!(
                    "non-finite eigenvalue at position {i}"
                )));
            }
            Ok(match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
        })?
        .ok_or_else(|| IndexError::Decomposition("no eigenvalues".into()))?;

    let trace: f64 = eigen.eigenvalues.iter().sum();
    if !(trace > 0.0) {
        return Err(IndexError::Decomposition(format!(
            "covariance trace is {trace}"
        )));
    }

    let axis = eigen.eigenvectors.column(best).normalize();
    let scores = x * &axis;

    Ok(PrincipalComponent {
        loadings: axis.iter().copied().collect(),
        scores: scores.iter().copied().collect(),
        eigenvalue,
        explained_variance_ratio: eigenvalue / trace,
    })
}
