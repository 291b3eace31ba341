//! Column-wise z-scoring.
//!
//! Each column is shifted by its mean and scaled by its population standard
//! deviation (ddof = 0), both computed once over the full sample. A column
//! with no spread has no defined z-score and is rejected.

use super::error::{DegenerateStatistic, IndexError};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Relative tolerance below which a standard deviation counts as zero.
const ZERO_VARIANCE_TOLERANCE: f64 = 1e-12;

/// Fitted location and scale for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnScale {
    pub column: String,
    pub mean: f64,
    pub std: f64,
}

impl ColumnScale {
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Standardized N x k matrix plus the fitted parameters, in column order.
#[derive(Debug, Clone)]
pub struct Standardized {
    pub matrix: DMatrix<f64>,
    pub scales: Vec<ColumnScale>,
}

/// Fit mean and population std for a column.
pub fn fit_column(column: &str, values: &[f64]) -> Result<ColumnScale, IndexError> {
    if let Some(row) = values.iter().position(|v| !v.is_finite()) {
        return Err(IndexError::NonFinite {
            column: column.to_string(),
            row,
        });
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();

    if !(std > ZERO_VARIANCE_TOLERANCE * mean.abs().max(1.0)) {
        return Err(DegenerateStatistic::ZeroVariance {
            column: column.to_string(),
        }
        .into());
    }

    Ok(ColumnScale {
        column: column.to_string(),
        mean,
        std,
    })
}

/// Standardize named columns of equal length into an N x k matrix.
pub fn standardize(columns: &[(&str, &[f64])]) -> Result<Standardized, IndexError> {
    if columns.is_empty() {
        return Err(IndexError::NoFactors);
    }
    let rows = columns[0].1.len();
    if rows < 2 {
        return Err(IndexError::TooFewRows { rows });
    }

    let scales = columns
        .iter()
        .map(|(name, values)| fit_column(name, values))
        .collect::<Result<Vec<_>, _>>()?;

    let matrix = DMatrix::from_fn(rows, columns.len(), |r, c| scales[c].apply(columns[c].1[r]));

    Ok(Standardized { matrix, scales })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn standardized_columns_have_zero_mean_unit_std() {
        let a: &[f64] = &[12.0, 15.5, 30.2, 18.0, 22.1, 14.9];
        let b: &[f64] = &[90.0, 110.0, 140.0, 100.0, 120.0, 95.0];
        let s = standardize(&[("VIX", a), ("MOVE", b)]).unwrap();

        for c in 0..2 {
            let col = s.matrix.column(c);
            let n = col.len() as f64;
            let mean = col.iter().sum::<f64>() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
            assert_relative_eq!(var.sqrt(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn uses_population_std() {
        let s = fit_column("X", &[1.0, -1.0, 1.0, -1.0]).unwrap();
        assert_relative_eq!(s.mean, 0.0);
        assert_relative_eq!(s.std, 1.0);
    }

    #[test]
    fn constant_column_is_degenerate() {
        let err = fit_column("BAMLC0A0CMEY", &[4.2; 10]).unwrap_err();
        match err {
            IndexError::Degenerate(DegenerateStatistic::ZeroVariance { column }) => {
                assert_eq!(column, "BAMLC0A0CMEY")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_input_rejected() {
        assert!(matches!(
            fit_column("VIX", &[1.0, f64::NAN, 2.0]),
            Err(IndexError::NonFinite { row: 1, .. })
        ));
    }

    #[test]
    fn single_row_rejected() {
        let a: &[f64] = &[1.0];
        assert!(matches!(
            standardize(&[("A", a)]),
            Err(IndexError::TooFewRows { rows: 1 })
        ));
    }
}
