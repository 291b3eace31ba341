//! Systemic risk index construction.
//!
//! Pipeline over a cleaned weekly panel:
//! 1. select the risk-factor columns
//! 2. z-score each column (population std)
//! 3. extract the first principal component
//! 4. orient it so the reference factor loads positively
//! 5. min-max rescale the scores onto `[0, 100]`
//!
//! The output is the input panel with one extra column holding the index.

pub mod error;
pub mod orient;
pub mod pca;
pub mod rescale;
pub mod standardize;

pub use error::{DegenerateStatistic, IndexError};
pub use orient::{orient, OrientedFactor};
pub use pca::{first_principal_component, PrincipalComponent};
pub use rescale::{rescale, to_sri_scale, SRI_MAX, SRI_MIN};
pub use standardize::{fit_column, standardize, ColumnScale, Standardized};

use crate::domain::CleanedPanel;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which columns feed the index and what the result is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSpec {
    /// Risk-factor columns, in matrix order.
    pub factors: Vec<String>,
    /// Column whose loading fixes the sign of the factor.
    pub reference: String,
    /// Name of the appended index column.
    pub output_column: String,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            factors: vec!["VIX".into(), "MOVE".into(), "BAMLC0A0CMEY".into()],
            reference: "VIX".into(),
            output_column: "SRI".into(),
        }
    }
}

/// Loading of one factor on the oriented component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorLoading {
    pub column: String,
    pub loading: f64,
}

/// Everything produced by [`construct_sri`].
#[derive(Debug, Clone)]
pub struct IndexResult {
    /// The input panel with the index column appended.
    pub panel: CleanedPanel,
    /// Index values, one per row, in `[SRI_MIN, SRI_MAX]`.
    pub sri: Vec<f64>,
    pub loadings: Vec<FactorLoading>,
    pub explained_variance_ratio: f64,
    pub standardization: Vec<ColumnScale>,
    /// Whether the solver's sign had to be negated.
    pub flipped: bool,
}

/// Build the index from a cleaned panel.
pub fn construct_sri(panel: &CleanedPanel, spec: &IndexSpec) -> Result<IndexResult, IndexError> {
    if spec.factors.is_empty() {
        return Err(IndexError::NoFactors);
    }
    let reference = spec
        .factors
        .iter()
        .position(|f| *f == spec.reference)
        .ok_or_else(|| IndexError::ReferenceNotSelected {
            column: spec.reference.clone(),
        })?;

    let columns = spec
        .factors
        .iter()
        .map(|name| {
            panel
                .column(name)
                .map(|values| (name.as_str(), values))
                .ok_or_else(|| IndexError::SchemaMismatch {
                    column: name.clone(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let standardized = standardize(&columns)?;
    let pc = first_principal_component(&standardized.matrix)?;
    debug!(
        eigenvalue = pc.eigenvalue,
        explained = pc.explained_variance_ratio,
        "extracted first principal component"
    );

    let oriented = orient(pc, reference, &spec.reference)?;
    let sri = to_sri_scale(&oriented.scores)?;

    let loadings = spec
        .factors
        .iter()
        .zip(&oriented.loadings)
        .map(|(column, &loading)| FactorLoading {
            column: column.clone(),
            loading,
        })
        .collect();

    let out = panel
        .clone()
        .with_column(spec.output_column.clone(), sri.clone())?;

    info!(
        rows = out.n_rows(),
        flipped = oriented.flipped,
        explained = oriented.explained_variance_ratio,
        "constructed {}",
        spec.output_column
    );

    Ok(IndexResult {
        panel: out,
        sri,
        loadings,
        explained_variance_ratio: oriented.explained_variance_ratio,
        standardization: standardized.scales,
        flipped: oriented.flipped,
    })
}
