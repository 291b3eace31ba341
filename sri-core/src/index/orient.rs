//! Sign orientation of the latent factor.
//!
//! Higher index values must mean higher stress. The factor is flipped as a
//! whole (scores and loadings together) whenever the loading on the reference
//! indicator comes out negative.

use super::error::DegenerateStatistic;
use super::pca::PrincipalComponent;

/// Loadings with magnitude at or below this are treated as zero.
const ZERO_LOADING_TOLERANCE: f64 = 1e-12;

/// A principal component whose reference loading is non-negative.
#[derive(Debug, Clone)]
pub struct OrientedFactor {
    pub loadings: Vec<f64>,
    pub scores: Vec<f64>,
    pub explained_variance_ratio: f64,
    /// Whether the solver's sign was negated.
    pub flipped: bool,
}

/// Orient `pc` so the loading at `reference` is positive.
///
/// `reference_name` is only used for the error message.
pub fn orient(
    pc: PrincipalComponent,
    reference: usize,
    reference_name: &str,
) -> Result<OrientedFactor, DegenerateStatistic> {
    let loading = pc.loadings.get(reference).copied().unwrap_or(0.0);
    if loading.abs() <= ZERO_LOADING_TOLERANCE {
        return Err(DegenerateStatistic::ZeroReferenceLoading {
            column: reference_name.to_string(),
        });
    }

    let flipped = loading < 0.0;
    let sign = if flipped { -1.0 } else { 1.0 };
    Ok(OrientedFactor {
        loadings: pc.loadings.iter().map(|l| l * sign).collect(),
        scores: pc.scores.iter().map(|s| s * sign).collect(),
        explained_variance_ratio: pc.explained_variance_ratio,
        flipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pc(loadings: Vec<f64>, scores: Vec<f64>) -> PrincipalComponent {
        PrincipalComponent {
            loadings,
            scores,
            eigenvalue: 2.0,
            explained_variance_ratio: 0.7,
        }
    }

    #[test]
    fn negative_reference_flips_everything() {
        let oriented = orient(pc(vec![-0.6, -0.8], vec![1.0, -2.0]), 0, "VIX").unwrap();
        assert!(oriented.flipped);
        assert_eq!(oriented.loadings, vec![0.6, 0.8]);
        assert_eq!(oriented.scores, vec![-1.0, 2.0]);
    }

    #[test]
    fn positive_reference_is_untouched() {
        let oriented = orient(pc(vec![0.6, -0.8], vec![1.0, -2.0]), 0, "VIX").unwrap();
        assert!(!oriented.flipped);
        assert_eq!(oriented.loadings, vec![0.6, -0.8]);
        assert_eq!(oriented.scores, vec![1.0, -2.0]);
    }

    #[test]
    fn zero_reference_loading_is_degenerate() {
        let err = orient(pc(vec![0.0, 1.0], vec![1.0, -1.0]), 0, "VIX").unwrap_err();
        assert_eq!(
            err,
            DegenerateStatistic::ZeroReferenceLoading {
                column: "VIX".into()
            }
        );
    }
}
