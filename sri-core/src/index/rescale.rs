//! Min-max rescaling of the oriented factor onto a bounded range.

use super::error::DegenerateStatistic;

/// Lower bound of the published index.
pub const SRI_MIN: f64 = 0.0;
/// Upper bound of the published index.
pub const SRI_MAX: f64 = 100.0;

/// Map the sample minimum to `lo` and the sample maximum to `hi`.
///
/// The extremes land exactly on the bounds. A constant input has no range to
/// scale and is rejected.
pub fn rescale(values: &[f64], lo: f64, hi: f64) -> Result<Vec<f64>, DegenerateStatistic> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(mn, mx), &v| {
            (mn.min(v), mx.max(v))
        });
    let range = max - min;
    let scale = min.abs().max(max.abs()).max(1.0);
    if values.is_empty() || !(range > f64::EPSILON * scale) {
        return Err(DegenerateStatistic::ZeroRange {
            value: if values.is_empty() { f64::NAN } else { min },
        });
    }

    Ok(values
        .iter()
        .map(|&v| {
            if v == min {
                lo
            } else if v == max {
                hi
            } else {
                (lo + (hi - lo) * (v - min) / range).clamp(lo, hi)
            }
        })
        .collect())
}

/// Rescale onto the published `[0, 100]` range.
pub fn to_sri_scale(values: &[f64]) -> Result<Vec<f64>, DegenerateStatistic> {
    rescale(values, SRI_MIN, SRI_MAX)
}
