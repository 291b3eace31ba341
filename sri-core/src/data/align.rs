//! Multi-series time alignment.
//!
//! Given raw series from any number of sources, build one panel on the union
//! of their dates (outer join). A cell is absent wherever a series has no
//! observation on that date; no row is dropped because one column is missing.

use super::provider::DataError;
use crate::domain::{Panel, RawSeries};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Outer-join series into a consolidated panel.
///
/// Columns keep the input order. Series names must be unique.
pub fn consolidate(series: &[RawSeries]) -> Result<Panel, DataError> {
    // Collect the union of all dates
    let all_dates: BTreeSet<NaiveDate> = series
        .iter()
        .flat_map(|s| s.observations().iter().map(|o| o.date))
        .collect();
    let dates: Vec<NaiveDate> = all_dates.into_iter().collect();

    let row_of: HashMap<NaiveDate, usize> =
        dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let columns = series
        .iter()
        .map(|s| {
            let mut cells = vec![None; dates.len()];
            for obs in s.observations() {
                cells[row_of[&obs.date]] = Some(obs.value);
            }
            (s.name().to_string(), cells)
        })
        .collect();

    let panel = Panel::new(dates, columns)?;
    debug!(
        rows = panel.n_rows(),
        columns = panel.n_cols(),
        absent = panel.absent_count(),
        "consolidated series"
    );
    Ok(panel)
}
