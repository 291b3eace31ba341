//! Gap filling and leading-row truncation.
//!
//! Weekly panels still have holes: macro series publish less often than
//! market series, and series start on different dates. Forward-fill repeats
//! the last known value down each column; truncation then drops the leading
//! rows that precede the first fully populated row.

use super::provider::DataError;
use crate::domain::{CleanedPanel, Panel};
use tracing::debug;

/// Replace each absent cell with the nearest preceding value in its column.
///
/// A column with no prior value stays absent. Idempotent.
pub fn forward_fill(panel: &Panel) -> Panel {
    let values: Vec<Vec<Option<f64>>> = panel
        .columns()
        .map(|(_, cells)| {
            let mut last = None;
            cells
                .iter()
                .map(|cell| {
                    if cell.is_some() {
                        last = *cell;
                    }
                    last
                })
                .collect()
        })
        .collect();
    Panel::from_parts(
        panel.dates().to_vec(),
        panel.column_names().to_vec(),
        values,
    )
}

/// Index of the first row where every column has a value.
pub fn first_complete_row(panel: &Panel) -> Option<usize> {
    (0..panel.n_rows()).find(|&row| panel.row_is_complete(row))
}

/// Drop rows from the start until the first fully populated row.
///
/// Rows after that point are kept as-is. With no complete row at all the
/// result is empty.
pub fn truncate_leading(panel: &Panel) -> Panel {
    let start = first_complete_row(panel).unwrap_or(panel.n_rows());
    panel.rows_from(start)
}

/// Forward-fill then truncate, producing a dense panel.
///
/// Fails when a column never has a value. Once every column has been seen,
/// forward-fill leaves no holes after the first complete row.
pub fn clean(weekly: &Panel) -> Result<CleanedPanel, DataError> {
    if weekly.n_cols() == 0 {
        return Err(DataError::InvalidPanel("panel has no columns".into()));
    }
    for (name, cells) in weekly.columns() {
        if cells.iter().all(Option::is_none) {
            return Err(DataError::DataUnavailable {
                provider: "weekly panel".into(),
                id: name.to_string(),
                reason: "column has no observations in the requested range".into(),
            });
        }
    }

    let filled = forward_fill(weekly);
    let truncated = truncate_leading(&filled);
    let dropped = filled.n_rows() - truncated.n_rows();
    if dropped > 0 {
        debug!(dropped, "truncated leading incomplete rows");
    }
    CleanedPanel::try_from_panel(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn weeks(n: usize) -> Vec<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        (0..n)
            .map(|i| first + chrono::Duration::days(7 * i as i64))
            .collect()
    }

    fn panel(cols: Vec<(&str, Vec<Option<f64>>)>) -> Panel {
        let n = cols[0].1.len();
        Panel::new(
            weeks(n),
            cols.into_iter().map(|(n, v)| (n.to_string(), v)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn forward_fill_repeats_last_value() {
        let p = panel(vec![("A", vec![None, Some(1.0), None, None, Some(2.0), None])]);
        let filled = forward_fill(&p);
        assert_eq!(
            filled.column("A").unwrap(),
            &[None, Some(1.0), Some(1.0), Some(1.0), Some(2.0), Some(2.0)]
        );
    }

    #[test]
    fn truncation_drops_rows_before_late_starter() {
        let p = panel(vec![
            ("VIX", vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            ("MOVE", vec![None, None, Some(90.0), None]),
        ]);
        let cleaned = clean(&p).unwrap();
        assert_eq!(cleaned.n_rows(), 2);
        assert_eq!(cleaned.dates()[0], weeks(4)[2]);
        assert_eq!(cleaned.column("VIX").unwrap(), &[3.0, 4.0]);
        assert_eq!(cleaned.column("MOVE").unwrap(), &[90.0, 90.0]);
    }

    #[test]
    fn fully_absent_column_is_fatal() {
        let p = panel(vec![
            ("VIX", vec![Some(1.0), Some(2.0)]),
            ("MOVE", vec![None, None]),
        ]);
        match clean(&p) {
            Err(DataError::DataUnavailable { id, .. }) => assert_eq!(id, "MOVE"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn truncate_without_complete_row_is_empty() {
        let p = panel(vec![("A", vec![Some(1.0), None]), ("B", vec![None, Some(2.0)])]);
        assert!(truncate_leading(&p).is_empty());
    }

    #[test]
    fn clean_output_has_no_absent_cells() {
        let p = panel(vec![
            ("A", vec![None, Some(1.0), None, Some(3.0), None]),
            ("B", vec![Some(5.0), None, None, None, Some(6.0)]),
        ]);
        let cleaned = clean(&p).unwrap();
        assert_eq!(cleaned.n_rows(), 4);
        assert_eq!(cleaned.column("A").unwrap(), &[1.0, 1.0, 3.0, 3.0]);
        assert_eq!(cleaned.column("B").unwrap(), &[5.0, 5.0, 5.0, 6.0]);
    }
}
