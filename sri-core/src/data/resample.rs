//! Weekly resampling.
//!
//! Buckets are labelled by their anchor day: the bucket for anchor date `A`
//! covers the seven days `(A - 7, A]`. With a Friday anchor, Saturday through
//! Friday roll up into the Friday label. Each cell takes the last observed
//! value inside its bucket, or stays absent when the bucket saw nothing.

use crate::domain::Panel;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// The anchor date of the bucket containing `date`.
pub fn week_ending(date: NaiveDate, anchor: Weekday) -> NaiveDate {
    let today = date.weekday().num_days_from_monday();
    let target = anchor.num_days_from_monday();
    let offset = (target + 7 - today) % 7;
    date + Duration::days(i64::from(offset))
}

/// Resample a panel to one row per week, last value wins.
///
/// The output has exactly one row per anchor date from the bucket of the
/// first input date through the bucket of the last, including weeks with no
/// observations at all.
pub fn resample_weekly(panel: &Panel, anchor: Weekday) -> Panel {
    let (first, last) = match (panel.dates().first(), panel.dates().last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Panel::empty(panel.column_names().to_vec()),
    };

    let first_label = week_ending(first, anchor);
    let last_label = week_ending(last, anchor);
    let n_weeks = ((last_label - first_label).num_days() / 7 + 1) as usize;
    let labels: Vec<NaiveDate> = (0..n_weeks)
        .map(|w| first_label + Duration::days(7 * w as i64))
        .collect();

    // Bucket index per input row; dates are sorted so these are non-decreasing.
    let buckets: Vec<usize> = panel
        .dates()
        .iter()
        .map(|d| ((week_ending(*d, anchor) - first_label).num_days() / 7) as usize)
        .collect();

    let values: Vec<Vec<Option<f64>>> = panel
        .columns()
        .map(|(_, cells)| {
            let mut out = vec![None; n_weeks];
            for (row, cell) in cells.iter().enumerate() {
                if let Some(v) = cell {
                    out[buckets[row]] = Some(*v);
                }
            }
            out
        })
        .collect();

    Panel::from_parts(labels, panel.column_names().to_vec(), values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn week_ending_friday() {
        // 2024-01-05 is a Friday.
        assert_eq!(week_ending(d("2024-01-05"), Weekday::Fri), d("2024-01-05"));
        assert_eq!(week_ending(d("2024-01-01"), Weekday::Fri), d("2024-01-05"));
        assert_eq!(week_ending(d("2024-01-06"), Weekday::Fri), d("2024-01-12"));
        assert_eq!(week_ending(d("2024-01-07"), Weekday::Fri), d("2024-01-12"));
    }

    #[test]
    fn week_ending_other_anchor() {
        assert_eq!(week_ending(d("2024-01-05"), Weekday::Wed), d("2024-01-10"));
        assert_eq!(week_ending(d("2024-01-03"), Weekday::Wed), d("2024-01-03"));
    }

    #[test]
    fn last_value_in_week_wins() {
        let panel = Panel::new(
            vec![d("2024-01-02"), d("2024-01-03"), d("2024-01-04")],
            vec![("VIX".into(), vec![Some(1.0), Some(2.0), None])],
        )
        .unwrap();
        let weekly = resample_weekly(&panel, Weekday::Fri);
        assert_eq!(weekly.dates(), &[d("2024-01-05")]);
        assert_eq!(weekly.column("VIX").unwrap(), &[Some(2.0)]);
    }

    #[test]
    fn empty_weeks_are_absent_not_zero() {
        let panel = Panel::new(
            vec![d("2024-01-02"), d("2024-01-16")],
            vec![("VIX".into(), vec![Some(1.0), Some(3.0)])],
        )
        .unwrap();
        let weekly = resample_weekly(&panel, Weekday::Fri);
        assert_eq!(
            weekly.dates(),
            &[d("2024-01-05"), d("2024-01-12"), d("2024-01-19")]
        );
        assert_eq!(weekly.column("VIX").unwrap(), &[Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn empty_panel_stays_empty() {
        let weekly = resample_weekly(&Panel::empty(vec!["VIX".into()]), Weekday::Fri);
        assert!(weekly.is_empty());
        assert_eq!(weekly.n_cols(), 1);
    }
}
