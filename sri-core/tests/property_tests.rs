//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Forward-fill is idempotent
//! 2. Outer join keeps the union of dates
//! 3. Weekly resampling yields evenly spaced anchor dates; cleaning leaves no holes
//! 4. Orientation: the reference loading is non-negative, and negating a factor
//!    only flips that factor's loading
//! 5. Rescale bounds: the sample minimum maps to 0 and the maximum to 100

use approx::assert_relative_eq;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use std::collections::BTreeSet;
use sri_core::data::{clean, consolidate, forward_fill, resample_weekly, week_ending};
use sri_core::domain::{CleanedPanel, Panel, RawSeries};
use sri_core::index::{construct_sri, to_sri_scale, IndexSpec, SRI_MAX, SRI_MIN};

// ── Strategies (proptest) ────────────────────────────────────────────

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
}

fn arb_cells() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::of(-100.0..100.0_f64), 1..60)
}

/// A daily series on a random subset of ~14 months of calendar days.
fn arb_series(name: &'static str) -> impl Strategy<Value = RawSeries> {
    prop::collection::btree_map(0..420_i64, 1.0..200.0_f64, 1..120).prop_map(move |points| {
        RawSeries::from_pairs(
            name,
            points
                .into_iter()
                .map(|(offset, v)| (base_date() + Duration::days(offset), v))
                .collect::<Vec<_>>(),
        )
    })
}

/// Rows of (latent, noise, noise, noise): three indicators driven by one factor.
fn arb_factor_rows() -> impl Strategy<Value = Vec<(f64, f64, f64, f64)>> {
    prop::collection::vec(
        (-3.0..3.0_f64, -0.3..0.3_f64, -0.3..0.3_f64, -0.3..0.3_f64),
        8..80,
    )
}

fn weeks(n: usize) -> Vec<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();
    (0..n).map(|i| first + Duration::days(7 * i as i64)).collect()
}

fn factor_panel(rows: &[(f64, f64, f64, f64)], move_sign: f64) -> CleanedPanel {
    let vix = rows.iter().map(|(l, a, _, _)| 20.0 + 5.0 * (l + a)).collect();
    let mv = rows
        .iter()
        .map(|(l, _, b, _)| move_sign * (100.0 + 20.0 * (l + b)))
        .collect();
    let spread = rows.iter().map(|(l, _, _, c)| 5.0 + 0.5 * (l + c)).collect();
    CleanedPanel::new(
        weeks(rows.len()),
        vec![
            ("VIX".into(), vix),
            ("MOVE".into(), mv),
            ("BAMLC0A0CMEY".into(), spread),
        ],
    )
    .unwrap()
}

// ── 1. Forward-fill ──────────────────────────────────────────────────

proptest! {
    /// Filling an already filled panel changes nothing.
    #[test]
    fn forward_fill_is_idempotent(cells in arb_cells()) {
        let panel = Panel::new(weeks(cells.len()), vec![("A".into(), cells)]).unwrap();
        let once = forward_fill(&panel);
        let twice = forward_fill(&once);
        prop_assert_eq!(once, twice);
    }

    /// Once a column has a value, it never goes absent again.
    #[test]
    fn forward_fill_leaves_no_hole_after_first_value(cells in arb_cells()) {
        let first = cells.iter().position(Option::is_some);
        let panel = Panel::new(weeks(cells.len()), vec![("A".into(), cells)]).unwrap();
        let filled = forward_fill(&panel);
        let col = filled.column("A").unwrap();
        if let Some(first) = first {
            prop_assert!(col[first..].iter().all(Option::is_some));
            prop_assert!(col[..first].iter().all(Option::is_none));
        }
    }
}

// ── 2. Outer join ────────────────────────────────────────────────────

proptest! {
    /// The consolidated panel has one row per date seen in any series.
    #[test]
    fn outer_join_is_date_union(a in arb_series("VIX"), b in arb_series("BAMLC0A0CMEY")) {
        let union: BTreeSet<NaiveDate> = a
            .observations()
            .iter()
            .chain(b.observations())
            .map(|o| o.date)
            .collect();
        let expected_absent = 2 * union.len() - a.len() - b.len();

        let panel = consolidate(&[a, b]).unwrap();

        let union_dates = union.into_iter().collect::<Vec<_>>();
        prop_assert_eq!(panel.dates(), union_dates.as_slice());
        prop_assert_eq!(panel.absent_count(), expected_absent);
    }
}

// ── 3. Weekly resampling and cleaning ────────────────────────────────

proptest! {
    /// Weekly rows fall on the anchor, seven days apart, covering every input.
    #[test]
    fn weekly_dates_are_evenly_spaced(a in arb_series("VIX"), b in arb_series("MOVE")) {
        let inputs: Vec<NaiveDate> = a
            .observations()
            .iter()
            .chain(b.observations())
            .map(|o| o.date)
            .collect();
        let weekly = resample_weekly(&consolidate(&[a, b]).unwrap(), Weekday::Fri);

        for d in weekly.dates() {
            prop_assert_eq!(d.weekday(), Weekday::Fri);
        }
        for pair in weekly.dates().windows(2) {
            prop_assert_eq!((pair[1] - pair[0]).num_days(), 7);
        }
        for d in inputs {
            prop_assert!(weekly.dates().binary_search(&week_ending(d, Weekday::Fri)).is_ok());
        }
    }

    /// Cleaning drops only leading rows and leaves every cell populated.
    #[test]
    fn cleaned_panel_is_dense_suffix(a in arb_series("VIX"), b in arb_series("MOVE")) {
        let weekly = resample_weekly(&consolidate(&[a, b]).unwrap(), Weekday::Fri);
        let cleaned = clean(&weekly).unwrap();

        prop_assert!(cleaned.n_rows() >= 1);
        let offset = weekly.n_rows() - cleaned.n_rows();
        prop_assert_eq!(&weekly.dates()[offset..], cleaned.dates());
        for (_, col) in cleaned.columns() {
            prop_assert!(col.iter().all(|v| v.is_finite()));
        }
    }
}

// ── 4. Orientation ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The reference factor always loads non-negatively.
    #[test]
    fn reference_loading_is_non_negative(rows in arb_factor_rows()) {
        let result = construct_sri(&factor_panel(&rows, 1.0), &IndexSpec::default()).unwrap();
        prop_assert!(result.loadings[0].loading >= 0.0);
    }

    /// Negating one factor flips its loading and leaves the index unchanged.
    #[test]
    fn negated_factor_flips_only_its_loading(rows in arb_factor_rows()) {
        let spec = IndexSpec::default();
        let plain = construct_sri(&factor_panel(&rows, 1.0), &spec).unwrap();
        let negated = construct_sri(&factor_panel(&rows, -1.0), &spec).unwrap();

        assert_relative_eq!(negated.loadings[0].loading, plain.loadings[0].loading, epsilon = 1e-6);
        assert_relative_eq!(negated.loadings[1].loading, -plain.loadings[1].loading, epsilon = 1e-6);
        assert_relative_eq!(negated.loadings[2].loading, plain.loadings[2].loading, epsilon = 1e-6);
        for (x, y) in plain.sri.iter().zip(&negated.sri) {
            assert_relative_eq!(*x, *y, epsilon = 1e-6);
        }
    }
}

// ── 5. Rescale bounds ────────────────────────────────────────────────

proptest! {
    #[test]
    fn rescale_hits_both_bounds(values in prop::collection::vec(-1e3..1e3_f64, 2..100)) {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assume!(max - min > 1e-9);

        let out = to_sri_scale(&values).unwrap();
        let out_min = out.iter().cloned().fold(f64::INFINITY, f64::min);
        let out_max = out.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assert_eq!(out_min, SRI_MIN);
        prop_assert_eq!(out_max, SRI_MAX);
        prop_assert!(out.iter().all(|v| (SRI_MIN..=SRI_MAX).contains(v)));
    }

    #[test]
    fn rescale_preserves_order(values in prop::collection::vec(-1e3..1e3_f64, 2..50)) {
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        prop_assume!(max - min > 1e-9);

        let out = to_sri_scale(&values).unwrap();
        for i in 0..values.len() {
            for j in 0..values.len() {
                if values[i] < values[j] {
                    prop_assert!(out[i] <= out[j]);
                }
            }
        }
    }
}
