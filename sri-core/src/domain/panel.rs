//! Date-keyed tables of indicator columns.
//!
//! [`Panel`] may contain absent cells (consolidated and weekly panels).
//! [`CleanedPanel`] is dense: every cell holds a finite value. That is the
//! shape persisted between the ingestion and index-construction stages.

use crate::data::provider::DataError;
use chrono::NaiveDate;
use std::collections::HashSet;

/// A sparse table: strictly increasing dates, named columns, optional cells.
///
/// Storage is column-major: `values[col][row]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl Panel {
    /// Build a panel, validating shape, date order and column uniqueness.
    pub fn new(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<Option<f64>>)>,
    ) -> Result<Self, DataError> {
        validate_dates(&dates)?;
        let (names, values): (Vec<String>, Vec<Vec<Option<f64>>>) = columns.into_iter().unzip();
        validate_columns(&names, values.iter().map(Vec::len), dates.len())?;
        Ok(Self {
            dates,
            columns: names,
            values,
        })
    }

    /// An empty panel that still carries its column names.
    pub fn empty(columns: Vec<String>) -> Self {
        let values = vec![Vec::new(); columns.len()];
        Self {
            dates: Vec::new(),
            columns,
            values,
        }
    }

    pub(crate) fn from_parts(
        dates: Vec<NaiveDate>,
        columns: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        debug_assert!(values.iter().all(|v| v.len() == dates.len()));
        Self {
            dates,
            columns,
            values,
        }
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.column_index(name).map(|i| self.values[i].as_slice())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate `(name, cells)` pairs in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(col).and_then(|c| c.get(row)).copied().flatten()
    }

    /// Whether every column has a value in `row`.
    pub fn row_is_complete(&self, row: usize) -> bool {
        self.values.iter().all(|c| c[row].is_some())
    }

    /// Total number of absent cells.
    pub fn absent_count(&self) -> usize {
        self.values
            .iter()
            .map(|c| c.iter().filter(|v| v.is_none()).count())
            .sum()
    }

    /// Rows from `start` (inclusive) to the end.
    pub fn rows_from(&self, start: usize) -> Panel {
        let start = start.min(self.dates.len());
        Self::from_parts(
            self.dates[start..].to_vec(),
            self.columns.clone(),
            self.values.iter().map(|c| c[start..].to_vec()).collect(),
        )
    }

    pub fn into_parts(self) -> (Vec<NaiveDate>, Vec<String>, Vec<Vec<Option<f64>>>) {
        (self.dates, self.columns, self.values)
    }
}

/// A dense table with no absent cells. All values are finite.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedPanel {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CleanedPanel {
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<(String, Vec<f64>)>) -> Result<Self, DataError> {
        validate_dates(&dates)?;
        let (names, values): (Vec<String>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        validate_columns(&names, values.iter().map(Vec::len), dates.len())?;
        for (name, col) in names.iter().zip(&values) {
            if let Some(row) = col.iter().position(|v| !v.is_finite()) {
                return Err(DataError::InvalidPanel(format!(
                    "column '{name}' has a non-finite value on {}",
                    dates[row]
                )));
            }
        }
        Ok(Self {
            dates,
            columns: names,
            values,
        })
    }

    /// Convert a sparse panel, failing on the first absent cell.
    pub fn try_from_panel(panel: Panel) -> Result<Self, DataError> {
        let (dates, names, values) = panel.into_parts();
        let mut dense = Vec::with_capacity(names.len());
        for (name, col) in names.into_iter().zip(values) {
            let mut filled = Vec::with_capacity(col.len());
            for (row, cell) in col.into_iter().enumerate() {
                match cell {
                    Some(v) => filled.push(v),
                    None => {
                        return Err(DataError::InvalidPanel(format!(
                            "column '{name}' is absent on {}",
                            dates[row]
                        )))
                    }
                }
            }
            dense.push((name, filled));
        }
        Self::new(dates, dense)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.dates.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().map(Vec::as_slice))
    }

    /// Value of every column at `row`, in column order.
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.values.iter().map(|c| c[row]).collect()
    }

    /// Append a column, preserving all existing ones.
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self, DataError> {
        let name = name.into();
        if self.columns.contains(&name) {
            return Err(DataError::InvalidPanel(format!(
                "column '{name}' already exists"
            )));
        }
        if values.len() != self.dates.len() {
            return Err(DataError::InvalidPanel(format!(
                "column '{name}' has {} values for {} rows",
                values.len(),
                self.dates.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DataError::InvalidPanel(format!(
                "column '{name}' contains non-finite values"
            )));
        }
        self.columns.push(name);
        self.values.push(values);
        Ok(self)
    }

    /// The last `n` rows (all rows if `n` exceeds the length).
    pub fn tail(&self, n: usize) -> CleanedPanel {
        let start = self.dates.len().saturating_sub(n);
        Self {
            dates: self.dates[start..].to_vec(),
            columns: self.columns.clone(),
            values: self.values.iter().map(|c| c[start..].to_vec()).collect(),
        }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}

fn validate_dates(dates: &[NaiveDate]) -> Result<(), DataError> {
    if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
        return Err(DataError::InvalidPanel(format!(
            "dates must be strictly increasing ({} followed by {})",
            w[0], w[1]
        )));
    }
    Ok(())
}

fn validate_columns(
    names: &[String],
    lengths: impl Iterator<Item = usize>,
    n_rows: usize,
) -> Result<(), DataError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(DataError::InvalidPanel(format!("duplicate column '{name}'")));
        }
    }
    for (name, len) in names.iter().zip(lengths) {
        if len != n_rows {
            return Err(DataError::InvalidPanel(format!(
                "column '{name}' has {len} values for {n_rows} rows"
            )));
        }
    }
    Ok(())
}
