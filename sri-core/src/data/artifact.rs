//! Persisted panel artifacts.
//!
//! Layout: first column `Date` (ISO 8601, ascending), then one numeric column
//! per indicator, no absent cells. CSV is the default; a `.parquet` extension
//! selects Parquet. Writes are atomic: the table goes to a `.tmp` sibling that
//! is renamed into place only after it has been fully written and closed, so
//! a reader never observes a half-written file and a failed write leaves
//! nothing behind.

use super::provider::DataError;
use crate::domain::CleanedPanel;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the leading date column.
pub const DATE_COLUMN: &str = "Date";

/// On-disk table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    Csv,
    Parquet,
}

impl ArtifactFormat {
    /// Pick the format from the file extension; anything but Parquet is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("parquet") | Some("pq") => ArtifactFormat::Parquet,
            _ => ArtifactFormat::Csv,
        }
    }
}

/// Write a panel atomically, creating parent directories as needed.
pub fn write_panel(panel: &CleanedPanel, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| DataError::ArtifactError(format!("failed to create dir: {e}")))?;
    }

    let tmp_path = tmp_path_for(path);
    let written = match ArtifactFormat::from_path(path) {
        ArtifactFormat::Csv => write_csv(panel, &tmp_path),
        ArtifactFormat::Parquet => write_parquet(panel, &tmp_path),
    };
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    // Atomic rename
    fs::rename(&tmp_path, path).map_err(|e| {
        // Clean up temp file on rename failure
        let _ = fs::remove_file(&tmp_path);
        DataError::ArtifactError(format!("atomic rename failed: {e}"))
    })?;

    info!(
        path = %path.display(),
        rows = panel.n_rows(),
        columns = panel.n_cols(),
        "wrote panel artifact"
    );
    Ok(())
}

/// Read a panel artifact, validating shape, date order and density.
pub fn read_panel(path: &Path) -> Result<CleanedPanel, DataError> {
    if !path.exists() {
        return Err(DataError::ArtifactError(format!(
            "artifact not found: {}",
            path.display()
        )));
    }
    match ArtifactFormat::from_path(path) {
        ArtifactFormat::Csv => read_csv(path),
        ArtifactFormat::Parquet => read_parquet(path),
    }
}

/// Check that every named column is present in an artifact's panel.
pub fn require_columns(
    panel: &CleanedPanel,
    columns: &[String],
    artifact: &Path,
) -> Result<(), DataError> {
    for column in columns {
        if panel.column(column).is_none() {
            return Err(DataError::SchemaMismatch {
                column: column.clone(),
                artifact: artifact.display().to_string(),
            });
        }
    }
    Ok(())
}

/// Deterministic BLAKE3 hash over dates, column names and values.
pub fn panel_hash(panel: &CleanedPanel) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in panel.dates() {
        hasher.update(date.to_string().as_bytes());
    }
    for (name, values) in panel.columns() {
        hasher.update(name.as_bytes());
        for v in values {
            hasher.update(&v.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── CSV ─────────────────────────────────────────────────────────────

fn write_csv(panel: &CleanedPanel, path: &Path) -> Result<(), DataError> {
    let csv_err = |e: csv::Error| DataError::ArtifactError(format!("csv write: {e}"));
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;

    let mut header = Vec::with_capacity(panel.n_cols() + 1);
    header.push(DATE_COLUMN.to_string());
    header.extend(panel.column_names().iter().cloned());
    wtr.write_record(&header).map_err(csv_err)?;

    for (row, date) in panel.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(panel.n_cols() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        // Display for f64 is the shortest string that round-trips exactly.
        record.extend(panel.row(row).iter().map(|v| v.to_string()));
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush()
        .map_err(|e| DataError::ArtifactError(format!("csv flush: {e}")))?;
    Ok(())
}

fn read_csv(path: &Path) -> Result<CleanedPanel, DataError> {
    let display = path.display().to_string();
    let csv_err = |e: csv::Error| DataError::ArtifactError(format!("csv read {display}: {e}"));
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;

    let headers = rdr.headers().map_err(csv_err)?.clone();
    match headers.get(0) {
        Some(first) if first.trim().eq_ignore_ascii_case(DATE_COLUMN) => {}
        _ => {
            return Err(DataError::SchemaMismatch {
                column: DATE_COLUMN.into(),
                artifact: display.clone(),
            })
        }
    }
    let names: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut dates = Vec::new();
    let mut values: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        // Header is line 1.
        let line = i + 2;
        let raw_date = record.get(0).unwrap_or("").trim();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            DataError::ArtifactError(format!(
                "{display}: line {line}: invalid date '{raw_date}': {e}"
            ))
        })?;
        dates.push(date);

        for (col, name) in names.iter().enumerate() {
            let raw = record.get(col + 1).unwrap_or("").trim();
            if raw.is_empty() {
                return Err(DataError::ArtifactError(format!(
                    "{display}: line {line}: column '{name}' is empty"
                )));
            }
            let v: f64 = raw.parse().map_err(|e| {
                DataError::ArtifactError(format!(
                    "{display}: line {line}: column '{name}': invalid number '{raw}': {e}"
                ))
            })?;
            values[col].push(v);
        }
    }

    CleanedPanel::new(dates, names.into_iter().zip(values).collect())
}

// ── Parquet ─────────────────────────────────────────────────────────

/// 1970-01-01, the origin of Polars' `Date` day counts.
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

/// Convert a panel to a Polars DataFrame.
fn panel_to_dataframe(panel: &CleanedPanel) -> Result<DataFrame, DataError> {
    let days: Vec<i32> = panel
        .dates()
        .iter()
        .map(|d| (*d - epoch()).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(panel.n_cols() + 1);
    columns.push(
        Column::new(DATE_COLUMN.into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
    );
    for (name, values) in panel.columns() {
        columns.push(Column::new(name.into(), values.to_vec()));
    }

    DataFrame::new(columns)
        .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(panel: &CleanedPanel, path: &Path) -> Result<(), DataError> {
    let mut df = panel_to_dataframe(panel)?;
    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn read_parquet(path: &Path) -> Result<CleanedPanel, DataError> {
    let display = path.display().to_string();
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    let date_col = df.column(DATE_COLUMN).map_err(|_| DataError::SchemaMismatch {
        column: DATE_COLUMN.into(),
        artifact: display.clone(),
    })?;
    let date_ca = date_col
        .date()
        .map_err(|e| DataError::ParquetError(format!("date column type: {e}")))?;

    let n = df.height();
    let mut dates = Vec::with_capacity(n);
    for i in 0..n {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        dates.push(epoch() + chrono::Duration::days(i64::from(days)));
    }

    let mut columns = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if name == DATE_COLUMN {
            continue;
        }
        let ca = column
            .f64()
            .map_err(|e| DataError::ParquetError(format!("column '{name}' type: {e}")))?;
        let mut values = Vec::with_capacity(n);
        for i in 0..n {
            let v = ca.get(i).ok_or_else(|| {
                DataError::ArtifactError(format!("{display}: column '{name}' is null at row {i}"))
            })?;
            values.push(v);
        }
        columns.push((name.to_string(), values));
    }

    CleanedPanel::new(dates, columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_panel() -> CleanedPanel {
        let first = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let dates = (0..3)
            .map(|i| first + chrono::Duration::days(7 * i))
            .collect();
        CleanedPanel::new(
            dates,
            vec![
                ("VIX".into(), vec![13.1, 14.25, 12.0]),
                ("MOVE".into(), vec![110.5, 0.1, 98.75]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ArtifactFormat::from_path(Path::new("a/b.csv")), ArtifactFormat::Csv);
        assert_eq!(
            ArtifactFormat::from_path(Path::new("a/b.PARQUET")),
            ArtifactFormat::Parquet
        );
        assert_eq!(ArtifactFormat::from_path(Path::new("noext")), ArtifactFormat::Csv);
    }

    #[test]
    fn csv_write_then_read_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/risk_factors.csv");
        let panel = sample_panel();

        write_panel(&panel, &path).unwrap();
        assert!(!tmp_path_for(&path).exists());

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Date,VIX,MOVE\n2024-01-05,13.1,110.5\n"));

        assert_eq!(read_panel(&path).unwrap(), panel);
    }

    #[test]
    fn parquet_write_then_read_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_factors.parquet");
        let panel = sample_panel();

        write_panel(&panel, &path).unwrap();
        assert_eq!(read_panel(&path).unwrap(), panel);
    }

    #[test]
    fn csv_with_empty_cell_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "Date,VIX\n2024-01-05,13.0\n2024-01-12,\n").unwrap();
        let err = read_panel(&path).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn csv_without_date_column_is_schema_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "When,VIX\n2024-01-05,13.0\n").unwrap();
        assert!(matches!(
            read_panel(&path),
            Err(DataError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn missing_required_column_is_named() {
        let panel = sample_panel();
        let err = require_columns(
            &panel,
            &["VIX".to_string(), "BAMLC0A0CMEY".to_string()],
            Path::new("data/risk_factors.csv"),
        )
        .unwrap_err();
        match err {
            DataError::SchemaMismatch { column, .. } => assert_eq!(column, "BAMLC0A0CMEY"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn hash_is_deterministic_and_value_sensitive() {
        let a = sample_panel();
        let b = sample_panel();
        assert_eq!(panel_hash(&a), panel_hash(&b));
        let c = b.with_column("SRI", vec![0.0, 50.0, 100.0]).unwrap();
        assert_ne!(panel_hash(&a), panel_hash(&c));
    }

    #[test]
    fn missing_file_is_artifact_error() {
        assert!(matches!(
            read_panel(Path::new("/definitely/not/here.csv")),
            Err(DataError::ArtifactError(_))
        ));
    }
}
