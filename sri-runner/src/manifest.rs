//! Run manifest sidecars (JSON).
//!
//! Every artifact gets a `<artifact>.manifest.json` next to it describing how
//! it was produced. The manifest is written after the artifact, with the same
//! temp-file + rename discipline. An artifact whose manifest cannot be written
//! is removed again, so a failed stage leaves nothing behind.

use crate::error::Stage;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sri_core::data::{panel_hash, DataSource};
use sri_core::domain::CleanedPanel;
use sri_core::index::{ColumnScale, FactorLoading};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Current schema version for manifests.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("I/O on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error(
        "manifest {path} has schema version {found}, this build reads version {}",
        SCHEMA_VERSION
    )]
    UnsupportedVersion { path: String, found: u32 },
}

/// Provenance of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub schema_version: u32,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    /// Hash of the run config that produced the artifact.
    pub run_id: String,
    pub rows: usize,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub columns: Vec<String>,
    /// BLAKE3 over the table contents.
    pub table_hash: String,
    /// Provider per input column (stage 1 only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, DataSource>,
    /// True if any input came from the synthetic source.
    pub synthetic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexSummary>,
}

/// Index construction details (stage 2 only).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    pub output_column: String,
    pub reference: String,
    pub loadings: Vec<FactorLoading>,
    pub explained_variance_ratio: f64,
    pub standardization: Vec<ColumnScale>,
    pub flipped: bool,
    /// Rows the index was computed over, before any tail window.
    pub fitted_rows: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tail: Option<usize>,
}

impl RunManifest {
    /// Describe `panel` as written by `stage`.
    pub fn describe(stage: Stage, run_id: &str, panel: &CleanedPanel, synthetic: bool) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            stage,
            created_at: Utc::now(),
            run_id: run_id.to_string(),
            rows: panel.n_rows(),
            start_date: panel.first_date(),
            end_date: panel.last_date(),
            columns: panel.column_names().to_vec(),
            table_hash: panel_hash(panel),
            sources: BTreeMap::new(),
            synthetic,
            index: None,
        }
    }
}

/// `data/sri.csv` -> `data/sri.csv.manifest.json`.
pub fn manifest_path_for(artifact: &Path) -> PathBuf {
    let mut name = artifact
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".manifest.json");
    artifact.with_file_name(name)
}

/// Write the sidecar manifest for `artifact` atomically.
pub fn write_manifest(artifact: &Path, manifest: &RunManifest) -> Result<PathBuf, ManifestError> {
    let path = manifest_path_for(artifact);
    let display = path.display().to_string();
    let json = serde_json::to_string_pretty(manifest).map_err(|source| ManifestError::Json {
        path: display.clone(),
        source,
    })?;

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let io_err = |source| ManifestError::Io {
        path: display.clone(),
        source,
    };
    fs::write(&tmp_path, json).map_err(io_err)?;
    if let Err(e) = fs::rename(&tmp_path, &path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }
    Ok(path)
}

/// Write the manifest for a freshly written `artifact`.
///
/// On failure the artifact and any stale manifest are removed.
pub fn commit_manifest(artifact: &Path, manifest: &RunManifest) -> Result<PathBuf, ManifestError> {
    write_manifest(artifact, manifest).map_err(|e| {
        let _ = fs::remove_file(artifact);
        let _ = fs::remove_file(manifest_path_for(artifact));
        e
    })
}

/// Read the sidecar manifest for `artifact`, if one exists.
pub fn read_manifest(artifact: &Path) -> Result<Option<RunManifest>, ManifestError> {
    let path = manifest_path_for(artifact);
    if !path.exists() {
        return Ok(None);
    }
    let display = path.display().to_string();
    let content = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
        path: display.clone(),
        source,
    })?;

    // Check the version before the full parse so newer layouts fail clearly.
    #[derive(Deserialize)]
    struct VersionProbe {
        schema_version: u32,
    }
    let probe: VersionProbe =
        serde_json::from_str(&content).map_err(|source| ManifestError::Json {
            path: display.clone(),
            source,
        })?;
    if probe.schema_version != SCHEMA_VERSION {
        return Err(ManifestError::UnsupportedVersion {
            path: display,
            found: probe.schema_version,
        });
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| ManifestError::Json {
            path: display,
            source,
        })
}
