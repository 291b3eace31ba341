//! Stage 2: read the cleaned panel, build the index, persist.

use crate::config::RunConfig;
use crate::error::{Stage, StageError};
use crate::manifest::{commit_manifest, read_manifest, IndexSummary, RunManifest};
use sri_core::data::{panel_hash, read_panel, require_columns, write_panel};
use sri_core::domain::CleanedPanel;
use sri_core::index::{construct_sri, IndexResult};
use std::path::PathBuf;
use tracing::{info, warn};

/// Result of a successful construct.
#[derive(Debug, Clone)]
pub struct ConstructOutcome {
    pub result: IndexResult,
    /// The table actually written (the tail window, if one was requested).
    pub written: CleanedPanel,
    pub artifact: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: RunManifest,
}

/// Run stage 2 from the cleaned artifact on disk.
///
/// With `tail = Some(n)` only the last `n` rows are written; the index is
/// always fitted on the full history.
pub fn run_construct(config: &RunConfig, tail: Option<usize>) -> Result<ConstructOutcome, StageError> {
    config.validate()?;
    if tail == Some(0) {
        return Err(StageError::InvalidArgument(
            "tail window must be at least one row".into(),
        ));
    }
    let data_err = || StageError::data(Stage::Construct);

    let input = &config.artifacts.cleaned;
    let panel = read_panel(input).map_err(data_err())?;
    require_columns(&panel, &config.index.factors, input).map_err(data_err())?;

    let upstream = read_manifest(input).map_err(StageError::manifest(Stage::Construct))?;
    // A manifest describing a different table says nothing about this one.
    let synthetic = match upstream {
        Some(m) if m.table_hash == panel_hash(&panel) => m.synthetic,
        Some(_) => {
            warn!(path = %input.display(), "cleaned artifact does not match its manifest hash; ignoring manifest");
            false
        }
        None => {
            warn!(path = %input.display(), "cleaned artifact has no manifest");
            false
        }
    };

    let result = construct_sri(&panel, &config.index)?;
    let written = match tail {
        Some(n) => result.panel.tail(n),
        None => result.panel.clone(),
    };

    let artifact = config.artifacts.indexed.clone();
    write_panel(&written, &artifact).map_err(data_err())?;

    let mut manifest =
        RunManifest::describe(Stage::Construct, &config.run_id(), &written, synthetic);
    manifest.index = Some(IndexSummary {
        output_column: config.index.output_column.clone(),
        reference: config.index.reference.clone(),
        loadings: result.loadings.clone(),
        explained_variance_ratio: result.explained_variance_ratio,
        standardization: result.standardization.clone(),
        flipped: result.flipped,
        fitted_rows: result.panel.n_rows(),
        tail,
    });
    let manifest_path =
        commit_manifest(&artifact, &manifest).map_err(StageError::manifest(Stage::Construct))?;

    info!(
        rows = written.n_rows(),
        fitted_rows = result.panel.n_rows(),
        path = %artifact.display(),
        "construct complete"
    );
    Ok(ConstructOutcome {
        result,
        written,
        artifact,
        manifest_path,
        manifest,
    })
}
