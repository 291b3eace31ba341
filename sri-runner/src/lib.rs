//! SRI Runner: stage orchestration for the systemic risk index.
//!
//! This crate builds on `sri-core` to provide:
//! - TOML run configuration with validation
//! - Stage 1 (ingest): fetch, align, resample, clean, persist
//! - Stage 2 (construct): read, build the index, persist
//! - Run manifests (JSON sidecars with provenance and index diagnostics)

pub mod config;
pub mod construct;
pub mod error;
pub mod ingest;
pub mod manifest;
pub mod pipeline;

pub use config::{ArtifactPaths, ConfigError, IngestConfig, MacroSeries, MarketTicker, RunConfig};
pub use construct::{run_construct, ConstructOutcome};
pub use error::{Stage, StageError};
pub use ingest::{build_panel, fetch_all, run_ingest, IngestOutcome};
pub use manifest::{
    commit_manifest, manifest_path_for, read_manifest, write_manifest, IndexSummary,
    ManifestError, RunManifest, SCHEMA_VERSION,
};
pub use pipeline::{run_pipeline, PipelineOutcome};
