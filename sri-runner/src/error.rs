//! Stage-level errors.

use crate::config::ConfigError;
use crate::manifest::ManifestError;
use serde::{Deserialize, Serialize};
use sri_core::data::DataError;
use sri_core::index::IndexError;
use std::fmt;
use thiserror::Error;

/// Pipeline stage, recorded in errors and manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ingest,
    Construct,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ingest => write!(f, "ingest"),
            Stage::Construct => write!(f, "construct"),
        }
    }
}

/// Errors from running a stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} stage: data error: {source}")]
    Data { stage: Stage, source: DataError },

    #[error("construct stage: index error: {0}")]
    Index(#[from] IndexError),

    #[error("{stage} stage: manifest error: {source}")]
    Manifest { stage: Stage, source: ManifestError },

    #[error("{0}")]
    InvalidArgument(String),
}

impl StageError {
    pub fn data(stage: Stage) -> impl FnOnce(DataError) -> StageError {
        move |source| StageError::Data { stage, source }
    }

    pub fn manifest(stage: Stage) -> impl FnOnce(ManifestError) -> StageError {
        move |source| StageError::Manifest { stage, source }
    }
}
