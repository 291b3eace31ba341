//! Serializable run configuration.
//!
//! One `RunConfig` drives both stages. Every field has a default, so an empty
//! TOML file reproduces the standard VIX / MOVE / credit-spread index.
//! Credentials are not part of the config; the caller passes them to the
//! provider it constructs.

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use sri_core::index::IndexSpec;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for an ingest + construct run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunConfig {
    pub ingest: IngestConfig,
    pub index: IndexSpec,
    pub artifacts: ArtifactPaths,
}

/// Stage 1 parameters: what to fetch and how to resample it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// First calendar date requested from every provider.
    pub start_date: NaiveDate,
    /// Weekday that labels each weekly bucket.
    pub anchor: Weekday,
    /// Market tickers, fetched together from the market source.
    pub market: Vec<MarketTicker>,
    /// Macro series, fetched one by one from the macro source.
    pub macro_series: Vec<MacroSeries>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            anchor: Weekday::Fri,
            market: vec![
                MarketTicker::aliased("^VIX", "VIX"),
                MarketTicker::aliased("^MOVE", "MOVE"),
            ],
            macro_series: vec![MacroSeries::new("BAMLC0A0CMEY")],
        }
    }
}

/// A market ticker and the panel column it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTicker {
    /// Provider symbol, e.g. `^VIX`.
    pub ticker: String,
    /// Column name; the ticker itself when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl MarketTicker {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            column: None,
        }
    }

    pub fn aliased(ticker: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            column: Some(column.into()),
        }
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.ticker)
    }
}

/// A macro series ID and the panel column it lands in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroSeries {
    /// Provider series ID, e.g. `BAMLC0A0CMEY`.
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl MacroSeries {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            column: None,
        }
    }

    pub fn column_name(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.id)
    }
}

/// Where each stage writes its table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    /// Cleaned weekly panel (stage 1 output, stage 2 input).
    pub cleaned: PathBuf,
    /// Panel with the index column (stage 2 output).
    pub indexed: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            cleaned: PathBuf::from("data/risk_factors.csv"),
            indexed: PathBuf::from("data/sri.csv"),
        }
    }
}

impl RunConfig {
    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Panel columns in stage 1 output order: market tickers, then macro series.
    pub fn column_names(&self) -> Vec<String> {
        self.ingest
            .market
            .iter()
            .map(|t| t.column_name().to_string())
            .chain(
                self.ingest
                    .macro_series
                    .iter()
                    .map(|m| m.column_name().to_string()),
            )
            .collect()
    }

    pub fn market_tickers(&self) -> Vec<String> {
        self.ingest.market.iter().map(|t| t.ticker.clone()).collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.market.is_empty() {
            return Err(ConfigError::Invalid(
                "ingest.market must list at least one ticker".into(),
            ));
        }

        let mut seen = HashSet::new();
        for t in &self.ingest.market {
            if t.ticker.trim().is_empty() {
                return Err(ConfigError::Invalid("empty market ticker".into()));
            }
            if !seen.insert(t.ticker.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "market ticker '{}' listed twice",
                    t.ticker
                )));
            }
        }
        if self.ingest.macro_series.iter().any(|m| m.id.trim().is_empty()) {
            return Err(ConfigError::Invalid("empty macro series id".into()));
        }

        let columns = self.column_names();
        let mut unique = HashSet::new();
        for c in &columns {
            if c.trim().is_empty() {
                return Err(ConfigError::Invalid("empty column name".into()));
            }
            if !unique.insert(c.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "column '{c}' is produced by more than one series"
                )));
            }
        }

        let index = &self.index;
        if index.factors.is_empty() {
            return Err(ConfigError::Invalid(
                "index.factors must name at least one column".into(),
            ));
        }
        if let Some(f) = index.factors.iter().find(|f| !unique.contains(f.as_str())) {
            return Err(ConfigError::Invalid(format!(
                "index factor '{f}' is not an ingested column (have: {})",
                columns.join(", ")
            )));
        }
        if !index.factors.contains(&index.reference) {
            return Err(ConfigError::Invalid(format!(
                "index.reference '{}' is not one of index.factors",
                index.reference
            )));
        }
        if unique.contains(index.output_column.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "index.output_column '{}' collides with an ingested column",
                index.output_column
            )));
        }
        if self.artifacts.cleaned == self.artifacts.indexed {
            return Err(ConfigError::Invalid(
                "artifacts.cleaned and artifacts.indexed must differ".into(),
            ));
        }
        Ok(())
    }

    /// Deterministic hash of the config, recorded in run manifests.
    pub fn run_id(&self) -> RunId {
        // Serializing plain data structs cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
