//! Data source traits and structured error types.
//!
//! Two capabilities feed the ingestion stage: a market source returning daily
//! closes for a set of tickers, and a macro source returning one series per
//! provider series ID. Both are traits so the HTTP providers can be swapped
//! for synthetic or in-memory sources in tests.

use crate::domain::RawSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in CLI output with enough context
/// (provider, ticker or series, column) to diagnose the failure.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("data unavailable from {provider} for '{id}': {reason}")]
    DataUnavailable {
        provider: String,
        id: String,
        reason: String,
    },

    #[error("schema mismatch: expected column '{column}' missing from {artifact}")]
    SchemaMismatch { column: String, artifact: String },

    #[error("invalid panel: {0}")]
    InvalidPanel(String),

    #[error("artifact error: {0}")]
    ArtifactError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),
}

/// Where a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    Fred,
    Synthetic,
}

/// Daily closing values for market tickers (equity and rate volatility).
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    /// Fetch daily closes for every ticker from `start` onward, keyed by ticker.
    fn fetch_daily_close(
        &self,
        tickers: &[String],
        start: NaiveDate,
    ) -> Result<BTreeMap<String, RawSeries>, DataError>;
}

/// Lower-frequency macro releases, one provider series ID at a time.
pub trait MacroDataSource: Send + Sync {
    fn name(&self) -> &str;

    fn source(&self) -> DataSource;

    fn fetch_series(&self, series_id: &str, start: NaiveDate) -> Result<RawSeries, DataError>;
}

/// Check a market fetch against the requested tickers.
///
/// Every ticker must be present with at least one observation; anything
/// less is fatal for the run.
pub fn ensure_complete(
    provider: &str,
    tickers: &[String],
    fetched: &BTreeMap<String, RawSeries>,
) -> Result<(), DataError> {
    if fetched.values().all(RawSeries::is_empty) {
        return Err(DataError::DataUnavailable {
            provider: provider.to_string(),
            id: tickers.join(","),
            reason: "combined result is empty".into(),
        });
    }
    for ticker in tickers {
        match fetched.get(ticker) {
            Some(series) if !series.is_empty() => {}
            Some(_) => {
                return Err(DataError::DataUnavailable {
                    provider: provider.to_string(),
                    id: ticker.clone(),
                    reason: "no observations returned".into(),
                })
            }
            None => {
                return Err(DataError::DataUnavailable {
                    provider: provider.to_string(),
                    id: ticker.clone(),
                    reason: "ticker missing from result".into(),
                })
            }
        }
    }
    Ok(())
}

/// Progress callback for multi-series fetches.
pub trait FetchProgress {
    /// Called when starting to fetch a ticker batch or series.
    fn on_start(&self, id: &str, index: usize, total: usize);

    /// Called when a fetch completes, with the observation count on success.
    fn on_complete(&self, id: &str, index: usize, total: usize, result: &Result<usize, DataError>);

    /// Called when every request has been issued.
    fn on_batch_complete(&self, succeeded: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl FetchProgress for StdoutProgress {
    fn on_start(&self, id: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {id}...", index + 1, total);
    }

    fn on_complete(
        &self,
        id: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, DataError>,
    ) {
        match result {
            Ok(n) => println!("  OK: {id} ({n} observations)"),
            Err(e) => println!("  FAIL: {id}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, total: usize) {
        println!("\nFetch complete: {succeeded}/{total} succeeded");
    }
}

/// Progress reporter that discards every event.
pub struct SilentProgress;

impl FetchProgress for SilentProgress {
    fn on_start(&self, _id: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _id: &str,
        _index: usize,
        _total: usize,
        _result: &Result<usize, DataError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _total: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(name: &str, n: usize) -> RawSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        RawSeries::from_pairs(
            name,
            (0..n).map(|i| (start + chrono::Duration::days(i as i64), 10.0 + i as f64)),
        )
    }

    fn tickers() -> Vec<String> {
        vec!["^VIX".to_string(), "^MOVE".to_string()]
    }

    #[test]
    fn complete_result_passes() {
        let mut fetched = BTreeMap::new();
        fetched.insert("^VIX".to_string(), series("^VIX", 3));
        fetched.insert("^MOVE".to_string(), series("^MOVE", 2));
        assert!(ensure_complete("test", &tickers(), &fetched).is_ok());
    }

    #[test]
    fn missing_ticker_is_fatal() {
        let mut fetched = BTreeMap::new();
        fetched.insert("^VIX".to_string(), series("^VIX", 3));
        let err = ensure_complete("test", &tickers(), &fetched).unwrap_err();
        match err {
            DataError::DataUnavailable { id, .. } => assert_eq!(id, "^MOVE"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_ticker_is_fatal() {
        let mut fetched = BTreeMap::new();
        fetched.insert("^VIX".to_string(), series("^VIX", 3));
        fetched.insert("^MOVE".to_string(), series("^MOVE", 0));
        assert!(matches!(
            ensure_complete("test", &tickers(), &fetched),
            Err(DataError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn empty_combined_result_is_fatal() {
        let fetched = BTreeMap::new();
        let err = ensure_complete("test", &tickers(), &fetched).unwrap_err();
        assert!(err.to_string().contains("combined result is empty"));
    }
}
