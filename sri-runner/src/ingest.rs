//! Stage 1: fetch, align, resample, clean, persist.
//!
//! Market tickers are fetched as one batch and must all come back non-empty.
//! Macro series are fetched one at a time; any failure, including a series
//! with no observations, aborts the stage.
//! Nothing is written unless the whole stage succeeds.

use crate::config::RunConfig;
use crate::error::{Stage, StageError};
use crate::manifest::{commit_manifest, RunManifest};
use sri_core::data::{
    clean, consolidate, ensure_complete, resample_weekly, write_panel, DataError, DataSource,
    FetchProgress, MacroDataSource, MarketDataSource,
};
use sri_core::domain::{CleanedPanel, RawSeries};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// Result of a successful ingest.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub panel: CleanedPanel,
    pub artifact: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: RunManifest,
}

/// Fetch every configured series and return them renamed to their columns.
///
/// Output order: market tickers in config order, then macro series in config
/// order.
pub fn fetch_all(
    config: &RunConfig,
    market: &dyn MarketDataSource,
    macro_source: &dyn MacroDataSource,
    progress: &dyn FetchProgress,
) -> Result<Vec<RawSeries>, DataError> {
    let ingest = &config.ingest;
    let tickers = config.market_tickers();
    let total = 1 + ingest.macro_series.len();
    let mut succeeded = 0;

    let batch_id = tickers.join(",");
    progress.on_start(&batch_id, 0, total);
    let fetched = market
        .fetch_daily_close(&tickers, ingest.start_date)
        .and_then(|fetched| {
            ensure_complete(market.name(), &tickers, &fetched)?;
            Ok(fetched)
        });
    let observed = fetched
        .as_ref()
        .map(|f| f.values().map(RawSeries::len).sum::<usize>())
        .map_err(clone_error);
    progress.on_complete(&batch_id, 0, total, &observed);
    let mut fetched = fetched?;
    succeeded += 1;

    let mut series = Vec::with_capacity(total);
    for t in &ingest.market {
        // ensure_complete guarantees presence
        let raw = fetched.remove(&t.ticker).ok_or_else(|| DataError::DataUnavailable {
            provider: market.name().to_string(),
            id: t.ticker.clone(),
            reason: "missing from batch result".into(),
        })?;
        debug!(ticker = %t.ticker, column = t.column_name(), rows = raw.len(), "market series");
        series.push(raw.renamed(t.column_name()));
    }

    for (i, m) in ingest.macro_series.iter().enumerate() {
        let index = i + 1;
        progress.on_start(&m.id, index, total);
        let result = macro_source
            .fetch_series(&m.id, ingest.start_date)
            .and_then(|raw| {
                if raw.is_empty() {
                    Err(DataError::DataUnavailable {
                        provider: macro_source.name().to_string(),
                        id: m.id.clone(),
                        reason: "no observations returned".into(),
                    })
                } else {
                    Ok(raw)
                }
            });
        let observed = result.as_ref().map(RawSeries::len).map_err(clone_error);
        progress.on_complete(&m.id, index, total, &observed);
        let raw = result?;
        debug!(series = %m.id, column = m.column_name(), rows = raw.len(), "macro series");
        series.push(raw.renamed(m.column_name()));
        succeeded += 1;
    }

    progress.on_batch_complete(succeeded, total);
    Ok(series)
}

/// Run stage 1 and write the cleaned panel plus its manifest.
pub fn run_ingest(
    config: &RunConfig,
    market: &dyn MarketDataSource,
    macro_source: &dyn MacroDataSource,
    progress: &dyn FetchProgress,
) -> Result<IngestOutcome, StageError> {
    config.validate()?;
    let data_err = || StageError::data(Stage::Ingest);

    let series = fetch_all(config, market, macro_source, progress).map_err(data_err())?;
    let panel = build_panel(config, &series).map_err(data_err())?;

    let artifact = config.artifacts.cleaned.clone();
    write_panel(&panel, &artifact).map_err(data_err())?;

    let synthetic =
        market.source() == DataSource::Synthetic || macro_source.source() == DataSource::Synthetic;
    let mut manifest = RunManifest::describe(Stage::Ingest, &config.run_id(), &panel, synthetic);
    manifest.sources = source_map(config, market.source(), macro_source.source());
    let manifest_path =
        commit_manifest(&artifact, &manifest).map_err(StageError::manifest(Stage::Ingest))?;

    info!(
        rows = panel.n_rows(),
        columns = panel.n_cols(),
        path = %artifact.display(),
        "ingest complete"
    );
    Ok(IngestOutcome {
        panel,
        artifact,
        manifest_path,
        manifest,
    })
}

/// Consolidate, resample and clean already-fetched series.
pub fn build_panel(config: &RunConfig, series: &[RawSeries]) -> Result<CleanedPanel, DataError> {
    let daily = consolidate(series)?;
    let weekly = resample_weekly(&daily, config.ingest.anchor);
    debug!(
        daily_rows = daily.n_rows(),
        weekly_rows = weekly.n_rows(),
        anchor = %config.ingest.anchor,
        "resampled to weekly"
    );
    clean(&weekly)
}

fn source_map(
    config: &RunConfig,
    market: DataSource,
    macro_source: DataSource,
) -> BTreeMap<String, DataSource> {
    let market_cols = config
        .ingest
        .market
        .iter()
        .map(|t| (t.column_name().to_string(), market));
    let macro_cols = config
        .ingest
        .macro_series
        .iter()
        .map(|m| (m.column_name().to_string(), macro_source));
    market_cols.chain(macro_cols).collect()
}

/// Copy of a provider error for the progress callback. `DataError` is not `Clone`.
fn clone_error(e: &DataError) -> DataError {
    match e {
        DataError::RateLimited { retry_after_secs } => DataError::RateLimited {
            retry_after_secs: *retry_after_secs,
        },
        DataError::DataUnavailable {
            provider,
            id,
            reason,
        } => DataError::DataUnavailable {
            provider: provider.clone(),
            id: id.clone(),
            reason: reason.clone(),
        },
        DataError::AuthenticationRequired(m) => DataError::AuthenticationRequired(m.clone()),
        DataError::ResponseFormatChanged(m) => DataError::ResponseFormatChanged(m.clone()),
        other => DataError::NetworkUnreachable(other.to_string()),
    }
}
