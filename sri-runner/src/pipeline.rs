//! Both stages back to back.

use crate::config::RunConfig;
use crate::construct::{run_construct, ConstructOutcome};
use crate::error::StageError;
use crate::ingest::{run_ingest, IngestOutcome};
use sri_core::data::{FetchProgress, MacroDataSource, MarketDataSource};

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub ingest: IngestOutcome,
    pub construct: ConstructOutcome,
}

/// Ingest then construct. Stage 2 reads the artifact stage 1 just wrote.
pub fn run_pipeline(
    config: &RunConfig,
    market: &dyn MarketDataSource,
    macro_source: &dyn MacroDataSource,
    progress: &dyn FetchProgress,
    tail: Option<usize>,
) -> Result<PipelineOutcome, StageError> {
    let ingest = run_ingest(config, market, macro_source, progress)?;
    let construct = run_construct(config, tail)?;
    Ok(PipelineOutcome { ingest, construct })
}
