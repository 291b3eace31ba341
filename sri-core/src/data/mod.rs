//! Data acquisition, alignment and persistence.
//!
//! Stage one of the pipeline lives here: fetch raw daily series, outer-join
//! them, resample to weekly, fill gaps, and write the cleaned panel.

pub mod align;
pub mod artifact;
pub mod clean;
pub mod fred;
pub mod provider;
pub mod resample;
pub mod synthetic;
pub mod yahoo;

pub use align::consolidate;
pub use artifact::{panel_hash, read_panel, require_columns, write_panel, ArtifactFormat, DATE_COLUMN};
pub use clean::{clean, first_complete_row, forward_fill, truncate_leading};
pub use fred::FredProvider;
pub use provider::{
    ensure_complete, DataError, DataSource, FetchProgress, MacroDataSource, MarketDataSource,
    SilentProgress, StdoutProgress,
};
pub use resample::{resample_weekly, week_ending};
pub use synthetic::SyntheticSource;
pub use yahoo::YahooProvider;
