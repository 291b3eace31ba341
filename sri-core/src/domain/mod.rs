//! Domain types: raw observation series and date-keyed panels.

pub mod panel;
pub mod series;

pub use panel::{CleanedPanel, Panel};
pub use series::{Observation, RawSeries};
