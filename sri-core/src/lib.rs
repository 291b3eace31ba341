//! SRI Core: data acquisition, weekly panel construction, and the systemic
//! risk index.
//!
//! - Domain types (raw series, sparse and dense panels)
//! - Market and macro data sources (Yahoo Finance, FRED, synthetic)
//! - Outer-join alignment, weekly resampling, gap filling
//! - Panel artifacts (CSV or Parquet)
//! - Index construction: z-score, first principal component, orientation,
//!   min-max rescale

pub mod data;
pub mod domain;
pub mod index;
