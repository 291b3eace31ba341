//! FRED (Federal Reserve Economic Data) macro series provider.
//!
//! Uses the `series/observations` endpoint with JSON output. FRED encodes a
//! missing observation as the string `"."`; those are skipped.

use super::provider::{DataError, DataSource, MacroDataSource};
use crate::domain::{Observation, RawSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const PROVIDER: &str = "fred";
const BASE_URL: &str = "https://api.stlouisfed.org/fred/series/observations";

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<FredObservation>,
}

#[derive(Debug, Deserialize)]
struct FredObservation {
    date: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct FredErrorBody {
    error_message: String,
}

/// FRED observations provider. Holds the API key explicitly.
pub struct FredProvider {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
}

impl FredProvider {
    pub fn new(api_key: impl Into<String>) -> Result<Self, DataError> {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Provider against a different observations endpoint (mirrors, tests).
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, DataError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(DataError::AuthenticationRequired(
                "FRED API key is empty".into(),
            ));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }

    fn observations_url(&self, series_id: &str, start: NaiveDate) -> String {
        format!(
            "{}?series_id={series_id}&api_key={}&file_type=json&observation_start={}",
            self.base_url,
            self.api_key,
            start.format("%Y-%m-%d")
        )
    }

    fn parse_response(series_id: &str, resp: ObservationsResponse) -> Result<RawSeries, DataError> {
        let mut observations = Vec::with_capacity(resp.observations.len());
        for obs in resp.observations {
            let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "{series_id}: invalid date '{}': {e}",
                    obs.date
                ))
            })?;
            if obs.value.trim() == "." {
                continue;
            }
            let value: f64 = obs.value.trim().parse().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "{series_id}: invalid value '{}' on {date}: {e}",
                    obs.value
                ))
            })?;
            observations.push(Observation::new(date, value));
        }
        Ok(RawSeries::new(series_id, observations))
    }

    /// Map a FRED error body to a structured error.
    fn classify_error(series_id: &str, status: reqwest::StatusCode, body: &str) -> DataError {
        let message = serde_json::from_str::<FredErrorBody>(body)
            .map(|b| b.error_message)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        if message.contains("api_key") {
            DataError::AuthenticationRequired(message)
        } else if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            DataError::RateLimited {
                retry_after_secs: 60,
            }
        } else if status.is_client_error() {
            DataError::DataUnavailable {
                provider: PROVIDER.into(),
                id: series_id.to_string(),
                reason: message,
            }
        } else {
            DataError::NetworkUnreachable(format!("{series_id}: {message}"))
        }
    }
}

impl MacroDataSource for FredProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn source(&self) -> DataSource {
        DataSource::Fred
    }

    fn fetch_series(&self, series_id: &str, start: NaiveDate) -> Result<RawSeries, DataError> {
        debug!(series_id, %start, "requesting FRED observations");
        let resp = self
            .client
            .get(self.observations_url(series_id, start))
            .send()
            .map_err(|e| {
                DataError::NetworkUnreachable(format!("{series_id}: {}", e.without_url()))
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Self::classify_error(series_id, status, &body));
        }

        let parsed: ObservationsResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!(
                "failed to parse response for {series_id}: {}",
                e.without_url()
            ))
        })?;
        let series = Self::parse_response(series_id, parsed)?;
        info!(series_id, observations = series.len(), "fetched macro series");
        Ok(series)
    }
}
