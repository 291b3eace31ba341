//! Yahoo Finance market data provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API. Volatility indices such as
//! `^VIX` and `^MOVE` are published there as ordinary chart symbols.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes; parse failures surface as [`DataError::ResponseFormatChanged`].
//! Requests are not retried: any failure aborts the ingestion run.

use super::provider::{DataError, DataSource, MarketDataSource};
use crate::domain::{Observation, RawSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

const PROVIDER: &str = "yahoo_finance";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Yahoo Finance daily-close provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    end: NaiveDate,
}

impl YahooProvider {
    /// Provider fetching through today (UTC).
    pub fn new() -> Result<Self, DataError> {
        Self::with_end(chrono::Utc::now().date_naive())
    }

    /// Provider fetching through a fixed end date.
    pub fn with_end(end: NaiveDate) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, end })
    }

    /// Build the chart API URL for a ticker and date range.
    fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::default()).and_utc().timestamp();
        let end_ts = end.and_time(chrono::NaiveTime::default()).and_utc().timestamp() + 86_399;
        let symbol = ticker.replace('^', "%5E");
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into a close series.
    fn parse_response(ticker: &str, resp: ChartResponse) -> Result<RawSeries, DataError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    DataError::DataUnavailable {
                        provider: PROVIDER.into(),
                        id: ticker.to_string(),
                        reason: err.description,
                    }
                } else {
                    DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                DataError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        // A valid symbol with no trading days in range has no timestamp array.
        let timestamps = data.timestamp.unwrap_or_default();

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut observations = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            // Null closes are holidays or missing prints.
            if let Some(close) = quote.close.get(i).copied().flatten() {
                observations.push(Observation::new(date, close));
            }
        }

        Ok(RawSeries::new(ticker, observations))
    }

    fn fetch_one(&self, ticker: &str, start: NaiveDate) -> Result<RawSeries, DataError> {
        let url = Self::chart_url(ticker, start, self.end);
        debug!(ticker, %url, "requesting chart");

        let resp = self.client.get(&url).send().map_err(|e| {
            DataError::NetworkUnreachable(format!("{ticker}: {e}"))
        })?;
        let status = resp.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "Yahoo Finance refused the request for {ticker} (HTTP {status})"
            )));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(DataError::DataUnavailable {
                provider: PROVIDER.into(),
                id: ticker.to_string(),
                reason: "symbol not found".into(),
            });
        }

        if !status.is_success() {
            return Err(DataError::NetworkUnreachable(format!(
                "HTTP {status} for {ticker}"
            )));
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {ticker}: {e}"))
        })?;

        Self::parse_response(ticker, chart)
    }
}

impl MarketDataSource for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn source(&self) -> DataSource {
        DataSource::YahooFinance
    }

    fn fetch_daily_close(
        &self,
        tickers: &[String],
        start: NaiveDate,
    ) -> Result<BTreeMap<String, RawSeries>, DataError> {
        let mut out = BTreeMap::new();
        for ticker in tickers {
            let series = self.fetch_one(ticker, start)?;
            info!(ticker = %ticker, observations = series.len(), "fetched daily closes");
            out.insert(ticker.clone(), series);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<RawSeries, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("^VIX", resp)
    }

    #[test]
    fn parses_closes_and_skips_nulls() {
        let json = r#"{"chart":{"result":[{
            "timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"close":[13.2,null,14.1]}]}
        }],"error":null}}"#;
        let series = parse(json).unwrap();
        assert_eq!(series.name(), "^VIX");
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(series.observations()[1].value, 14.1);
    }

    #[test]
    fn not_found_maps_to_data_unavailable() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(matches!(
            parse(json),
            Err(DataError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn missing_timestamps_yield_empty_series() {
        let json = r#"{"chart":{"result":[{"indicators":{"quote":[{"close":[]}]}}],"error":null}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn chart_url_covers_whole_end_day() {
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2000, 1, 2).unwrap();
        let url = YahooProvider::chart_url("^VIX", start, end);
        assert!(url.contains("period1=946684800"));
        assert!(url.contains("period2=946857599"));
        assert!(url.contains("interval=1d"));
        assert!(url.contains("/chart/%5EVIX?"));
    }
}
