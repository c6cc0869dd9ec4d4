//! Stock price data source - Yahoo Finance chart API
//!
//! Endpoint: https://query1.finance.yahoo.com/v8/finance/chart/{symbol}
//! Returns daily candles for the requested window; only the close price is
//! kept. An empty window is an error for this domain ("no data found"), and
//! null closes (holidays, halted days) are skipped.

use crate::monitor::error::BoxError;
use crate::monitor::source::DataSource;
use crate::monitor::types::Observation;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

const API_TIMEOUT: Duration = Duration::from_secs(10);

/// Yahoo Finance chart response structure (fields we consume)
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Vec<Option<f64>>,
}

#[derive(Debug)]
pub struct StockDataSource {
    client: reqwest::Client,
    base_url: String,
}

impl StockDataSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://query1.finance.yahoo.com".to_string(),
        }
    }
}

impl Default for StockDataSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Pair timestamps with closes, dropping null closes and bad timestamps
fn observations_from_chart(result: ChartResult) -> Vec<Observation> {
    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    timestamps
        .into_iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let value = close?;
            let timestamp = Utc.timestamp_opt(ts, 0).single()?;
            Some(Observation { timestamp, value })
        })
        .collect()
}

#[async_trait]
impl DataSource for StockDataSource {
    async fn fetch(
        &self,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, BoxError> {
        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url,
            keyword,
            start.timestamp(),
            end.timestamp()
        );

        let response = self.client.get(&url).timeout(API_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(format!("Yahoo Finance API error: {}", response.status()).into());
        }

        let body: ChartResponse = response.json().await?;
        let result = body
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| format!("No data found for {}", keyword))?;

        let observations = observations_from_chart(result);
        if observations.is_empty() {
            return Err(format!("No data found for {}", keyword).into());
        }

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_parsing_skips_null_closes() {
        let json = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1700000000, 1700086400, 1700172800],
                    "indicators": {
                        "quote": [{"close": [189.37, null, 191.45]}]
                    }
                }]
            }
        }"#;

        let body: ChartResponse = serde_json::from_str(json).unwrap();
        let result = body.chart.result.unwrap().remove(0);
        let observations = observations_from_chart(result);

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].value, 189.37);
        assert_eq!(observations[1].value, 191.45);
        assert_eq!(observations[0].timestamp.timestamp(), 1700000000);
    }

    #[test]
    fn test_chart_parsing_handles_missing_fields() {
        let json = r#"{"chart": {"result": [{"indicators": {"quote": []}}]}}"#;

        let body: ChartResponse = serde_json::from_str(json).unwrap();
        let result = body.chart.result.unwrap().remove(0);

        assert!(observations_from_chart(result).is_empty());
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_live() {
        let source = StockDataSource::new();
        let end = Utc::now();
        let start = end - chrono::Duration::days(7);

        let observations = source.fetch("AAPL", start, end).await.unwrap();
        assert!(!observations.is_empty());
        assert!(observations.iter().all(|o| o.value > 0.0));
    }
}
