//! Weather data source - Open-Meteo
//!
//! Two-step fetch: geocode the city keyword, then pull daily mean
//! temperature from the archive API for the requested window. Unknown city
//! and empty window are errors; days without a value are skipped.
//!
//! Endpoints:
//! - https://geocoding-api.open-meteo.com/v1/search?name={city}&count=1
//! - https://archive-api.open-meteo.com/v1/archive?latitude=..&longitude=..
//!   &start_date=..&end_date=..&daily=temperature_2m_mean

use crate::monitor::error::BoxError;
use crate::monitor::source::DataSource;
use crate::monitor::types::Observation;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Deserialize;
use std::time::Duration;

const API_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    daily: Option<Daily>,
}

#[derive(Debug, Deserialize)]
struct Daily {
    time: Vec<String>,
    temperature_2m_mean: Vec<Option<f64>>,
}

#[derive(Debug)]
pub struct WeatherDataSource {
    client: reqwest::Client,
    geocoding_url: String,
    archive_url: String,
}

impl WeatherDataSource {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            geocoding_url: "https://geocoding-api.open-meteo.com".to_string(),
            archive_url: "https://archive-api.open-meteo.com".to_string(),
        }
    }
}

impl Default for WeatherDataSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Map the daily series to observations, skipping days without a value
fn observations_from_daily(daily: Daily) -> Result<Vec<Observation>, BoxError> {
    let mut observations = Vec::new();

    for (date, temperature) in daily.time.iter().zip(daily.temperature_2m_mean) {
        let Some(value) = temperature else {
            continue;
        };
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date in archive response: {}", date))?;
        observations.push(Observation {
            timestamp: Utc.from_utc_datetime(&midnight),
            value,
        });
    }

    Ok(observations)
}

#[async_trait]
impl DataSource for WeatherDataSource {
    async fn fetch(
        &self,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, BoxError> {
        // Step 1: city name → coordinates
        let geo_url = format!(
            "{}/v1/search?name={}&count=1",
            self.geocoding_url, keyword
        );
        let response = self.client.get(&geo_url).timeout(API_TIMEOUT).send().await?;
        if !response.status().is_success() {
            return Err(format!("Geocoding API error: {}", response.status()).into());
        }

        let geo: GeocodingResponse = response.json().await?;
        let location = geo
            .results
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| format!("No coordinates found for city: {}", keyword))?;

        // Step 2: daily mean temperature for the window
        let archive_url = format!(
            "{}/v1/archive?latitude={}&longitude={}&start_date={}&end_date={}&daily=temperature_2m_mean",
            self.archive_url,
            location.latitude,
            location.longitude,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d"),
        );
        let response = self
            .client
            .get(&archive_url)
            .timeout(API_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(format!("Archive API error: {}", response.status()).into());
        }

        let archive: ArchiveResponse = response.json().await?;
        let daily = archive
            .daily
            .ok_or_else(|| format!("No data found for {} in the specified date range", keyword))?;

        let observations = observations_from_daily(daily)?;
        if observations.is_empty() {
            return Err(
                format!("No data found for {} in the specified date range", keyword).into(),
            );
        }

        Ok(observations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daily_parsing_skips_missing_values() {
        let daily = Daily {
            time: vec![
                "2024-01-01".to_string(),
                "2024-01-02".to_string(),
                "2024-01-03".to_string(),
            ],
            temperature_2m_mean: vec![Some(1.5), None, Some(-2.0)],
        };

        let observations = observations_from_daily(daily).unwrap();

        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].value, 1.5);
        assert_eq!(observations[1].value, -2.0);
        assert_eq!(
            observations[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_daily_parsing_rejects_malformed_date() {
        let daily = Daily {
            time: vec!["01/02/2024".to_string()],
            temperature_2m_mean: vec![Some(1.0)],
        };

        assert!(observations_from_daily(daily).is_err());
    }

    #[tokio::test]
    #[ignore] // Run only when testing with live API
    async fn test_fetch_live() {
        let source = WeatherDataSource::new();
        let end = Utc::now();
        let start = end - chrono::Duration::days(14);

        let observations = source.fetch("Berlin", start, end).await.unwrap();
        assert!(!observations.is_empty());
    }
}
