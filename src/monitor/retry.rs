//! Fixed-attempt retry policy for fetch failures

use super::error::FetchExhausted;
use super::source::DataSource;
use super::types::Observation;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::time::sleep;

/// Fixed-attempt, fixed-delay retry wrapper around `DataSource::fetch`
///
/// Stateless across ticks: every tick restarts the attempt count at zero,
/// so a permanently failing source retries forever, once per interval.
/// There is no circuit breaker and no growing backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            // Zero attempts would make every tick a silent no-op
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run one tick's fetch, retrying on failure
    ///
    /// Returns the first successful batch, or `FetchExhausted` carrying the
    /// final attempt's error once all attempts are spent. Waits
    /// `retry_delay` between attempts but not after the last one.
    pub async fn fetch(
        &self,
        source: &dyn DataSource,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, FetchExhausted> {
        let mut last_error = String::new();

        for attempt in 0..self.max_attempts {
            match source.fetch(keyword, start, end).await {
                Ok(observations) => return Ok(observations),
                Err(e) => {
                    last_error = e.to_string();
                    log::warn!(
                        "⏳ Fetch failed for {} (attempt {}/{}): {}",
                        keyword,
                        attempt + 1,
                        self.max_attempts,
                        last_error
                    );
                    if attempt + 1 < self.max_attempts {
                        sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(FetchExhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}
