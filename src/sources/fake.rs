//! Synthetic data source for demos and tests
//!
//! Returns one observation per fetch: a random walk step around a base
//! value, stamped at the end of the requested window. Counts its own
//! invocations so tests can assert call budgets without instrumenting the
//! monitor.

use crate::monitor::error::BoxError;
use crate::monitor::source::DataSource;
use crate::monitor::types::Observation;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug)]
pub struct FakeDataSource {
    base_value: f64,
    calls: AtomicUsize,
}

impl FakeDataSource {
    pub fn new(base_value: f64) -> Self {
        Self {
            base_value,
            calls: AtomicUsize::new(0),
        }
    }

    /// Total number of fetch calls made against this source
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for FakeDataSource {
    async fn fetch(
        &self,
        _keyword: &str,
        _start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let noise: f64 = rand::thread_rng().gen_range(-1.0..1.0);
        Ok(vec![Observation {
            timestamp: end,
            value: self.base_value + noise,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_observation_per_call() {
        let source = FakeDataSource::new(50.0);
        let now = Utc::now();

        let batch = source.fetch("anything", now, now).await.unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].timestamp, now);
        assert!((batch[0].value - 50.0).abs() <= 1.0);
        assert_eq!(source.call_count(), 1);
    }
}
