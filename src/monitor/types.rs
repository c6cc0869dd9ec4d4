//! Core data structures for subscription monitoring
//!
//! All types map to the SQLite schema in `store::run_schema_migrations`:
//! - `observations` table → `Observation` (keyed by domain, keyword, timestamp)
//! - `subscriptions` table → `Subscription` (keyed by domain, keyword)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// One timestamped numeric sample for a tracked keyword
///
/// Immutable once created. Produced only by a `DataSource`; owned by the
/// monitor that fetched it until handed to the `ObservationStore`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Category of data being tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataDomain {
    /// Daily stock close prices (keyword = ticker symbol)
    Stocks,
    /// Daily mean temperature (keyword = city name)
    Weather,
    /// Search interest over time (no provider registered by default)
    Trends,
    /// Synthetic data for demos and tests
    Fake,
}

impl DataDomain {
    /// Stable string form used in the database and in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            DataDomain::Stocks => "stocks",
            DataDomain::Weather => "weather",
            DataDomain::Trends => "trends",
            DataDomain::Fake => "fake",
        }
    }

    pub fn parse(s: &str) -> Option<DataDomain> {
        match s {
            "stocks" => Some(DataDomain::Stocks),
            "weather" => Some(DataDomain::Weather),
            "trends" => Some(DataDomain::Trends),
            "fake" => Some(DataDomain::Fake),
            _ => None,
        }
    }
}

impl fmt::Display for DataDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a subscription's monitor
///
/// Valid transitions: `Stopped → Running ⇄ Paused → Stopped`. A stopped
/// subscription can be started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Stopped,
    Running,
    Paused,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Stopped => "stopped",
            SubscriptionStatus::Running => "running",
            SubscriptionStatus::Paused => "paused",
        }
    }

    pub fn parse(s: &str) -> Option<SubscriptionStatus> {
        match s {
            "stopped" => Some(SubscriptionStatus::Stopped),
            "running" => Some(SubscriptionStatus::Running),
            "paused" => Some(SubscriptionStatus::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked (domain, keyword) monitoring target
///
/// Identity is the (domain, keyword) pair - at most one subscription exists
/// per pair. Mutated by its monitor on every status change and every tick;
/// deleted only by an explicit delete that also purges its observations.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub domain: DataDomain,
    pub keyword: String,
    /// Poll interval; always positive
    pub interval: Duration,
    pub status: SubscriptionStatus,
    /// Timestamp of the last completed tick (heartbeat)
    pub last_run: Option<DateTime<Utc>>,
    /// Last fetch or persistence error, cleared on the next successful fetch
    pub last_error: Option<String>,
}

impl Subscription {
    pub fn new(domain: DataDomain, keyword: String, interval: Duration) -> Self {
        Self {
            domain,
            keyword,
            interval,
            status: SubscriptionStatus::Stopped,
            last_run: None,
            last_error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_string_roundtrip() {
        for domain in [
            DataDomain::Stocks,
            DataDomain::Weather,
            DataDomain::Trends,
            DataDomain::Fake,
        ] {
            assert_eq!(DataDomain::parse(domain.as_str()), Some(domain));
        }
        assert_eq!(DataDomain::parse("stonks"), None);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            SubscriptionStatus::Stopped,
            SubscriptionStatus::Running,
            SubscriptionStatus::Paused,
        ] {
            assert_eq!(SubscriptionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SubscriptionStatus::parse("sleeping"), None);
    }

    #[test]
    fn test_new_subscription_starts_stopped() {
        let sub = Subscription::new(
            DataDomain::Stocks,
            "AAPL".to_string(),
            Duration::from_secs(60),
        );
        assert_eq!(sub.status, SubscriptionStatus::Stopped);
        assert!(sub.last_run.is_none());
        assert!(sub.last_error.is_none());
    }
}
