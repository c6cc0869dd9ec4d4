//! # Subscription Monitoring Core
//!
//! Implements the monitoring control loop:
//! - One `Monitor` per tracked (domain, keyword) pair, each owning an
//!   independent poll loop task
//! - Start/pause/resume/stop lifecycle, persisted on every transition
//! - Fixed-attempt retry around each fetch
//! - Registry that recovers all persisted subscriptions at startup
//!
//! ## Architecture
//!
//! The core knows nothing about provider wire formats. It talks to two
//! narrow contracts:
//! 1. `DataSource::fetch(keyword, start, end)` produces observations
//! 2. `ObservationStore` durably appends observations and upserts
//!    subscription state
//!
//! Every tick the loop fetches the `[now - interval, now)` window, appends
//! successes, records the last error on retry exhaustion, and persists the
//! subscription unconditionally so external observers always see a fresh
//! heartbeat. Failures never escape a tick: a broken source shows up as
//! `last_error` on a degraded-but-alive subscription, not a dead process.
//!
//! Subscriptions are fully independent - a slow fetch in one monitor never
//! delays another's tick.
//!
//! ## Module Organization
//!
//! - `types` - Core data structures (Observation, Subscription)
//! - `error` - Error taxonomy
//! - `retry` - Fixed-attempt fetch retry policy
//! - `source` - DataSource and factory contracts
//! - `store` - ObservationStore contract + SQLite implementation
//! - `service` - Per-subscription Monitor and its poll loop
//! - `registry` - Startup recovery and keyword management
//! - `config` - Environment-based runtime configuration

pub mod config;
pub mod error;
pub mod registry;
pub mod retry;
pub mod service;
pub mod source;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::MonitorConfig;
pub use error::{BoxError, FetchExhausted, UnsupportedDomain};
pub use registry::{LoadReport, MonitorRegistry};
pub use retry::RetryPolicy;
pub use service::Monitor;
pub use source::{DataSource, SourceFactory};
pub use store::{ObservationStore, SqliteObservationStore};
pub use types::{DataDomain, Observation, Subscription, SubscriptionStatus};
