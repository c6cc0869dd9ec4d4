//! # Trendwatch
//!
//! Background monitoring of keyword time series. Each tracked
//! (domain, keyword) pair gets its own poll loop that periodically pulls
//! observations from a pluggable data source, stores them in SQLite, and
//! persists its own lifecycle state so it survives restarts.
//!
//! ## Module Organization
//!
//! - `monitor` - Core: per-subscription service, registry, retry policy,
//!   persistence contracts
//! - `sources` - Data source implementations per domain (stocks, weather,
//!   fake) and the domain lookup table

pub mod monitor;
pub mod sources;
