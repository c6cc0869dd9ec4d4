//! Contracts between the monitoring core and its data providers
//!
//! The core never sees provider wire formats; it only consumes normalized
//! `Observation` batches through `DataSource::fetch`.

use super::error::{BoxError, UnsupportedDomain};
use super::types::{DataDomain, Observation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Per-domain observation producer
///
/// Implemented by an external collaborator per domain (see `crate::sources`).
/// The empty-vs-error distinction is domain-specific: "no data in range" may
/// be a valid empty batch for one provider and an error for another. The
/// monitor treats any non-error empty result as a successful empty batch.
///
/// Implementations own their own timeouts; a fetch call is expected to
/// return in bounded time.
#[async_trait]
pub trait DataSource: Send + Sync + std::fmt::Debug {
    /// Fetch observations for `keyword` in the window `[start, end)`
    async fn fetch(
        &self,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, BoxError>;
}

/// Domain → DataSource lookup used by the registry
///
/// Shared read-only across monitors; resolution for an unknown domain fails
/// that one subscription without affecting others.
pub trait SourceFactory: Send + Sync {
    fn resolve(&self, domain: DataDomain) -> Result<Arc<dyn DataSource>, UnsupportedDomain>;
}
