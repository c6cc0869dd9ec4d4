//! Data source implementations per domain
//!
//! Each domain gets one capability implementation selected through
//! `SourceRegistry`, the domain → source lookup table handed to the
//! monitor registry. No shared state between sources.
//!
//! The `Trends` domain has no registered provider: the public trends API
//! needs a session-token handshake that has no stable contract, so the
//! domain surfaces as `UnsupportedDomain` until a provider exists.

pub mod fake;
pub mod stock;
pub mod weather;

pub use fake::FakeDataSource;
pub use stock::StockDataSource;
pub use weather::WeatherDataSource;

use crate::monitor::error::UnsupportedDomain;
use crate::monitor::source::{DataSource, SourceFactory};
use crate::monitor::types::DataDomain;
use std::collections::HashMap;
use std::sync::Arc;

/// Domain → DataSource lookup table
pub struct SourceRegistry {
    sources: HashMap<DataDomain, Arc<dyn DataSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: HashMap::new(),
        }
    }

    /// Registry with the production providers: stocks and weather
    ///
    /// `Fake` is registered explicitly by demos and tests; `Trends` stays
    /// unsupported (see module doc).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(DataDomain::Stocks, Arc::new(StockDataSource::new()));
        registry.register(DataDomain::Weather, Arc::new(WeatherDataSource::new()));
        registry
    }

    pub fn register(&mut self, domain: DataDomain, source: Arc<dyn DataSource>) {
        self.sources.insert(domain, source);
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceFactory for SourceRegistry {
    fn resolve(&self, domain: DataDomain) -> Result<Arc<dyn DataSource>, UnsupportedDomain> {
        self.sources
            .get(&domain)
            .cloned()
            .ok_or(UnsupportedDomain(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_stocks_and_weather() {
        let registry = SourceRegistry::with_defaults();
        assert!(registry.resolve(DataDomain::Stocks).is_ok());
        assert!(registry.resolve(DataDomain::Weather).is_ok());
    }

    #[test]
    fn test_unregistered_domains_are_unsupported() {
        let registry = SourceRegistry::with_defaults();

        let err = registry.resolve(DataDomain::Trends).unwrap_err();
        assert!(err.to_string().contains("trends"));
        assert!(registry.resolve(DataDomain::Fake).is_err());
    }

    #[test]
    fn test_register_overrides_lookup() {
        let mut registry = SourceRegistry::new();
        registry.register(DataDomain::Fake, Arc::new(FakeDataSource::new(1.0)));
        assert!(registry.resolve(DataDomain::Fake).is_ok());
        assert!(registry.resolve(DataDomain::Stocks).is_err());
    }
}
