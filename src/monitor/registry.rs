//! Subscription registry - startup recovery and keyword management
//!
//! Owns every live `Monitor`, keyed by (domain, keyword). At startup
//! `load_all` reconstitutes monitors from persisted subscriptions:
//! `Running` ones restart their poll loop, `Paused` ones are rebuilt dormant
//! and wait for an explicit resume, `Stopped` ones just become startable
//! again. A subscription whose domain has no registered data source is
//! reported and skipped without affecting the rest.

use super::error::BoxError;
use super::retry::RetryPolicy;
use super::service::Monitor;
use super::source::SourceFactory;
use super::store::ObservationStore;
use super::types::{DataDomain, Subscription, SubscriptionStatus};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Outcome of `load_all`
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Monitors reconstituted (any status)
    pub loaded: usize,
    /// Monitors whose poll loop was restarted (persisted as `Running`)
    pub resumed: usize,
    /// Per-subscription failures: (domain, keyword, error)
    pub failed: Vec<(DataDomain, String, String)>,
}

/// Registry of all live monitors
pub struct MonitorRegistry {
    store: Arc<dyn ObservationStore>,
    factory: Arc<dyn SourceFactory>,
    retry: RetryPolicy,
    monitors: Mutex<HashMap<(DataDomain, String), Arc<Monitor>>>,
}

impl MonitorRegistry {
    pub fn new(
        store: Arc<dyn ObservationStore>,
        factory: Arc<dyn SourceFactory>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            factory,
            retry,
            monitors: Mutex::new(HashMap::new()),
        }
    }

    /// Reconstitute a monitor for every persisted subscription
    ///
    /// Failures are per-subscription: an unresolvable domain or a failed
    /// restart lands in the report and the remaining subscriptions still
    /// load. Pairs already present in the registry are left untouched.
    pub async fn load_all(&self) -> Result<LoadReport, BoxError> {
        let subscriptions = self.store.load_subscriptions().await?;
        let mut report = LoadReport::default();
        let mut monitors = self.monitors.lock().await;

        for sub in subscriptions {
            let key = (sub.domain, sub.keyword.clone());
            if monitors.contains_key(&key) {
                continue;
            }

            let source = match self.factory.resolve(sub.domain) {
                Ok(source) => source,
                Err(e) => {
                    log::error!("❌ Cannot recover {}/{}: {}", sub.domain, sub.keyword, e);
                    report.failed.push((sub.domain, sub.keyword, e.to_string()));
                    continue;
                }
            };

            let was_running = sub.status == SubscriptionStatus::Running;
            let monitor = Arc::new(Monitor::new(
                sub,
                source,
                self.store.clone(),
                self.retry.clone(),
            ));

            if was_running {
                // Loaded Running subscriptions restart their loop; loaded
                // Paused ones stay dormant until an explicit resume
                match monitor.start().await {
                    Ok(()) => report.resumed += 1,
                    Err(e) => {
                        log::error!(
                            "❌ Failed to restart {}/{}: {}",
                            monitor.domain(),
                            monitor.keyword(),
                            e
                        );
                        report
                            .failed
                            .push((monitor.domain(), monitor.keyword().to_string(), e.to_string()));
                    }
                }
            }

            report.loaded += 1;
            monitors.insert(key, monitor);
        }

        log::info!(
            "📋 Registry loaded {} subscriptions ({} restarted, {} failed)",
            report.loaded,
            report.resumed,
            report.failed.len()
        );

        Ok(report)
    }

    /// Create or update the subscription for (domain, keyword) and start it
    ///
    /// At most one subscription exists per pair: watching an existing pair
    /// updates its interval and restarts it if stopped, instead of creating
    /// a duplicate.
    pub async fn watch(
        &self,
        domain: DataDomain,
        keyword: &str,
        interval: Duration,
    ) -> Result<Arc<Monitor>, BoxError> {
        if interval.is_zero() {
            return Err("poll interval must be positive".into());
        }

        let mut monitors = self.monitors.lock().await;
        let key = (domain, keyword.to_string());

        if let Some(existing) = monitors.get(&key) {
            existing.set_interval(interval).await?;
            existing.start().await?;
            return Ok(existing.clone());
        }

        let source = self.factory.resolve(domain)?;
        let subscription = Subscription::new(domain, keyword.to_string(), interval);
        let monitor = Arc::new(Monitor::new(
            subscription,
            source,
            self.store.clone(),
            self.retry.clone(),
        ));
        monitor.start().await?;
        monitors.insert(key, monitor.clone());

        Ok(monitor)
    }

    /// Look up the monitor for a pair
    pub async fn get(&self, domain: DataDomain, keyword: &str) -> Option<Arc<Monitor>> {
        self.monitors
            .lock()
            .await
            .get(&(domain, keyword.to_string()))
            .cloned()
    }

    /// All live monitors, for UIs and shutdown
    pub async fn monitors(&self) -> Vec<Arc<Monitor>> {
        self.monitors.lock().await.values().cloned().collect()
    }

    /// Stop the pair's monitor and purge its subscription and observations
    ///
    /// The purge runs even if stopping fails to persist: the monitor is
    /// already unregistered at that point, so leaving its rows behind would
    /// orphan them with no live handle.
    pub async fn delete(&self, domain: DataDomain, keyword: &str) -> Result<(), BoxError> {
        let removed = self
            .monitors
            .lock()
            .await
            .remove(&(domain, keyword.to_string()));

        if let Some(monitor) = removed {
            if let Err(e) = monitor.stop().await {
                log::error!(
                    "❌ Failed to stop {}/{} before delete: {}",
                    domain,
                    keyword,
                    e
                );
            }
        }

        self.store.delete_all(domain, keyword).await?;
        Ok(())
    }

    /// Stop every monitor, joining each poll loop
    pub async fn stop_all(&self) {
        for monitor in self.monitors().await {
            if let Err(e) = monitor.stop().await {
                log::error!(
                    "❌ Failed to stop {}/{}: {}",
                    monitor.domain(),
                    monitor.keyword(),
                    e
                );
            }
        }
    }
}
