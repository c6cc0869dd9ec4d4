//! Per-subscription monitoring service
//!
//! One `Monitor` owns one subscription for its whole lifetime. While running
//! it holds exactly one spawned poll loop task; the loop fetches the
//! `[now - interval, now)` window once per interval, applies the retry
//! policy, appends successes to the store, and persists the subscription on
//! every tick so `last_run` is an accurate heartbeat after a crash.
//!
//! Locking: the whole tick body runs under the subscription lock, the same
//! lock the lifecycle commands take. A pause or stop therefore never races a
//! fetch already in flight - a paused subscription never half-commits a
//! batch. Different monitors share nothing but the store and are fully
//! independent.
//!
//! Cancellation is cooperative: stop flips a watch flag that the loop checks
//! between ticks and before each fetch; a fetch already started completes
//! first (bounded by the source's own timeout plus the retry budget).

use super::error::BoxError;
use super::retry::RetryPolicy;
use super::source::DataSource;
use super::store::ObservationStore;
use super::types::{DataDomain, Subscription, SubscriptionStatus};
use chrono::Utc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;

const STATUS_STOPPED: u8 = 0;
const STATUS_RUNNING: u8 = 1;
const STATUS_PAUSED: u8 = 2;

fn status_to_u8(status: SubscriptionStatus) -> u8 {
    match status {
        SubscriptionStatus::Stopped => STATUS_STOPPED,
        SubscriptionStatus::Running => STATUS_RUNNING,
        SubscriptionStatus::Paused => STATUS_PAUSED,
    }
}

fn status_from_u8(raw: u8) -> SubscriptionStatus {
    match raw {
        STATUS_RUNNING => SubscriptionStatus::Running,
        STATUS_PAUSED => SubscriptionStatus::Paused,
        _ => SubscriptionStatus::Stopped,
    }
}

/// State shared between the `Monitor` handle and its poll loop task
struct MonitorShared {
    domain: DataDomain,
    keyword: String,
    source: Arc<dyn DataSource>,
    store: Arc<dyn ObservationStore>,
    retry: RetryPolicy,
    /// Authoritative subscription state, guarded by the per-subscription lock
    subscription: Mutex<Subscription>,
    /// Advisory mirror for lock-free `status()` reads
    status: AtomicU8,
}

impl MonitorShared {
    fn set_status(&self, status: SubscriptionStatus) {
        self.status.store(status_to_u8(status), Ordering::Release);
    }
}

/// Bookkeeping for one spawned poll loop
struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

/// Controllable background poller for one (domain, keyword) subscription
///
/// State machine: `Stopped → Running ⇄ Paused → Stopped`, with `Stopped`
/// re-enterable via `start()`. Every transition is persisted synchronously -
/// the stored status always reflects the actual run state as of the last
/// successful persistence call.
pub struct Monitor {
    shared: Arc<MonitorShared>,
    /// Present exactly while a poll loop task exists
    runtime: std::sync::Mutex<Option<LoopHandle>>,
}

impl Monitor {
    /// Build a monitor around a (possibly recovered) subscription
    ///
    /// No loop exists at construction, so a persisted `Running` status is
    /// normalized to `Stopped` here and re-entered via `start()` by the
    /// registry. A persisted `Paused` status is honored as-is: the monitor
    /// stays dormant until an explicit `resume()`.
    pub fn new(
        mut subscription: Subscription,
        source: Arc<dyn DataSource>,
        store: Arc<dyn ObservationStore>,
        retry: RetryPolicy,
    ) -> Self {
        if subscription.status == SubscriptionStatus::Running {
            subscription.status = SubscriptionStatus::Stopped;
        }

        let shared = Arc::new(MonitorShared {
            domain: subscription.domain,
            keyword: subscription.keyword.clone(),
            status: AtomicU8::new(status_to_u8(subscription.status)),
            subscription: Mutex::new(subscription),
            source,
            store,
            retry,
        });

        Self {
            shared,
            runtime: std::sync::Mutex::new(None),
        }
    }

    pub fn domain(&self) -> DataDomain {
        self.shared.domain
    }

    pub fn keyword(&self) -> &str {
        &self.shared.keyword
    }

    /// Current lifecycle state
    ///
    /// Advisory lock-free read for UIs; not a synchronization primitive.
    pub fn status(&self) -> SubscriptionStatus {
        status_from_u8(self.shared.status.load(Ordering::Acquire))
    }

    /// Snapshot of the subscription (status, interval, last_run, last_error)
    pub async fn subscription(&self) -> Subscription {
        self.shared.subscription.lock().await.clone()
    }

    /// Transition `Stopped → Running` and spawn the poll loop
    ///
    /// No-op if already running or paused: at most one loop ever exists.
    pub async fn start(&self) -> Result<(), BoxError> {
        {
            let mut sub = self.shared.subscription.lock().await;
            if sub.status != SubscriptionStatus::Stopped {
                return Ok(());
            }
            sub.status = SubscriptionStatus::Running;
            self.shared.set_status(SubscriptionStatus::Running);
            self.shared.store.upsert_subscription(&sub).await?;
        }

        self.spawn_loop();
        log::info!(
            "▶️  Monitoring started for {}/{}",
            self.shared.domain,
            self.shared.keyword
        );
        Ok(())
    }

    /// Transition `Running → Paused`
    ///
    /// The poll loop keeps ticking on schedule but skips the fetch step;
    /// the interval timer is not reset. No-op unless currently running.
    pub async fn pause(&self) -> Result<(), BoxError> {
        let mut sub = self.shared.subscription.lock().await;
        if sub.status != SubscriptionStatus::Running {
            return Ok(());
        }
        sub.status = SubscriptionStatus::Paused;
        self.shared.set_status(SubscriptionStatus::Paused);
        self.shared.store.upsert_subscription(&sub).await?;

        log::info!(
            "⏸️  Monitoring paused for {}/{}",
            self.shared.domain,
            self.shared.keyword
        );
        Ok(())
    }

    /// Transition `Paused → Running`
    ///
    /// Also spawns the poll loop for a monitor recovered in `Paused` state,
    /// which has no loop yet. No-op unless currently paused.
    pub async fn resume(&self) -> Result<(), BoxError> {
        {
            let mut sub = self.shared.subscription.lock().await;
            if sub.status != SubscriptionStatus::Paused {
                return Ok(());
            }
            sub.status = SubscriptionStatus::Running;
            self.shared.set_status(SubscriptionStatus::Running);
            self.shared.store.upsert_subscription(&sub).await?;
        }

        self.spawn_loop();
        log::info!(
            "▶️  Monitoring resumed for {}/{}",
            self.shared.domain,
            self.shared.keyword
        );
        Ok(())
    }

    /// Transition to `Stopped` and join the poll loop
    ///
    /// Sets the termination flag, persists `Stopped`, then blocks until the
    /// loop's current iteration finishes: once this returns, no further
    /// fetch or persist happens. No-op if already stopped.
    pub async fn stop(&self) -> Result<(), BoxError> {
        let handle = self.runtime.lock().unwrap().take();

        if let Some(ref h) = handle {
            // Termination flag first so a sleeping loop wakes promptly
            let _ = h.stop_tx.send(true);
        }

        {
            let mut sub = self.shared.subscription.lock().await;
            if sub.status == SubscriptionStatus::Stopped {
                return Ok(());
            }
            sub.status = SubscriptionStatus::Stopped;
            self.shared.set_status(SubscriptionStatus::Stopped);
            self.shared.store.upsert_subscription(&sub).await?;
        }

        if let Some(h) = handle {
            if let Err(e) = h.join.await {
                log::error!(
                    "❌ Poll loop task for {}/{} failed: {}",
                    self.shared.domain,
                    self.shared.keyword,
                    e
                );
            }
        }

        log::info!(
            "⏹️  Monitoring stopped for {}/{}",
            self.shared.domain,
            self.shared.keyword
        );
        Ok(())
    }

    /// Update and persist the poll interval of a live subscription
    ///
    /// Takes effect at the next tick boundary.
    pub async fn set_interval(&self, interval: Duration) -> Result<(), BoxError> {
        if interval.is_zero() {
            return Err("poll interval must be positive".into());
        }

        let mut sub = self.shared.subscription.lock().await;
        sub.interval = interval;
        self.shared.store.upsert_subscription(&sub).await?;
        Ok(())
    }

    fn spawn_loop(&self) {
        let mut runtime = self.runtime.lock().unwrap();
        if runtime.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = self.shared.clone();
        let join = tokio::spawn(poll_loop(shared, stop_rx));

        *runtime = Some(LoopHandle { stop_tx, join });
    }
}

/// Poll loop: one tick per interval until the stop flag is set
///
/// The first tick runs immediately on spawn. The inter-tick sleep is
/// selected against the stop signal so `stop()` never waits for a full
/// interval to elapse.
async fn poll_loop(shared: Arc<MonitorShared>, mut stop_rx: watch::Receiver<bool>) {
    log::info!(
        "⏰ Poll loop started for {}/{}",
        shared.domain,
        shared.keyword
    );

    loop {
        // Stop check before the fetch begins
        if *stop_rx.borrow() {
            break;
        }

        run_tick(&shared).await;

        let interval = shared.subscription.lock().await.interval;
        tokio::select! {
            _ = sleep(interval) => {}
            _ = stop_rx.changed() => break,
        }
    }

    log::info!(
        "✅ Poll loop stopped for {}/{}",
        shared.domain,
        shared.keyword
    );
}

/// One tick: fetch (unless paused), record the outcome, persist heartbeat
///
/// Runs entirely under the subscription lock. Never returns an error - a
/// failed fetch lands in `last_error`, a failed persist is logged and the
/// loop continues to the next scheduled tick.
async fn run_tick(shared: &Arc<MonitorShared>) {
    let mut sub = shared.subscription.lock().await;

    if sub.status == SubscriptionStatus::Running {
        let end = Utc::now();
        let start = end - chrono::Duration::milliseconds(sub.interval.as_millis() as i64);

        match shared
            .retry
            .fetch(shared.source.as_ref(), &sub.keyword, start, end)
            .await
        {
            Ok(observations) => {
                match shared
                    .store
                    .append(sub.domain, &sub.keyword, observations)
                    .await
                {
                    Ok(()) => sub.last_error = None,
                    Err(e) => {
                        log::error!(
                            "❌ Failed to append observations for {}/{}: {}",
                            sub.domain,
                            sub.keyword,
                            e
                        );
                        sub.last_error = Some(e.to_string());
                    }
                }
            }
            Err(e) => {
                log::error!("❌ Giving up on {}/{}: {}", sub.domain, sub.keyword, e);
                sub.last_error = Some(e.to_string());
            }
        }
    }

    // Heartbeat: persisted every tick, paused or not, success or failure
    sub.last_run = Some(Utc::now());
    if let Err(e) = shared.store.upsert_subscription(&sub).await {
        log::error!(
            "❌ Failed to persist subscription state for {}/{}: {}",
            sub.domain,
            sub.keyword,
            e
        );
    }
}
