//! Persistence contract and SQLite implementation
//!
//! Two tables, both durable across restarts:
//! - `observations` - append-only samples keyed by (domain, keyword, timestamp)
//! - `subscriptions` - one row per tracked pair, upserted on every tick and
//!   every lifecycle transition
//!
//! Timestamps are stored as i64 epoch milliseconds.

use super::error::BoxError;
use super::types::{DataDomain, Observation, Subscription, SubscriptionStatus};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Durable storage for observations and subscription state
///
/// Shared by all monitors; implementations must be safe for concurrent use.
/// Appends are transactional: a batch lands completely or not at all.
#[async_trait]
pub trait ObservationStore: Send + Sync {
    /// Append a fetched batch for (domain, keyword)
    ///
    /// Idempotent on the (domain, keyword, timestamp) key so a re-fetched
    /// window never duplicates rows.
    async fn append(
        &self,
        domain: DataDomain,
        keyword: &str,
        observations: Vec<Observation>,
    ) -> Result<(), BoxError>;

    /// Read stored observations in the window `[start, end)`, ordered by time
    async fn query(
        &self,
        domain: DataDomain,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, BoxError>;

    /// Insert or update the subscription row for its (domain, keyword) pair
    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), BoxError>;

    /// Load every persisted subscription
    async fn load_subscriptions(&self) -> Result<Vec<Subscription>, BoxError>;

    /// Purge both the subscription row and all its observations
    async fn delete_all(&self, domain: DataDomain, keyword: &str) -> Result<(), BoxError>;
}

/// Create tables if missing and enable WAL mode
///
/// Idempotent; safe to run on every startup.
pub fn run_schema_migrations(conn: &Connection) -> Result<(), BoxError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS observations (
            domain      TEXT NOT NULL,
            keyword     TEXT NOT NULL,
            timestamp   INTEGER NOT NULL,
            value       REAL NOT NULL,
            PRIMARY KEY (domain, keyword, timestamp)
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            domain      TEXT NOT NULL,
            keyword     TEXT NOT NULL,
            interval_ms INTEGER NOT NULL,
            status      TEXT NOT NULL,
            last_run    INTEGER,
            last_error  TEXT,
            updated_at  INTEGER NOT NULL,
            created_at  INTEGER NOT NULL,
            PRIMARY KEY (domain, keyword)
        );
        "#,
    )?;

    Ok(())
}

/// SQLite-backed `ObservationStore`
///
/// A single connection behind a mutex; no awaits happen while the lock is
/// held, so concurrent monitors serialize briefly on each write.
pub struct SqliteObservationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteObservationStore {
    /// Open (creating if needed) the database at `db_path` and run migrations
    pub fn open(db_path: &str) -> Result<Self, BoxError> {
        let conn = Connection::open(db_path)?;
        run_schema_migrations(&conn)?;
        log::info!("📊 Observation store ready at {}", db_path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>, BoxError> {
        Utc.timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| format!("invalid timestamp in database: {}", ms).into())
    }
}

#[async_trait]
impl ObservationStore for SqliteObservationStore {
    async fn append(
        &self,
        domain: DataDomain,
        keyword: &str,
        observations: Vec<Observation>,
    ) -> Result<(), BoxError> {
        if observations.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        for obs in &observations {
            tx.execute(
                r#"
                INSERT INTO observations (domain, keyword, timestamp, value)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(domain, keyword, timestamp) DO UPDATE SET
                    value = excluded.value
                "#,
                rusqlite::params![
                    domain.as_str(),
                    keyword,
                    obs.timestamp.timestamp_millis(),
                    obs.value,
                ],
            )?;
        }

        tx.commit()?;
        log::debug!(
            "✅ Appended {} observations for {}/{}",
            observations.len(),
            domain,
            keyword
        );

        Ok(())
    }

    async fn query(
        &self,
        domain: DataDomain,
        keyword: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Observation>, BoxError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT timestamp, value FROM observations
            WHERE domain = ?1 AND keyword = ?2 AND timestamp >= ?3 AND timestamp < ?4
            ORDER BY timestamp
            "#,
        )?;

        let rows = stmt.query_map(
            rusqlite::params![
                domain.as_str(),
                keyword,
                start.timestamp_millis(),
                end.timestamp_millis(),
            ],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?)),
        )?;

        let mut observations = Vec::new();
        for row in rows {
            let (ms, value) = row?;
            observations.push(Observation {
                timestamp: Self::timestamp_from_millis(ms)?,
                value,
            });
        }

        Ok(observations)
    }

    async fn upsert_subscription(&self, subscription: &Subscription) -> Result<(), BoxError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().timestamp_millis();

        conn.execute(
            r#"
            INSERT INTO subscriptions
                (domain, keyword, interval_ms, status, last_run, last_error, updated_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            ON CONFLICT(domain, keyword) DO UPDATE SET
                interval_ms = excluded.interval_ms,
                status = excluded.status,
                last_run = excluded.last_run,
                last_error = excluded.last_error,
                updated_at = excluded.updated_at
            "#,
            rusqlite::params![
                subscription.domain.as_str(),
                subscription.keyword,
                subscription.interval.as_millis() as i64,
                subscription.status.as_str(),
                subscription.last_run.map(|t| t.timestamp_millis()),
                subscription.last_error,
                now,
            ],
        )?;

        Ok(())
    }

    async fn load_subscriptions(&self) -> Result<Vec<Subscription>, BoxError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            r#"
            SELECT domain, keyword, interval_ms, status, last_run, last_error
            FROM subscriptions
            ORDER BY domain, keyword
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut subscriptions = Vec::new();
        for row in rows {
            let (domain, keyword, interval_ms, status, last_run, last_error) = row?;

            let domain = DataDomain::parse(&domain)
                .ok_or_else(|| format!("unknown domain in subscriptions table: {}", domain))?;
            let status = SubscriptionStatus::parse(&status)
                .ok_or_else(|| format!("unknown status in subscriptions table: {}", status))?;

            let last_run = match last_run {
                Some(ms) => Some(Self::timestamp_from_millis(ms)?),
                None => None,
            };

            subscriptions.push(Subscription {
                domain,
                keyword,
                interval: Duration::from_millis(interval_ms.max(0) as u64),
                status,
                last_run,
                last_error,
            });
        }

        Ok(subscriptions)
    }

    async fn delete_all(&self, domain: DataDomain, keyword: &str) -> Result<(), BoxError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM observations WHERE domain = ?1 AND keyword = ?2",
            rusqlite::params![domain.as_str(), keyword],
        )?;
        tx.execute(
            "DELETE FROM subscriptions WHERE domain = ?1 AND keyword = ?2",
            rusqlite::params![domain.as_str(), keyword],
        )?;

        tx.commit()?;
        log::info!("🗑️  Purged all data for {}/{}", domain, keyword);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (NamedTempFile, SqliteObservationStore) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = SqliteObservationStore::open(db_path).unwrap();
        (temp_file, store)
    }

    fn obs(ms: i64, value: f64) -> Observation {
        Observation {
            timestamp: Utc.timestamp_millis_opt(ms).unwrap(),
            value,
        }
    }

    #[tokio::test]
    async fn test_append_and_query_window() {
        let (_temp, store) = create_test_store();
        let domain = DataDomain::Stocks;

        store
            .append(
                domain,
                "AAPL",
                vec![obs(1_000, 10.0), obs(2_000, 20.0), obs(3_000, 30.0)],
            )
            .await
            .unwrap();

        // Window is [start, end): 3_000 is excluded
        let result = store
            .query(
                domain,
                "AAPL",
                Utc.timestamp_millis_opt(1_000).unwrap(),
                Utc.timestamp_millis_opt(3_000).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].value, 10.0);
        assert_eq!(result[1].value, 20.0);
    }

    #[tokio::test]
    async fn test_append_same_timestamp_is_idempotent() {
        let (_temp, store) = create_test_store();
        let domain = DataDomain::Stocks;

        store.append(domain, "AAPL", vec![obs(1_000, 10.0)]).await.unwrap();
        store.append(domain, "AAPL", vec![obs(1_000, 11.0)]).await.unwrap();

        let result = store
            .query(
                domain,
                "AAPL",
                Utc.timestamp_millis_opt(0).unwrap(),
                Utc.timestamp_millis_opt(10_000).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, 11.0);
    }

    #[tokio::test]
    async fn test_query_separates_keywords_and_domains() {
        let (_temp, store) = create_test_store();

        store
            .append(DataDomain::Stocks, "AAPL", vec![obs(1_000, 1.0)])
            .await
            .unwrap();
        store
            .append(DataDomain::Stocks, "MSFT", vec![obs(1_000, 2.0)])
            .await
            .unwrap();
        store
            .append(DataDomain::Weather, "AAPL", vec![obs(1_000, 3.0)])
            .await
            .unwrap();

        let result = store
            .query(
                DataDomain::Stocks,
                "AAPL",
                Utc.timestamp_millis_opt(0).unwrap(),
                Utc.timestamp_millis_opt(10_000).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].value, 1.0);
    }

    #[tokio::test]
    async fn test_upsert_subscription_single_row_per_pair() {
        let (_temp, store) = create_test_store();

        let mut sub = Subscription::new(
            DataDomain::Weather,
            "Berlin".to_string(),
            Duration::from_secs(60),
        );
        store.upsert_subscription(&sub).await.unwrap();

        sub.status = SubscriptionStatus::Running;
        sub.interval = Duration::from_secs(120);
        sub.last_error = Some("timeout".to_string());
        store.upsert_subscription(&sub).await.unwrap();

        let loaded = store.load_subscriptions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].domain, DataDomain::Weather);
        assert_eq!(loaded[0].keyword, "Berlin");
        assert_eq!(loaded[0].interval, Duration::from_secs(120));
        assert_eq!(loaded[0].status, SubscriptionStatus::Running);
        assert_eq!(loaded[0].last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_load_subscriptions_roundtrip() {
        let (_temp, store) = create_test_store();
        let last_run = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let sub = Subscription {
            domain: DataDomain::Fake,
            keyword: "demo".to_string(),
            interval: Duration::from_millis(1_500),
            status: SubscriptionStatus::Paused,
            last_run: Some(last_run),
            last_error: None,
        };
        store.upsert_subscription(&sub).await.unwrap();

        let loaded = store.load_subscriptions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].status, SubscriptionStatus::Paused);
        assert_eq!(loaded[0].interval, Duration::from_millis(1_500));
        assert_eq!(loaded[0].last_run, Some(last_run));
    }

    #[tokio::test]
    async fn test_delete_all_purges_observations_and_subscription() {
        let (_temp, store) = create_test_store();
        let domain = DataDomain::Stocks;

        let sub = Subscription::new(domain, "AAPL".to_string(), Duration::from_secs(60));
        store.upsert_subscription(&sub).await.unwrap();
        store
            .append(domain, "AAPL", vec![obs(1_000, 1.0), obs(2_000, 2.0)])
            .await
            .unwrap();

        // Unrelated pair survives the purge
        let other = Subscription::new(domain, "MSFT".to_string(), Duration::from_secs(60));
        store.upsert_subscription(&other).await.unwrap();

        store.delete_all(domain, "AAPL").await.unwrap();

        let result = store
            .query(
                domain,
                "AAPL",
                Utc.timestamp_millis_opt(0).unwrap(),
                Utc.timestamp_millis_opt(10_000).unwrap(),
            )
            .await
            .unwrap();
        assert!(result.is_empty());

        let loaded = store.load_subscriptions().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].keyword, "MSFT");
    }
}
