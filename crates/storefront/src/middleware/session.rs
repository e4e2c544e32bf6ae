//! Session middleware configuration.
//!
//! Sessions live in memory; the only state they carry is the backend bearer
//! token, a copy of the user record and a pending gateway order. A restart
//! logs everyone out, which the backend token model already tolerates.
//!
//! Records are held in a moka cache whose per-entry expiry follows each
//! record's `expiry_date`, so abandoned sessions are evicted instead of
//! accumulating for the life of the process.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{Expiry as CacheExpiry, future::Cache};
use tower_sessions::cookie::time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store;
use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::StorefrontConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "se_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Upper bound on live sessions held at once.
const MAX_SESSIONS: u64 = 100_000;

/// Time left until a record expires, zero once it has passed.
fn time_left(record: &Record) -> Duration {
    Duration::try_from(record.expiry_date - OffsetDateTime::now_utc()).unwrap_or(Duration::ZERO)
}

/// Expire each cache entry when its session record does.
struct RecordExpiry;

impl CacheExpiry<Id, Record> for RecordExpiry {
    fn expire_after_create(&self, _id: &Id, record: &Record, _at: Instant) -> Option<Duration> {
        Some(time_left(record))
    }

    fn expire_after_update(
        &self,
        _id: &Id,
        record: &Record,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(time_left(record))
    }
}

/// In-memory session store that drops expired records.
#[derive(Debug, Clone)]
pub struct SessionCache {
    records: Cache<Id, Record>,
}

impl SessionCache {
    #[must_use]
    pub fn new(max_sessions: u64) -> Self {
        Self {
            records: Cache::builder()
                .max_capacity(max_sessions)
                .expire_after(RecordExpiry)
                .build(),
        }
    }

    /// Number of sessions currently held, after pending evictions run.
    pub async fn live_sessions(&self) -> u64 {
        self.records.run_pending_tasks().await;
        self.records.entry_count()
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(MAX_SESSIONS)
    }
}

#[async_trait]
impl SessionStore for SessionCache {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        while self.records.contains_key(&record.id) {
            record.id = Id::default();
        }
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        self.records.insert(record.id, record.clone()).await;
        Ok(())
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        Ok(self
            .records
            .get(id)
            .await
            .filter(|record| record.expiry_date > OffsetDateTime::now_utc()))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.records.invalidate(id).await;
        Ok(())
    }
}

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<SessionCache> {
    SessionManagerLayer::new(SessionCache::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_https())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use tower_sessions::cookie::time::Duration as TimeDuration;

    use super::*;

    fn record(expires_in: TimeDuration) -> Record {
        Record {
            id: Id::default(),
            data: HashMap::from([("auth".to_string(), serde_json::json!({"token": "t"}))]),
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    #[tokio::test]
    async fn test_live_session_round_trip() {
        let store = SessionCache::default();
        let mut live = record(TimeDuration::hours(1));

        store.create(&mut live).await.unwrap();
        let loaded = store.load(&live.id).await.unwrap().unwrap();
        assert_eq!(loaded.data, live.data);

        store.delete(&live.id).await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_evicted() {
        let store = SessionCache::default();
        let mut expired = record(TimeDuration::seconds(-5));
        let mut live = record(TimeDuration::hours(1));

        store.create(&mut expired).await.unwrap();
        store.create(&mut live).await.unwrap();

        assert!(store.load(&expired.id).await.unwrap().is_none());
        assert_eq!(store.live_sessions().await, 1);
    }
}
