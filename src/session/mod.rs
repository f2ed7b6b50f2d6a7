//! Analysis session registry.
//!
//! A session holds one loaded dataset and the latest report computed on
//! it. Sessions idle out after a TTL: access checks expiry lazily and a
//! background reaper sweeps on a fixed interval.

use crate::analysis::AnalysisError;
use crate::dataset::Dataset;
use crate::models::AnalysisReport;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Errors surfaced at the session boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session '{0}' not found")]
    NotFound(String),

    #[error("session '{0}' has expired")]
    Expired(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Describes the dataset a session was created from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionMetadata {
    pub dataset_name: String,
    pub rows: usize,
    pub columns: usize,
    pub loaded_at: DateTime<Utc>,
}

impl SessionMetadata {
    pub fn for_dataset(dataset: &Dataset) -> Self {
        Self {
            dataset_name: dataset.name.clone(),
            rows: dataset.n_rows(),
            columns: dataset.n_columns(),
            loaded_at: Utc::now(),
        }
    }
}

/// Snapshot of one session. The dataset is shared, not copied.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub dataset: Arc<Dataset>,
    pub metadata: SessionMetadata,
    pub report: Option<AnalysisReport>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Registry counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    /// Sessions held, including expired ones not yet swept.
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub ttl_seconds: i64,
}

/// Storage for analysis sessions.
pub trait SessionStore: Send + Sync {
    /// Register a dataset and return the new session id.
    fn create(&self, dataset: Dataset, metadata: SessionMetadata) -> String;

    /// Fetch a session, refreshing its access time. Expired sessions are
    /// evicted and reported as [`SessionError::Expired`].
    fn get(&self, id: &str) -> Result<Session, SessionError>;

    /// Store the latest report for a session. Last write wins.
    fn update(&self, id: &str, report: AnalysisReport) -> Result<(), SessionError>;

    /// Remove a session. Returns whether it existed.
    fn delete(&self, id: &str) -> bool;

    /// Remove every session. Returns how many were removed.
    fn purge_all(&self) -> usize;

    /// Remove expired sessions. Returns how many were removed.
    fn cleanup_expired(&self) -> usize;

    fn stats(&self) -> SessionStats;
}

/// Process-local store behind a read/write lock.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn with_ttl_minutes(minutes: i64) -> Self {
        Self::new(Duration::minutes(minutes))
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        now - session.last_accessed > self.ttl
    }

    #[cfg(test)]
    fn backdate(&self, id: &str, by: Duration) {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(session) = sessions.get_mut(id) {
            session.last_accessed = session.last_accessed - by;
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn create(&self, dataset: Dataset, metadata: SessionMetadata) -> String {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = Session {
            id: id.clone(),
            dataset: Arc::new(dataset),
            metadata,
            report: None,
            created_at: now,
            last_accessed: now,
        };
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), session);
        debug!("Created session {}", id);
        id
    }

    fn get(&self, id: &str) -> Result<Session, SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let expired = match sessions.get(id) {
            Some(session) => self.is_expired(session, now),
            None => return Err(SessionError::NotFound(id.to_string())),
        };
        if expired {
            sessions.remove(id);
            debug!("Session {} expired on access", id);
            return Err(SessionError::Expired(id.to_string()));
        }
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.last_accessed = now;
        Ok(session.clone())
    }

    fn update(&self, id: &str, report: AnalysisReport) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        session.report = Some(report);
        session.last_accessed = Utc::now();
        Ok(())
    }

    fn delete(&self, id: &str) -> bool {
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    fn purge_all(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let count = sessions.len();
        sessions.clear();
        count
    }

    fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !self.is_expired(s, now));
        before - sessions.len()
    }

    fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        let now = Utc::now();
        let expired = sessions
            .values()
            .filter(|s| self.is_expired(s, now))
            .count();
        SessionStats {
            total: sessions.len(),
            active: sessions.len() - expired,
            expired,
            ttl_seconds: self.ttl.num_seconds(),
        }
    }
}

/// Sweep expired sessions every `every` until the task is aborted.
pub fn spawn_reaper(store: Arc<dyn SessionStore>, every: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let removed = store.cleanup_expired();
            if removed > 0 {
                info!("Removed {} expired session(s)", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample_dataset;

    fn store_with_session() -> (InMemorySessionStore, String) {
        let store = InMemorySessionStore::with_ttl_minutes(60);
        let dataset = sample_dataset();
        let metadata = SessionMetadata::for_dataset(&dataset);
        let id = store.create(dataset, metadata);
        (store, id)
    }

    #[test]
    fn test_create_and_get() {
        let (store, id) = store_with_session();
        let session = store.get(&id).unwrap();
        assert_eq!(session.id, id);
        assert_eq!(session.metadata.dataset_name, "sample.csv");
        assert!(session.report.is_none());
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_unknown_session() {
        let store = InMemorySessionStore::with_ttl_minutes(60);
        assert!(matches!(store.get("nope"), Err(SessionError::NotFound(_))));
        assert!(!store.delete("nope"));
    }

    #[test]
    fn test_lazy_expiry_on_get() {
        let (store, id) = store_with_session();
        store.backdate(&id, Duration::minutes(61));
        assert!(matches!(store.get(&id), Err(SessionError::Expired(_))));
        // Evicted by the failed access
        assert!(matches!(store.get(&id), Err(SessionError::NotFound(_))));
    }

    #[test]
    fn test_cleanup_and_stats() {
        let (store, old) = store_with_session();
        let dataset = sample_dataset();
        let metadata = SessionMetadata::for_dataset(&dataset);
        let fresh = store.create(dataset, metadata);
        store.backdate(&old, Duration::hours(2));

        let stats = store.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.ttl_seconds, 3600);

        assert_eq!(store.cleanup_expired(), 1);
        assert!(store.get(&fresh).is_ok());
        assert_eq!(store.purge_all(), 1);
        assert_eq!(store.stats().total, 0);
    }

    #[test]
    fn test_reaper_sweeps_expired_sessions() {
        tokio_test::block_on(async {
            let store = Arc::new(InMemorySessionStore::with_ttl_minutes(1));
            let dataset = sample_dataset();
            let metadata = SessionMetadata::for_dataset(&dataset);
            let id = store.create(dataset, metadata);
            store.backdate(&id, Duration::minutes(5));

            let handle = spawn_reaper(store.clone(), std::time::Duration::from_millis(10));
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            handle.abort();

            assert_eq!(store.stats().total, 0);
        });
    }
}
