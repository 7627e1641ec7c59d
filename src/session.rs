//! Session Store
//!
//! Registry of live practice sessions. Each session owns one engine connection,
//! bound at creation to the instance the pool picked for it.
//!
//! ## Architecture
//!
//! ```text
//! SessionStore
//! ├── sessions: RwLock<HashMap<SessionToken, Arc<Session>>>
//! │   └── Session
//! │       ├── connection: Mutex<Box<dyn EngineConnection>>  (bound for life)
//! │       ├── last_activity: Mutex<Instant>                 (monotonic)
//! │       └── query_count: AtomicU64
//! └── pool: Arc<ResourcePool>                               (consulted on create only)
//! ```
//!
//! ## Locking
//!
//! - `get`, `count`, `list` and the scan phase of `sweep` take the read lock
//! - `create`, `terminate` and the delete phase of `sweep` take the write lock
//! - `touch` takes no store lock; it only updates the session's own fields
//!
//! Callers receive `Arc<Session>`, so an in-flight query keeps its connection
//! alive even if the sweeper removes the entry underneath it.

use crate::engine::EngineConnection;
use crate::error::PracticeError;
use crate::pool::ResourcePool;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Opaque session token (`sess_` + 32 hex digits)
pub type SessionToken = String;

const TOKEN_PREFIX: &str = "sess_";

/// Fresh random token. 122 random bits, so collisions are negligible.
fn generate_token() -> SessionToken {
    format!("{TOKEN_PREFIX}{}", uuid::Uuid::new_v4().simple())
}

/// A single user's session.
pub struct Session {
    token: SessionToken,
    user_id: String,
    instance_index: usize,
    connection: Mutex<Box<dyn EngineConnection>>,
    created_at: Instant,
    created_at_utc: DateTime<Utc>,
    last_activity: Mutex<Instant>,
    query_count: AtomicU64,
    active_question_id: Mutex<Option<String>>,
}

impl Session {
    fn new(
        token: SessionToken,
        user_id: String,
        instance_index: usize,
        connection: Box<dyn EngineConnection>,
    ) -> Self {
        let now = Instant::now();
        Self {
            token,
            user_id,
            instance_index,
            connection: Mutex::new(connection),
            created_at: now,
            created_at_utc: Utc::now(),
            last_activity: Mutex::new(now),
            query_count: AtomicU64::new(0),
            active_question_id: Mutex::new(None),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Pool index of the instance this session's connection is bound to
    pub fn instance_index(&self) -> usize {
        self.instance_index
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn last_activity(&self) -> Instant {
        *self.last_activity.lock()
    }

    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    pub fn active_question_id(&self) -> Option<String> {
        self.active_question_id.lock().clone()
    }

    pub fn set_active_question(&self, question_id: Option<String>) {
        *self.active_question_id.lock() = question_id;
    }

    /// Advance the activity clock and count one query.
    ///
    /// The timestamp never moves backwards, even if two touches race.
    fn touch(&self) {
        let now = Instant::now();
        {
            let mut last = self.last_activity.lock();
            if now > *last {
                *last = now;
            }
        }
        self.query_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Idle strictly longer than `timeout` as of `now`.
    pub fn is_expired_at(&self, timeout: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity()) > timeout
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.is_expired_at(timeout, Instant::now())
    }

    /// Run `f` with exclusive use of the session's connection.
    ///
    /// Sessions use their connection sequentially; a second concurrent request
    /// on the same session waits here.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut dyn EngineConnection) -> R) -> R {
        let mut conn = self.connection.lock();
        f(conn.as_mut())
    }

    /// Reporting snapshot.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            token: self.token.clone(),
            user_id: self.user_id.clone(),
            instance_index: self.instance_index,
            created_at: self.created_at_utc,
            idle_secs: self.last_activity().elapsed().as_secs(),
            query_count: self.query_count(),
            active_question_id: self.active_question_id(),
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.token)
            .field("user_id", &self.user_id)
            .field("instance_index", &self.instance_index)
            .field("query_count", &self.query_count())
            .finish_non_exhaustive()
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub token: SessionToken,
    pub user_id: String,
    pub instance_index: usize,
    pub created_at: DateTime<Utc>,
    pub idle_secs: u64,
    pub query_count: u64,
    pub active_question_id: Option<String>,
}

/// Summary statistics about sessions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub active_sessions: usize,
    /// Live sessions per pool instance
    pub sessions_per_instance: Vec<usize>,
    pub total_queries: u64,
}

/// Concurrent token → session registry.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionToken, Arc<Session>>>,
    pool: Arc<ResourcePool>,
    /// 0 = unlimited
    max_sessions: usize,
}

impl SessionStore {
    pub fn new(pool: Arc<ResourcePool>, max_sessions: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            pool,
            max_sessions,
        }
    }

    /// Create a session bound to the next pool instance.
    pub fn create(&self, user_id: &str) -> Result<SessionToken, PracticeError> {
        if self.at_capacity(self.sessions.read().len()) {
            return Err(PracticeError::CapacityExceeded {
                max: self.max_sessions,
            });
        }

        let (instance, index) = self.pool.acquire()?;
        let connection = instance.open_connection()?;

        let token = {
            let mut sessions = self.sessions.write();
            if self.at_capacity(sessions.len()) {
                return Err(PracticeError::CapacityExceeded {
                    max: self.max_sessions,
                });
            }

            let mut token = generate_token();
            while sessions.contains_key(&token) {
                token = generate_token();
            }
            let session = Session::new(token.clone(), user_id.to_string(), index, connection);
            sessions.insert(token.clone(), Arc::new(session));
            token
        };

        self.pool.record_assignment(index);
        tracing::info!(user_id, instance = index, "session_created");
        Ok(token)
    }

    fn at_capacity(&self, current: usize) -> bool {
        self.max_sessions > 0 && current >= self.max_sessions
    }

    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(token).cloned()
    }

    /// Record activity on a session. Takes no store lock.
    pub fn touch(&self, session: &Session) {
        session.touch();
    }

    pub fn is_expired(&self, session: &Session, timeout: Duration) -> bool {
        session.is_expired(timeout)
    }

    /// Remove sessions idle longer than `timeout`. Returns the number removed.
    pub fn sweep(&self, timeout: Duration) -> usize {
        self.sweep_at(timeout, Instant::now())
    }

    /// `sweep` against an explicit clock reading.
    ///
    /// Phase one collects expired tokens under the read lock; phase two removes
    /// exactly those under the write lock. Expiry is not re-checked: a session
    /// found idle stays removed even if touched in between.
    pub fn sweep_at(&self, timeout: Duration, now: Instant) -> usize {
        let expired: Vec<SessionToken> = {
            let sessions = self.sessions.read();
            sessions
                .iter()
                .filter(|(_, session)| session.is_expired_at(timeout, now))
                .map(|(token, _)| token.clone())
                .collect()
        };

        if expired.is_empty() {
            return 0;
        }

        let removed = {
            let mut sessions = self.sessions.write();
            expired
                .iter()
                .filter(|token| sessions.remove(token.as_str()).is_some())
                .count()
        };

        if removed > 0 {
            tracing::info!(removed, timeout_secs = timeout.as_secs(), "sessions_swept");
        }
        removed
    }

    /// Remove a session. Returns false if it was not present.
    pub fn terminate(&self, token: &str) -> bool {
        let removed = self.sessions.write().remove(token);
        match removed {
            Some(session) => {
                tracing::info!(user_id = session.user_id(), "session_terminated");
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// All sessions, sorted by token for deterministic output
    pub fn list(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> =
            self.sessions.read().values().map(|s| s.info()).collect();
        infos.sort_unstable_by(|a, b| a.token.cmp(&b.token));
        infos
    }

    pub fn stats(&self) -> SessionStats {
        let sessions = self.sessions.read();
        let mut per_instance = vec![0usize; self.pool.size()];
        let mut total_queries = 0;
        for session in sessions.values() {
            if let Some(slot) = per_instance.get_mut(session.instance_index()) {
                *slot += 1;
            }
            total_queries += session.query_count();
        }
        SessionStats {
            active_sessions: sessions.len(),
            sessions_per_instance: per_instance,
            total_queries,
        }
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }
}
