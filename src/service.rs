//! Practice Service
//!
//! Facade the transport layer talks to. Owns the pool, the session store and
//! the execution gateway, and maps tokens and question ids onto them.
//!
//! ```text
//! request ─▶ SessionStore::get ─▶ touch ─▶ ExecutionGateway::execute ─▶ ExecutionResult
//!                                               │
//!                                               └─ catalog expected answer (optional)
//! ```

use crate::catalog::{self, Question};
use crate::config::{Config, SessionConfig};
use crate::engine::{Engine, SqliteEngine};
use crate::error::{PracticeError, PracticeResult};
use crate::execution::{ExecutionGateway, ExecutionResult};
use crate::pool::{PoolTelemetry, ResourcePool};
use crate::session::{Session, SessionInfo, SessionStats, SessionStore, SessionToken};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

const MAX_USER_ID_LEN: usize = 128;

/// Service health and telemetry snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// "healthy", or "unavailable" once the pool is shut down
    pub status: String,
    pub engine: String,
    pub active_session_count: usize,
    pub total_questions: usize,
    pub pool_size: usize,
    pub telemetry: PoolTelemetry,
    pub sessions: SessionStats,
    pub uptime_secs: u64,
}

pub struct PracticeService {
    pool: Arc<ResourcePool>,
    store: Arc<SessionStore>,
    gateway: ExecutionGateway,
    engine_name: &'static str,
    sessions: SessionConfig,
    started_at: Instant,
}

impl PracticeService {
    /// Build a service on the SQLite engine.
    pub fn from_config(config: &Config) -> PracticeResult<Self> {
        Self::with_engine(&SqliteEngine::new(), config)
    }

    /// Build a service on `engine`, creating every pool instance and loading the
    /// catalog dataset into each one. Any failure here is fatal.
    pub fn with_engine(engine: &dyn Engine, config: &Config) -> PracticeResult<Self> {
        config
            .validate()
            .map_err(|e| PracticeError::validation(e.to_string()))?;

        let pool = ResourcePool::new(config.pool.size);
        pool.initialize(engine, &config.pool.backing(), |index, instance| {
            tracing::debug!(instance = index, "catalog_install");
            catalog::install(instance)
        })?;
        let pool = Arc::new(pool);

        let store = Arc::new(SessionStore::new(
            Arc::clone(&pool),
            config.sessions.max_sessions,
        ));

        Ok(Self {
            gateway: ExecutionGateway::new(Arc::clone(&pool)),
            pool,
            store,
            engine_name: engine.name(),
            sessions: config.sessions.clone(),
            started_at: Instant::now(),
        })
    }

    pub fn create_session(&self, user_id: &str) -> PracticeResult<SessionToken> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(PracticeError::validation("user_id is required"));
        }
        if user_id.len() > MAX_USER_ID_LEN {
            return Err(PracticeError::validation(format!(
                "user_id must be at most {MAX_USER_ID_LEN} bytes"
            )));
        }
        self.store.create(user_id)
    }

    pub fn lookup_session(&self, token: &str) -> PracticeResult<SessionInfo> {
        self.live_session(token).map(|session| session.info())
    }

    /// Run `sql` on the session, checking it against `question_id` if given.
    ///
    /// `Err` means the request never reached the gateway (bad input, unknown or
    /// expired session). Query-level failures come back inside the result.
    pub fn execute_on_session(
        &self,
        token: &str,
        sql: &str,
        question_id: Option<&str>,
    ) -> PracticeResult<ExecutionResult> {
        if sql.trim().is_empty() {
            return Err(PracticeError::validation("user_sql is required"));
        }

        let question: Option<&'static Question> = match question_id.filter(|id| !id.is_empty()) {
            Some(id) => Some(catalog::find_by_id(id).ok_or_else(|| {
                PracticeError::validation(format!("unknown question_id: {id}"))
            })?),
            None => None,
        };

        let session = self.live_session(token)?;
        self.store.touch(&session);
        if let Some(question) = question {
            session.set_active_question(Some(question.id.to_string()));
        }

        let expected = question.map(Question::expected);
        Ok(self.gateway.execute(&session, sql, expected.as_ref()))
    }

    /// Remove a session. Returns false if the token was unknown.
    pub fn terminate_session(&self, token: &str) -> bool {
        self.store.terminate(token)
    }

    /// Sweep now with an explicit timeout, independent of the background sweeper.
    pub fn sweep_now(&self, timeout_secs: u64) -> usize {
        self.store.sweep(Duration::from_secs(timeout_secs))
    }

    pub fn health_snapshot(&self) -> HealthSnapshot {
        let status = if self.pool.is_initialized() {
            "healthy"
        } else {
            "unavailable"
        };
        HealthSnapshot {
            status: status.to_string(),
            engine: self.engine_name.to_string(),
            active_session_count: self.store.count(),
            total_questions: catalog::all().len(),
            pool_size: self.pool.size(),
            telemetry: self.pool.snapshot_telemetry(),
            sessions: self.store.stats(),
            uptime_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Log final telemetry and release the pool. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.pool.is_initialized() {
            return;
        }
        let telemetry = self.pool.snapshot_telemetry();
        for instance in &telemetry.instances {
            tracing::info!(
                instance = instance.index,
                assignments = instance.assignments,
                queries = instance.queries_executed,
                "instance_telemetry"
            );
        }
        tracing::info!(
            total_assignments = telemetry.total_assignments,
            total_queries = telemetry.total_queries,
            active_sessions = self.store.count(),
            "practice_service_shutdown"
        );
        self.pool.shutdown();
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.sessions
    }

    fn live_session(&self, token: &str) -> PracticeResult<Arc<Session>> {
        let session = self
            .store
            .get(token)
            .ok_or(PracticeError::SessionNotFound)?;
        if self
            .store
            .is_expired(&session, self.sessions.idle_timeout())
        {
            return Err(PracticeError::SessionExpired);
        }
        Ok(session)
    }
}

impl std::fmt::Debug for PracticeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PracticeService")
            .field("engine", &self.engine_name)
            .field("pool", &self.pool)
            .field("sessions", &self.store.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::FakeEngine;
    use crate::engine::{EngineError, ResultSet};

    fn small_config() -> Config {
        let mut config = Config::default();
        config.pool.size = 3;
        config
    }

    fn fake_service() -> PracticeService {
        let engine = FakeEngine::with_responder(|_, sql| {
            if sql.starts_with("SELECT MAX") {
                Ok(ResultSet::from_positional(["SecondHighestSalary"], [["100000"]]))
            } else if sql.contains("nope") {
                Err(EngineError::query("no such table: nope"))
            } else {
                Ok(ResultSet::default())
            }
        });
        PracticeService::with_engine(&engine, &small_config()).unwrap()
    }

    #[test]
    fn test_catalog_installed_on_every_instance() {
        let engine = FakeEngine::new();
        let statements = Arc::clone(&engine.statements);
        PracticeService::with_engine(&engine, &small_config()).unwrap();

        let statements = statements.lock();
        for instance in 0..3 {
            assert!(statements.iter().any(|(i, sql)| {
                *i == instance && sql.contains("CREATE TABLE IF NOT EXISTS Employee")
            }));
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.pool.size = 0;
        let err = PracticeService::with_engine(&FakeEngine::new(), &config).unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_pool_init_failure_is_fatal() {
        let engine = FakeEngine::new().failing_at(1);
        let err = PracticeService::with_engine(&engine, &small_config()).unwrap_err();
        assert!(matches!(err, PracticeError::PoolInitialization { .. }));
    }

    #[test]
    fn test_create_session_validates_user_id() {
        let service = fake_service();
        assert_eq!(
            service.create_session("   ").unwrap_err().code(),
            "VALIDATION_ERROR"
        );
        assert!(service.create_session(&"x".repeat(129)).is_err());
        assert!(service.create_session("alice").is_ok());
    }

    #[test]
    fn test_lookup_session() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();
        let info = service.lookup_session(&token).unwrap();
        assert_eq!(info.user_id, "alice");
        assert_eq!(info.token, token);

        assert_eq!(
            service.lookup_session("sess_missing").unwrap_err(),
            PracticeError::SessionNotFound
        );
    }

    #[test]
    fn test_execute_checks_answer_and_tracks_question() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();

        let result = service
            .execute_on_session(&token, "SELECT MAX(salary) ...", Some("q1"))
            .unwrap();
        assert!(result.success);
        assert_eq!(result.is_correct, Some(true));

        let info = service.lookup_session(&token).unwrap();
        assert_eq!(info.query_count, 1);
        assert_eq!(info.active_question_id.as_deref(), Some("q1"));
    }

    #[test]
    fn test_execute_without_question_has_no_verdict() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();
        let result = service.execute_on_session(&token, "SELECT 1", None).unwrap();
        assert_eq!(result.is_correct, None);
    }

    #[test]
    fn test_execute_request_errors() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();

        assert_eq!(
            service.execute_on_session(&token, "  ", None).unwrap_err().code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            service
                .execute_on_session(&token, "SELECT 1", Some("q404"))
                .unwrap_err()
                .code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            service
                .execute_on_session("sess_missing", "SELECT 1", None)
                .unwrap_err(),
            PracticeError::SessionNotFound
        );
    }

    #[test]
    fn test_query_errors_are_results() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();

        let rejected = service
            .execute_on_session(&token, "DROP TABLE Employee", None)
            .unwrap();
        assert_eq!(rejected.error.unwrap().code(), "QUERY_REJECTED");

        let failed = service
            .execute_on_session(&token, "SELECT * FROM nope", None)
            .unwrap();
        assert_eq!(failed.error.unwrap().code(), "EXECUTION_ERROR");
    }

    #[test]
    fn test_expired_session_reported_until_swept() {
        let mut config = small_config();
        config.sessions.idle_timeout_secs = 0;
        let service = PracticeService::with_engine(&FakeEngine::new(), &config).unwrap();
        let token = service.create_session("alice").unwrap();

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(
            service.execute_on_session(&token, "SELECT 1", None).unwrap_err(),
            PracticeError::SessionExpired
        );
        assert_eq!(service.sweep_now(0), 1);
        assert_eq!(
            service.lookup_session(&token).unwrap_err(),
            PracticeError::SessionNotFound
        );
    }

    #[test]
    fn test_terminate_session() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();
        assert!(service.terminate_session(&token));
        assert!(!service.terminate_session(&token));
    }

    #[test]
    fn test_health_snapshot() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();
        service.create_session("bob").unwrap();
        service.execute_on_session(&token, "SELECT 1", None).unwrap();

        let health = service.health_snapshot();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.engine, "fake");
        assert_eq!(health.active_session_count, 2);
        assert_eq!(health.pool_size, 3);
        assert_eq!(health.total_questions, catalog::all().len());
        assert_eq!(health.telemetry.total_assignments, 2);
        assert_eq!(health.telemetry.total_queries, 1);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let service = fake_service();
        let token = service.create_session("alice").unwrap();
        service.shutdown();
        service.shutdown();

        assert_eq!(service.health_snapshot().status, "unavailable");
        assert_eq!(
            service.create_session("bob").unwrap_err(),
            PracticeError::PoolUnavailable
        );
        // Existing sessions keep their connections
        assert!(service
            .execute_on_session(&token, "SELECT 1", None)
            .unwrap()
            .success);
    }
}
