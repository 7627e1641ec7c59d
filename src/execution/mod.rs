//! Query Execution Module
//!
//! Runs user SQL on a session's bound connection:
//! - textual safety filter before anything reaches the engine
//! - wall-clock timing of the engine call
//! - engine errors and panics folded into a structured result
//! - optional answer checking against an expected result set

mod compare;
mod safety;

pub use compare::compare_against_expected;
pub use safety::{check_query, inspect, is_safe, SafetyReport, BLOCKED_KEYWORDS};

use crate::engine::{EngineError, ResultSet, Row};
use crate::error::PracticeError;
use crate::pool::ResourcePool;
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one query, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Present only when the query was checked against an expected answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PracticeError>,
    pub elapsed_ms: f64,
}

impl ExecutionResult {
    pub fn from_result_set(result: ResultSet, elapsed_ms: f64) -> Self {
        let row_count = result.rows.len();
        Self {
            success: true,
            columns: result.columns,
            rows: result.rows,
            row_count,
            is_correct: None,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(error: PracticeError, elapsed_ms: f64) -> Self {
        Self {
            success: false,
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            is_correct: None,
            error: Some(error),
            elapsed_ms,
        }
    }

    /// View the returned data as a result set, for comparison.
    pub fn result_set(&self) -> ResultSet {
        ResultSet::new(self.columns.clone(), self.rows.clone())
    }
}

/// Executes queries on behalf of sessions and records per-instance telemetry.
pub struct ExecutionGateway {
    pool: Arc<ResourcePool>,
}

impl ExecutionGateway {
    pub fn new(pool: Arc<ResourcePool>) -> Self {
        Self { pool }
    }

    /// Run `sql` on the session's connection.
    ///
    /// Never returns an error: every failure is carried in the result. When
    /// `expected` is given and the query succeeds, `is_correct` is set.
    pub fn execute(
        &self,
        session: &Session,
        sql: &str,
        expected: Option<&ResultSet>,
    ) -> ExecutionResult {
        if let Err(reason) = check_query(sql) {
            tracing::debug!(token = session.token(), %reason, "query_rejected");
            return ExecutionResult::failure(PracticeError::QuerySafetyViolation { reason }, 0.0);
        }

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            session.with_connection(|conn| conn.run(sql))
        }));
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.pool.record_query(session.instance_index());

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => Err(EngineError::query(panic_message(payload.as_ref()))),
        };

        match result {
            Ok(result_set) => {
                let is_correct = expected.map(|want| compare_against_expected(&result_set, want));
                let mut out = ExecutionResult::from_result_set(result_set, elapsed_ms);
                out.is_correct = is_correct;
                out
            }
            Err(e) => {
                tracing::debug!(
                    token = session.token(),
                    instance = session.instance_index(),
                    error = %e,
                    "query_failed"
                );
                ExecutionResult::failure(e.into(), elapsed_ms)
            }
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("engine panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::FakeEngine;
    use crate::engine::{Backing, EngineInstance};
    use crate::session::SessionStore;

    fn setup(engine: FakeEngine) -> (SessionStore, ExecutionGateway) {
        let pool = ResourcePool::new(2);
        pool.initialize(&engine, &Backing::Memory, |_, _: &dyn EngineInstance| Ok(()))
            .unwrap();
        let pool = Arc::new(pool);
        (
            SessionStore::new(Arc::clone(&pool), 0),
            ExecutionGateway::new(pool),
        )
    }

    fn salary_engine() -> FakeEngine {
        FakeEngine::with_responder(|_, sql| {
            if sql.contains("boom") {
                panic!("engine exploded");
            }
            if sql.contains("missing") {
                return Err(EngineError::query("no such table: missing"));
            }
            Ok(ResultSet::from_positional(
                ["SecondHighestSalary"],
                [["100000"]],
            ))
        })
    }

    #[test]
    fn test_successful_execution() {
        let (store, gateway) = setup(salary_engine());
        let session = store.get(&store.create("u1").unwrap()).unwrap();

        let result = gateway.execute(&session, "SELECT 1", None);
        assert!(result.success);
        assert_eq!(result.columns, vec!["SecondHighestSalary"]);
        assert_eq!(result.row_count, 1);
        assert_eq!(result.is_correct, None);
        assert!(result.error.is_none());
        assert!(result.elapsed_ms >= 0.0);
    }

    #[test]
    fn test_unsafe_query_never_reaches_engine() {
        let engine = salary_engine();
        let statements = Arc::clone(&engine.statements);
        let (store, gateway) = setup(engine);
        let session = store.get(&store.create("u1").unwrap()).unwrap();

        let result = gateway.execute(&session, "DROP TABLE Employee", None);
        assert!(!result.success);
        assert!(matches!(
            result.error,
            Some(PracticeError::QuerySafetyViolation { .. })
        ));
        assert!(statements.lock().is_empty());
        assert_eq!(store.pool().snapshot_telemetry().total_queries, 0);
    }

    #[test]
    fn test_engine_error_is_structured() {
        let (store, gateway) = setup(salary_engine());
        let session = store.get(&store.create("u1").unwrap()).unwrap();

        let result = gateway.execute(&session, "SELECT * FROM missing", None);
        assert!(!result.success);
        assert_eq!(
            result.error,
            Some(PracticeError::EngineExecution {
                message: "no such table: missing".to_string()
            })
        );
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn test_engine_panic_is_contained() {
        let (store, gateway) = setup(salary_engine());
        let session = store.get(&store.create("u1").unwrap()).unwrap();

        let result = gateway.execute(&session, "SELECT boom", None);
        assert!(!result.success);
        match result.error {
            Some(PracticeError::EngineExecution { message }) => {
                assert!(message.contains("engine exploded"), "got: {message}")
            }
            other => panic!("unexpected: {other:?}"),
        }

        // Connection is still usable afterwards
        assert!(gateway.execute(&session, "SELECT 1", None).success);
    }

    #[test]
    fn test_answer_checking() {
        let (store, gateway) = setup(salary_engine());
        let session = store.get(&store.create("u1").unwrap()).unwrap();

        let right = ResultSet::from_positional(["SecondHighestSalary"], [["100000"]]);
        let wrong = ResultSet::from_positional(["SecondHighestSalary"], [["90000"]]);
        assert_eq!(
            gateway.execute(&session, "SELECT 1", Some(&right)).is_correct,
            Some(true)
        );
        assert_eq!(
            gateway.execute(&session, "SELECT 1", Some(&wrong)).is_correct,
            Some(false)
        );
    }

    #[test]
    fn test_failed_query_has_no_correctness_verdict() {
        let (store, gateway) = setup(salary_engine());
        let session = store.get(&store.create("u1").unwrap()).unwrap();
        let expected = ResultSet::from_positional(["SecondHighestSalary"], [["100000"]]);

        let result = gateway.execute(&session, "SELECT * FROM missing", Some(&expected));
        assert_eq!(result.is_correct, None);
    }

    #[test]
    fn test_queries_recorded_against_bound_instance() {
        let (store, gateway) = setup(salary_engine());
        let first = store.get(&store.create("a").unwrap()).unwrap();
        let second = store.get(&store.create("b").unwrap()).unwrap();

        gateway.execute(&first, "SELECT 1", None);
        gateway.execute(&first, "SELECT * FROM missing", None);
        gateway.execute(&second, "SELECT 1", None);

        let telemetry = store.pool().snapshot_telemetry();
        assert_eq!(telemetry.instances[first.instance_index()].queries_executed, 2);
        assert_eq!(telemetry.instances[second.instance_index()].queries_executed, 1);
    }

    #[test]
    fn test_result_serialization_omits_absent_fields() {
        let result = ExecutionResult::from_result_set(ResultSet::default(), 1.5);
        let json = serde_json::to_value(&result).unwrap();
        assert!(json.get("is_correct").is_none());
        assert!(json.get("error").is_none());
        assert_eq!(json["success"], true);
    }
}
