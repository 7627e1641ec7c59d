//! # sqldrill
//!
//! Pooled SQL practice sessions: many short-lived client sessions run
//! read-only SQL against a small, fixed set of engine instances, each holding
//! its own copy of the practice dataset.
//!
//! ## Architecture
//!
//! ```text
//! HTTP (axum)
//!     ↓
//! PracticeService
//!     ├── SessionStore         token → Session (RwLock map)
//!     │     └── Session        one connection, bound to one instance for life
//!     ├── ExecutionGateway     safety filter → timed run → structured result
//!     ├── ResourcePool         N engine instances, lock-free round robin
//!     └── catalog              embedded questions + dataset bootstrap
//!
//! sweeper (tokio task)         evicts sessions idle past the timeout
//! ```
//!
//! The pool is consulted only when a session is created. Every later query
//! goes straight to the connection the session already owns.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sqldrill::{Config, PracticeService};
//!
//! let service = PracticeService::from_config(&Config::default())?;
//! let token = service.create_session("alice")?;
//!
//! let result = service.execute_on_session(
//!     &token,
//!     "SELECT MAX(salary) AS SecondHighestSalary FROM Employee \
//!      WHERE salary < (SELECT MAX(salary) FROM Employee)",
//!     Some("q1"),
//! )?;
//! assert_eq!(result.is_correct, Some(true));
//! ```
//!
//! ## Module Organization
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `engine` | Engine traits and the SQLite implementation |
//! | `pool` | Fixed-size round-robin instance pool with telemetry |
//! | `session` | Session registry, activity tracking, idle sweep |
//! | `execution` | Safety filter, timed execution, answer checking |
//! | `sweeper` | Periodic background sweep with cooperative shutdown |
//! | `catalog` | Embedded practice questions and dataset |
//! | `service` | Facade used by the transport layer |
//! | `protocol` | HTTP API |

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution;
pub mod pool;
pub mod protocol;
pub mod service;
pub mod session;
pub mod sweeper;

pub use config::Config;
pub use engine::{
    Engine, EngineConnection, EngineError, EngineInstance, ResultSet, Row, SqliteEngine,
};
pub use error::{PracticeError, PracticeResult};
pub use execution::{
    check_query, compare_against_expected, is_safe, ExecutionGateway, ExecutionResult,
};
pub use pool::{InstanceTelemetry, PoolError, PoolTelemetry, ResourcePool};
pub use service::{HealthSnapshot, PracticeService};
pub use session::{Session, SessionInfo, SessionStats, SessionStore, SessionToken};
