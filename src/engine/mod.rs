//! Query Engine Abstraction
//!
//! The pool never talks to a concrete database directly. It is written against
//! three small traits:
//!
//! ```text
//! Engine ──open_instance──▶ EngineInstance ──open_connection──▶ EngineConnection
//!                                                                   │
//!                                                              run(sql) ─▶ ResultSet
//! ```
//!
//! Closing is `Drop`: releasing the last handle to an instance or connection
//! closes it. `sqlite` provides the production engine; tests substitute fakes.

pub mod sqlite;

pub use sqlite::SqliteEngine;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// One result row: column name → rendered text value.
pub type Row = BTreeMap<String, String>;

/// Text rendering used for SQL NULL in result rows.
pub const NULL_TEXT: &str = "NULL";

/// Normalized query output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names in projection order
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a result set from positional rows.
    ///
    /// Each row is zipped against `columns`; extra values are ignored.
    pub fn from_positional<C, R, V>(columns: C, rows: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator,
        R::Item: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.into_iter().map(Into::into))
                    .collect::<Row>()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Engine-level failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The instance could not be created at the given location
    #[error("failed to open engine instance at {location}: {message}")]
    Open { location: String, message: String },

    /// A connection to an existing instance could not be created
    #[error("failed to open connection: {message}")]
    Connect { message: String },

    /// The engine rejected or failed to run a statement
    #[error("{message}")]
    Query { message: String },
}

impl EngineError {
    pub fn query(message: impl Into<String>) -> Self {
        EngineError::Query {
            message: message.into(),
        }
    }
}

/// Where a single engine instance keeps its dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstanceLocation {
    /// Private in-process dataset, lost when the instance closes
    Memory,
    /// Dataset backed by the given database file
    File(PathBuf),
}

impl std::fmt::Display for InstanceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceLocation::Memory => write!(f, ":memory:"),
            InstanceLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Pool-level backing descriptor, resolved to one location per instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backing {
    Memory,
    /// One `instance-<i>.db` file per instance under this directory
    Directory(PathBuf),
}

impl Backing {
    /// Memory marker accepted by [`Backing::parse`].
    pub const MEMORY_MARKER: &'static str = ":memory:";

    /// Parse a configured location: `:memory:` (or empty) selects memory,
    /// anything else names a directory.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim();
        if spec.is_empty() || spec == Self::MEMORY_MARKER {
            Backing::Memory
        } else {
            Backing::Directory(PathBuf::from(spec))
        }
    }

    pub fn instance_location(&self, index: usize) -> InstanceLocation {
        match self {
            Backing::Memory => InstanceLocation::Memory,
            Backing::Directory(dir) => {
                InstanceLocation::File(dir.join(format!("instance-{index}.db")))
            }
        }
    }
}

/// Factory for engine instances.
pub trait Engine: Send + Sync {
    /// Short engine name used in logs and health output.
    fn name(&self) -> &'static str;

    fn open_instance(
        &self,
        location: &InstanceLocation,
    ) -> Result<Arc<dyn EngineInstance>, EngineError>;
}

/// One independent engine owning its own dataset.
pub trait EngineInstance: Send + Sync {
    /// Connection for a session. Sessions may only read.
    fn open_connection(&self) -> Result<Box<dyn EngineConnection>, EngineError>;

    /// Writable connection used once at startup to load datasets.
    ///
    /// Engines without a read-only mode can keep the default.
    fn open_setup_connection(&self) -> Result<Box<dyn EngineConnection>, EngineError> {
        self.open_connection()
    }
}

/// A connection bound to exactly one instance, used sequentially.
pub trait EngineConnection: Send {
    fn run(&mut self, sql: &str) -> Result<ResultSet, EngineError>;
}
