//! SQLite engine backed by `rusqlite`.
//!
//! Each pool instance is its own database:
//! - memory backing: a named shared-cache in-memory database, kept alive by an
//!   anchor connection held by the instance handle
//! - file backing: one database file per instance
//!
//! Session connections are opened with `query_only` so the engine itself refuses
//! writes even when a statement gets past the textual safety filter.

use super::{
    Engine, EngineConnection, EngineError, EngineInstance, InstanceLocation, ResultSet, Row,
    NULL_TEXT,
};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OpenFlags};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT_MS: u64 = 100;

/// Factory for SQLite-backed instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteEngine;

impl SqliteEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for SqliteEngine {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn open_instance(
        &self,
        location: &InstanceLocation,
    ) -> Result<Arc<dyn EngineInstance>, EngineError> {
        let target = match location {
            InstanceLocation::Memory => format!(
                "file:sqldrill-{}?mode=memory&cache=shared",
                uuid::Uuid::new_v4().simple()
            ),
            InstanceLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| EngineError::Open {
                        location: location.to_string(),
                        message: e.to_string(),
                    })?;
                }
                path.to_string_lossy().into_owned()
            }
        };

        let anchor = open(&target).map_err(|e| EngineError::Open {
            location: location.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!(location = %location, "sqlite_instance_opened");

        Ok(Arc::new(SqliteInstance {
            target,
            _anchor: Mutex::new(anchor),
        }))
    }
}

fn open(target: &str) -> Result<Connection, rusqlite::Error> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(target, flags)?;
    conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
    Ok(conn)
}

struct SqliteInstance {
    target: String,
    // Holds a shared-cache memory database open between sessions.
    _anchor: Mutex<Connection>,
}

impl EngineInstance for SqliteInstance {
    fn open_connection(&self) -> Result<Box<dyn EngineConnection>, EngineError> {
        let conn = open(&self.target).map_err(connect_error)?;
        conn.pragma_update(None, "query_only", 1)
            .map_err(connect_error)?;
        Ok(Box::new(SqliteConnection { conn }))
    }

    fn open_setup_connection(&self) -> Result<Box<dyn EngineConnection>, EngineError> {
        let conn = open(&self.target).map_err(connect_error)?;
        Ok(Box::new(SqliteConnection { conn }))
    }
}

fn connect_error(e: rusqlite::Error) -> EngineError {
    EngineError::Connect {
        message: e.to_string(),
    }
}

struct SqliteConnection {
    conn: Connection,
}

impl EngineConnection for SqliteConnection {
    fn run(&mut self, sql: &str) -> Result<ResultSet, EngineError> {
        // Exactly one statement; only whitespace or comments may follow it.
        let mut batch = Batch::new(&self.conn, sql.trim());
        let Some(mut stmt) = batch.next().map_err(query_error)? else {
            return Err(EngineError::query("no statement to run"));
        };
        if batch.next().map_err(query_error)?.is_some() {
            return Err(EngineError::query("multiple statements are not allowed"));
        }

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut out = Vec::new();
        let mut rows = stmt.query([]).map_err(query_error)?;
        while let Some(row) = rows.next().map_err(query_error)? {
            let mut record = Row::new();
            for (idx, name) in columns.iter().enumerate() {
                let value = row.get_ref(idx).map_err(query_error)?;
                record.insert(name.clone(), render(value));
            }
            out.push(record);
        }

        Ok(ResultSet::new(columns, out))
    }
}

fn query_error(e: rusqlite::Error) -> EngineError {
    EngineError::query(e.to_string())
}

/// Text form of a single value.
fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => NULL_TEXT.to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        ValueRef::Blob(bytes) => {
            let mut hex = String::with_capacity(bytes.len() * 2);
            for b in bytes {
                let _ = write!(hex, "{b:02x}");
            }
            hex
        }
    }
}
