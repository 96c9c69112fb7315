//! Statement execution against a database target
//!
//! Every call opens its own connection and drops it before returning.
//! Statement errors are data for the refinement loop, so `run` reports them
//! as [`ExecutionResult::Failure`] instead of returning an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Database a question is answered against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseTarget(PathBuf);

impl DatabaseTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for DatabaseTarget {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for DatabaseTarget {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

/// A single result cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl From<ValueRef<'_>> for CellValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => CellValue::Null,
            ValueRef::Integer(i) => CellValue::Integer(i),
            ValueRef::Real(r) => CellValue::Real(r),
            ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => CellValue::Blob(b.to_vec()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Real(r) => write!(f, "{}", r),
            CellValue::Text(t) => write!(f, "{}", t),
            CellValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// Outcome of running one statement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// Fully materialized result set
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
    /// Backend error message, verbatim
    Failure { message: String },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionResult::Rows { .. })
    }

    /// Error message of a failed execution
    pub fn error_message(&self) -> Option<&str> {
        match self {
            ExecutionResult::Failure { message } => Some(message),
            ExecutionResult::Rows { .. } => None,
        }
    }
}

/// Errors raised when a database target cannot be used at all
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Cannot open database {target}: {message}")]
    Unavailable { target: String, message: String },
}

impl ExecutorError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ExecutorError::Unavailable { target, .. } => format!(
                "The database {} could not be opened. Check that the file exists and is a SQLite database.",
                target
            ),
        }
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Runs single statements against a database target
pub trait Executor: Send + Sync {
    /// Execute exactly one statement
    fn run(&self, target: &DatabaseTarget, sql: &str) -> ExecutionResult;

    /// Check that the target can be opened
    fn probe(&self, _target: &DatabaseTarget) -> ExecutorResult<()> {
        Ok(())
    }
}

impl<T: Executor + ?Sized> Executor for Box<T> {
    fn run(&self, target: &DatabaseTarget, sql: &str) -> ExecutionResult {
        (**self).run(target, sql)
    }

    fn probe(&self, target: &DatabaseTarget) -> ExecutorResult<()> {
        (**self).probe(target)
    }
}

/// SQLite executor
///
/// # Example
///
/// ```rust,no_run
/// use nl2sql_core::sql::{DatabaseTarget, Executor, SqliteExecutor};
///
/// let executor = SqliteExecutor::new().read_only(true);
/// let result = executor.run(&DatabaseTarget::new("company.db"), "SELECT 1;");
/// assert!(result.is_success());
/// ```
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    read_only: bool,
    busy_timeout: Duration,
}

impl Default for SqliteExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteExecutor {
    pub fn new() -> Self {
        Self {
            read_only: false,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Open connections read-only
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// How long to wait on a locked database
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    fn open(&self, target: &DatabaseTarget) -> rusqlite::Result<Connection> {
        let access = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        // No SQLITE_OPEN_CREATE: a missing file must not become an empty database
        let conn = Connection::open_with_flags(
            target.path(),
            access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn query(&self, target: &DatabaseTarget, sql: &str) -> rusqlite::Result<ExecutionResult> {
        let conn = self.open(target)?;
        let mut batch = Batch::new(&conn, sql);
        let Some(mut stmt) = batch.next()? else {
            return Ok(ExecutionResult::Failure {
                message: "no SQL statement to execute".to_string(),
            });
        };
        if batch.next()?.is_some() {
            return Ok(ExecutionResult::Failure {
                message: "multiple statements provided; execute exactly one".to_string(),
            });
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = Vec::new();
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(CellValue::from(row.get_ref(i)?));
            }
            rows.push(values);
        }

        Ok(ExecutionResult::Rows { columns, rows })
    }
}

impl Executor for SqliteExecutor {
    fn run(&self, target: &DatabaseTarget, sql: &str) -> ExecutionResult {
        match self.query(target, sql) {
            Ok(result) => {
                if let ExecutionResult::Rows { rows, .. } = &result {
                    tracing::debug!(target_db = %target, rows = rows.len(), "Statement succeeded");
                }
                result
            }
            Err(e) => {
                let message = sqlite_message(&e);
                tracing::debug!(target_db = %target, error = %message, "Statement failed");
                ExecutionResult::Failure { message }
            }
        }
    }

    fn probe(&self, target: &DatabaseTarget) -> ExecutorResult<()> {
        let unavailable = |e: rusqlite::Error| ExecutorError::Unavailable {
            target: target.to_string(),
            message: sqlite_message(&e),
        };
        let conn = self.open(target).map_err(unavailable)?;
        // Opening is lazy; touching the schema surfaces non-database files
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<usize, i64>(0))
            .map_err(unavailable)?;
        Ok(())
    }
}

/// The message SQLite itself reported, without the wrapper prefix
fn sqlite_message(error: &rusqlite::Error) -> String {
    match error {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.clone(),
        other => other.to_string(),
    }
}
