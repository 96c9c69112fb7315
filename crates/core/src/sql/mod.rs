//! SQL extraction and execution

pub mod executor;
pub mod extract;

pub use executor::{
    CellValue, DatabaseTarget, ExecutionResult, Executor, ExecutorError, ExecutorResult,
    SqliteExecutor,
};
pub use extract::{SENTINEL_SQL, extract_sql, is_sentinel};
