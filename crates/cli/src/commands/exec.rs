//! Exec command implementation

use std::path::PathBuf;

use nl2sql_core::{DatabaseTarget, ExecutionResult, Executor, SqliteExecutor};

use crate::error::CliError;
use crate::output::{OutputFormat, format_rows, to_json, to_yaml, write_output};

/// Arguments for the `exec` command
pub struct ExecArgs {
    /// Path to the SQLite database file
    pub database: PathBuf,
    /// Statement to execute
    pub sql: String,
    /// Open the database read-only
    pub read_only: bool,
    /// Output format (text, json, yaml)
    pub format: OutputFormat,
}

/// Run one statement after checking the database can be opened
pub fn run_statement(args: &ExecArgs) -> Result<ExecutionResult, CliError> {
    let executor = SqliteExecutor::new().read_only(args.read_only);
    let target = DatabaseTarget::new(args.database.clone());
    executor.probe(&target)?;
    Ok(executor.run(&target, &args.sql))
}

/// Handle the `exec` command
pub fn handle_exec(args: &ExecArgs) -> Result<(), CliError> {
    let result = run_statement(args)?;

    match (args.format, &result) {
        (OutputFormat::Text, ExecutionResult::Rows { columns, rows }) => {
            write_output(&format_rows(columns, rows), None)?
        }
        // Reported through the error below
        (OutputFormat::Text, ExecutionResult::Failure { .. }) => {}
        (OutputFormat::Json, _) => write_output(&to_json(&result)?, None)?,
        (OutputFormat::Yaml, _) => write_output(&to_yaml(&result)?, None)?,
    }

    match result {
        ExecutionResult::Rows { .. } => Ok(()),
        ExecutionResult::Failure { message } => Err(CliError::StatementFailed(message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn args(database: PathBuf, sql: &str, read_only: bool) -> ExecArgs {
        ExecArgs {
            database,
            sql: sql.to_string(),
            read_only,
            format: OutputFormat::Text,
        }
    }

    fn sample_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("items.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, label TEXT);
             INSERT INTO items VALUES (1, 'bolt'), (2, 'nut');",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_run_statement_rows() {
        let dir = TempDir::new().unwrap();
        let result =
            run_statement(&args(sample_db(&dir), "SELECT label FROM items ORDER BY id", true))
                .unwrap();
        match result {
            ExecutionResult::Rows { columns, rows } => {
                assert_eq!(columns, vec!["label"]);
                assert_eq!(rows.len(), 2);
            }
            other => panic!("Expected rows, got {other:?}"),
        }
    }

    #[test]
    fn test_run_statement_failure_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let result =
            run_statement(&args(sample_db(&dir), "SELECT lable FROM items", true)).unwrap();
        assert_eq!(result.error_message(), Some("no such column: lable"));
    }

    #[test]
    fn test_handle_exec_reports_failure() {
        let dir = TempDir::new().unwrap();
        let err = handle_exec(&args(sample_db(&dir), "DELETE FROM items", true)).unwrap_err();
        assert!(matches!(err, CliError::StatementFailed(_)));
    }

    #[test]
    fn test_run_statement_missing_database() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.db");
        let result = run_statement(&args(missing.clone(), "SELECT 1", false));
        assert!(matches!(result, Err(CliError::Database(_))));
        assert!(!missing.exists());
    }
}
