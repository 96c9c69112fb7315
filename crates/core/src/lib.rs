//! NL2SQL Core - natural-language questions to executable SQLite queries
//!
//! Provides:
//! - Schema loading, introspection and question-driven pruning
//! - Oracle clients (Ollama, OpenAI-compatible) behind one trait
//! - SQL extraction from free-form oracle text
//! - Single-statement execution against SQLite
//! - The generate, execute and refine loop with a full trace

pub mod config;
pub mod llm;
pub mod refine;
pub mod schema;
pub mod sql;

// Re-export commonly used types
pub use config::{ConfigError, OracleConfig, OracleMode, SolverConfig, StageOverride};
pub use llm::{LlmClient, LlmError, LlmResult};
pub use refine::{
    Attempt, AttemptOutcome, RefinementLoop, SolveError, SolveResult, Termination, Trace,
    TraceReport,
};
pub use schema::{Column, ForeignKey, PruneOutcome, Schema, SchemaError, Table};
pub use sql::{
    DatabaseTarget, ExecutionResult, Executor, SENTINEL_SQL, SqliteExecutor, extract_sql,
};
