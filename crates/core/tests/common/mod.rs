//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use nl2sql_core::llm::{LlmClient, LlmError, LlmResult};
use nl2sql_core::schema::{Column, Schema, Table};
use nl2sql_core::sql::DatabaseTarget;
use rusqlite::Connection;

/// Oracle that replays a script and records every prompt
pub struct ScriptedOracle {
    script: Mutex<VecDeque<LlmResult<String>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<&str>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(results: Vec<LlmResult<String>>) -> Self {
        Self {
            script: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// `(system, prompt)` pairs in call order
    pub fn calls(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.complete_with_system("", prompt).await
    }

    async fn complete_with_system(&self, system: &str, prompt: &str) -> LlmResult<String> {
        self.prompts
            .lock()
            .unwrap()
            .push((system.to_string(), prompt.to_string()));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::ConnectionError("script exhausted".into())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn max_tokens(&self) -> usize {
        8192
    }

    async fn is_ready(&self) -> bool {
        true
    }
}

/// Wrap a statement the way a well-behaved oracle would
pub fn fenced(sql: &str) -> String {
    format!("Let me think step by step.\n\n```sql\n{}\n```", sql)
}

pub const COMPANY_DDL: &str = "
    CREATE TABLE departments (id INTEGER PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE employees (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        department TEXT,
        salary REAL
    );
    INSERT INTO departments VALUES (1, 'eng'), (2, 'ops');
    INSERT INTO employees VALUES
        (1, 'Ada', 'eng', 120.0),
        (2, 'Bo', 'eng', 100.0),
        (3, 'Cy', 'ops', 90.0);
";

/// Create the employees/departments database under `dir`
pub fn company_db(dir: &Path) -> DatabaseTarget {
    let path = dir.join("company.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(COMPANY_DDL).unwrap();
    DatabaseTarget::new(path)
}

/// Schema matching [`COMPANY_DDL`]
pub fn company_schema() -> Schema {
    Schema::new(vec![
        Table::new("employees")
            .with_column(Column::new("id", "INTEGER").primary_key())
            .with_column(Column::new("name", "TEXT"))
            .with_column(Column::new("department", "TEXT"))
            .with_column(Column::new("salary", "REAL")),
        Table::new("departments")
            .with_column(Column::new("id", "INTEGER").primary_key())
            .with_column(Column::new("name", "TEXT")),
    ])
}
