//! Question-driven schema pruning
//!
//! The oracle names the tables and columns it considers relevant; the pruned
//! schema is the intersection of that selection with the source schema.
//! Pruning is an optimization, so any unusable selection falls back to the
//! full schema instead of failing.

use serde::Deserialize;

use super::model::{Schema, Table};
use crate::llm::client::{LlmClient, complete_with_retry};
use crate::llm::error::LlmResult;
use crate::llm::prompt::{PromptContext, Stage, extract_json};

/// Result of pruning a schema
#[derive(Debug, Clone, PartialEq)]
pub enum PruneOutcome {
    /// The selection parsed and matched at least one table
    Pruned(Schema),
    /// The selection was unusable; `schema` is the unpruned source
    Fallback { schema: Schema, reason: String },
}

impl PruneOutcome {
    /// Schema to hand to the next stage
    pub fn schema(&self) -> &Schema {
        match self {
            PruneOutcome::Pruned(schema) => schema,
            PruneOutcome::Fallback { schema, .. } => schema,
        }
    }

    pub fn into_schema(self) -> Schema {
        match self {
            PruneOutcome::Pruned(schema) => schema,
            PruneOutcome::Fallback { schema, .. } => schema,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PruneOutcome::Fallback { .. })
    }
}

#[derive(Debug, Deserialize)]
struct Selection {
    tables: Vec<SelectedTable>,
}

#[derive(Debug, Deserialize)]
struct SelectedTable {
    name: String,
    columns: Vec<SelectedColumn>,
}

/// Columns may be listed as bare names or as `{"name": ...}` objects
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SelectedColumn {
    Name(String),
    Object { name: String },
}

impl SelectedColumn {
    fn name(&self) -> &str {
        match self {
            SelectedColumn::Name(name) => name,
            SelectedColumn::Object { name } => name,
        }
    }
}

/// Build a pruned schema from an oracle selection response
///
/// Tables and columns keep the source order and the source metadata; names
/// the source does not contain are dropped. Foreign keys survive when their
/// local column does.
pub fn apply_selection(response: &str, source: &Schema) -> PruneOutcome {
    let fallback = |reason: String| PruneOutcome::Fallback {
        schema: source.clone(),
        reason,
    };

    let payload = extract_json(response);
    let selection: Selection = match serde_json::from_str(&payload) {
        Ok(selection) => selection,
        Err(e) => return fallback(format!("unparseable selection: {e}")),
    };

    let mut tables = Vec::new();
    for table in &source.tables {
        let Some(selected) = selection.tables.iter().find(|s| s.name == table.name) else {
            continue;
        };

        let columns: Vec<_> = table
            .columns
            .iter()
            .filter(|c| selected.columns.iter().any(|s| s.name() == c.name))
            .cloned()
            .collect();
        let foreign_keys = table
            .foreign_keys
            .iter()
            .filter(|fk| columns.iter().any(|c| c.name == fk.column_name))
            .cloned()
            .collect();

        tables.push(Table {
            name: table.name.clone(),
            columns,
            foreign_keys,
        });
    }

    if tables.is_empty() {
        return fallback("selection matched no tables".to_string());
    }

    PruneOutcome::Pruned(Schema::new(tables))
}

/// Ask the oracle which parts of `schema` answer `question`
///
/// Transport and configuration failures are returned as errors. A malformed
/// reply, or an oracle error about the reply itself, yields
/// [`PruneOutcome::Fallback`].
pub async fn prune<C: LlmClient + ?Sized>(
    client: &C,
    question: &str,
    schema: &Schema,
    max_retries: usize,
) -> LlmResult<PruneOutcome> {
    let prompt = PromptContext::new(question, schema).selector_prompt();

    let system = Stage::Prune.system_prompt();
    let outcome = match complete_with_retry(client, &system, &prompt, max_retries).await {
        Ok(response) => apply_selection(&response, schema),
        Err(e) if e.is_resource_error() => return Err(e),
        Err(e) => PruneOutcome::Fallback {
            schema: schema.clone(),
            reason: e.to_string(),
        },
    };

    match &outcome {
        PruneOutcome::Pruned(pruned) => tracing::info!(
            tables_before = schema.tables.len(),
            tables_after = pruned.tables.len(),
            "Schema pruned"
        ),
        PruneOutcome::Fallback { reason, .. } => {
            tracing::warn!(reason = %reason, "Schema pruning fell back to the full schema")
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::MockLlmClient;
    use crate::llm::error::LlmError;
    use crate::schema::{Column, ForeignKey};

    fn source() -> Schema {
        Schema::new(vec![
            Table::new("employees")
                .with_column(Column::new("id", "INTEGER").primary_key())
                .with_column(Column::new("name", "TEXT"))
                .with_column(Column::new("dept_id", "INTEGER"))
                .with_column(Column::new("salary", "REAL"))
                .with_foreign_key(ForeignKey::new("dept_id", "departments", "id")),
            Table::new("departments")
                .with_column(Column::new("id", "INTEGER").primary_key())
                .with_column(Column::new("name", "TEXT")),
            Table::new("audit_log").with_column(Column::new("entry", "TEXT")),
        ])
    }

    #[test]
    fn test_selection_keeps_source_metadata() {
        let response = r#"```json
{"tables": [{"name": "employees", "columns": ["salary", "id", "dept_id"]}]}
```"#;
        let outcome = apply_selection(response, &source());
        let PruneOutcome::Pruned(schema) = outcome else {
            panic!("expected pruned schema");
        };

        let employees = schema.table("employees").unwrap();
        let names: Vec<&str> = employees.columns.iter().map(|c| c.name.as_str()).collect();
        // Source order, not selection order
        assert_eq!(names, vec!["id", "dept_id", "salary"]);
        assert!(employees.column("id").unwrap().is_primary_key);
        assert_eq!(employees.column("salary").unwrap().data_type, "REAL");
        assert_eq!(employees.foreign_keys.len(), 1);
    }

    #[test]
    fn test_selection_ignores_oracle_types() {
        let response = r#"{"tables": [{"name": "departments", "columns": [{"name": "id", "type": "TEXT"}]}]}"#;
        let schema = apply_selection(response, &source()).into_schema();
        assert_eq!(schema.tables[0].columns[0].data_type, "INTEGER");
    }

    #[test]
    fn test_selection_drops_unknown_names() {
        let response = r#"Relevant parts: {"tables": [
            {"name": "employees", "columns": ["salry", "name"]},
            {"name": "payroll", "columns": ["amount"]}
        ]} hope this helps"#;
        let outcome = apply_selection(response, &source());
        assert!(!outcome.is_fallback());
        let schema = outcome.schema();
        assert_eq!(schema.table_names(), vec!["employees"]);
        assert_eq!(schema.tables[0].columns.len(), 1);
        // dept_id was not selected, so its foreign key goes too
        assert!(schema.tables[0].foreign_keys.is_empty());
        assert!(schema.is_subset_of(&source()));
    }

    #[test]
    fn test_selected_table_without_matching_columns_is_kept_empty() {
        let response = r#"{"tables": [{"name": "audit_log", "columns": []}]}"#;
        let schema = apply_selection(response, &source()).into_schema();
        assert_eq!(schema.table_names(), vec!["audit_log"]);
        assert!(schema.tables[0].columns.is_empty());
    }

    #[test]
    fn test_malformed_selection_falls_back() {
        for response in [
            "I think you need the employees table.",
            r#"{"tables": [{"name": "employees"}]}"#,
            r#"{"relevant": ["employees"]}"#,
            r#"{"tables": [{"name": "employees", "columns": [1, 2]}]}"#,
            r#"{"tables": [{"name": "payroll", "columns": ["amount"]}]}"#,
            r#"{"tables": []}"#,
        ] {
            let outcome = apply_selection(response, &source());
            assert!(outcome.is_fallback(), "expected fallback for {response}");
            assert_eq!(outcome.schema(), &source());
        }
    }

    #[tokio::test]
    async fn test_prune_sends_selector_prompt() {
        let client = MockLlmClient::new(r#"{"tables": [{"name": "departments", "columns": ["name"]}]}"#);
        let outcome = prune(&client, "List department names", &source(), 0)
            .await
            .unwrap();

        assert_eq!(outcome.schema().table_names(), vec!["departments"]);
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Question: List department names"));
        assert!(prompts[0].contains("Table: audit_log\nColumns: entry (TEXT)"));
    }

    #[tokio::test]
    async fn test_prune_format_error_falls_back() {
        let client = MockLlmClient::with_results(vec![Err(LlmError::InvalidResponse(
            "response contained no choices".into(),
        ))]);
        let outcome = prune(&client, "q", &source(), 0).await.unwrap();
        assert!(outcome.is_fallback());
    }

    #[tokio::test]
    async fn test_prune_resource_error_propagates() {
        let client = MockLlmClient::failing();
        let result = prune(&client, "q", &source(), 0).await;
        assert!(matches!(result, Err(LlmError::ConnectionError(_))));
    }
}
