//! Schema command implementation

use std::path::{Path, PathBuf};

use nl2sql_core::Schema;
use nl2sql_core::schema::introspect_sqlite;

use crate::error::CliError;
use crate::output::{OutputFormat, to_json, to_yaml, write_output};

/// Arguments for the `schema` command
pub struct SchemaArgs {
    /// Path to the SQLite database file
    pub database: PathBuf,
    /// Output format (text, json, yaml)
    pub format: OutputFormat,
    /// Output file path (stdout if not provided)
    pub output: Option<PathBuf>,
}

/// Load a schema document, or introspect the database when none is given
pub fn load_schema(database: &Path, schema_file: Option<&Path>) -> Result<Schema, CliError> {
    let schema = match schema_file {
        Some(path) => Schema::from_file(path)?,
        None => introspect_sqlite(database)?,
    };
    Ok(schema)
}

pub fn render_schema(schema: &Schema, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Text => Ok(schema.render_detailed()),
        OutputFormat::Json => to_json(schema),
        OutputFormat::Yaml => to_yaml(schema),
    }
}

/// Handle the `schema` command
pub fn handle_schema(args: &SchemaArgs) -> Result<(), CliError> {
    let schema = introspect_sqlite(&args.database)?;
    eprintln!(
        "Introspected {} tables, {} columns",
        schema.tables.len(),
        schema.column_count()
    );
    let content = render_schema(&schema, args.format)?;
    write_output(&content, args.output.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;
    use tempfile::TempDir;

    fn sample_db(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("shop.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE orders (
                 id INTEGER PRIMARY KEY,
                 customer_id INTEGER REFERENCES customers(id),
                 total REAL
             );",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_load_schema_introspects_without_file() {
        let dir = TempDir::new().unwrap();
        let db = sample_db(&dir);

        let schema = load_schema(&db, None).unwrap();
        assert_eq!(schema.table_names(), vec!["customers", "orders"]);
    }

    #[test]
    fn test_load_schema_prefers_file() {
        let dir = TempDir::new().unwrap();
        let db = sample_db(&dir);
        let file = dir.path().join("schema.json");
        std::fs::write(
            &file,
            r#"{"tables":[{"name":"orders","columns":[{"name":"total","type":"REAL"}]}]}"#,
        )
        .unwrap();

        let schema = load_schema(&db, Some(&file)).unwrap();
        assert_eq!(schema.table_names(), vec!["orders"]);
    }

    #[test]
    fn test_load_schema_missing_database() {
        let dir = TempDir::new().unwrap();
        let result = load_schema(&dir.path().join("absent.db"), None);
        assert!(matches!(result, Err(CliError::Schema(_))));
    }

    #[test]
    fn test_render_schema_formats() {
        let dir = TempDir::new().unwrap();
        let schema = load_schema(&sample_db(&dir), None).unwrap();

        let text = render_schema(&schema, OutputFormat::Text).unwrap();
        assert!(text.contains("Foreign Keys: customer_id -> customers.id"));

        let json = render_schema(&schema, OutputFormat::Json).unwrap();
        let parsed = Schema::from_json_str(&json).unwrap();
        assert_eq!(parsed, schema);

        let yaml = render_schema(&schema, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("name: orders"));
    }
}
