//! Schema model
//!
//! Tables, columns and foreign keys as the solver sees them. The serialized
//! form is the plain `{"tables": [...]}` document used by schema files.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{SchemaError, SchemaResult};

/// Foreign key from a column of one table to a column of another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referencing column in the owning table
    pub column_name: String,
    /// Referenced table
    pub referenced_table: String,
    /// Referenced column in the referenced table
    pub referenced_column: String,
}

impl ForeignKey {
    pub fn new(
        column_name: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            column_name: column_name.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }
}

/// Column of a table
///
/// # Example
///
/// ```rust
/// use nl2sql_core::schema::Column;
///
/// let id = Column::new("id", "INTEGER").primary_key();
/// assert!(id.is_primary_key);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared type as written in the DDL (may be empty in SQLite)
    #[serde(rename = "type", default)]
    pub data_type: String,
    /// Whether the column is part of the primary key
    #[serde(default)]
    pub is_primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: false,
        }
    }

    /// Mark the column as part of the primary key
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }
}

/// Table of a schema
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Table {
    /// Table name, unique within the schema
    pub name: String,
    /// Columns in declaration order
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Outgoing foreign keys
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Append a column
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a foreign key
    pub fn with_foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    /// Find a column by exact name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Names of the primary key columns, in column order
    pub fn primary_key_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Ordered collection of tables
///
/// Loaded once per database and treated as read-only afterwards; pruning
/// produces a new `Schema` rather than editing one in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    /// Find a table by exact name
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Table names in order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Total column count across tables
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Check that every table and column of `self` exists by name in `source`
    pub fn is_subset_of(&self, source: &Schema) -> bool {
        self.tables.iter().all(|table| {
            source.table(&table.name).is_some_and(|src| {
                table.columns.iter().all(|c| src.column(&c.name).is_some())
            })
        })
    }

    /// Check the uniqueness invariants
    ///
    /// Table names must be unique within the schema and column names unique
    /// within their table. Empty names are rejected too.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut tables = HashSet::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                return Err(SchemaError::EmptyName {
                    context: "table".to_string(),
                });
            }
            if !tables.insert(table.name.as_str()) {
                return Err(SchemaError::DuplicateTable(table.name.clone()));
            }

            let mut columns = HashSet::new();
            for column in &table.columns {
                if column.name.trim().is_empty() {
                    return Err(SchemaError::EmptyName {
                        context: format!("column of table '{}'", table.name),
                    });
                }
                if !columns.insert(column.name.as_str()) {
                    return Err(SchemaError::DuplicateColumn {
                        table: table.name.clone(),
                        column: column.name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Parse a schema document from JSON text
    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        let schema: Schema = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Parse a schema document from YAML text
    pub fn from_yaml_str(yaml: &str) -> SchemaResult<Self> {
        let schema: Schema = serde_yaml::from_str(yaml)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Load a schema document, choosing the format by file extension
    ///
    /// `.yaml` and `.yml` are read as YAML, anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_json_str(&text),
        }
    }
}
