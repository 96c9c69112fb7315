//! Error types for schema loading and introspection

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or loading a schema
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Duplicate table name: {0}")]
    DuplicateTable(String),

    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Empty name for {context}")]
    EmptyName { context: String },

    #[error("Failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to introspect database {path}: {message}")]
    Introspection { path: PathBuf, message: String },
}

impl SchemaError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            SchemaError::DuplicateTable(name) => format!(
                "The schema lists table '{}' more than once. Table names must be unique.",
                name
            ),
            SchemaError::DuplicateColumn { table, column } => format!(
                "Table '{}' lists column '{}' more than once.",
                table, column
            ),
            SchemaError::EmptyName { context } => {
                format!("A {} has an empty name.", context)
            }
            SchemaError::Io { path, .. } => {
                format!("Could not read schema file {}.", path.display())
            }
            SchemaError::Json(e) => format!("The schema file is not valid JSON: {}", e),
            SchemaError::Yaml(e) => format!("The schema file is not valid YAML: {}", e),
            SchemaError::Introspection { path, message } => format!(
                "Could not read the schema of {}: {}",
                path.display(),
                message
            ),
        }
    }
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages_name_the_offender() {
        let err = SchemaError::DuplicateColumn {
            table: "employees".into(),
            column: "salary".into(),
        };
        assert!(err.user_message().contains("employees"));
        assert!(err.user_message().contains("salary"));

        let err = SchemaError::Introspection {
            path: PathBuf::from("/tmp/x.db"),
            message: "file is not a database".into(),
        };
        assert!(err.to_string().contains("/tmp/x.db"));
    }
}
