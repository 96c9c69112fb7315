//! Text renderings of a schema for oracle prompts
//!
//! Three views are used: a one-line-per-table summary, the selector listing
//! with column types, and the detailed listing with keys.

use super::model::{Schema, Table};

impl Schema {
    /// One line per table with its column names
    ///
    /// ```text
    /// Tables in this database:
    /// - employees (columns: id, name)
    ///
    /// End of schema.
    /// ```
    pub fn render_summary(&self) -> String {
        let lines: Vec<String> = self
            .tables
            .iter()
            .map(|table| {
                let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
                format!("- {} (columns: {})", table.name, names.join(", "))
            })
            .collect();

        format!(
            "Tables in this database:\n{}\n\nEnd of schema.",
            lines.join("\n")
        )
    }

    /// Table blocks listing `name (TYPE)` for each column, used when pruning
    pub fn render_selector(&self) -> String {
        self.tables
            .iter()
            .map(|table| {
                let columns: Vec<String> = table
                    .columns
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.data_type))
                    .collect();
                format!("Table: {}\nColumns: {}", table.name, columns.join(", "))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Summary followed by per-table detail with primary and foreign keys
    pub fn render_detailed(&self) -> String {
        let details: Vec<String> = self.tables.iter().map(render_table_detail).collect();
        format!("{}\n\n{}", self.render_summary(), details.join("\n\n"))
    }
}

fn render_table_detail(table: &Table) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| {
            let pk = if c.is_primary_key { " (PK)" } else { "" };
            format!("{} ({}){}", c.name, c.data_type, pk)
        })
        .collect();

    let mut lines = vec![
        format!("Table: {}", table.name),
        format!("Columns: {}", columns.join(", ")),
    ];

    let primary_keys = table.primary_key_names();
    if !primary_keys.is_empty() {
        lines.push(format!("Primary Keys: {}", primary_keys.join(", ")));
    }

    if !table.foreign_keys.is_empty() {
        let fks: Vec<String> = table
            .foreign_keys
            .iter()
            .map(|fk| {
                format!(
                    "{} -> {}.{}",
                    fk.column_name, fk.referenced_table, fk.referenced_column
                )
            })
            .collect();
        lines.push(format!("Foreign Keys: {}", fks.join("; ")));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use crate::schema::{Column, ForeignKey, Schema, Table};

    fn schema() -> Schema {
        Schema::new(vec![
            Table::new("employees")
                .with_column(Column::new("id", "INTEGER").primary_key())
                .with_column(Column::new("dept_id", "INTEGER"))
                .with_foreign_key(ForeignKey::new("dept_id", "departments", "id")),
            Table::new("departments")
                .with_column(Column::new("id", "INTEGER").primary_key())
                .with_column(Column::new("name", "TEXT")),
        ])
    }

    #[test]
    fn test_render_summary() {
        assert_eq!(
            schema().render_summary(),
            "Tables in this database:\n\
             - employees (columns: id, dept_id)\n\
             - departments (columns: id, name)\n\
             \n\
             End of schema."
        );
    }

    #[test]
    fn test_render_summary_empty_schema() {
        assert_eq!(
            Schema::default().render_summary(),
            "Tables in this database:\n\n\nEnd of schema."
        );
    }

    #[test]
    fn test_render_selector() {
        assert_eq!(
            schema().render_selector(),
            "Table: employees\nColumns: id (INTEGER), dept_id (INTEGER)\n\n\
             Table: departments\nColumns: id (INTEGER), name (TEXT)"
        );
    }

    #[test]
    fn test_render_detailed_includes_keys() {
        let text = schema().render_detailed();
        assert!(text.starts_with("Tables in this database:"));
        assert!(text.contains("Columns: id (INTEGER) (PK), dept_id (INTEGER)"));
        assert!(text.contains("Primary Keys: id"));
        assert!(text.contains("Foreign Keys: dept_id -> departments.id"));
        // departments has no foreign keys
        assert_eq!(text.matches("Foreign Keys:").count(), 1);
    }
}
