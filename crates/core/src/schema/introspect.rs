//! Read a schema from an existing SQLite database
//!
//! Tables come from `sqlite_master` (internal `sqlite_%` tables skipped),
//! columns from `pragma_table_info` and keys from `pragma_foreign_key_list`.

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use super::error::{SchemaError, SchemaResult};
use super::model::{Column, ForeignKey, Schema, Table};

/// Introspect the SQLite database at `path`
///
/// The database is opened read-only and is never created; a missing file is
/// an error.
pub fn introspect_sqlite(path: impl AsRef<Path>) -> SchemaResult<Schema> {
    let path = path.as_ref();
    let fail = |e: rusqlite::Error| SchemaError::Introspection {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(fail)?;

    let schema = read_schema(&conn).map_err(fail)?;
    tracing::debug!(
        path = %path.display(),
        tables = schema.tables.len(),
        columns = schema.column_count(),
        "Introspected SQLite schema"
    );
    schema.validate()?;
    Ok(schema)
}

fn read_schema(conn: &Connection) -> rusqlite::Result<Schema> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY rowid",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<usize, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let mut table = Table::new(name);
        table.columns = read_columns(conn, &table.name)?;
        table.foreign_keys = read_foreign_keys(conn, &table.name)?;
        tables.push(table);
    }

    resolve_implicit_references(conn, &mut tables)?;
    Ok(Schema::new(tables))
}

fn read_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<Column>> {
    let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info(?1) ORDER BY cid")?;
    let columns = stmt
        .query_map([table], |row| {
            Ok(Column {
                name: row.get::<usize, String>(0)?,
                data_type: row.get::<usize, Option<String>>(1)?.unwrap_or_default(),
                is_primary_key: row.get::<usize, i64>(2)? > 0,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

fn read_foreign_keys(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ForeignKey>> {
    let mut stmt = conn.prepare(
        "SELECT \"from\", \"table\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
    )?;
    let fks = stmt
        .query_map([table], |row| {
            Ok(ForeignKey {
                column_name: row.get::<usize, String>(0)?,
                referenced_table: row.get::<usize, String>(1)?,
                referenced_column: row.get::<usize, Option<String>>(2)?.unwrap_or_default(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(fks)
}

/// First column of the primary key of `table`, in key order
fn first_key_column(conn: &Connection, table: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk LIMIT 1",
        [table],
        |row| row.get::<usize, String>(0),
    )
    .optional()
}

/// `REFERENCES t` without a column list targets the primary key of `t`
fn resolve_implicit_references(conn: &Connection, tables: &mut [Table]) -> rusqlite::Result<()> {
    let mut key_columns: Vec<(String, Option<String>)> = Vec::new();
    for table in tables.iter() {
        if !table.primary_key_names().is_empty() {
            key_columns.push((table.name.clone(), first_key_column(conn, &table.name)?));
        }
    }

    for table in tables.iter_mut() {
        for fk in table.foreign_keys.iter_mut().filter(|fk| fk.referenced_column.is_empty()) {
            if let Some((_, Some(pk))) = key_columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&fk.referenced_table))
            {
                fk.referenced_column = pk.clone();
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_db(sql: &str) -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
        (dir, path)
    }

    #[test]
    fn test_introspect_tables_columns_and_keys() {
        let (_dir, path) = create_db(
            "CREATE TABLE departments (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE employees (
                 id INTEGER PRIMARY KEY,
                 name TEXT NOT NULL,
                 salary REAL,
                 dept_id INTEGER REFERENCES departments(id)
             );",
        );

        let schema = introspect_sqlite(&path).unwrap();
        assert_eq!(schema.table_names(), vec!["departments", "employees"]);

        let employees = schema.table("employees").unwrap();
        let names: Vec<&str> = employees.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "salary", "dept_id"]);
        assert_eq!(employees.primary_key_names(), vec!["id"]);
        assert_eq!(employees.column("salary").unwrap().data_type, "REAL");
        assert_eq!(
            employees.foreign_keys,
            vec![ForeignKey::new("dept_id", "departments", "id")]
        );
    }

    #[test]
    fn test_introspect_implicit_reference_and_untyped_column() {
        let (_dir, path) = create_db(
            "CREATE TABLE parent (pid INTEGER PRIMARY KEY);
             CREATE TABLE child (note, parent_id REFERENCES parent);",
        );

        let schema = introspect_sqlite(&path).unwrap();
        let child = schema.table("child").unwrap();
        assert_eq!(child.column("note").unwrap().data_type, "");
        assert_eq!(child.foreign_keys[0].referenced_column, "pid");
    }

    #[test]
    fn test_implicit_reference_follows_key_order() {
        let (_dir, path) = create_db(
            "CREATE TABLE a (x INTEGER, y INTEGER, PRIMARY KEY (y, x));
             CREATE TABLE b (r INTEGER REFERENCES a);",
        );

        let schema = introspect_sqlite(&path).unwrap();
        let b = schema.table("b").unwrap();
        assert_eq!(b.foreign_keys[0].referenced_table, "a");
        assert_eq!(b.foreign_keys[0].referenced_column, "y");
    }

    #[test]
    fn test_introspect_skips_internal_tables() {
        let (_dir, path) = create_db(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT);
             INSERT INTO t (v) VALUES ('x');",
        );

        let schema = introspect_sqlite(&path).unwrap();
        assert_eq!(schema.table_names(), vec!["t"]);
    }

    #[test]
    fn test_introspect_missing_file_is_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.db");

        let result = introspect_sqlite(&path);
        assert!(matches!(result, Err(SchemaError::Introspection { .. })));
        assert!(!path.exists());
    }
}
