//! Store schema introspection and its textual rendering.
//!
//! The rendering is the grounding context handed to the model: one
//! `CREATE TABLE` line per user table, with column names and the declared
//! type text exactly as the store reports it. It approximates the schema and
//! is not meant to be executable DDL (no keys, constraints or defaults).
//!
//! # Example
//!
//! ```
//! use sql_agent::schema::{ColumnDefinition, SchemaDescription, TableDefinition};
//!
//! let schema = SchemaDescription::new(vec![TableDefinition {
//!     name:    "t".into(),
//!     columns: vec![
//!         ColumnDefinition::new("id", "INTEGER"),
//!         ColumnDefinition::new("name", "TEXT"),
//!     ]
//! }]);
//!
//! assert_eq!(schema.render(), "CREATE TABLE t (id INTEGER, name TEXT);");
//! ```

use std::fmt;

use rusqlite::Connection;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::{AgentError, AgentResult},
    store::StoreTarget
};

const LIST_TABLES: &str = "SELECT name FROM sqlite_master \
                           WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
                           ORDER BY name";

const LIST_COLUMNS: &str = "SELECT name, type FROM pragma_table_info(?1) ORDER BY cid";

/// Column name with its store-reported type text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name:      String,
    /// Declared type, possibly empty
    pub data_type: String
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name:      name.into(),
            data_type: data_type.into()
        }
    }
}

/// One user table and its columns in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDefinition {
    pub name:    String,
    pub columns: Vec<ColumnDefinition>
}

impl TableDefinition {
    /// `CREATE TABLE <name> (<col> <type>, ...);`
    pub fn render(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.data_type).trim_end().to_string())
            .collect();
        format!("CREATE TABLE {} ({});", self.name, columns.join(", "))
    }
}

/// Ordered table definitions read fresh from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    tables: Vec<TableDefinition>
}

impl SchemaDescription {
    pub fn new(tables: Vec<TableDefinition>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &[TableDefinition] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&TableDefinition> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Table lines joined by newlines
    pub fn render(&self) -> String {
        self.tables
            .iter()
            .map(TableDefinition::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for SchemaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Describe the user tables of the store at `target`.
///
/// # Errors
///
/// `StoreUnavailable` when the store cannot be opened, `SchemaReadError`
/// when enumeration fails part-way.
pub fn describe_schema(target: &StoreTarget) -> AgentResult<SchemaDescription> {
    let conn = target.open_read_only()?;
    read_schema(&conn)
}

/// Describe the user tables reachable through an open connection.
pub fn read_schema(conn: &Connection) -> AgentResult<SchemaDescription> {
    let names = list_tables(conn).map_err(schema_read_error)?;
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns = list_columns(conn, &name).map_err(schema_read_error)?;
        tables.push(TableDefinition { name, columns });
    }
    debug!(tables = tables.len(), "read store schema");
    Ok(SchemaDescription::new(tables))
}

fn list_tables(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(LIST_TABLES)?;
    let names = stmt.query_map([], |row| row.get(0))?;
    names.collect()
}

fn list_columns(conn: &Connection, table: &str) -> rusqlite::Result<Vec<ColumnDefinition>> {
    let mut stmt = conn.prepare(LIST_COLUMNS)?;
    let columns = stmt.query_map([table], |row| {
        Ok(ColumnDefinition {
            name:      row.get(0)?,
            data_type: row.get::<_, Option<String>>(1)?.unwrap_or_default()
        })
    })?;
    columns.collect()
}

fn schema_read_error(err: rusqlite::Error) -> AgentError {
    AgentError::SchemaReadError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table_line() {
        let table = TableDefinition {
            name:    "users".into(),
            columns: vec![
                ColumnDefinition::new("id", "INTEGER"),
                ColumnDefinition::new("email", "VARCHAR(255)"),
            ]
        };
        assert_eq!(
            table.render(),
            "CREATE TABLE users (id INTEGER, email VARCHAR(255));"
        );
    }

    #[test]
    fn test_render_untyped_column() {
        let table = TableDefinition {
            name:    "loose".into(),
            columns: vec![ColumnDefinition::new("a", ""), ColumnDefinition::new("b", "INT")]
        };
        assert_eq!(table.render(), "CREATE TABLE loose (a, b INT);");
    }

    #[test]
    fn test_render_empty_schema() {
        let schema = SchemaDescription::default();
        assert!(schema.is_empty());
        assert_eq!(schema.render(), "");
    }

    #[test]
    fn test_read_schema_in_memory() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE zeta (z TEXT);
             CREATE TABLE alpha (id INTEGER PRIMARY KEY, label TEXT NOT NULL DEFAULT 'x');"
        )
        .unwrap();
        let schema = read_schema(&conn).unwrap();
        assert_eq!(
            schema.render(),
            "CREATE TABLE alpha (id INTEGER, label TEXT);\nCREATE TABLE zeta (z TEXT);"
        );
    }

    #[test]
    fn test_read_schema_skips_internal_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT);
             INSERT INTO items (name) VALUES ('a');"
        )
        .unwrap();
        let schema = read_schema(&conn).unwrap();
        assert_eq!(schema.tables().len(), 1);
        assert!(schema.table("sqlite_sequence").is_none());
        assert!(schema.table("items").is_some());
    }
}
