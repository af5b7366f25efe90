//! Read-only execution of gate-approved SQL.
//!
//! [`run_read_only`] re-runs the safety gate itself and never trusts an
//! earlier verdict. A rejected statement fails before any connection is
//! opened. Accepted statements run on a read-only connection that lives for
//! this call only, and every row is fetched before it returns.

use std::fmt;

use rusqlite::{
    Batch, ToSql,
    types::{FromSqlError, ToSqlOutput, ValueRef}
};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    error::{AgentError, AgentResult},
    safety::classify,
    store::StoreTarget
};

/// Scalar cell value as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>)
}

/// TEXT cells must be valid UTF-8; anything else is a decode error.
impl TryFrom<ValueRef<'_>> for Value {
    type Error = FromSqlError;

    fn try_from(value: ValueRef<'_>) -> Result<Self, Self::Error> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(r) => Self::Real(r),
            ValueRef::Text(_) => Self::Text(value.as_str()?.to_string()),
            ValueRef::Blob(b) => Self::Blob(b.to_vec())
        })
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Borrowed(match self {
            Self::Null => ValueRef::Null,
            Self::Integer(i) => ValueRef::Integer(*i),
            Self::Real(r) => ValueRef::Real(*r),
            Self::Text(t) => ValueRef::Text(t.as_bytes()),
            Self::Blob(b) => ValueRef::Blob(b.as_slice())
        }))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{:?}", r),
            Self::Text(t) => f.write_str(t),
            Self::Blob(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                f.write_str("'")
            }
        }
    }
}

/// Column names and rows of one statement, in store order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExecutionResult {
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<Value>>
}

impl ExecutionResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

const SINGLE_STATEMENT_ONLY: &str = "You can only execute one statement at a time.";

/// Execute `sql` against `target` with positional `params`.
///
/// # Errors
///
/// - `UnsafeQueryRejected` when the safety gate rejects `sql`; the store is
///   not touched.
/// - `StoreUnavailable` when the store cannot be opened.
/// - `QueryExecutionError` with the engine message when preparing, binding or
///   stepping fails, when a TEXT cell is not valid UTF-8, or when `sql`
///   holds more than one statement.
pub fn run_read_only(
    target: &StoreTarget,
    sql: &str,
    params: &[Value]
) -> AgentResult<ExecutionResult> {
    let verdict = classify(sql);
    if !verdict.is_accepted() {
        warn!(reason = %verdict.reason(), "refusing to execute statement");
        return Err(AgentError::UnsafeQueryRejected {
            sql: sql.to_string()
        });
    }
    let conn = target.open_read_only()?;
    // Trailing whitespace and comments prepare to nothing and are skipped.
    let mut batch = Batch::new(&conn, sql);
    let mut stmt = batch
        .next()
        .map_err(execution_error)?
        .ok_or_else(|| AgentError::QueryExecutionError("empty statement".to_string()))?;
    if batch.next().map_err(execution_error)?.is_some() {
        warn!("statement has trailing SQL after the first statement");
        return Err(AgentError::QueryExecutionError(
            SINGLE_STATEMENT_ONLY.to_string()
        ));
    }
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let width = columns.len();
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params.iter()))
        .map_err(execution_error)?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next().map_err(execution_error)? {
        let mut values = Vec::with_capacity(width);
        for idx in 0..width {
            let cell = row.get_ref(idx).map_err(execution_error)?;
            values.push(Value::try_from(cell).map_err(decode_error)?);
        }
        collected.push(values);
    }
    info!(columns = width, rows = collected.len(), "query executed");
    Ok(ExecutionResult {
        columns,
        rows: collected
    })
}

fn execution_error(err: rusqlite::Error) -> AgentError {
    AgentError::QueryExecutionError(err.to_string())
}

fn decode_error(err: FromSqlError) -> AgentError {
    AgentError::QueryExecutionError(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(42).to_string(), "42");
        assert_eq!(Value::Real(1.5).to_string(), "1.5");
        assert_eq!(Value::Real(2.0).to_string(), "2.0");
        assert_eq!(Value::from("bob").to_string(), "bob");
        assert_eq!(Value::Blob(vec![0x0a, 0xff]).to_string(), "x'0aff'");
    }

    #[test]
    fn test_value_serializes_untagged() {
        let row = vec![Value::Integer(1), Value::Null, Value::from("a")];
        assert_eq!(serde_json::to_string(&row).unwrap(), r#"[1,null,"a"]"#);
    }

    #[test]
    fn test_value_from_text_ref() {
        assert_eq!(
            Value::try_from(ValueRef::Text(b"caf\xc3\xa9")).unwrap(),
            Value::from("café")
        );
        assert!(Value::try_from(ValueRef::Text(&[0xff, 0xfe])).is_err());
    }

    #[test]
    fn test_rejected_before_opening_store() {
        let target = StoreTarget::from_path("/nonexistent/dir/never.db");
        let err = run_read_only(&target, "DELETE FROM users", &[]).unwrap_err();
        assert!(matches!(err, AgentError::UnsafeQueryRejected { .. }));
    }

    #[test]
    fn test_missing_store_is_unavailable() {
        let target = StoreTarget::from_path("/nonexistent/dir/never.db");
        let err = run_read_only(&target, "SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, AgentError::StoreUnavailable { .. }));
    }
}
