//! Storage Client (C1) — a thin adapter over a remote libSQL/Turso database.
//!
//! Holds a URL and bearer token, brackets every top-level operation with
//! `connect`/`disconnect`, and exposes `query`/`execute` over positional
//! parameters. Everything downstream (Repository, Seeder) speaks only
//! this narrow interface, never the underlying `libsql` types directly.

use std::collections::HashMap;

use libsql::Builder;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::CoreError;

/// A positional bind parameter accepted by `query`/`execute`.
#[derive(Debug, Clone)]
pub enum Param {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Null,
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Text(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Text(v)
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Integer(v)
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Real(v)
    }
}

impl From<bool> for Param {
    fn from(v: bool) -> Self {
        Param::Bool(v)
    }
}

impl<T: Into<Param>> From<Option<T>> for Param {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => Param::Null,
        }
    }
}

fn to_libsql_value(p: &Param) -> libsql::Value {
    match p {
        Param::Text(s) => libsql::Value::Text(s.clone()),
        Param::Integer(i) => libsql::Value::Integer(*i),
        Param::Real(f) => libsql::Value::Real(*f),
        Param::Bool(b) => libsql::Value::Integer(if *b { 1 } else { 0 }),
        Param::Null => libsql::Value::Null,
    }
}

/// A single scalar value read back from a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// A result row, mapping column name to value.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: HashMap<String, Value>,
}

impl Row {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }
}

fn from_libsql_value(v: libsql::Value) -> Value {
    match v {
        libsql::Value::Null => Value::Null,
        libsql::Value::Integer(i) => Value::Integer(i),
        libsql::Value::Real(f) => Value::Real(f),
        libsql::Value::Text(s) => Value::Text(s),
        libsql::Value::Blob(b) => Value::Blob(b),
    }
}

struct Session {
    #[allow(dead_code)]
    db: libsql::Database,
    conn: libsql::Connection,
}

/// Configured client holding a URL and bearer token; the underlying
/// session is established lazily by `connect`.
pub struct StorageClient {
    url: String,
    token: String,
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for StorageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageClient")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl StorageClient {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self, CoreError> {
        let url = url.into();
        let token = token.into();
        if url.is_empty() {
            return Err(CoreError::InvalidInput("storage url must not be empty".into()));
        }
        if token.is_empty() {
            return Err(CoreError::InvalidInput(
                "storage auth token must not be empty".into(),
            ));
        }
        Ok(StorageClient {
            url,
            token,
            session: Mutex::new(None),
        })
    }

    /// Establish the underlying session. Idempotent: calling `connect`
    /// while already connected is a no-op.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut guard = self.session.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        debug!(url = %self.url, "connecting storage client");
        let db = Builder::new_remote(self.url.clone(), self.token.clone())
            .build()
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| CoreError::StorageError(e.to_string()))?;

        *guard = Some(Session { db, conn });
        Ok(())
    }

    /// Release the underlying session. Subsequent `query`/`execute` calls
    /// fail with `NotConnected` until `connect` is called again.
    pub async fn disconnect(&self) {
        debug!("disconnecting storage client");
        let mut guard = self.session.lock().await;
        *guard = None;
    }

    /// Execute a read statement, returning all result rows.
    pub async fn query(&self, sql: &str, params: &[Param]) -> Result<Vec<Row>, CoreError> {
        debug!(sql, "storage query");
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(CoreError::NotConnected)?;

        let values: Vec<libsql::Value> = params.iter().map(to_libsql_value).collect();
        let mut rows = session
            .conn
            .query(sql, libsql::params_from_iter(values))
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))?;

        let mut out = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))?
        {
            let mut columns = HashMap::new();
            let column_count = row.column_count();
            for idx in 0..column_count {
                let name = row
                    .column_name(idx)
                    .unwrap_or_default()
                    .to_string();
                let value = row
                    .get_value(idx)
                    .map_err(|e| CoreError::StorageError(e.to_string()))?;
                columns.insert(name, from_libsql_value(value));
            }
            out.push(Row { columns });
        }
        Ok(out)
    }

    /// Execute a write or DDL statement.
    pub async fn execute(&self, sql: &str, params: &[Param]) -> Result<(), CoreError> {
        debug!(sql, "storage execute");
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(CoreError::NotConnected)?;

        let values: Vec<libsql::Value> = params.iter().map(to_libsql_value).collect();
        session
            .conn
            .execute(sql, libsql::params_from_iter(values))
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        Ok(())
    }

    /// The id assigned to the most recently inserted row on this connection.
    pub async fn last_insert_rowid(&self) -> Result<i64, CoreError> {
        let guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(CoreError::NotConnected)?;
        Ok(session.conn.last_insert_rowid())
    }

    /// An in-memory client for tests, bypassing the remote-URL/token checks
    /// that real deployments go through. Not cfg(test)-gated so it is also
    /// reachable from integration tests under `tests/`, which link this
    /// crate's ordinary (non-test) build.
    pub async fn new_in_memory_for_test() -> Result<Self, CoreError> {
        let client = StorageClient {
            url: ":memory:".to_string(),
            token: "test".to_string(),
            session: Mutex::new(None),
        };
        let db = Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        *client.session.lock().await = Some(Session { db, conn });
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_url() {
        let err = StorageClient::new("", "token").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn rejects_empty_token() {
        let err = StorageClient::new("libsql://example.turso.io", "").unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn query_before_connect_fails_not_connected() {
        let client = StorageClient::new("libsql://example.turso.io", "token").unwrap();
        let err = client.query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, CoreError::NotConnected));
    }

    #[tokio::test]
    async fn execute_after_disconnect_fails_not_connected() {
        let client = StorageClient::new("libsql://example.turso.io", "token").unwrap();
        client.disconnect().await;
        let err = client.execute("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, CoreError::NotConnected));
    }
}
