//! SQLite-backed [`ConnectionProvider`].
//!
//! Every [`acquire`](ConnectionProvider::acquire) opens a new connection to the
//! database file; dropping the [`SqliteConnection`] closes it. Batch writes run
//! inside a transaction so a batch either lands whole or not at all.

use std::{path::PathBuf, time::Duration};

use log::debug;
use rusqlite::{
    ToSql, params_from_iter,
    types::{ToSqlOutput, ValueRef},
};

use crate::{
    data::{DATE_FORMAT, DATETIME_FORMAT, Value},
    error::StoreError,
    store::{Connection, ConnectionProvider, Record},
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteProvider {
    path: PathBuf,
    foreign_keys: bool,
}

impl SqliteProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            foreign_keys: false,
        }
    }

    /// Enforce `REFERENCES` clauses on every connection handed out.
    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ConnectionProvider for SqliteProvider {
    type Conn = SqliteConnection;

    fn acquire(&self) -> Result<Self::Conn, StoreError> {
        debug!("Opening SQLite connection to {:?}", self.path);
        let conn = rusqlite::Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // The bundled library enforces foreign keys unless told otherwise.
        let pragma = if self.foreign_keys {
            "PRAGMA foreign_keys = ON;"
        } else {
            "PRAGMA foreign_keys = OFF;"
        };
        conn.execute_batch(pragma)?;
        Ok(SqliteConnection { conn })
    }
}

pub struct SqliteConnection {
    conn: rusqlite::Connection,
}

impl Connection for SqliteConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let changed = self.conn.execute(sql, params_from_iter(params.iter()))?;
        Ok(changed as u64)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, StoreError> {
        let tx = self.conn.transaction()?;
        let mut affected = 0u64;
        {
            let mut stmt = tx.prepare_cached(sql)?;
            for row in rows {
                affected += stmt.execute(params_from_iter(row.iter()))? as u64;
            }
        }
        tx.commit()?;
        Ok(affected)
    }

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query(params_from_iter(params.iter()))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = Vec::with_capacity(names.len());
            for (idx, name) in names.iter().enumerate() {
                fields.push((name.clone(), from_sql_ref(row.get_ref(idx)?)));
            }
            records.push(Record::new(fields));
        }
        Ok(records)
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(i) => ToSqlOutput::from(*i),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Date(d) => ToSqlOutput::from(d.format(DATE_FORMAT).to_string()),
            Value::DateTime(dt) => ToSqlOutput::from(dt.format(DATETIME_FORMAT).to_string()),
        })
    }
}

fn from_sql_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Text(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn batch_writes_are_atomic() {
        let dir = tempdir().expect("temp dir");
        let provider = SqliteProvider::new(dir.path().join("atomic.db"));
        let mut conn = provider.acquire().unwrap();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, label TEXT NOT NULL)", &[])
            .unwrap();

        let rows = vec![
            vec![Value::Integer(1), Value::Text("one".into())],
            vec![Value::Integer(2), Value::Null],
        ];
        assert!(conn
            .execute_batch("INSERT INTO t (id, label) VALUES (?1, ?2)", &rows)
            .is_err());

        let count = conn.query("SELECT COUNT(*) AS n FROM t", &[]).unwrap();
        assert_eq!(count[0].get("n"), Some(&Value::Integer(0)));
    }

    #[test]
    fn query_returns_named_fields() {
        let dir = tempdir().expect("temp dir");
        let provider = SqliteProvider::new(dir.path().join("query.db"));
        let mut conn = provider.acquire().unwrap();
        conn.execute("CREATE TABLE t (id INTEGER PRIMARY KEY, seen DATE)", &[])
            .unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
        conn.execute(
            "INSERT INTO t (id, seen) VALUES (?1, ?2)",
            &[Value::Integer(9), Value::Date(date)],
        )
        .unwrap();

        let records = conn
            .query("SELECT id, seen FROM t WHERE id = ?1", &[Value::Integer(9)])
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("id"), Some(&Value::Integer(9)));
        assert_eq!(records[0].get("seen"), Some(&Value::Text("2025-01-31".into())));
    }

    #[test]
    fn foreign_keys_follow_the_provider_flag() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("fk.db");
        let setup = "CREATE TABLE parent (id INTEGER PRIMARY KEY); \
                     CREATE TABLE child (id INTEGER PRIMARY KEY, parent_id INTEGER REFERENCES parent (id))";
        let mut conn = SqliteProvider::new(&path).acquire().unwrap();
        conn.conn.execute_batch(setup).unwrap();
        let insert = "INSERT INTO child (id, parent_id) VALUES (?1, ?2)";
        conn.execute(insert, &[Value::Integer(1), Value::Integer(42)])
            .expect("enforcement is off by default");
        drop(conn);

        let mut strict = SqliteProvider::new(&path)
            .with_foreign_keys(true)
            .acquire()
            .unwrap();
        assert!(
            strict
                .execute(insert, &[Value::Integer(2), Value::Integer(42)])
                .is_err()
        );
    }
}
