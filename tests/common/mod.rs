#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use foodshare_ingest::data::Value;
use foodshare_ingest::error::StoreError;
use foodshare_ingest::sqlite::SqliteProvider;
use foodshare_ingest::store::{Connection, ConnectionProvider, Record};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    pub fn db_path(&self) -> PathBuf {
        self.temp_dir.path().join("foodshare.db")
    }

    /// SQLite provider on a database file inside the workspace.
    pub fn sqlite(&self) -> SqliteProvider {
        SqliteProvider::new(self.db_path())
    }
}

/// Fetches every row of `sql` as plain values.
pub fn query_rows(provider: &SqliteProvider, sql: &str) -> Vec<Vec<Value>> {
    let mut conn = provider.acquire().expect("acquire connection");
    conn.query(sql, &[])
        .expect("query")
        .into_iter()
        .map(|record| record.fields().iter().map(|(_, v)| v.clone()).collect())
        .collect()
}

pub fn count_rows(provider: &SqliteProvider, table: &str) -> i64 {
    let rows = query_rows(provider, &format!("SELECT COUNT(*) FROM \"{table}\""));
    rows[0][0].as_integer().expect("integer count")
}

#[derive(Debug, Default)]
pub struct ScriptState {
    pub acquired: usize,
    pub released: usize,
    pub batch_calls: usize,
    /// Zero-based `execute_batch` calls that fail.
    pub failing_batches: BTreeSet<usize>,
    pub unavailable: bool,
    pub committed: Vec<Vec<Value>>,
    pub statements: Vec<String>,
}

/// In-memory store that records what it was sent and fails on request.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProvider {
    pub state: Rc<RefCell<ScriptState>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_batches(batches: &[usize]) -> Self {
        let provider = Self::new();
        provider
            .state
            .borrow_mut()
            .failing_batches
            .extend(batches.iter().copied());
        provider
    }

    pub fn unavailable() -> Self {
        let provider = Self::new();
        provider.state.borrow_mut().unavailable = true;
        provider
    }

    pub fn committed_keys(&self) -> Vec<i64> {
        self.state
            .borrow()
            .committed
            .iter()
            .filter_map(|row| row.first().and_then(Value::as_integer))
            .collect()
    }
}

pub struct ScriptedConnection {
    state: Rc<RefCell<ScriptState>>,
}

impl Drop for ScriptedConnection {
    fn drop(&mut self) {
        self.state.borrow_mut().released += 1;
    }
}

impl Connection for ScriptedConnection {
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, StoreError> {
        let mut state = self.state.borrow_mut();
        state.statements.push(sql.to_string());
        state.committed.push(params.to_vec());
        Ok(1)
    }

    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, StoreError> {
        let mut state = self.state.borrow_mut();
        let call = state.batch_calls;
        state.batch_calls += 1;
        state.statements.push(sql.to_string());
        if state.failing_batches.contains(&call) {
            return Err(StoreError::Rejected(format!("scripted failure in call {call}")));
        }
        state.committed.extend(rows.iter().cloned());
        Ok(rows.len() as u64)
    }

    fn query(&mut self, sql: &str, _params: &[Value]) -> Result<Vec<Record>, StoreError> {
        self.state.borrow_mut().statements.push(sql.to_string());
        Ok(Vec::new())
    }
}

impl ConnectionProvider for ScriptedProvider {
    type Conn = ScriptedConnection;

    fn acquire(&self) -> Result<Self::Conn, StoreError> {
        let mut state = self.state.borrow_mut();
        if state.unavailable {
            return Err(StoreError::Unavailable("scripted outage".to_string()));
        }
        state.acquired += 1;
        Ok(ScriptedConnection {
            state: Rc::clone(&self.state),
        })
    }
}
