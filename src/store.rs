//! The data-store seam.
//!
//! The ingestion core never owns a connection. It asks a [`ConnectionProvider`]
//! for one per unit of work (a batch, a DDL pass, a query) and drops it as soon
//! as that unit finishes, on success and on error alike.

use serde::Serialize;

use crate::{data::Value, error::StoreError};

/// One fetched row with its fields in select-list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn first(&self) -> Option<&Value> {
        self.fields.first().map(|(_, value)| value)
    }
}

pub trait Connection {
    /// Runs one statement with one parameter tuple and returns the affected row count.
    fn execute(&mut self, sql: &str, params: &[Value]) -> Result<u64, StoreError>;

    /// Runs one statement once per parameter tuple as a single atomic unit.
    fn execute_batch(&mut self, sql: &str, rows: &[Vec<Value>]) -> Result<u64, StoreError>;

    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Record>, StoreError>;
}

pub trait ConnectionProvider {
    type Conn: Connection;

    /// Hands out a connection the caller releases by dropping it.
    fn acquire(&self) -> Result<Self::Conn, StoreError>;
}

/// Runs `work` on a freshly acquired connection.
pub fn with_connection<P, T, F>(provider: &P, work: F) -> Result<T, StoreError>
where
    P: ConnectionProvider,
    F: FnOnce(&mut P::Conn) -> Result<T, StoreError>,
{
    let mut conn = provider.acquire()?;
    work(&mut conn)
}
