//! Error taxonomy for the ingestion pipeline.
//!
//! Whole-file problems ([`IngestError`]) abort before any write. Row problems
//! ([`RowCoercionError`]) and batch problems ([`BatchFailure`]) are collected
//! into the run's report instead of being returned as `Err`.

use serde::Serialize;
use thiserror::Error;

use crate::catalog::Table;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("{table}: synonym '{synonym}' is claimed by both {first} and {second}")]
    SynonymCollision {
        table: Table,
        synonym: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("{table}: headers '{first}' and '{second}' both map to {canonical}")]
    DuplicateSource {
        table: Table,
        canonical: &'static str,
        first: String,
        second: String,
    },
    #[error("{table}: no canonical column named '{column}'")]
    UnknownColumn { table: Table, column: String },
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(
        "{table}: missing required column(s) {}; CSV columns found: {}",
        .missing.join(", "),
        .found.join(", ")
    )]
    SchemaMismatch {
        table: Table,
        missing: Vec<&'static str>,
        found: Vec<String>,
    },
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("CSV input: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("statement rejected: {0}")]
    Rejected(String),
}

/// A row dropped by the normaliser. `line` is the 1-based line in the source
/// file, counting the header as line 1.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error("line {line}: {column} {reason}{}", .value.as_deref().map(|v| format!(" (got '{v}')")).unwrap_or_default())]
pub struct RowCoercionError {
    pub line: u64,
    pub key: Option<i64>,
    pub column: &'static str,
    pub value: Option<String>,
    pub reason: String,
}

/// A batch the store refused. Earlier batches stay committed.
#[derive(Debug, Clone, Error, Serialize, PartialEq, Eq)]
#[error(
    "{table}: batch {batch_index} ({rows} row(s), keys {first_key}..={last_key}) failed: {message}"
)]
pub struct BatchFailure {
    pub table: Table,
    pub batch_index: usize,
    pub first_key: i64,
    pub last_key: i64,
    pub rows: usize,
    pub message: String,
}
