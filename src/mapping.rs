//! Source header to canonical column reconciliation.
//!
//! [`build_mapping`] resolves every raw header against a table's
//! [`SynonymCatalog`]; [`missing_required`] reports the canonical columns that
//! no header resolved to. Ingestion refuses a file with any missing column.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{
    catalog::{SynonymCatalog, Table},
    error::{IngestError, MappingError},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappedHeader {
    pub position: usize,
    pub source: String,
    pub canonical: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMapping {
    table: Table,
    headers: Vec<MappedHeader>,
}

/// Maps each raw header to its canonical column, or leaves it unmapped.
///
/// Two source headers resolving to the same canonical column is an error:
/// there is no principled way to pick one.
pub fn build_mapping(
    catalog: &SynonymCatalog,
    source_headers: &[String],
) -> Result<ColumnMapping, MappingError> {
    let table = catalog.table();
    let mut headers: Vec<MappedHeader> = Vec::with_capacity(source_headers.len());
    for (position, source) in source_headers.iter().enumerate() {
        let canonical = catalog.resolve(source);
        if let Some(target) = canonical
            && let Some(previous) = headers.iter().find(|h| h.canonical == Some(target))
        {
            return Err(MappingError::DuplicateSource {
                table,
                canonical: target,
                first: previous.source.clone(),
                second: source.clone(),
            });
        }
        headers.push(MappedHeader {
            position,
            source: source.clone(),
            canonical,
        });
    }
    Ok(ColumnMapping { table, headers })
}

/// Canonical columns of `table` absent from `mapped`, in write order.
pub fn missing_required(table: Table, mapped: &BTreeSet<&str>) -> Vec<&'static str> {
    table
        .columns()
        .iter()
        .map(|column| column.name)
        .filter(|name| !mapped.contains(name))
        .collect()
}

impl ColumnMapping {
    pub fn table(&self) -> Table {
        self.table
    }

    pub fn headers(&self) -> &[MappedHeader] {
        &self.headers
    }

    /// `(source, canonical)` pairs for every header that resolved.
    pub fn mapped(&self) -> impl Iterator<Item = (&str, &'static str)> {
        self.headers
            .iter()
            .filter_map(|h| h.canonical.map(|canonical| (h.source.as_str(), canonical)))
    }

    pub fn unmapped(&self) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|h| h.canonical.is_none())
            .map(|h| h.source.as_str())
            .collect()
    }

    pub fn canonical_set(&self) -> BTreeSet<&'static str> {
        self.headers.iter().filter_map(|h| h.canonical).collect()
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        let mapped = self.canonical_set();
        missing_required(self.table, &mapped)
    }

    /// Source position of a canonical column.
    pub fn position_of(&self, canonical: &str) -> Option<usize> {
        self.headers
            .iter()
            .find(|h| h.canonical == Some(canonical))
            .map(|h| h.position)
    }

    /// Fails closed when any canonical column is missing.
    pub fn require_complete(&self) -> Result<(), IngestError> {
        let missing = self.missing_required();
        if missing.is_empty() {
            return Ok(());
        }
        Err(IngestError::SchemaMismatch {
            table: self.table,
            missing,
            found: self.headers.iter().map(|h| h.source.clone()).collect(),
        })
    }
}
