//! End-to-end CSV ingestion.
//!
//! ```text
//! CSV bytes -> headers -> ColumnMapping (fail closed) -> RawRow -> CleanRow -> BatchUpserter
//! ```
//!
//! Nothing is written unless every canonical column of the target table was
//! matched. After that, bad rows are dropped individually and failed batches
//! are recorded; both end up in the [`ImportReport`].

use std::{io::Read, path::Path};

use encoding_rs::Encoding;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    catalog::{SynonymCatalog, Table},
    config::IngestConfig,
    error::{BatchFailure, IngestError, RowCoercionError},
    io_utils,
    mapping::{ColumnMapping, build_mapping},
    rows::{CleanRow, RawRow, normalize_row},
    store::ConnectionProvider,
    upsert::Progress,
};

/// How to read the input file.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub table: Table,
    pub mapping: ColumnMapping,
    pub rows_read: usize,
    pub rows_cleaned: usize,
    pub rows_committed: usize,
    pub rows_affected: u64,
    pub batches_committed: usize,
    pub rows_not_attempted: usize,
    pub rejected: Vec<RowCoercionError>,
    pub failed_batches: Vec<BatchFailure>,
}

impl ImportReport {
    /// Every row read was written.
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed_batches.is_empty() && self.rows_not_attempted == 0
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Table: {}", self.table),
            format!("Rows read: {}", self.rows_read),
            format!(
                "Rows written: {} ({} batch(es), {} affected)",
                self.rows_committed, self.batches_committed, self.rows_affected
            ),
            format!("Rows rejected: {}", self.rejected.len()),
            format!("Batches failed: {}", self.failed_batches.len()),
        ];
        if self.rows_not_attempted > 0 {
            lines.push(format!("Rows not attempted: {}", self.rows_not_attempted));
        }
        lines.extend(self.rejected.iter().map(|err| format!("  rejected {err}")));
        lines.extend(self.failed_batches.iter().map(|f| format!("  failed {f}")));
        lines
    }
}

pub struct Importer<'a, P: ConnectionProvider> {
    provider: &'a P,
    config: IngestConfig,
}

impl<'a, P: ConnectionProvider> Importer<'a, P> {
    pub fn new(provider: &'a P, config: IngestConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn import_path<F>(
        &self,
        table: Table,
        path: &Path,
        options: &ReadOptions,
        on_progress: F,
    ) -> Result<ImportReport, IngestError>
    where
        F: FnMut(Progress),
    {
        let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
        let encoding = io_utils::resolve_encoding(options.encoding.as_deref())?;
        info!(
            "Importing '{}' into {table} (delimiter '{}')",
            path.display(),
            crate::printable_delimiter(delimiter)
        );
        let reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
        self.import_reader(table, reader, encoding, on_progress)
    }

    pub fn import_reader<R, F>(
        &self,
        table: Table,
        mut reader: csv::Reader<R>,
        encoding: &'static Encoding,
        on_progress: F,
    ) -> Result<ImportReport, IngestError>
    where
        R: Read,
        F: FnMut(Progress),
    {
        let catalog = self.config.catalog(table)?;
        let headers = io_utils::reader_headers(&mut reader, encoding)?;
        let mapping = reconcile(&catalog, &headers)?;

        let mut rows_read = 0usize;
        let mut cleaned: Vec<CleanRow> = Vec::new();
        let mut rejected: Vec<RowCoercionError> = Vec::new();
        let mut record = csv::ByteRecord::new();
        while reader.read_byte_record(&mut record)? {
            rows_read += 1;
            let line = record
                .position()
                .map(|pos| pos.line())
                .unwrap_or(rows_read as u64 + 1);
            let cells = match io_utils::decode_record(&record, encoding) {
                Ok(cells) => cells,
                Err(err) => {
                    let rejection = RowCoercionError {
                        line,
                        key: None,
                        column: "record",
                        value: None,
                        reason: err.to_string(),
                    };
                    warn!("{table}: {rejection}");
                    rejected.push(rejection);
                    continue;
                }
            };
            let raw = raw_row(&mapping, line, cells);
            match normalize_row(table, &raw) {
                Ok(row) => cleaned.push(row),
                Err(rejection) => {
                    warn!("{table}: {rejection}");
                    rejected.push(rejection);
                }
            }
        }
        info!(
            "{table}: {rows_read} row(s) read, {} clean, {} rejected",
            cleaned.len(),
            rejected.len()
        );

        let outcome = self
            .config
            .upserter()
            .upsert(self.provider, table, &cleaned, on_progress);

        let report = ImportReport {
            table,
            mapping,
            rows_read,
            rows_cleaned: cleaned.len(),
            rows_committed: outcome.rows_committed,
            rows_affected: outcome.affected,
            batches_committed: outcome.batches_committed,
            rows_not_attempted: outcome.rows_not_attempted,
            rejected,
            failed_batches: outcome.failures,
        };
        info!(
            "{table}: {} row(s) written, {} rejected, {} batch(es) failed",
            report.rows_committed,
            report.rejected.len(),
            report.failed_batches.len()
        );
        Ok(report)
    }
}

/// Maps the header row and refuses the file if a canonical column is missing.
pub fn reconcile(catalog: &SynonymCatalog, headers: &[String]) -> Result<ColumnMapping, IngestError> {
    let mapping = build_mapping(catalog, headers)?;
    for (source, canonical) in mapping.mapped() {
        debug!("{}: '{source}' -> {canonical}", catalog.table());
    }
    let unmapped = mapping.unmapped();
    if !unmapped.is_empty() {
        info!(
            "{}: ignoring unmapped column(s) {}",
            catalog.table(),
            unmapped.join(", ")
        );
    }
    mapping.require_complete()?;
    Ok(mapping)
}

/// Reads only the header row of `path` and maps it. Missing columns are
/// reported on the mapping, not as an error.
pub fn preview_mapping(
    catalog: &SynonymCatalog,
    path: &Path,
    options: &ReadOptions,
) -> Result<ColumnMapping, IngestError> {
    let delimiter = io_utils::resolve_input_delimiter(path, options.delimiter);
    let encoding = io_utils::resolve_encoding(options.encoding.as_deref())?;
    let mut reader = io_utils::open_csv_reader_from_path(path, delimiter)?;
    let headers = io_utils::reader_headers(&mut reader, encoding)?;
    Ok(build_mapping(catalog, &headers)?)
}

fn raw_row(mapping: &ColumnMapping, line: u64, mut cells: Vec<String>) -> RawRow {
    let mut raw = RawRow::new(line);
    for header in mapping.headers() {
        let Some(canonical) = header.canonical else {
            continue;
        };
        if let Some(cell) = cells.get_mut(header.position) {
            raw.insert(canonical, std::mem::take(cell));
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_row_uses_canonical_names_and_skips_short_records() {
        let catalog = SynonymCatalog::builtin(Table::Receivers).unwrap();
        let headers: Vec<String> = ["id", "receivername", "Kind", "city", "email"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let mapping = build_mapping(&catalog, &headers).unwrap();
        let raw = raw_row(
            &mapping,
            4,
            vec!["3".into(), "Shelter".into(), "x".into(), "Pune".into()],
        );
        assert_eq!(raw.line, 4);
        assert_eq!(raw.get("Receiver_ID"), Some("3"));
        assert_eq!(raw.get("Name"), Some("Shelter"));
        assert_eq!(raw.get("City"), Some("Pune"));
        assert_eq!(raw.get("Contact"), None);
        assert_eq!(raw.get("Type"), None);
    }

    #[test]
    fn summary_lists_rejections_and_failures() {
        let catalog = SynonymCatalog::builtin(Table::Providers).unwrap();
        let headers: Vec<String> = ["Provider_ID", "Name", "Type", "Address", "City", "Contact"]
            .iter()
            .map(|h| h.to_string())
            .collect();
        let report = ImportReport {
            table: Table::Providers,
            mapping: build_mapping(&catalog, &headers).unwrap(),
            rows_read: 3,
            rows_cleaned: 2,
            rows_committed: 0,
            rows_affected: 0,
            batches_committed: 0,
            rows_not_attempted: 0,
            rejected: vec![RowCoercionError {
                line: 3,
                key: None,
                column: "Provider_ID",
                value: Some("x".into()),
                reason: "is not an integer".into(),
            }],
            failed_batches: vec![BatchFailure {
                table: Table::Providers,
                batch_index: 0,
                first_key: 1,
                last_key: 2,
                rows: 2,
                message: "store unavailable: down".into(),
            }],
        };
        assert!(!report.is_clean());
        let lines = report.summary_lines();
        assert!(lines.contains(&"Rows rejected: 1".to_string()));
        assert!(
            lines
                .iter()
                .any(|l| l.contains("line 3: Provider_ID is not an integer (got 'x')"))
        );
        assert!(lines.iter().any(|l| l.contains("keys 1..=2")));
    }
}
