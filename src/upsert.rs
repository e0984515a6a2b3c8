//! Batched upserts.
//!
//! Rows are split into fixed-size batches and each batch goes to the store as
//! one `execute_batch` call on its own connection. A failed batch is recorded
//! with its key range and the run moves on (unless told to stop); batches that
//! already committed stay committed.

use log::{debug, warn};
use serde::Serialize;

use crate::{
    catalog::Table,
    data::Value,
    error::BatchFailure,
    rows::CleanRow,
    statements,
    store::{Connection, ConnectionProvider},
};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// How often the progress callback fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProgressCadence {
    #[default]
    PerBatch,
    /// Whenever the processed count crosses a multiple of N, and at the end.
    EveryRows(usize),
}

/// Advisory progress: rows submitted so far, not rows known to be committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub table: Table,
    pub processed: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    /// Affected-row count as reported by the store.
    pub affected: u64,
    pub batches_committed: usize,
    pub rows_committed: usize,
    pub failures: Vec<BatchFailure>,
    /// Rows never sent because the run stopped after a failure.
    pub rows_not_attempted: usize,
}

impl UpsertOutcome {
    pub fn rows_failed(&self) -> usize {
        self.failures.iter().map(|f| f.rows).sum()
    }
}

#[derive(Debug, Clone)]
pub struct BatchUpserter {
    batch_size: usize,
    cadence: ProgressCadence,
    stop_on_failure: bool,
}

impl Default for BatchUpserter {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl BatchUpserter {
    /// A batch size of 0 is treated as 1.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            cadence: ProgressCadence::PerBatch,
            stop_on_failure: false,
        }
    }

    pub fn with_progress(mut self, cadence: ProgressCadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn stop_on_failure(mut self, stop: bool) -> Self {
        self.stop_on_failure = stop;
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Upserts `rows` into `table`. Every row must belong to `table`.
    pub fn upsert<P, F>(
        &self,
        provider: &P,
        table: Table,
        rows: &[CleanRow],
        mut on_progress: F,
    ) -> UpsertOutcome
    where
        P: ConnectionProvider,
        F: FnMut(Progress),
    {
        debug_assert!(rows.iter().all(|row| row.table() == table));
        let mut outcome = UpsertOutcome::default();
        if rows.is_empty() {
            return outcome;
        }

        let sql = statements::upsert(table);
        let total = rows.len();
        let mut processed = 0usize;

        for (batch_index, batch) in rows.chunks(self.batch_size).enumerate() {
            let params: Vec<Vec<Value>> = batch.iter().map(CleanRow::params).collect();
            let result = provider
                .acquire()
                .and_then(|mut conn| conn.execute_batch(&sql, &params));
            match result {
                Ok(affected) => {
                    outcome.affected += affected;
                    outcome.batches_committed += 1;
                    outcome.rows_committed += batch.len();
                }
                Err(err) => {
                    let failure = BatchFailure {
                        table,
                        batch_index,
                        first_key: batch.first().map(CleanRow::key).unwrap_or_default(),
                        last_key: batch.last().map(CleanRow::key).unwrap_or_default(),
                        rows: batch.len(),
                        message: err.to_string(),
                    };
                    warn!("{failure}");
                    outcome.failures.push(failure);
                }
            }

            let before = processed;
            processed += batch.len();
            if self.should_report(before, processed, total) {
                debug!("{table}: {processed}/{total} row(s) submitted");
                on_progress(Progress {
                    table,
                    processed,
                    total,
                });
            }

            if self.stop_on_failure && !outcome.failures.is_empty() {
                outcome.rows_not_attempted = total - processed;
                if outcome.rows_not_attempted > 0 {
                    warn!(
                        "{table}: stopping after failed batch; {} row(s) not attempted",
                        outcome.rows_not_attempted
                    );
                }
                break;
            }
        }
        outcome
    }

    fn should_report(&self, before: usize, after: usize, total: usize) -> bool {
        match self.cadence {
            ProgressCadence::PerBatch => true,
            ProgressCadence::EveryRows(every) => {
                let every = every.max(1);
                after == total || after / every > before / every
            }
        }
    }
}
