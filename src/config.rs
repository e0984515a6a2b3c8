//! Optional YAML configuration for ingestion runs.
//!
//! ```yaml
//! batch_size: 50
//! progress_every: 500
//! stop_on_batch_failure: false
//! foreign_keys: true
//! synonyms:
//!   food_listings:
//!     Location: ["pickup_point", "branch"]
//! ```

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{SynonymCatalog, SynonymOverrides, Table},
    error::MappingError,
    upsert::{BatchUpserter, DEFAULT_BATCH_SIZE, ProgressCadence},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub batch_size: usize,
    /// Report progress every N rows instead of after every batch.
    pub progress_every: Option<usize>,
    pub stop_on_batch_failure: bool,
    pub foreign_keys: bool,
    pub synonyms: BTreeMap<Table, SynonymOverrides>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            progress_every: None,
            stop_on_batch_failure: false,
            foreign_keys: false,
            synonyms: BTreeMap::new(),
        }
    }
}

impl IngestConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config: IngestConfig = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing config YAML {path:?}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: IngestConfig = serde_yaml::from_str(input).context("Parsing config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.batch_size > 0, "batch_size must be at least 1");
        ensure!(
            self.progress_every != Some(0),
            "progress_every must be at least 1"
        );
        for table in self.synonyms.keys() {
            self.catalog(*table)?;
        }
        Ok(())
    }

    pub fn progress(&self) -> ProgressCadence {
        match self.progress_every {
            Some(every) => ProgressCadence::EveryRows(every),
            None => ProgressCadence::PerBatch,
        }
    }

    pub fn upserter(&self) -> BatchUpserter {
        BatchUpserter::new(self.batch_size)
            .with_progress(self.progress())
            .stop_on_failure(self.stop_on_batch_failure)
    }

    pub fn catalog(&self, table: Table) -> Result<SynonymCatalog, MappingError> {
        match self.synonyms.get(&table) {
            Some(extra) => SynonymCatalog::with_overrides(table, extra),
            None => SynonymCatalog::builtin(table),
        }
    }
}
