use std::{fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use crate::{
    cli::ImportArgs,
    config::IngestConfig,
    ingest::{ImportReport, Importer, ReadOptions},
    setup::{self, SchemaStatus},
    sqlite::SqliteProvider,
};

pub fn execute(args: &ImportArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let provider = SqliteProvider::new(&args.db.db).with_foreign_keys(config.foreign_keys);

    if !args.no_setup
        && let SchemaStatus::Deferred { reason } = setup::ensure_schema(&provider)
    {
        warn!("Continuing without schema setup: {reason}");
    }

    let importer = Importer::new(&provider, config);
    let options = ReadOptions {
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
    };
    let report = importer
        .import_path(args.table, &args.input, &options, |progress| {
            info!(
                "{}: {}/{} row(s) processed",
                progress.table, progress.processed, progress.total
            );
        })?;

    for line in report.summary_lines() {
        println!("{line}");
    }
    if let Some(path) = &args.report {
        write_report(&report, path)?;
        info!("Import report written to {path:?}");
    }

    if report.failed_batches.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} batch(es) failed while importing into {}",
            report.failed_batches.len(),
            args.table
        ))
    }
}

fn resolve_config(args: &ImportArgs) -> Result<IngestConfig> {
    let mut config = match &args.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    if let Some(size) = args.batch_size {
        config.batch_size = size;
    }
    if let Some(every) = args.progress_every {
        config.progress_every = Some(every);
    }
    if args.stop_on_failure {
        config.stop_on_batch_failure = true;
    }
    config.validate()?;
    Ok(config)
}

fn write_report(report: &ImportReport, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Creating report file {path:?}"))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Writing report to {path:?}"))
}
