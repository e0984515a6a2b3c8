use anyhow::{Context, Result, anyhow};
use log::info;

use crate::{
    cli::MapArgs,
    config::IngestConfig,
    ingest::{ReadOptions, preview_mapping},
    table,
};

/// Prints how each header maps and fails when a canonical column has no
/// source.
pub fn execute(args: &MapArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => IngestConfig::load(path)?,
        None => IngestConfig::default(),
    };
    let catalog = config.catalog(args.table)?;
    let options = ReadOptions {
        delimiter: args.delimiter,
        encoding: args.input_encoding.clone(),
    };
    let mapping = preview_mapping(&catalog, &args.input, &options)
        .with_context(|| format!("Reading headers from {:?}", args.input))?;
    info!(
        "Mapped {} of {} header(s) for {}",
        mapping.mapped().count(),
        mapping.headers().len(),
        args.table
    );

    let rows = mapping
        .headers()
        .iter()
        .map(|header| {
            vec![
                header.source.clone(),
                header.canonical.unwrap_or("(ignored)").to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&["source", "canonical"], &rows);

    let missing = mapping.missing_required();
    if missing.is_empty() {
        println!("All {} column(s) of {} are mapped", args.table.columns().len(), args.table);
        Ok(())
    } else {
        Err(anyhow!(
            "{}: missing required column(s) {}",
            args.table,
            missing.join(", ")
        ))
    }
}
