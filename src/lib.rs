pub mod catalog;
pub mod claims;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod header;
pub mod import_cmd;
pub mod ingest;
pub mod io_utils;
pub mod map_cmd;
pub mod mapping;
pub mod rows;
pub mod setup;
pub mod sqlite;
pub mod statements;
pub mod store;
pub mod table;
pub mod upsert;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    catalog::Table,
    claims::NewClaim,
    cli::{Cli, Commands},
    setup::SchemaStatus,
    sqlite::SqliteProvider,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("foodshare_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Setup(args) => handle_setup(&args),
        Commands::Check(args) => handle_check(&args),
        Commands::Map(args) => map_cmd::execute(&args),
        Commands::Import(args) => import_cmd::execute(&args),
        Commands::Claim(args) => handle_claim(&args),
    }
}

fn handle_setup(args: &cli::SetupArgs) -> Result<()> {
    let provider = SqliteProvider::new(&args.db.db);
    info!("Setting up schema in {:?}", provider.path());
    if let SchemaStatus::Deferred { reason } = setup::ensure_schema(&provider) {
        return Err(anyhow!("Schema setup failed: {reason}"));
    }
    if args.seed {
        let inserted = setup::seed_sample_rows(&provider, Local::now().date_naive())
            .context("Inserting sample rows")?;
        info!("Inserted {inserted} sample row(s)");
    }

    let tables = setup::existing_tables(&provider).context("Listing tables")?;
    let mut rows = Vec::with_capacity(tables.len());
    for name in &tables {
        let count = match name.parse::<Table>() {
            Ok(table) => setup::row_count(&provider, table)
                .with_context(|| format!("Counting rows in {table}"))?
                .to_string(),
            Err(_) => "-".to_string(),
        };
        rows.push(vec![name.clone(), count]);
    }
    table::print_table(&["table", "rows"], &rows);
    Ok(())
}

fn handle_check(args: &cli::DbArgs) -> Result<()> {
    let provider = SqliteProvider::new(&args.db);
    setup::check_connection(&provider)
        .with_context(|| format!("Connecting to {:?}", provider.path()))?;
    println!("OK: {} is reachable", provider.path().display());
    Ok(())
}

fn handle_claim(args: &cli::ClaimArgs) -> Result<()> {
    let provider = SqliteProvider::new(&args.db.db);
    let claim = claims::create_claim(
        &provider,
        NewClaim {
            food_id: args.food_id,
            receiver_id: args.receiver_id,
            status: args.status,
        },
    )
    .context("Creating claim")?;
    println!(
        "Claim {} created (food {}, receiver {}, {})",
        claim.claim_id, claim.food_id, claim.receiver_id, claim.status
    );
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
