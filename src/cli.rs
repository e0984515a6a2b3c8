use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{catalog::Table, rows::ClaimStatus};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Import provider, receiver, food listing and claim CSVs into a SQLite database",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the tables if they do not exist and list what the database holds
    Setup(SetupArgs),
    /// Check that the database can be opened and queried
    Check(DbArgs),
    /// Show how a CSV's headers map onto a table's canonical columns
    Map(MapArgs),
    /// Map, clean and upsert a CSV into one table
    Import(ImportArgs),
    /// Record a single claim with the next free Claim_ID
    Claim(ClaimArgs),
}

#[derive(Debug, Args)]
pub struct DbArgs {
    /// SQLite database file
    #[arg(long = "db")]
    pub db: PathBuf,
}

#[derive(Debug, Args)]
pub struct SetupArgs {
    #[command(flatten)]
    pub db: DbArgs,
    /// Also insert one linked sample row per table (existing rows are kept)
    #[arg(long)]
    pub seed: bool,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Target table (providers, receivers, food_listings, claims)
    #[arg(short, long, value_parser = parse_table)]
    pub table: Table,
    /// Input CSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML file with extra column synonyms
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[command(flatten)]
    pub db: DbArgs,
    /// Target table (providers, receivers, food_listings, claims)
    #[arg(short, long, value_parser = parse_table)]
    pub table: Table,
    /// Input CSV file (`-` for stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// YAML ingestion config (batch size, progress cadence, synonyms)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Rows per upsert batch (overrides the config file)
    #[arg(long = "batch-size")]
    pub batch_size: Option<usize>,
    /// Report progress every N rows instead of after each batch
    #[arg(long = "progress-every")]
    pub progress_every: Option<usize>,
    /// Stop at the first failed batch instead of attempting the rest
    #[arg(long = "stop-on-failure")]
    pub stop_on_failure: bool,
    /// Skip creating missing tables before importing
    #[arg(long = "no-setup")]
    pub no_setup: bool,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Write the full import report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ClaimArgs {
    #[command(flatten)]
    pub db: DbArgs,
    #[arg(long = "food-id")]
    pub food_id: i64,
    #[arg(long = "receiver-id")]
    pub receiver_id: i64,
    /// Pending, Completed or Cancelled
    #[arg(long, default_value = "Pending", value_parser = parse_status)]
    pub status: ClaimStatus,
}

pub fn parse_table(value: &str) -> Result<Table, String> {
    value.parse::<Table>().map_err(|err| err.to_string())
}

pub fn parse_status(value: &str) -> Result<ClaimStatus, String> {
    value.parse::<ClaimStatus>().map_err(|err| err.to_string())
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
