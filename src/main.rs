//! # Main — CLI Entry Point
//!
//! Parses arguments, resolves the client configuration, initializes logging,
//! and routes each subcommand to its runner in [`cli`].
//!
//! ## Subcommands
//!
//! - `sequences`: primes expressible as sums of consecutive primes in a range
//!   (optionally exported to CSV).
//! - `phones`: prime phone numbers under a two-digit prefix.
//! - `prefixes`: list the dialable prefixes the service knows about.
//! - `interactive`: line-oriented session driving every surface at once;
//!   new searches supersede the one in flight.
//!
//! ## Global Options
//!
//! - `--base-url` / `PRIMESUM_BASE_URL`: collaborator root (overrides `--env`).
//! - `--env` / `PRIMESUM_ENV`: `development` (localhost:5000) or `production`.
//! - `--deadline-ms` / `PRIMESUM_DEADLINE_MS`: per-request deadline (default 30000).
//! - `--config`: TOML file with a `[client]` table, below flags and env vars.

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use primesum::config::Environment;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "primesum",
    version,
    about = "Search for primes that are sums of consecutive primes, and for prime phone numbers"
)]
struct Cli {
    /// Base URL of the search service (or set PRIMESUM_BASE_URL)
    #[arg(long, env = "PRIMESUM_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Deployment to use when no base URL is given
    #[arg(long = "env", env = "PRIMESUM_ENV", value_enum, global = true)]
    environment: Option<Environment>,

    /// Per-request deadline in milliseconds
    #[arg(long, env = "PRIMESUM_DEADLINE_MS", global = true)]
    deadline_ms: Option<u64>,

    /// TOML config file with a [client] table
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find primes in [start, end] that are sums of consecutive primes
    Sequences {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Minimum number of distinct sequences per prime
        #[arg(long, default_value = "1")]
        min_sequences: String,
        /// Maximum number of sequences per prime (omit for no limit)
        #[arg(long)]
        max_sequences: Option<String>,
        /// Minimum number of terms in a sequence
        #[arg(long, default_value = "2")]
        min_length: String,
        /// Maximum number of terms in a sequence (omit for no limit)
        #[arg(long)]
        max_length: Option<String>,
        /// Also write the results to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Find prime phone numbers under a two-digit prefix (e.g. 12 for 0912)
    Phones {
        #[arg(long)]
        prefix: String,
    },
    /// List the phone prefixes the service has data for
    Prefixes,
    /// Read commands from stdin; type `help` for the list
    Interactive,
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // LOG_FORMAT=json for log shippers, human-readable on stderr otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    let config = cli::resolve_config(&cli)?;

    match cli.command {
        Commands::Sequences {
            start,
            end,
            min_sequences,
            max_sequences,
            min_length,
            max_length,
            csv,
        } => {
            let form = primesum::SequenceForm {
                start: start.unwrap_or_default(),
                end: end.unwrap_or_default(),
                min_sequences,
                max_sequences: max_sequences.unwrap_or_default(),
                min_length,
                max_length: max_length.unwrap_or_default(),
            };
            cli::run_sequences(&config, form, csv.as_deref())
        }
        Commands::Phones { prefix } => cli::run_phones(&config, prefix),
        Commands::Prefixes => cli::run_prefixes(&config),
        Commands::Interactive => cli::run_interactive(&config),
    }
}
