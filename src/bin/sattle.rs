//! Command-line front end of the sattle engine.
//!
//! - `check`: register a visit against a TLE file and print the whitelist of a DiaSource batch
//! - `tracks`: register a visit and print the computed cache entry
//!
//! Both print JSON on stdout; logs go to stderr and follow `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sattle::api::{RegisterVisitRequest, WhitelistRequest, WhitelistResponse};
use sattle::catalog::tle_file::TleFileCatalog;
use sattle::config::SattleConfig;
use sattle::sattle::Sattle;
use sattle::sattle_errors::SattleError;
use sattle::visit_cache::VisitCacheEntry;

#[derive(Parser, Debug)]
#[command(name = "sattle")]
#[command(about = "Satellite track cache and DiaSource whitelist filter")]
#[command(version)]
struct Args {
    /// Two- or three-line element set file
    #[arg(long, global = true)]
    tle: Option<PathBuf>,

    /// JSON configuration file (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a visit and print the whitelist of a DiaSource batch
    Check {
        /// Visit registration request (JSON)
        #[arg(long)]
        visit: PathBuf,

        /// Whitelist request (JSON)
        #[arg(long)]
        diasources: PathBuf,

        /// Select element sets valid at the exposure start
        #[arg(long)]
        historical: bool,

        /// Also print contaminated and rejected sources
        #[arg(long)]
        verbose: bool,
    },

    /// Register a visit and print its tracks
    Tracks {
        /// Visit registration request (JSON)
        #[arg(long)]
        visit: PathBuf,

        /// Select element sets valid at the exposure start
        #[arg(long)]
        historical: bool,
    },
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SattleError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), SattleError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn register(
    engine: &Sattle<TleFileCatalog>,
    visit: &Path,
    historical: bool,
) -> Result<Arc<VisitCacheEntry>, SattleError> {
    let mut request: RegisterVisitRequest = read_json(visit)?;
    request.historical |= historical;
    let entry = engine.register_visit(&request).await?;
    info!(
        visit_id = entry.visit_id(),
        tracks = entry.tracks.len(),
        skipped = entry.skipped.len(),
        "visit ready"
    );
    Ok(entry)
}

#[tokio::main]
async fn main() -> Result<(), SattleError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => SattleConfig::from_json_file(path)?,
        None => SattleConfig::default(),
    };
    let Some(tle) = args.tle else {
        return Err(SattleError::InvalidConfig("--tle <FILE> is required".into()));
    };
    let catalog = TleFileCatalog::new(tle)
        .with_historical_window(config.catalog.historical_window_days);
    let engine = Sattle::new(catalog, &config)?;

    match args.command {
        Command::Check {
            visit,
            diasources,
            historical,
            verbose,
        } => {
            register(&engine, &visit, historical).await?;
            let query: WhitelistRequest = read_json(&diasources)?;
            let outcome = engine.whitelist(&query)?;
            if verbose {
                print_json(&outcome)
            } else {
                print_json(&WhitelistResponse::from(outcome))
            }
        }
        Command::Tracks { visit, historical } => {
            let entry = register(&engine, &visit, historical).await?;
            print_json(&*entry)
        }
    }
}
