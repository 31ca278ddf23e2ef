//! pdg-ingest - painting catalog ingestion
//!
//! `fetch` queries the graph endpoint window by window and writes raw window
//! files plus a run log. `merge` reconciles the raw files with the prior
//! corpus into the final catalog. `run` does both.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use pdg_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use pdg_ingest::pipeline::{self, MergePaths};
use pdg_ingest::services::{RunPaths, SparqlClient};
use pdg_ingest::IngestConfig;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for pdg-ingest
#[derive(Parser, Debug)]
#[command(name = "pdg-ingest")]
#[command(about = "Public-domain painting catalog ingestion")]
#[command(version)]
struct Args {
    /// Root folder holding the data directory
    #[arg(short, long, global = true)]
    root_folder: Option<PathBuf>,

    /// TOML config file (default: platform config location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the endpoint and write raw window files
    Fetch,
    /// Reconcile raw window files with the prior corpus
    Merge(MergeArgs),
    /// Fetch, then merge
    Run(MergeArgs),
}

#[derive(ClapArgs, Debug, Default)]
struct MergeArgs {
    /// Museum→city reference table
    #[arg(long)]
    city_mapping: Option<PathBuf>,

    /// Prior corpus (default: <root>/data/existing-artworks.json)
    #[arg(long)]
    prior: Option<PathBuf>,

    /// Output corpus (default: <root>/data/all-artworks.json)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (toml_config, config_source) =
        TomlConfig::load_or_default(args.config.as_deref()).context("Failed to load config")?;
    init_tracing(&toml_config).context("Failed to initialize logging")?;

    info!("Starting pdg-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config_source.log();

    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder.clone())
        .with_toml(&toml_config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directories()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let config = IngestConfig::resolve(&toml_config).context("Invalid ingest configuration")?;

    match args.command {
        Command::Fetch => {
            run_fetch(&config, &initializer).await?;
        }
        Command::Merge(merge_args) => {
            run_merge(&config, &toml_config, &initializer, &merge_args)?;
        }
        Command::Run(merge_args) => {
            run_fetch(&config, &initializer).await?;
            run_merge(&config, &toml_config, &initializer, &merge_args)?;
        }
    }

    info!("Done");
    Ok(())
}

async fn run_fetch(config: &IngestConfig, initializer: &RootFolderInitializer) -> Result<()> {
    let client = SparqlClient::new(
        config.sparql_endpoint.clone(),
        &config.user_agent,
        config.query_timeout,
        config.validation_rules(),
    )
    .context("Failed to build SPARQL client")?;
    info!(endpoint = %config.sparql_endpoint, "SPARQL client ready");

    let paths = RunPaths {
        raw_dir: initializer.raw_dir(),
        run_log: initializer.run_log_path(),
    };
    let report = pipeline::fetch(&client, config, paths)
        .await
        .context("Ingestion run failed")?;

    let failed = report.failed_windows().count();
    if failed > 0 {
        warn!(failed, "Some windows failed; see the run log for details");
    }
    Ok(())
}

fn run_merge(
    config: &IngestConfig,
    toml_config: &TomlConfig,
    initializer: &RootFolderInitializer,
    args: &MergeArgs,
) -> Result<()> {
    let paths = MergePaths {
        raw_dir: initializer.raw_dir(),
        prior_corpus: args
            .prior
            .clone()
            .unwrap_or_else(|| initializer.prior_corpus_path()),
        city_mapping: resolve_city_mapping(args, toml_config, initializer.root_folder()),
        output: args
            .output
            .clone()
            .unwrap_or_else(|| initializer.corpus_path()),
    };

    pipeline::merge(config, &paths).context("Reconciliation failed")?;
    Ok(())
}

/// City table location
///
/// **Priority:** CLI → TOML → `<root>/city-mapping.json` if present → bundled
fn resolve_city_mapping(
    args: &MergeArgs,
    toml_config: &TomlConfig,
    root_folder: &Path,
) -> Option<PathBuf> {
    if let Some(path) = &args.city_mapping {
        return Some(path.clone());
    }
    if let Some(path) = &toml_config.city_mapping {
        return Some(path.clone());
    }
    let local = root_folder.join("city-mapping.json");
    local.exists().then_some(local)
}

/// Registry with an env filter, stderr output and an optional log file
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(toml_config: &TomlConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&toml_config.logging.level))
        .context("Invalid log level")?;

    let file_layer = match &toml_config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(())
}
