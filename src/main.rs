//! procdash - process lookup and dashboard service
//!
//! Reads a JSON snapshot of administrative processes from a primary
//! location (with a local backup) and answers lookups and per-unit
//! dashboard queries, over HTTP or once from the command line.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error, or the queried process/category was not found

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod server;
mod store;

use anyhow::{Context, Result};
use cli::{Args, Command, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use error::QueryError;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use store::RecordStore;
use tracing::{debug, error, info, warn};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("procdash v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .procdash.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("{} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Run the selected subcommand. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(command) = args.command else {
        anyhow::bail!("no subcommand given");
    };

    let record_store = Arc::new(RecordStore::from_config(&config.storage));
    debug!(
        "Snapshot: primary {} / secondary {}",
        record_store.loader().primary().display(),
        record_store.loader().secondary().display()
    );

    match command {
        Command::Serve { .. } => {
            let state = server::AppState {
                store: record_store,
                default_threshold_days: config.dashboard.threshold_days,
            };
            server::run_server(state, &config.server.bind_address).await?;
            Ok(0)
        }
        Command::Find { numero } => {
            let records = record_store.records().await?;
            report_query(analysis::find_by_number(&records, numero.trim()))
        }
        Command::Details {
            unidade,
            tipo_tabela,
            dias,
        } => {
            let threshold = dias.unwrap_or(config.dashboard.threshold_days);
            let records = record_store.records().await?;
            report_query(analysis::details_by_unit_and_category(
                &records,
                &tipo_tabela,
                &unidade,
                threshold,
            ))
        }
        Command::Invalid {
            unidade,
            tipo_tabela,
        } => {
            let records = record_store.records().await?;
            report_query(analysis::invalid_count_by_unit_and_category(
                &records,
                &tipo_tabela,
                &unidade,
            ))
        }
        Command::Dashboard {
            unidade,
            dias,
            format,
            output,
        } => {
            let threshold = dias.unwrap_or(config.dashboard.threshold_days);
            let records = record_store.records().await?;
            let dashboard = report::build_dashboard(&records, &unidade, threshold);

            let rendered = match format {
                OutputFormat::Json => report::generate_json_dashboard(&dashboard)?,
                OutputFormat::Markdown => report::generate_markdown_dashboard(&dashboard),
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, &rendered).with_context(|| {
                        format!("Failed to write dashboard to {}", path.display())
                    })?;
                    info!("Dashboard saved to {}", path.display());
                }
                None => println!("{}", rendered),
            }
            Ok(0)
        }
        Command::Migrate { input, output } => {
            let count = store::migrate::migrate_file(&input, &output).await?;
            println!("Migrated {} records to {}", count, output.display());
            Ok(0)
        }
    }
}

/// Print a query result as JSON; a miss becomes exit code 1.
fn report_query<T: Serialize>(result: Result<T, QueryError>) -> Result<i32> {
    match result {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(0)
        }
        Err(QueryError::NotFound(message)) => {
            eprintln!("{}", message);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
