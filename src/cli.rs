//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// procdash - process lookup and dashboard over a JSON snapshot
///
/// Serves process lookups and per-unit dashboards from a snapshot that is
/// read from a primary location with a local backup.
///
/// Examples:
///   procdash serve --bind 0.0.0.0:3000
///   procdash find 0001.000123/2024-07
///   procdash dashboard --unidade SEFAZ --dias 15 --format json
///   procdash migrate legacy_map.json data/processos.json
///   procdash --init-config
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .procdash.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Primary snapshot location (overrides config)
    #[arg(long, value_name = "FILE", env = "PROCDASH_PRIMARY", global = true)]
    pub primary: Option<PathBuf>,

    /// Secondary (backup) snapshot location (overrides config)
    #[arg(long, value_name = "FILE", env = "PROCDASH_SECONDARY", global = true)]
    pub secondary: Option<PathBuf>,

    /// Seconds a loaded snapshot may be reused; 0 reloads on every query
    #[arg(long, value_name = "SECS", global = true)]
    pub cache_ttl: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .procdash.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to listen on (overrides config)
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Look up a single process by its number
    Find {
        /// Process number, e.g. 0001.000123/2024-07
        numero: String,
    },

    /// Render the dashboard for a unit
    Dashboard {
        #[arg(long)]
        unidade: String,

        /// Day threshold for the in-threshold columns (defaults to config)
        #[arg(long, value_name = "DAYS")]
        dias: Option<f64>,

        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Threshold breakdown for one category of a unit
    Details {
        #[arg(long)]
        unidade: String,

        #[arg(long)]
        tipo_tabela: String,

        /// Day threshold (defaults to config)
        #[arg(long, value_name = "DAYS")]
        dias: Option<f64>,
    },

    /// Count records without a usable day count
    Invalid {
        #[arg(long)]
        unidade: String,

        #[arg(long)]
        tipo_tabela: String,
    },

    /// Convert an id-keyed snapshot into the canonical list form
    Migrate {
        input: PathBuf,
        output: PathBuf,
    },
}

/// Output format for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Skip the remaining checks for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required (try --help)".to_string());
        };

        match command {
            Command::Find { numero } if numero.trim().is_empty() => {
                Err("Process number must not be empty".to_string())
            }
            Command::Dashboard { dias: Some(d), .. } | Command::Details { dias: Some(d), .. }
                if !d.is_finite() || *d < 0.0 =>
            {
                Err("Day threshold must be a non-negative number".to_string())
            }
            Command::Migrate { input, output } if input == output => {
                Err("Migration input and output must differ".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
