//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Configuration file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "modelscan.toml";

/// modelscan -- detect unsafe code embedded in serialized ML models.
///
/// Use `modelscan <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "modelscan", version, about, long_about = None)]
pub struct Cli {
    /// Path to a modelscan.toml configuration file.
    ///
    /// When omitted, `modelscan.toml` in the current directory is used if present,
    /// otherwise built-in defaults.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration path and whether the user asked for it explicitly.
    pub fn config_path(&self) -> (&Path, bool) {
        match &self.config {
            Some(path) => (path.as_path(), true),
            None => (Path::new(DEFAULT_CONFIG_PATH), false),
        }
    }
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a file, directory or zip archive.
    Scan(ScanArgs),

    /// Check whether paths have a supported extension (no I/O).
    Check(CheckArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- scan ----

/// Scan a path and print the report.
#[derive(Args, Debug)]
pub struct ScanArgs {
    /// File, directory or archive to scan.
    pub path: PathBuf,

    /// List every skipped file in text output.
    #[arg(long)]
    pub show_skipped: bool,

    /// Also write the JSON report to this file.
    #[arg(long)]
    pub output_file: Option<PathBuf>,
}

// ---- check ----

/// Check paths against the configured extensions.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Paths to check.
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

// ---- config ----

/// Manage modelscan configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, scanners, zip).
        #[arg(long)]
        section: Option<String>,
    },
}
