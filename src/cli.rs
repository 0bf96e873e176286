//! CLI arguments and subcommands for deleted-mapping-exporter.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "deleted-mapping-exporter",
    about = "Prometheus exporter for processes still mapping deleted libraries",
    long_about = "Prometheus exporter for processes still mapping deleted libraries.\n\n\
                  Scans /proc/<pid>/maps of every process for executable mappings whose \
                  backing file was deleted (for example after a library upgrade) and \
                  exports one gauge per library path, so operators know which \
                  services need a restart.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Address to listen on for web interface and telemetry
    #[arg(long, alias = "deletedmapping.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics
    #[arg(long, alias = "deletedmapping.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Path where proc is mounted
    #[arg(long, alias = "deletedmapping.proc-path")]
    pub proc_path: Option<PathBuf>,

    /// Parallel scanning threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Log level (default: info)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a single scan and print the deleted libraries found
    Scan {
        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },

    /// Check runtime requirements and permissions
    CheckRequirements,
}
