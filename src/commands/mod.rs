//! CLI command implementations for deleted-mapping-exporter.
//!
//! This module provides implementations for CLI subcommands:
//! - `scan`: One-shot scan with a printed report

pub mod scan;

// Re-export command functions
pub use scan::command_scan;
