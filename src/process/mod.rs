//! Process-related modules for deleted mapping detection.
//!
//! This module provides:
//! - `maps`: Classification of `/proc/<pid>/maps` lines
//! - `scanner`: Process discovery and per-host tallying

pub mod maps;
pub mod scanner;

// Re-export commonly used types
pub use maps::{deleted_mapping_path, MapEntry, DELETED_SUFFIX};
pub use scanner::{
    collect_proc_entries, scan_deleted_mappings, search_maps, ProcEntry, ScanError,
    ScrapeResult, Tally,
};
