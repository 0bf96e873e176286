//! Deleted Mapping Exporter Library
//!
//! Detects processes that still map shared libraries whose files have been
//! deleted from disk, typically after a package upgrade, and exposes the
//! result as Prometheus metrics.
//!
//! # Features
//!
//! - **Map-Line Classification**: Picks deleted private executable mappings out of `/proc/<pid>/maps`
//! - **Per-Host Scanning**: Walks every process, tolerating processes that vanish mid-scan
//! - **Metric Rendering**: One gauge per library path plus an `up` health gauge
//!
//! # Usage
//!
//! ```rust,no_run
//! use deleted_mapping_exporter::{render, scan_deleted_mappings, MetricDescriptors};
//! use std::path::Path;
//!
//! let result = scan_deleted_mappings(Path::new("/proc"));
//! for (path, count) in &result.tally {
//!     println!("{path}: {count}");
//! }
//!
//! let descriptors = MetricDescriptors::new().unwrap();
//! let families = render(&descriptors, &result.tally, result.is_success()).unwrap();
//! println!("{} metric families", families.len());
//! ```

pub mod metrics;
pub mod process;

// Re-export main types for convenience
pub use metrics::{render, DeletedMappingCollector, MetricDescriptors, LIBRARY_LABEL, NAMESPACE};
pub use process::{deleted_mapping_path, scan_deleted_mappings, ScanError, ScrapeResult, Tally};
