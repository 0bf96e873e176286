//! Scan command implementation.
//!
//! Runs a single scan of the process root and prints the deleted libraries
//! found, without starting the HTTP server.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use deleted_mapping_exporter::{scan_deleted_mappings, ScrapeResult};

use crate::cli::ConfigFormat;
use crate::config::Config;

/// Serializable summary of one scan.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub proc_path: String,
    pub success: bool,
    pub duration_ms: f64,
    pub failures: Vec<String>,
    /// Library path -> matching maps lines, sorted by path.
    pub libraries: BTreeMap<String, u64>,
}

impl ScanReport {
    pub fn new(proc_path: &Path, result: &ScrapeResult, duration_ms: f64) -> Self {
        Self {
            proc_path: proc_path.display().to_string(),
            success: result.is_success(),
            duration_ms,
            failures: result.failures.iter().map(|f| f.to_string()).collect(),
            libraries: result
                .tally
                .iter()
                .map(|(path, count)| (path.clone(), *count))
                .collect(),
        }
    }

    pub fn render(&self, format: ConfigFormat) -> Result<String, Box<dyn std::error::Error>> {
        let output = match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self)?,
            ConfigFormat::Toml => toml::to_string_pretty(self)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self)?,
        };
        Ok(output)
    }
}

/// Runs one scan and prints the report.
pub fn command_scan(format: ConfigFormat, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let proc_path = config.proc_path();

    let start = Instant::now();
    let result = scan_deleted_mappings(proc_path);
    let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

    let report = ScanReport::new(proc_path, &result, duration_ms);
    println!("{}", report.render(format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_report_from_fake_proc_root() {
        let root = TempDir::new().unwrap();
        let pid_dir = root.path().join("7");
        fs::create_dir(&pid_dir).unwrap();
        fs::write(
            pid_dir.join("maps"),
            "00400000-00452000 r-xp 00000000 08:02 173521 /lib/old.so (deleted)\n",
        )
        .unwrap();
        fs::create_dir(root.path().join("8")).unwrap();

        let result = scan_deleted_mappings(root.path());
        let report = ScanReport::new(root.path(), &result, 1.0);

        assert!(!report.success);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.libraries.get("/lib/old.so"), Some(&1));

        let json = report.render(ConfigFormat::Json).unwrap();
        assert!(json.contains("\"/lib/old.so\": 1"));
    }
}
