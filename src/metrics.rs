//! Prometheus metrics for deleted library mappings.
//!
//! Descriptors are built once at startup into [`MetricDescriptors`]. Every
//! scrape renders a fresh set of metric families from a new scan, so nothing
//! mutable is shared between concurrent scrapes.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, error};

use crate::process::{scan_deleted_mappings, Tally};

/// Metric namespace shared by all exported series.
pub const NAMESPACE: &str = "old_lib_exporter";

/// Label carrying the deleted library path.
pub const LIBRARY_LABEL: &str = "libraryname";

/// Immutable metric shapes, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct MetricDescriptors {
    libs_opts: Opts,
    up_opts: Opts,
    libs_desc: Desc,
    up_desc: Desc,
}

impl MetricDescriptors {
    pub fn new() -> prometheus::Result<Self> {
        let libs_opts = Opts::new("oldlibs", "Number of processes using this old library.")
            .namespace(NAMESPACE);
        let up_opts = Opts::new("up", "Whether scraping old lib's metrics was successful.")
            .namespace(NAMESPACE);

        let libs_desc = Desc::new(
            libs_opts.fq_name(),
            libs_opts.help.clone(),
            vec![LIBRARY_LABEL.to_string()],
            HashMap::new(),
        )?;
        let up_desc = Desc::new(
            up_opts.fq_name(),
            up_opts.help.clone(),
            Vec::new(),
            HashMap::new(),
        )?;

        Ok(Self {
            libs_opts,
            up_opts,
            libs_desc,
            up_desc,
        })
    }

    pub fn descs(&self) -> Vec<&Desc> {
        vec![&self.libs_desc, &self.up_desc]
    }
}

/// Renders a tally and the scan outcome into metric families.
///
/// Emits one `oldlibs` sample per path and exactly one `up` sample. The
/// tally is only read; families without samples are left out.
pub fn render(
    descriptors: &MetricDescriptors,
    tally: &Tally,
    success: bool,
) -> prometheus::Result<Vec<MetricFamily>> {
    let libs = GaugeVec::new(descriptors.libs_opts.clone(), &[LIBRARY_LABEL])?;
    for (path, count) in tally {
        debug!("Deleted library {} mapped {} times", path, count);
        libs.with_label_values(&[path.as_str()]).set(*count as f64);
    }

    let up = Gauge::with_opts(descriptors.up_opts.clone())?;
    up.set(if success { 1.0 } else { 0.0 });

    let mut families: Vec<MetricFamily> = libs
        .collect()
        .into_iter()
        .filter(|mf| !mf.get_metric().is_empty())
        .collect();
    families.extend(up.collect());
    Ok(families)
}

/// Collector that scans the process root on every gather.
pub struct DeletedMappingCollector {
    proc_path: PathBuf,
    descriptors: MetricDescriptors,
}

impl DeletedMappingCollector {
    pub fn new(proc_path: impl Into<PathBuf>, descriptors: MetricDescriptors) -> Self {
        Self {
            proc_path: proc_path.into(),
            descriptors,
        }
    }

    pub fn proc_path(&self) -> &Path {
        &self.proc_path
    }
}

impl Collector for DeletedMappingCollector {
    fn desc(&self) -> Vec<&Desc> {
        self.descriptors.descs()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let result = scan_deleted_mappings(&self.proc_path);
        match render(&self.descriptors, &result.tally, result.is_success()) {
            Ok(families) => families,
            Err(e) => {
                error!("Failed to render deleted mapping metrics: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Encoder, TextEncoder};

    fn encode(families: &[MetricFamily]) -> Vec<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(families, &mut buffer).unwrap();
        let mut lines: Vec<String> = String::from_utf8(buffer)
            .unwrap()
            .lines()
            .filter(|l| !l.starts_with('#'))
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }

    #[test]
    fn test_render_one_sample_per_path_plus_up() {
        let descriptors = MetricDescriptors::new().unwrap();
        let mut tally = Tally::new();
        tally.insert("/lib/old.so".to_string(), 2);
        tally.insert("/usr/lib/libssl.so.3".to_string(), 5);

        let lines = encode(&render(&descriptors, &tally, true).unwrap());
        assert_eq!(
            lines,
            vec![
                "old_lib_exporter_oldlibs{libraryname=\"/lib/old.so\"} 2",
                "old_lib_exporter_oldlibs{libraryname=\"/usr/lib/libssl.so.3\"} 5",
                "old_lib_exporter_up 1",
            ]
        );
    }

    #[test]
    fn test_render_failure_sets_up_to_zero() {
        let descriptors = MetricDescriptors::new().unwrap();
        let mut tally = Tally::new();
        tally.insert("/lib/old.so".to_string(), 1);

        let lines = encode(&render(&descriptors, &tally, false).unwrap());
        assert!(lines.contains(&"old_lib_exporter_up 0".to_string()));
        assert!(lines.contains(&"old_lib_exporter_oldlibs{libraryname=\"/lib/old.so\"} 1".to_string()));
    }

    #[test]
    fn test_render_empty_tally_emits_only_up() {
        let descriptors = MetricDescriptors::new().unwrap();
        let families = render(&descriptors, &Tally::new(), true).unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(encode(&families), vec!["old_lib_exporter_up 1"]);
    }

    #[test]
    fn test_render_is_idempotent() {
        let descriptors = MetricDescriptors::new().unwrap();
        let mut tally = Tally::new();
        tally.insert("/lib/a.so".to_string(), 3);
        tally.insert("/lib/b.so".to_string(), 1);

        let first = encode(&render(&descriptors, &tally, true).unwrap());
        let second = encode(&render(&descriptors, &tally, true).unwrap());
        assert_eq!(first, second);
        assert_eq!(tally.len(), 2);
    }

    #[test]
    fn test_descriptors_names() {
        let descriptors = MetricDescriptors::new().unwrap();
        let names: Vec<&str> = descriptors
            .descs()
            .iter()
            .map(|d| d.fq_name.as_str())
            .collect();
        assert_eq!(names, vec!["old_lib_exporter_oldlibs", "old_lib_exporter_up"]);
    }

    #[test]
    fn test_collector_scans_configured_root() {
        let root = tempfile::TempDir::new().unwrap();
        let collector = DeletedMappingCollector::new(root.path(), MetricDescriptors::new().unwrap());
        assert_eq!(collector.proc_path(), root.path());
        assert_eq!(collector.desc().len(), 2);

        let lines = encode(&collector.collect());
        assert_eq!(lines, vec!["old_lib_exporter_up 1".to_string()]);
    }
}
