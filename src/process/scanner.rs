//! Process scanning for deleted library mappings.
//!
//! This module walks the process-information root (normally `/proc`), reads
//! every `<pid>/maps` listing and tallies deleted library mappings by path.
//! Per-process failures never abort a scan; they are collected alongside the
//! partial tally so the caller can report a degraded outcome.

use ahash::AHashMap as HashMap;
use rayon::prelude::*;
use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::process::maps::deleted_mapping_path;

/// Library path -> number of matching maps lines.
///
/// Counts are per matching line, not per distinct process: a process that
/// maps the same deleted file in two executable segments contributes 2.
pub type Tally = HashMap<String, u64>;

/// Buffer size for reading maps listings.
const MAPS_BUFFER_BYTES: usize = 64 * 1024;

/// Process entry representing a numeric directory under the proc root.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

impl ProcEntry {
    pub fn maps_path(&self) -> PathBuf {
        self.proc_path.join("maps")
    }
}

/// Failure observed while scanning.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("cannot list process root {}: {source}", .path.display())]
    ListRoot { path: PathBuf, source: io::Error },

    #[error("cannot open maps of pid {pid}: {source}")]
    OpenMaps { pid: u32, source: io::Error },

    #[error("cannot read maps of pid {pid}: {source}")]
    ReadMaps { pid: u32, source: io::Error },
}

/// Outcome of one scan: the (possibly partial) tally and every failure seen.
#[derive(Debug, Default)]
pub struct ScrapeResult {
    pub tally: Tally,
    pub failures: Vec<ScanError>,
}

impl ScrapeResult {
    /// True when the scan finished without any I/O failure.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// The most recently recorded failure, if any.
    pub fn last_error(&self) -> Option<&ScanError> {
        self.failures.last()
    }
}

/// Lists numeric process directories under `root`.
///
/// An error while reading any directory entry fails the whole listing.
pub fn collect_proc_entries(root: &Path) -> io::Result<Vec<ProcEntry>> {
    filter_proc_entries(fs::read_dir(root)?.map(|entry| entry.map(|e| e.path())))
}

/// Keeps the numeric entries of a directory listing, stopping at the first error.
fn filter_proc_entries<I>(paths: I) -> io::Result<Vec<ProcEntry>>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
{
    let mut out = Vec::new();
    for path in paths {
        let p = path?;
        let name = match p.file_name().and_then(|s| s.to_str()) {
            Some(v) => v,
            None => continue,
        };
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        let pid: u32 = match name.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        out.push(ProcEntry { pid, proc_path: p });
    }
    Ok(out)
}

/// Feeds every line of a maps listing through the classifier.
///
/// Counts from lines read before an I/O error are kept in `tally`.
pub fn search_maps<R: BufRead>(mut reader: R, tally: &mut Tally) -> io::Result<()> {
    let mut buf = Vec::with_capacity(256);
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(path) = deleted_mapping_path(&line) {
            *tally.entry(path.to_owned()).or_insert(0) += 1;
        }
    }
}

/// Scans a single process. Returns its tally and the failure, if any.
fn scan_process(entry: &ProcEntry) -> (Tally, Option<ScanError>) {
    let mut tally = Tally::new();
    let file = match fs::File::open(entry.maps_path()) {
        Ok(f) => f,
        Err(source) => {
            return (
                tally,
                Some(ScanError::OpenMaps {
                    pid: entry.pid,
                    source,
                }),
            )
        }
    };

    let reader = BufReader::with_capacity(MAPS_BUFFER_BYTES, file);
    let err = search_maps(reader, &mut tally)
        .err()
        .map(|source| ScanError::ReadMaps {
            pid: entry.pid,
            source,
        });
    (tally, err)
}

/// Adds every count of `from` into `into`.
fn merge_tally(into: &mut Tally, from: Tally) {
    for (path, count) in from {
        *into.entry(path).or_insert(0) += count;
    }
}

/// Scans every process under `root` for deleted library mappings.
///
/// A root that cannot be listed yields an empty tally and a single
/// [`ScanError::ListRoot`]. Processes are read in parallel on the rayon pool.
#[instrument(skip_all, fields(root = %root.display()))]
pub fn scan_deleted_mappings(root: &Path) -> ScrapeResult {
    let start = Instant::now();

    let entries = match collect_proc_entries(root) {
        Ok(entries) => entries,
        Err(source) => {
            warn!("Failed to list process root {}: {}", root.display(), source);
            return ScrapeResult {
                tally: Tally::new(),
                failures: vec![ScanError::ListRoot {
                    path: root.to_path_buf(),
                    source,
                }],
            };
        }
    };
    debug!("Collected {} process entries from {}", entries.len(), root.display());

    let mut result = entries
        .par_iter()
        .map(scan_process)
        .fold(ScrapeResult::default, |mut acc, (tally, err)| {
            merge_tally(&mut acc.tally, tally);
            acc.failures.extend(err);
            acc
        })
        .reduce(ScrapeResult::default, |mut a, b| {
            merge_tally(&mut a.tally, b.tally);
            a.failures.extend(b.failures);
            a
        });

    // Keep failures in pid order so "last error" is stable across runs.
    result.failures.sort_by_key(failure_pid);

    for failure in &result.failures {
        debug!("Soft failure during scan: {}", failure);
    }
    if let Some(last) = result.last_error() {
        warn!(
            "Scan finished with {} soft failures (last: {})",
            result.failures.len(),
            last
        );
    }

    debug!(
        "Scanned {} processes in {:.3}ms: {} deleted libraries",
        entries.len(),
        start.elapsed().as_secs_f64() * 1000.0,
        result.tally.len()
    );
    result
}

fn failure_pid(err: &ScanError) -> u32 {
    match err {
        ScanError::ListRoot { .. } => 0,
        ScanError::OpenMaps { pid, .. } | ScanError::ReadMaps { pid, .. } => *pid,
    }
}
