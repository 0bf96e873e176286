//! Startup requirement validation for deleted-mapping-exporter.
//!
//! This module validates that the exporter can read the memory maps of the
//! processes it is supposed to watch before it starts serving.

use nix::unistd::geteuid;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error, info, warn};

use deleted_mapping_exporter::process::collect_proc_entries;

/// Validate all runtime requirements
pub fn validate_requirements(proc_path: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_proc_access(proc_path)?;

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - maps of other users' processes will be unreadable");
        warn!("   Each unreadable process reports old_lib_exporter_up 0");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check that the proc root is listable and maps files are readable
fn check_proc_access(proc_path: &Path) -> Result<(), ValidationError> {
    let entries = collect_proc_entries(proc_path).map_err(|e| {
        error!("❌ Cannot list {}: {}", proc_path.display(), e);
        ValidationError::ProcRootUnreadable(proc_path.display().to_string(), e.to_string())
    })?;

    // Prefer init, which is owned by root and so exercises permissions.
    let probe = entries
        .iter()
        .find(|e| e.pid == 1)
        .or_else(|| entries.first());

    let Some(probe) = probe else {
        warn!("⚠️  No process directories found under {}", proc_path.display());
        return Ok(());
    };

    let maps = probe.maps_path();
    match fs::File::open(&maps) {
        Ok(_) => {
            info!("✅ maps access: Can read {}", maps.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            error!("❌ Cannot read {} - insufficient permissions", maps.display());
            error!("   Only user-owned processes will be scanned!");
            error!("");
            error!("   Solutions:");
            error!("   1. Run as root");
            error!("   2. Grant capabilities:");
            error!("      setcap cap_dac_read_search,cap_sys_ptrace+ep /path/to/binary");
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) => {
            debug!("Could not test {}: {}", maps.display(), e);
            warn!("⚠️  Could not test maps access: {}", e);
            Ok(())
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("Cannot list process root {0}: {1}")]
    ProcRootUnreadable(String, String),
}
