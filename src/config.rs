//! Configuration management for deleted-mapping-exporter.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, LogLevel};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9040";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
pub const DEFAULT_PROC_PATH: &str = "/proc";

/// Address used when the listen address omits the host part.
const ANY_IPV4: &str = "0.0.0.0";

/// Exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    #[serde(alias = "listen-address")]
    pub listen_address: Option<String>,
    #[serde(alias = "telemetry-path")]
    pub telemetry_path: Option<String>,

    // Scanning
    #[serde(alias = "proc-path")]
    pub proc_path: Option<PathBuf>,
    pub parallelism: Option<usize>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_address: Some(DEFAULT_LISTEN_ADDRESS.to_string()),
            telemetry_path: Some(DEFAULT_TELEMETRY_PATH.to_string()),
            proc_path: Some(PathBuf::from(DEFAULT_PROC_PATH)),
            parallelism: None,
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn listen_address(&self) -> &str {
        self.listen_address
            .as_deref()
            .unwrap_or(DEFAULT_LISTEN_ADDRESS)
    }

    pub fn telemetry_path(&self) -> &str {
        self.telemetry_path
            .as_deref()
            .unwrap_or(DEFAULT_TELEMETRY_PATH)
    }

    pub fn proc_path(&self) -> &Path {
        self.proc_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROC_PATH))
    }

    /// Effective log level, `info` when unset.
    pub fn log_level(&self) -> Result<LogLevel, String> {
        match self.log_level.as_deref() {
            Some(level) => LogLevel::from_str(level, true)
                .map_err(|_| format!("Invalid log_level '{}'", level)),
            None => Ok(LogLevel::Info),
        }
    }
}

/// Turns a `host:port` listen address into something `TcpListener::bind` accepts.
///
/// A bare `:port` binds every IPv4 interface.
pub fn resolve_listen_address(addr: &str) -> Result<String, Box<dyn std::error::Error>> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| format!("Listen address '{}' has no port", addr))?;

    port.parse::<u16>()
        .map_err(|_| format!("Invalid port '{}' in listen address '{}'", port, addr))?;

    if host.is_empty() {
        Ok(format!("{}:{}", ANY_IPV4, port))
    } else {
        Ok(addr.to_string())
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    resolve_listen_address(cfg.listen_address())?;

    let telemetry_path = cfg.telemetry_path();
    if !telemetry_path.starts_with('/') {
        return Err(format!(
            "Invalid telemetry_path '{}', must start with '/'",
            telemetry_path
        )
        .into());
    }
    if telemetry_path == "/" {
        return Err("telemetry_path must not be '/', it is reserved for the landing page".into());
    }

    if cfg.proc_path().as_os_str().is_empty() {
        return Err("proc_path must not be empty".into());
    }

    cfg.log_level()?;

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(addr) = &args.listen_address {
        config.listen_address = Some(addr.clone());
    }
    if let Some(path) = &args.telemetry_path {
        config.telemetry_path = Some(path.clone());
    }
    if let Some(path) = &args.proc_path {
        config.proc_path = Some(path.clone());
    }
    if let Some(threads) = args.parallelism {
        config.parallelism = Some(threads);
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(format!("{:?}", level).to_lowercase());
    }

    Ok(config)
}

/// Configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        if !p.exists() {
            return Err(format!("Config file not found: {}", p.display()).into());
        }
        p.to_path_buf()
    } else {
        // Try default locations
        let defaults = [
            "/etc/deleted-mapping-exporter/config.yaml",
            "/etc/deleted-mapping-exporter/config.yml",
            "/etc/deleted-mapping-exporter/config.json",
            "./deleted-mapping-exporter.yaml",
            "./deleted-mapping-exporter.yml",
            "./deleted-mapping-exporter.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        }
    };

    let content = fs::read_to_string(&path)?;
    let config = parse_config(&content, path.extension().and_then(|s| s.to_str()))?;
    info!("Loaded configuration from: {}", path.display());
    Ok(merge_defaults(config))
}

/// Parses config file content, choosing the format from the file extension.
fn parse_config(content: &str, extension: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match extension {
        Some("json") => serde_json::from_str(content)?,
        Some("toml") => toml::from_str(content)?,
        // Default to YAML
        _ => serde_yaml::from_str(content)?,
    };
    Ok(config)
}

/// Fills fields the config file left out with their defaults.
fn merge_defaults(mut config: Config) -> Config {
    let defaults = Config::default();
    config.listen_address = config.listen_address.or(defaults.listen_address);
    config.telemetry_path = config.telemetry_path.or(defaults.telemetry_path);
    config.proc_path = config.proc_path.or(defaults.proc_path);
    config.log_level = config.log_level.or(defaults.log_level);
    config
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.listen_address(), ":9040");
        assert_eq!(cfg.telemetry_path(), "/metrics");
        assert_eq!(cfg.proc_path(), Path::new("/proc"));
    }

    #[test]
    fn test_resolve_listen_address() {
        assert_eq!(resolve_listen_address(":9040").unwrap(), "0.0.0.0:9040");
        assert_eq!(
            resolve_listen_address("127.0.0.1:9040").unwrap(),
            "127.0.0.1:9040"
        );
        assert_eq!(
            resolve_listen_address("[::1]:9040").unwrap(),
            "[::1]:9040"
        );
        assert!(resolve_listen_address("9040").is_err());
        assert!(resolve_listen_address(":http").is_err());
        assert!(resolve_listen_address(":70000").is_err());
    }

    #[test]
    fn test_invalid_telemetry_path() {
        let mut cfg = Config::default();
        cfg.telemetry_path = Some("metrics".into());
        assert!(validate_effective_config(&cfg).is_err());

        cfg.telemetry_path = Some("/".into());
        assert!(validate_effective_config(&cfg).is_err());

        cfg.telemetry_path = Some("/probe/metrics".into());
        assert!(validate_effective_config(&cfg).is_ok());
    }

    #[test]
    fn test_log_level_parsing() {
        let mut cfg = Config::default();
        assert!(matches!(cfg.log_level(), Ok(LogLevel::Info)));

        cfg.log_level = Some("DEBUG".into());
        assert!(matches!(cfg.log_level(), Ok(LogLevel::Debug)));

        cfg.log_level = Some("verbose".into());
        assert!(cfg.log_level().is_err());
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_empty_proc_path_rejected() {
        let mut cfg = Config::default();
        cfg.proc_path = Some(PathBuf::new());
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_parse_config_formats() {
        let yaml = parse_config("listen-address: \"127.0.0.1:9100\"\nproc_path: /host/proc\n", None).unwrap();
        assert_eq!(yaml.listen_address.as_deref(), Some("127.0.0.1:9100"));
        assert_eq!(yaml.proc_path.as_deref(), Some(Path::new("/host/proc")));

        let json = parse_config(r#"{"telemetry_path": "/probe"}"#, Some("json")).unwrap();
        assert_eq!(json.telemetry_path.as_deref(), Some("/probe"));

        let toml = parse_config("parallelism = 4\n", Some("toml")).unwrap();
        assert_eq!(toml.parallelism, Some(4));
    }

    #[test]
    fn test_merge_defaults_keeps_file_values() {
        let cfg = merge_defaults(parse_config("proc_path: /host/proc\n", None).unwrap());
        assert_eq!(cfg.proc_path(), Path::new("/host/proc"));
        assert_eq!(cfg.listen_address(), ":9040");
        assert_eq!(cfg.telemetry_path(), "/metrics");
    }
}
