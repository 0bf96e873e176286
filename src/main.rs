//! deleted-mapping-exporter - version 0.1.0
//!
//! Prometheus exporter for processes still mapping deleted libraries.
//! This is the main entry point that initializes the server and handles subcommands.

mod cli;
mod commands;
mod config;
mod handlers;
mod startup_checks;
mod state;

use axum::{routing::get, Router};
use clap::Parser;
use deleted_mapping_exporter::{DeletedMappingCollector, MetricDescriptors};
use prometheus::Registry;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tracing::{debug, error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::command_scan;
use config::{resolve_config, resolve_listen_address, show_config, validate_effective_config, Config};
use handlers::{metrics_handler, root_handler};
use state::{AppState, SharedState};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let log_level = config.log_level().unwrap_or(LogLevel::Info);
    let level = match log_level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };

    let Some(level) = level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Logging initialized with level: {:?}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config);

    // Configure parallel scanning before any scan runs, subcommands included
    if let Some(threads) = config.parallelism {
        if threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build_global()
                .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
            debug!("Rayon thread pool configured with {} threads", threads);
        }
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Scan { format } => command_scan(format.clone(), &config),

            Commands::CheckRequirements => {
                println!("🔍 Checking Runtime Requirements");
                println!("================================\n");

                match startup_checks::validate_requirements(config.proc_path()) {
                    Ok(_) => {
                        println!("\n✅ All requirements met - ready for production!");
                        Ok(())
                    }
                    Err(e) => {
                        eprintln!("\n❌ Requirements check failed: {}", e);
                        std::process::exit(1);
                    }
                }
            }
        };
    }

    info!("Starting deleted-mapping-exporter");

    if let Err(e) = startup_checks::validate_requirements(config.proc_path()) {
        error!("❌ Startup validation failed: {}", e);
        error!("   The exporter will start but scrapes will report old_lib_exporter_up 0!");
        // Continue anyway - don't fail hard
    }

    // Initialize Prometheus metrics registry
    let registry = Registry::new();
    let descriptors = MetricDescriptors::new()?;
    let collector = DeletedMappingCollector::new(config.proc_path(), descriptors);
    debug!(
        "Registering deleted mapping collector for {}",
        collector.proc_path().display()
    );
    registry.register(Box::new(collector))?;

    let telemetry_path = config.telemetry_path().to_string();
    let bind_addr = resolve_listen_address(config.listen_address())?;

    let state: SharedState = Arc::new(AppState {
        registry,
        config: Arc::new(config),
    });

    // Configure HTTP server routes
    let app = Router::new()
        .route("/", get(root_handler))
        .route(&telemetry_path, get(metrics_handler))
        .with_state(state);

    let listener = match TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_addr, e);
            return Err(e.into());
        }
    };
    info!(
        "deleted-mapping-exporter listening on http://{}{}",
        bind_addr, telemetry_path
    );

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("deleted-mapping-exporter stopped gracefully");
    Ok(())
}
