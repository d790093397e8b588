//! Doc Gateway Server
//!
//! REST gateway exposing a document store over HTTP.

use std::path::PathBuf;

use clap::{Arg, ArgMatches, Command};
use doc_gateway::api::start_server;
use doc_gateway::core::config::StorageType;
use doc_gateway::core::{init_logging, Config};
use doc_gateway::{Error, Result};
use tokio::signal;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // Parse command line arguments
    let matches = Command::new("doc-gateway")
        .version(doc_gateway::VERSION)
        .about("REST gateway over a schemaless document store.")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path"),
        )
        .arg(
            Arg::new("http-addr")
                .long("http-addr")
                .value_name("ADDR")
                .help("HTTP server bind address"),
        )
        .arg(
            Arg::new("max-body-size")
                .long("max-body-size")
                .value_name("BYTES")
                .help("Largest accepted request body"),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .help("Number of worker threads (0 = one per CPU)"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error)"),
        )
        .arg(
            Arg::new("log-format")
                .long("log-format")
                .value_name("FORMAT")
                .help("Log format (pretty, compact, json)"),
        )
        .arg(
            Arg::new("storage-type")
                .long("storage-type")
                .value_name("TYPE")
                .help("Storage backend type (memory)"),
        )
        .get_matches();

    // Load configuration
    let config_path = matches.get_one::<String>("config").map(PathBuf::from);
    let mut config = Config::load(config_path.as_deref())?;
    apply_cli_overrides(&mut config, &matches)?;
    config.validate()?;

    init_logging(&config.logging)?;
    info!("Starting {} v{}", doc_gateway::NAME, doc_gateway::VERSION);

    let workers = config.optimal_worker_threads();
    info!("Using {} worker threads", workers);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    runtime.block_on(run(config))
}

async fn run(config: Config) -> Result<()> {
    // Initialize storage; an unreachable backend stops startup here
    let store = doc_gateway::storage::create_store(&config.storage)
        .map_err(|e| Error::config(format!("Storage initialization failed: {}", e)))?;

    start_server(&config.server, store.clone(), shutdown_signal()).await?;

    drop(store);
    info!("Shutdown complete");
    Ok(())
}

/// Apply command line argument overrides to configuration
fn apply_cli_overrides(config: &mut Config, matches: &ArgMatches) -> Result<()> {
    if let Some(addr) = matches.get_one::<String>("http-addr") {
        config.server.http_addr = addr
            .parse()
            .map_err(|e| Error::config(format!("Invalid HTTP address: {}", e)))?;
    }

    if let Some(size) = matches.get_one::<String>("max-body-size") {
        config.server.max_body_size = size
            .parse()
            .map_err(|e| Error::config(format!("Invalid max body size: {}", e)))?;
    }

    if let Some(workers) = matches.get_one::<String>("workers") {
        config.server.worker_threads = workers
            .parse()
            .map_err(|e| Error::config(format!("Invalid worker count: {}", e)))?;
    }

    if let Some(level) = matches.get_one::<String>("log-level") {
        config.logging.level = level.clone();
    }

    if let Some(format) = matches.get_one::<String>("log-format") {
        config.logging.format = format.clone();
    }

    if let Some(storage_type) = matches.get_one::<String>("storage-type") {
        config.storage.storage_type = storage_type.parse::<StorageType>()?;
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C signal, shutting down");
        },
        _ = terminate => {
            warn!("Received terminate signal, shutting down");
        },
    }
}
