//! Portico Production Server
//!
//! Front controller for the multi-tenant platform:
//! - Resolves `/t/{slug}/...` URLs to an organization, fail-closed
//! - Gates per-org module access fresh on every request
//! - Dispatches to registered module handlers
//! - Redirects legacy URL forms to the canonical `apps/` routes
//! - Contains exceptions and panics behind negotiated error pages
//!
//! Usage:
//! ```bash
//! # With config file
//! portico-server --config portico.yaml
//!
//! # Or with environment variables
//! PORTICO_PORT=8080 portico-server
//!
//! # With both (env vars override config)
//! PORTICO_DEBUG=true portico-server --config portico.yaml
//! ```
//!
//! Test with:
//! ```bash
//! curl http://localhost:8080/_ping
//! curl http://localhost:8080/t/acme/dashboard
//! curl http://localhost:8080/t/acme/apps/pos/branches
//! ```

mod app;
mod config;

use clap::Parser;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use portico_core::module::ModuleRegistry;
use portico_ingress::gateway_router;

use config::ServerConfig;

const GATE: &str = r#"
  ____________________________
 |  __  __  __  __  __  __   |      _
 | |  ||  ||  ||  ||  ||  |  |     (_)
 | |  ||  ||  ||  ||  ||  |  |  _ __  ___  _ __| |_ _  ___ ___
 | |  ||  ||  ||  ||  ||  |  | | '_ \/ _ \| '__| __| |/ __/ _ \
 | |  ||  ||  ||  ||  ||  |  | | |_) | (_) | |  | |_| | (_| (_) |
 |_|__||__||__||__||__||__|__| | .__/\___/|_|   \__|_|\___\___/
                               |_|     version : {VERSION}
"#;

/// Portico Server - Multi-Tenant Front Controller
#[derive(Parser)]
#[command(name = "portico-server")]
#[command(about = "Portico front controller for multi-tenant module dispatch", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "PORTICO_CONFIG")]
    config: Option<String>,

    /// Enable debug error detail (overrides config)
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        ServerConfig::from_file(config_path)
            .map_err(|e| anyhow::anyhow!("failed to load {config_path}: {e}"))?
    } else {
        ServerConfig::default()
    };

    // Merge environment variables (they override config file)
    config.merge_env();

    // CLI flag has the highest precedence
    if cli.debug {
        config.debug = true;
    }

    // Initialize tracing with the configured level
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::new(format!("{log_level}"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    println!("{}", GATE.replace("{VERSION}", env!("CARGO_PKG_VERSION")));

    info!("Initializing Portico front controller");
    if let Some(path) = &cli.config {
        info!("Configuration loaded from: {path}");
    } else {
        info!("Using default configuration");
    }

    info!(
        "Directory seeded with {} organization(s)",
        config.directory.orgs.len()
    );
    if config.directory.orgs.is_empty() {
        warn!("No organizations configured - every tenant URL will 404");
        warn!("    Add a directory.orgs section to the config file to seed tenants");
    }

    // Module handlers are linked in by the deployment; a bare server runs
    // the tenant-core pages only.
    let registry = build_registry();
    if registry.is_empty() {
        warn!("No modules registered - module URLs will 404 even when enabled");
    } else {
        info!("Registered modules: {}", registry.keys().join(", "));
    }

    if config.debug {
        warn!("Debug error detail is ON - do not run production like this");
    }

    let state = app::build_state(&config, registry);
    let router = gateway_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("");
    info!("Portico gateway listening on http://{addr}");
    info!("   Liveness check: http://{addr}/_ping");
    info!("   Tenant routes:  http://{addr}/t/{{slug}}/...");
    info!("");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Registry of module entry points compiled into this deployment.
fn build_registry() -> ModuleRegistry {
    ModuleRegistry::new()
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
