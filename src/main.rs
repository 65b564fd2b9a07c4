//! CrediCheck Daemon
//!
//! Serves community credibility ratings for websites to the browser extension.
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (port 4269, data in the local data dir)
//! credicheck
//!
//! # Start with custom config
//! credicheck --config /path/to/config.toml
//!
//! # Demo mode: every new site gets random votes and a score
//! credicheck --demo-mode
//!
//! # Throwaway in-memory database
//! credicheck --in-memory --http-port 8000
//! ```

use clap::Parser;
use credicheck::api;
use credicheck::services::events::spawn_logging_listener;
use credicheck::{Config, CrediDb, HttpServer, Services};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "credicheck")]
#[command(about = "Community credibility ratings for websites")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory (database and config.toml)
    #[arg(long, env = "CREDICHECK_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    /// HTTP API port
    #[arg(long, env = "CREDICHECK_HTTP_PORT")]
    http_port: Option<u16>,

    /// Address to bind the HTTP server to
    #[arg(long, env = "CREDICHECK_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Seed newly registered sites with random votes and a score
    #[arg(long, env = "CREDICHECK_DEMO_MODE")]
    demo_mode: bool,

    /// Enable PUT /score for assigning credibility scores
    #[arg(long, env = "CREDICHECK_ADMIN_API")]
    admin_api: bool,

    /// Keep everything in memory (nothing is written to disk)
    #[arg(long)]
    in_memory: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("credicheck=info".parse()?))
        .init();

    let args = Args::parse();

    // Load config
    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    // Apply CLI overrides
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(addr) = args.bind_address {
        config.bind_address = addr;
    }
    if args.demo_mode {
        config.demo_mode = true;
    }
    if args.admin_api {
        config.admin_api = true;
    }

    info!(
        storage_dir = %config.storage_dir.display(),
        http_port = config.http_port,
        demo_mode = config.demo_mode,
        "Starting credicheck"
    );

    // Open database
    let db = if args.in_memory {
        info!("Using in-memory database; all data is lost on exit");
        Arc::new(CrediDb::open_in_memory()?)
    } else {
        tokio::fs::create_dir_all(&config.storage_dir).await?;

        // Save default config if it doesn't exist
        let config_path = config.config_path();
        if !config_path.exists() {
            config.save(&config_path)?;
            info!(path = %config_path.display(), "Created default config");
        }

        Arc::new(CrediDb::open(&config.storage_dir, &config.db_options())?)
    };

    let services = if config.demo_mode {
        info!(
            votes_min = config.demo_votes_min,
            votes_max = config.demo_votes_max,
            "Demo mode enabled: new sites are seeded with random data"
        );
        Arc::new(Services::with_demo(db.clone(), config.demo_config()))
    } else {
        Arc::new(Services::new(db.clone()))
    };

    let _event_logger = spawn_logging_listener(services.events.clone());

    let http_addr: SocketAddr = format!("{}:{}", config.bind_address, config.http_port).parse()?;
    let http_server =
        Arc::new(HttpServer::new(services.clone(), http_addr).with_admin_api(config.admin_api));

    info!("HTTP API available at http://{}", http_addr);
    for route in api::routes(config.admin_api) {
        info!("  {:<6} {:<16} - {}", route.method, route.path, route.summary);
    }

    info!("Press Ctrl+C to stop.");

    // Handle shutdown signal
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
    };

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = result {
                error!(error = %e, "HTTP server error");
            }
        }
        _ = shutdown => {}
    }

    // Print stats before exit
    if let Ok(stats) = db.stats() {
        info!(
            users = stats.users,
            sites = stats.sites,
            votes = stats.votes,
            "Final database stats"
        );
    }

    Ok(())
}
