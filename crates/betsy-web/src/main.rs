//! Betsy tile wall HTTP control surface: entry point.
//!
//! # Usage
//!
//! ```text
//! betsy-web [OPTIONS]
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config file]
//!   -I, --interface <NAME>   Network interface the tiles are attached to
//!   -T, --inventory <PATH>   JSON tile map
//!   --bind <ADDR>            HTTP listen address [default from config: localhost]
//!   --port <PORT>            HTTP listen port [default from config: 3000]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description            |
//! |-------------------|------------------------|
//! | `BETSY_CONFIG`    | Config file path       |
//! | `BETSY_INTERFACE` | Network interface      |
//! | `BETSY_INVENTORY` | Tile map path          |
//! | `BETSY_WEB_BIND`  | HTTP listen address    |
//! | `BETSY_WEB_PORT`  | HTTP listen port       |
//!
//! # Example
//!
//! ```text
//! betsy-web -I eth1 -T wall.json --port 8080
//! curl -F data=@frame.png http://localhost:8080/api/v1/frame
//! ```

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use betsy_core::BufferRing;
use betsy_driver::application::settings::{ActiveSettings, SettingsStore};
use betsy_driver::infrastructure::storage::config::{load_config_or_default, AppConfig};
use betsy_driver::infrastructure::wall::open_wall;
use betsy_web::application::ControlService;
use betsy_web::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Betsy tile wall HTTP control surface.
#[derive(Debug, Parser)]
#[command(
    name = "betsy-web",
    about = "HTTP control surface for Betsy LED tile walls",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "BETSY_CONFIG")]
    config: Option<PathBuf>,

    /// Network interface the tiles are attached to (overrides the config).
    #[arg(short = 'I', long, env = "BETSY_INTERFACE")]
    interface: Option<String>,

    /// JSON tile map (overrides the config).
    #[arg(short = 'T', long, env = "BETSY_INVENTORY")]
    inventory: Option<PathBuf>,

    /// Address the HTTP server listens on (overrides the config).
    #[arg(long, env = "BETSY_WEB_BIND")]
    bind: Option<String>,

    /// Port the HTTP server listens on (overrides the config).
    #[arg(long, env = "BETSY_WEB_PORT")]
    port: Option<u16>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn into_app_config(self) -> anyhow::Result<AppConfig> {
        let mut config = load_config_or_default(self.config.as_deref())
            .context("failed to load configuration")?;
        if let Some(interface) = self.interface {
            config.network.interface = interface;
        }
        if let Some(inventory) = self.inventory {
            config.inventory.path = inventory;
        }
        if let Some(bind) = self.bind {
            config.web.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_app_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let defaults =
        ActiveSettings::from_config(&config.color).context("invalid [color] configuration")?;
    let (endpoint, display) = open_wall(&config)
        .await
        .with_context(|| format!("failed to open wall on {}", config.network.interface))?;

    let service = Arc::new(ControlService::new(
        endpoint,
        display,
        SettingsStore::new(defaults),
        BufferRing::new(config.transport.buffer_slots),
        config.transport.workers,
    ));

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let result = run_server(Arc::clone(&service), &config.web, running).await;

    match Arc::try_unwrap(service) {
        Ok(service) => service.into_binding().close(),
        Err(_) => warn!("control service still shared at shutdown; socket closes on drop"),
    }
    result
}

// ── Tests ─────────────────────────────────────────────────────────────────────
