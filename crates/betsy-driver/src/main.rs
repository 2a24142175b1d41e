//! Betsy tile wall driver: command-line entry point.
//!
//! Sends still images and looping image sequences to a wall of Betsy LED
//! tiles over link-local IPv6 UDP.
//!
//! # Usage
//!
//! ```text
//! betsy [OPTIONS] <COMMAND>
//!
//! Commands:
//!   send         Send one image to the wall and present it
//!   play         Loop an image sequence at a fixed frame rate
//!   present      Broadcast a present command for a device buffer
//!   init-config  Write the effective configuration to the config file
//!
//! Options:
//!   --config <PATH>          Config file [default: platform config file]
//!   -I, --interface <NAME>   Network interface the tiles are attached to
//!   -T, --inventory <PATH>   JSON tile map
//!   --workers <N>            Tiles sent concurrently per frame
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Description                      |
//! |-------------------|----------------------------------|
//! | `BETSY_CONFIG`    | Config file path                 |
//! | `BETSY_INTERFACE` | Network interface                |
//! | `BETSY_INVENTORY` | Tile map path                    |
//! | `RUST_LOG`        | Log filter (overrides `log_level`) |
//!
//! # Examples
//!
//! ```text
//! betsy -I eth1 -T wall.json send test.png --brightness 0.3
//! betsy -I eth1 play 'frames/%04d.png' --stop 240 --fps 24
//! betsy -I eth1 -T /etc/betsy/wall.json init-config
//! ```

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use betsy_core::{BufferRing, Display, TileGeometry};
use betsy_driver::application::play_sequence::{PlaybackOptions, SequencePlayer};
use betsy_driver::application::settings::{ActiveSettings, SettingsStore, SettingsUpdate};
use betsy_driver::application::transport::FrameTransport;
use betsy_driver::infrastructure::image_source::{load_image, load_sequence};
use betsy_driver::infrastructure::network::UdpEndpoint;
use betsy_driver::infrastructure::storage::config::{
    config_file_path, load_config_or_default, save_config, save_config_to, AppConfig,
};
use betsy_driver::infrastructure::wall::open_wall;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Betsy LED tile wall driver.
#[derive(Debug, Parser)]
#[command(
    name = "betsy",
    about = "Drive Betsy LED tile walls over link-local IPv6",
    version
)]
struct Cli {
    /// Path to a TOML config file.
    ///
    /// Without it the platform config file is used if present.
    #[arg(long, global = true, env = "BETSY_CONFIG")]
    config: Option<PathBuf>,

    /// Network interface the tiles are attached to (overrides the config).
    #[arg(short = 'I', long, global = true, env = "BETSY_INTERFACE")]
    interface: Option<String>,

    /// JSON tile map (overrides the config).
    #[arg(short = 'T', long, global = true, env = "BETSY_INVENTORY")]
    inventory: Option<PathBuf>,

    /// Tiles converted and sent concurrently per frame.
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Wall(WallCommand),

    /// Write the effective configuration (file plus overrides) to the
    /// config file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Commands that talk to the tiles.
#[derive(Debug, Subcommand)]
enum WallCommand {
    /// Send one image to the wall and present it.
    Send {
        /// Image file (PNG, JPEG, ...).
        image: PathBuf,

        /// Device buffer to write into and present.
        #[arg(short = 'B', long, default_value_t = 0)]
        buffer: u8,

        #[command(flatten)]
        color: ColorArgs,
    },

    /// Loop an image sequence at a fixed frame rate.
    Play {
        /// printf-style file pattern, e.g. `frames/%04d.png`.
        pattern: String,

        /// First frame index.
        #[arg(short = 'S', long, default_value_t = 1)]
        start: u32,

        /// Last frame index (inclusive).
        #[arg(short = 'N', long)]
        stop: u32,

        /// Frames per second.
        #[arg(short = 'R', long, default_value_t = 30)]
        fps: u32,

        /// Stop after this many passes (default: loop until Ctrl+C).
        #[arg(long)]
        loops: Option<u64>,

        #[command(flatten)]
        color: ColorArgs,
    },

    /// Broadcast a present command for a device buffer.
    Present {
        /// Device buffer to display.
        buffer: u8,
    },
}

/// Per-run color overrides.
#[derive(Debug, Args)]
struct ColorArgs {
    /// Gamma exponent.
    #[arg(short = 'G', long)]
    gamma: Option<f64>,

    /// Brightness post-scaler (capped at the configured maximum).
    #[arg(short = 'P', long)]
    brightness: Option<f32>,
}

impl ColorArgs {
    fn to_update(&self) -> SettingsUpdate {
        SettingsUpdate {
            gamma: self.gamma,
            brightness: self.brightness,
            ..SettingsUpdate::default()
        }
    }
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    fn load_config(&self) -> anyhow::Result<AppConfig> {
        let mut config = load_config_or_default(self.config.as_deref())
            .context("failed to load configuration")?;
        if let Some(interface) = &self.interface {
            config.network.interface = interface.clone();
        }
        if let Some(inventory) = &self.inventory {
            config.inventory.path = inventory.clone();
        }
        if let Some(workers) = self.workers {
            config.transport.workers = workers;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let command = match cli.command {
        Command::InitConfig { force } => {
            let path = write_config(cli.config.as_deref(), &config, force)?;
            info!("wrote configuration to {}", path.display());
            return Ok(());
        }
        Command::Wall(command) => command,
    };

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, stopping");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    let (endpoint, display) = open_wall(&config)
        .await
        .with_context(|| format!("failed to open wall on {}", config.network.interface))?;

    let result = run(command, &config, &endpoint, &display, running).await;
    endpoint.close();
    result
}

async fn run(
    command: WallCommand,
    config: &AppConfig,
    endpoint: &UdpEndpoint,
    display: &Display,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()> {
    let geometry: TileGeometry = config.tile.geometry();
    let transport = FrameTransport::new(endpoint, geometry);
    let workers = config.transport.workers;

    match command {
        WallCommand::Send {
            image,
            buffer,
            color,
        } => {
            let store = settings_store(config)?;
            let settings = store.frame_settings(Some(&color.to_update()))?;
            let source = load_image(&image)?;

            let report = transport
                .send_frame_concurrent(display, buffer, &source, &settings, workers)
                .await?;
            transport.present(buffer).await?;
            info!(
                "sent {} to {} tiles ({} datagrams, {} bytes) in {:?}",
                image.display(),
                report.tiles,
                report.datagrams,
                report.bytes,
                report.elapsed
            );
        }

        WallCommand::Play {
            pattern,
            start,
            stop,
            fps,
            loops,
            color,
        } => {
            let store = settings_store(config)?;
            let settings = store.frame_settings(Some(&color.to_update()))?;
            info!("loading frames {start}..={stop} of {pattern}");
            let frames = load_sequence(&pattern, start, stop)?;

            let ring = BufferRing::new(config.transport.buffer_slots);
            let player = SequencePlayer::new(transport, display, &ring, running);
            let options = PlaybackOptions {
                fps,
                max_loops: loops,
                workers,
            };
            let stats = player.play(&frames, &settings, options).await?;
            info!("played {} frames over {} loops", stats.frames, stats.loops);
        }

        WallCommand::Present { buffer } => {
            transport.present(buffer).await?;
            info!("presented buffer {buffer}");
        }
    }
    Ok(())
}

/// Writes `config` to `target`, or to the platform config file when no path
/// was given.  Returns the path written.
fn write_config(target: Option<&Path>, config: &AppConfig, force: bool) -> anyhow::Result<PathBuf> {
    let path = match target {
        Some(path) => path.to_path_buf(),
        None => config_file_path().context("no platform config directory")?,
    };
    if path.exists() && !force {
        bail!("{} already exists (pass --force to overwrite)", path.display());
    }
    let saved = match target {
        Some(path) => save_config_to(path, config),
        None => save_config(config),
    };
    saved.with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn settings_store(config: &AppConfig) -> anyhow::Result<SettingsStore> {
    let defaults =
        ActiveSettings::from_config(&config.color).context("invalid [color] configuration")?;
    Ok(SettingsStore::new(defaults))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_send_defaults() {
        // Arrange / Act
        let cli = Cli::parse_from(["betsy", "send", "frame.png"]);

        // Assert
        match cli.command {
            Command::Wall(WallCommand::Send {
                image,
                buffer,
                color,
            }) => {
                assert_eq!(image, PathBuf::from("frame.png"));
                assert_eq!(buffer, 0);
                assert!(color.to_update().is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_play_defaults_match_sequence_player() {
        let cli = Cli::parse_from(["betsy", "play", "f/%04d.png", "--stop", "10"]);

        match cli.command {
            Command::Wall(WallCommand::Play {
                start, stop, fps, loops, ..
            }) => {
                assert_eq!(start, 1);
                assert_eq!(stop, 10);
                assert_eq!(fps, 30);
                assert_eq!(loops, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_play_requires_stop() {
        let result = Cli::try_parse_from(["betsy", "play", "f/%04d.png"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "betsy", "-I", "eth1", "-T", "wall.json", "play", "f/%d.png", "-N", "5", "-R", "12",
            "-G", "2.2", "-P", "0.25",
        ]);

        assert_eq!(cli.interface.as_deref(), Some("eth1"));
        assert_eq!(cli.inventory, Some(PathBuf::from("wall.json")));
        match cli.command {
            Command::Wall(WallCommand::Play { fps, color, .. }) => {
                assert_eq!(fps, 12);
                let update = color.to_update();
                assert_eq!(update.gamma, Some(2.2));
                assert_eq!(update.brightness, Some(0.25));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_options_after_subcommand() {
        let cli = Cli::parse_from(["betsy", "present", "1", "--interface", "eth2"]);

        assert_eq!(cli.interface.as_deref(), Some("eth2"));
        assert!(matches!(
            cli.command,
            Command::Wall(WallCommand::Present { buffer: 1 })
        ));
    }

    #[test]
    fn test_load_config_applies_overrides() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\ninterface = \"eth0\"\n").expect("write");
        let cli = Cli {
            config: Some(path),
            interface: Some("eth3".to_string()),
            inventory: Some(PathBuf::from("wall.json")),
            workers: Some(8),
            command: Command::InitConfig { force: false },
        };

        // Act
        let config = cli.load_config().expect("config");

        // Assert
        assert_eq!(config.network.interface, "eth3");
        assert_eq!(config.inventory.path, PathBuf::from("wall.json"));
        assert_eq!(config.transport.workers, 8);
    }

    #[test]
    fn test_load_config_invalid_file_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network\n").expect("write");
        let cli = Cli {
            config: Some(path),
            interface: None,
            inventory: None,
            workers: None,
            command: Command::InitConfig { force: false },
        };

        assert!(cli.load_config().is_err());
    }

    #[test]
    fn test_settings_store_rejects_invalid_color_config() {
        let mut config = AppConfig::default();
        config.color.gamma = -1.0;

        assert!(settings_store(&config).is_err());
    }

    #[test]
    fn test_cli_init_config_flags() {
        let cli = Cli::parse_from(["betsy", "-I", "eth4", "init-config", "--force"]);

        assert_eq!(cli.interface.as_deref(), Some("eth4"));
        assert!(matches!(cli.command, Command::InitConfig { force: true }));
    }

    #[test]
    fn test_write_config_saves_overrides_and_refuses_to_clobber() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");
        let mut config = AppConfig::default();
        config.network.interface = "eth5".to_string();

        // Act
        let written = write_config(Some(&path), &config, false).expect("write");
        let second = write_config(Some(&path), &AppConfig::default(), false);

        // Assert
        assert_eq!(written, path);
        assert!(second.is_err(), "existing file is kept without --force");
        let loaded = load_config_or_default(Some(&path)).expect("load");
        assert_eq!(loaded.network.interface, "eth5");
    }

    #[test]
    fn test_write_config_force_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\ninterface = \"eth0\"\n").expect("write");
        let mut config = AppConfig::default();
        config.network.interface = "eth9".to_string();

        write_config(Some(&path), &config, true).expect("write");

        let loaded = load_config_or_default(Some(&path)).expect("load");
        assert_eq!(loaded.network.interface, "eth9");
    }
}
