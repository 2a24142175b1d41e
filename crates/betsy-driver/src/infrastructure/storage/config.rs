//! TOML-based configuration for the driver and web control surface.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Betsy\config.toml`
//! - Linux:    `~/.config/betsy/config.toml`
//! - macOS:    `~/Library/Application Support/Betsy/config.toml`
//!
//! Both binaries also accept `--config <path>`, which goes through
//! [`load_config_from`] instead.
//!
//! ```toml
//! log_level = "info"
//!
//! [network]
//! interface = "eth0"
//! port = 48757
//!
//! [color]
//! gamma = 2.4
//! brightness = 1.0
//! max_brightness = 0.5
//!
//! [inventory]
//! path = "tilemap.json"
//! ```
//!
//! # Serde default values
//!
//! Every section and every field has a default, so an empty file (or no
//! file at all) yields a working configuration for an 18×18 Betsy wall on
//! `eth0`.

use std::num::NonZeroU8;
use std::path::{Path, PathBuf};

use betsy_core::color::settings::{DEFAULT_GAMMA, DEFAULT_POSTSCALER};
use betsy_core::protocol::PROTOCOL_PORT;
use betsy_core::{Matrix3x3, TileGeometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default ceiling for the brightness post-scaler accepted per frame.
pub const DEFAULT_MAX_BRIGHTNESS: f32 = 0.5;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub tile: TileConfig,
    #[serde(default)]
    pub color: ColorConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub web: WebConfig,
}

/// Interface and port used to reach the tiles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Name of the interface the tiles are attached to (e.g. `"eth0"`).
    #[serde(default = "default_interface")]
    pub interface: String,
    /// UDP port the tiles listen on.
    #[serde(default = "default_protocol_port")]
    pub port: u16,
    /// Also pin the socket to the interface with `SO_BINDTODEVICE`
    /// (Linux only; usually needs `CAP_NET_RAW`).
    #[serde(default)]
    pub bind_to_device: bool,
}

/// Pixel dimensions of every tile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TileConfig {
    #[serde(default = "default_tile_side")]
    pub width: u32,
    #[serde(default = "default_tile_side")]
    pub height: u32,
}

/// Color settings applied at startup and restored by a reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColorConfig {
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Post-scaler applied to every converted pixel.
    #[serde(default = "default_brightness")]
    pub brightness: f32,
    /// Upper bound enforced on the post-scaler of every transmitted frame.
    #[serde(default = "default_max_brightness")]
    pub max_brightness: f32,
    /// Row-major 3×3 color transform.
    #[serde(default)]
    pub transform: Matrix3x3,
}

/// Frame transmission tuning.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TransportConfig {
    /// Number of device buffers cycled through (1 = always buffer 0).
    #[serde(default = "default_buffer_slots")]
    pub buffer_slots: NonZeroU8,
    /// Tiles converted and sent concurrently per frame (1 = sequential).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Location of the JSON tile map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryConfig {
    #[serde(default = "default_inventory_path")]
    pub path: PathBuf,
}

/// HTTP control surface listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebConfig {
    #[serde(default = "default_web_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_interface() -> String {
    "eth0".to_string()
}
fn default_protocol_port() -> u16 {
    PROTOCOL_PORT
}
fn default_tile_side() -> u32 {
    TileGeometry::BETSY.width
}
fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}
fn default_brightness() -> f32 {
    DEFAULT_POSTSCALER
}
fn default_max_brightness() -> f32 {
    DEFAULT_MAX_BRIGHTNESS
}
fn default_buffer_slots() -> NonZeroU8 {
    NonZeroU8::MIN.saturating_add(1)
}
fn default_workers() -> usize {
    4
}
fn default_inventory_path() -> PathBuf {
    PathBuf::from("tilemap.json")
}
fn default_web_bind_address() -> String {
    "localhost".to_string()
}
fn default_web_port() -> u16 {
    3000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            network: NetworkConfig::default(),
            tile: TileConfig::default(),
            color: ColorConfig::default(),
            transport: TransportConfig::default(),
            inventory: InventoryConfig::default(),
            web: WebConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            port: default_protocol_port(),
            bind_to_device: false,
        }
    }
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            width: default_tile_side(),
            height: default_tile_side(),
        }
    }
}

impl TileConfig {
    pub fn geometry(&self) -> TileGeometry {
        TileGeometry::new(self.width, self.height)
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            gamma: default_gamma(),
            brightness: default_brightness(),
            max_brightness: default_max_brightness(),
            transform: Matrix3x3::IDENTITY,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            buffer_slots: default_buffer_slots(),
            workers: default_workers(),
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: default_inventory_path(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_address: default_web_bind_address(),
            port: default_web_port(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning defaults if it does not exist.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cfg: AppConfig = toml::from_str(&content)?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads from `path` when given, otherwise from the platform config file.
///
/// A host with no platform config directory (no `HOME`, for example) gets
/// the defaults instead of an error.
pub fn load_config_or_default(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    match path {
        Some(path) => load_config_from(path),
        None => match load_config() {
            Err(ConfigError::NoPlatformConfigDir) => Ok(AppConfig::default()),
            other => other,
        },
    }
}

/// Persists `config` to the platform config file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config base directory including the `betsy`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Betsy"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("betsy"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Betsy")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
