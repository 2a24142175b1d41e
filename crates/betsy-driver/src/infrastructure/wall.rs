//! Wall bootstrap shared by the `betsy` and `betsy-web` binaries.
//!
//! Opening a wall means binding the UDP endpoint on the configured
//! interface and then reading the inventory into a sorted [`Display`].

use std::path::Path;

use betsy_core::Display;
use thiserror::Error;
use tracing::info;

use crate::infrastructure::network::{NetworkBinding, NetworkError, UdpEndpoint};
use crate::infrastructure::storage::config::AppConfig;
use crate::infrastructure::storage::inventory::{load_inventory, InventoryError};

#[derive(Debug, Error)]
pub enum WallError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error("inventory {0} contains no active tiles")]
    NoTiles(String),
}

/// Reads the inventory at `path` and maps its tiles through `binding`.
///
/// # Errors
///
/// Fails if the inventory cannot be read or resolved, or if every entry
/// is ignored.
pub fn build_display<B>(binding: &B, config: &AppConfig, path: &Path) -> Result<Display, WallError>
where
    B: NetworkBinding + ?Sized,
{
    let mut display = Display::new(config.tile.geometry());
    load_inventory(path)?.populate(binding, &mut display)?;
    if display.is_empty() {
        return Err(WallError::NoTiles(path.display().to_string()));
    }
    Ok(display)
}

/// Binds the endpoint described by `config.network` and loads the
/// inventory named by `config.inventory`.
pub async fn open_wall(config: &AppConfig) -> Result<(UdpEndpoint, Display), WallError> {
    let endpoint = UdpEndpoint::bind(&config.network).await?;
    let display = build_display(&endpoint, config, &config.inventory.path)?;
    if let Some(bounds) = display.canvas_bounds() {
        let tiles = display.len();
        info!(
            "wall ready: {tiles} tiles covering {}x{} pixels",
            bounds.width(),
            bounds.height()
        );
    }
    Ok((endpoint, display))
}
