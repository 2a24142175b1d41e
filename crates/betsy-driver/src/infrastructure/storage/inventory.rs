//! JSON tile inventory.
//!
//! The inventory lists every tile of a wall and where its top-left pixel
//! sits on the canvas:
//!
//! ```json
//! {
//!   "tilemap": [
//!     { "ipv6_link_local": "fe80::2ee:aff:fe01:1", "start": [0, 0] },
//!     { "ipv6_link_local": "fe80::2ee:aff:fe01:2", "start": [18, 0] },
//!     { "ipv6_link_local": "fe80::2ee:aff:fe01:3", "start": [36, 0], "ignore": "true" }
//!   ]
//! }
//! ```
//!
//! Entries marked `"ignore": "true"` (or `true`) are skipped.  Coordinates
//! may be written as floats; they are truncated toward zero.

use std::path::{Path, PathBuf};

use betsy_core::{Display, TileGeometry};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::infrastructure::network::{NetworkBinding, NetworkError};

/// Errors produced while reading or applying an inventory.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The inventory file could not be read.
    #[error("I/O error reading inventory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document is not a valid inventory.
    #[error("malformed inventory: {0}")]
    Malformed(String),

    /// A tile address could not be resolved against the network binding.
    #[error("inventory entry {index}: {source}")]
    Resolve {
        index: usize,
        #[source]
        source: NetworkError,
    },
}

/// Parsed inventory document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub tilemap: Vec<InventoryEntry>,
}

/// One tile of the inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// Link-local IPv6 address of the tile, optionally with a `%zone`.
    pub ipv6_link_local: String,
    /// Canvas position `[x, y]` of the tile's top-left pixel.
    pub start: Vec<f64>,
    #[serde(default)]
    pub ignore: IgnoreFlag,
}

/// The `ignore` field, accepted either as a JSON bool or as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IgnoreFlag {
    Bool(bool),
    Text(String),
}

impl IgnoreFlag {
    pub fn is_set(&self) -> bool {
        match self {
            IgnoreFlag::Bool(b) => *b,
            IgnoreFlag::Text(s) => s == "true",
        }
    }
}

impl Default for IgnoreFlag {
    fn default() -> Self {
        IgnoreFlag::Bool(false)
    }
}

impl InventoryEntry {
    /// Canvas origin, truncated to whole pixels.  The tile's far edge must
    /// still fit in canvas coordinates.
    fn origin(&self, index: usize, geometry: TileGeometry) -> Result<(i32, i32), InventoryError> {
        let (x, y) = match self.start.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => (*x, *y),
            _ => {
                return Err(InventoryError::Malformed(format!(
                    "entry {index}: 'start' must hold two finite coordinates"
                )))
            }
        };
        match (canvas_axis(x, geometry.width), canvas_axis(y, geometry.height)) {
            (Some(x), Some(y)) => Ok((x, y)),
            _ => Err(InventoryError::Malformed(format!(
                "entry {index}: 'start' [{x}, {y}] is outside the canvas range"
            ))),
        }
    }
}

/// Truncates `value` to a pixel coordinate, or `None` when a tile of
/// `extent` pixels starting there would overflow `i32`.
fn canvas_axis(value: f64, extent: u32) -> Option<i32> {
    let start = i32::try_from(value.trunc() as i64).ok()?;
    start.checked_add(i32::try_from(extent).ok()?)?;
    Some(start)
}

impl Inventory {
    /// Resolves every non-ignored entry through `binding`, maps it onto
    /// `display`, then sorts the display.  Returns the number of tiles
    /// mapped.
    ///
    /// Entries are validated before any tile is mapped, so a malformed
    /// inventory leaves `display` unchanged.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Malformed`] for bad coordinates and
    /// [`InventoryError::Resolve`] for unresolvable addresses.
    pub fn populate<B>(&self, binding: &B, display: &mut Display) -> Result<usize, InventoryError>
    where
        B: NetworkBinding + ?Sized,
    {
        let geometry = display.geometry();
        let mut resolved = Vec::with_capacity(self.tilemap.len());
        for (index, entry) in self.tilemap.iter().enumerate() {
            if entry.ignore.is_set() {
                debug!("skipping ignored tile {}", entry.ipv6_link_local);
                continue;
            }
            let (x, y) = entry.origin(index, geometry)?;
            let tile = binding
                .resolve(&entry.ipv6_link_local)
                .map_err(|source| InventoryError::Resolve { index, source })?;
            resolved.push((tile, x, y));
        }

        let mapped = resolved.len();
        for (tile, x, y) in resolved {
            display.map_tile(tile, x, y);
        }
        display.sort();
        let on_display = display.len();
        info!(
            "mapped {mapped} of {} inventory tiles ({on_display} on display)",
            self.tilemap.len()
        );
        Ok(mapped)
    }
}

/// Parses an inventory document.
pub fn parse_inventory(json: &str) -> Result<Inventory, InventoryError> {
    serde_json::from_str(json).map_err(|e| InventoryError::Malformed(e.to_string()))
}

/// Reads and parses the inventory at `path`.
pub fn load_inventory(path: &Path) -> Result<Inventory, InventoryError> {
    let content = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_inventory(&content)
}
