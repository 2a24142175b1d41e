//! Tile geometry and canvas rectangles.
//!
//! Every tile on a wall has the same pixel dimensions.  The frame buffer a
//! tile expects is `BYTES_PER_PIXEL × width × height` bytes: three
//! little-endian `u16` values (R, G, B) per pixel, in raster order.

use serde::{Deserialize, Serialize};

/// Bytes occupied by one pixel in a tile frame buffer (three LE `u16`).
pub const BYTES_PER_PIXEL: usize = 6;

/// Pixel dimensions shared by every tile of a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileGeometry {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl TileGeometry {
    /// The 18×18 panel used by Betsy hardware.
    pub const BETSY: TileGeometry = TileGeometry {
        width: 18,
        height: 18,
    };

    /// Creates a geometry with the given dimensions.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Number of pixels on one tile.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Exact length in bytes of one tile's frame buffer.
    pub fn frame_len(&self) -> usize {
        self.pixel_count() * BYTES_PER_PIXEL
    }

    /// Returns the canvas rectangle covered by a tile whose top-left corner
    /// sits at `(x, y)`.
    pub fn crop_at(&self, x: i32, y: i32) -> CropRect {
        CropRect {
            min_x: x,
            min_y: y,
            max_x: x + self.width as i32,
            max_y: y + self.height as i32,
        }
    }
}

impl Default for TileGeometry {
    fn default() -> Self {
        Self::BETSY
    }
}

/// A half-open rectangle `[min, max)` in canvas coordinates.
///
/// Coordinates may be negative; pixels outside the source image read as
/// black when the rectangle is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl CropRect {
    /// Width in pixels (zero for degenerate rectangles).
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    /// Height in pixels (zero for degenerate rectangles).
    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }

    /// Number of pixels inside the rectangle.
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Smallest rectangle covering both `self` and `other`.
    pub fn union(&self, other: &CropRect) -> CropRect {
        CropRect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}
