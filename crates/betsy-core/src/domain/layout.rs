//! Display layout domain entity.
//!
//! A [`Display`] is the logical-to-physical map of a tile wall.  Each entry
//! binds a resolved [`Tile`] to the rectangle of the source canvas it shows.
//! The canvas origin is the top-left pixel of the source image; tiles are
//! placed by the position of their own top-left pixel.
//!
//! Overlapping rectangles are allowed and not detected: two tiles showing the
//! same region simply receive the same pixels.

use crate::domain::geometry::{CropRect, TileGeometry};
use crate::domain::tile::Tile;

/// A tile pinned to a region of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedTile {
    /// Network identity of the tile.
    pub tile: Tile,
    /// Canvas region shown by the tile, exactly one tile in size.
    pub crop: CropRect,
}

/// Ordered collection of mapped tiles sharing one geometry.
///
/// The mapping only grows; tiles are never removed.  After [`Display::sort`]
/// the order is row-major by crop origin, which is also the order frames are
/// transmitted in.
#[derive(Debug, Clone, Default)]
pub struct Display {
    geometry: TileGeometry,
    mapping: Vec<MappedTile>,
}

impl Display {
    /// Creates an empty display whose tiles all have `geometry`.
    pub fn new(geometry: TileGeometry) -> Self {
        Self {
            geometry,
            mapping: Vec::new(),
        }
    }

    /// Geometry shared by every tile of this display.
    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    /// Appends `tile` with its top-left corner at `(start_x, start_y)` and
    /// returns the new entry.
    pub fn map_tile(&mut self, tile: Tile, start_x: i32, start_y: i32) -> &MappedTile {
        let crop = self.geometry.crop_at(start_x, start_y);
        self.mapping.push(MappedTile { tile, crop });
        // The push above guarantees a last element.
        &self.mapping[self.mapping.len() - 1]
    }

    /// Orders tiles by ascending row, then ascending column.
    ///
    /// Stable and idempotent: tiles sharing an origin keep their insertion
    /// order.
    pub fn sort(&mut self) {
        self.mapping
            .sort_by_key(|mapped| (mapped.crop.min_y, mapped.crop.min_x));
    }

    /// Current mapping in transmission order.
    pub fn mapping(&self) -> &[MappedTile] {
        &self.mapping
    }

    /// Number of mapped tiles.
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns `true` if no tile has been mapped yet.
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Smallest rectangle covering every mapped tile, or `None` for an
    /// empty display.
    pub fn canvas_bounds(&self) -> Option<CropRect> {
        let mut iter = self.mapping.iter().map(|m| m.crop);
        let first = iter.next()?;
        Some(iter.fold(first, |acc, crop| acc.union(&crop)))
    }
}
