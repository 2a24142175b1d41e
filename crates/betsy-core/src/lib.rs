//! # betsy-core
//!
//! Shared library for driving walls of Betsy LED tiles: tile geometry and
//! display layout, the color pipeline that turns source pixels into the
//! tile's native PWM frame buffer, and the text-prefixed wire commands that
//! carry those buffers over UDP.
//!
//! This crate has zero dependencies on sockets, file systems, or image
//! decoders.  The driver and web crates supply those.
//!
//! # Architecture overview (for beginners)
//!
//! A Betsy wall is a grid of small LED panels ("tiles"), each of which is an
//! independent IPv6 host.  To show an image on the wall we:
//!
//! 1. Cut the image into one rectangle per tile (the **display layout**).
//! 2. Convert every pixel of that rectangle into three 12-bit PWM values
//!    (the **color pipeline**).
//! 3. Split the resulting byte buffer into 1 KiB pieces and send each piece
//!    to the tile with a `dpc! data` command (the **protocol**).
//! 4. Broadcast one `dpc! upload` command so every tile swaps the new buffer
//!    onto its LEDs at the same moment.
//!
//! The modules mirror those steps:
//!
//! - **`domain`** – tile geometry, tile addresses, and the [`Display`] that
//!   maps tiles onto canvas rectangles.
//! - **`color`** – gamma table, 3×3 color transform, post-scaler, and the
//!   [`PixelConverter`] that fills frame buffers.
//! - **`protocol`** – command encoding/decoding, chunking, and the buffer
//!   slot ring.

pub mod color;
pub mod domain;
pub mod protocol;

pub use color::pipeline::{PixelConverter, PixelSource, PwmPixel, RgbaFrame, PWM_FULL_SCALE};
pub use color::settings::{ColorError, ColorSettings, Gamma, GammaTable, Matrix3x3};
pub use domain::geometry::{CropRect, TileGeometry, BYTES_PER_PIXEL};
pub use domain::layout::{Display, MappedTile};
pub use domain::tile::{scoped_address, AddressError, Tile};
pub use protocol::buffer_ring::BufferRing;
pub use protocol::chunk::{chunk_count, chunks, Chunk};
pub use protocol::command::{decode_command, upload_command, Command, ProtocolError};
