//! Domain entities for Betsy tile walls.
//!
//! This module contains pure layout logic with no infrastructure dependencies.
//!
//! # What lives here? (for beginners)
//!
//! - [`geometry`] – how big a tile is, how many bytes its frame buffer takes,
//!   and the rectangle type used to cut tiles out of a source image.
//! - [`tile`] – the network identity of one tile (an IPv6 link-local
//!   address scoped to the interface it is reachable through).
//! - [`layout`] – the [`layout::Display`]: an ordered list of tiles, each
//!   pinned to a rectangle of the canvas.
//!
//! Nothing in here opens a socket.  Resolving a textual address against a
//! real interface is done by the driver crate, which calls
//! [`tile::scoped_address`] with the interface index it discovered.

pub mod geometry;
pub mod layout;
pub mod tile;
