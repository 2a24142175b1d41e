//! Storage infrastructure: configuration and tile inventory files.
//!
//! - `config` reads and writes the TOML driver configuration from the
//!   platform-appropriate directory, falling back to defaults on first run.
//! - `inventory` reads the JSON tile map that says which tile sits where.

pub mod config;
pub mod inventory;
