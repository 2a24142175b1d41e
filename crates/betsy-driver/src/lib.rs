//! betsy-driver library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`,
//! the `betsy` binary in `main.rs`, and the `betsy-web` crate share the same
//! module tree.
//!
//! # Layers
//!
//! - **`application`** – use cases: sending frames to every tile of a
//!   display, publishing color settings, and playing image sequences.  These
//!   only see the [`NetworkBinding`](infrastructure::network::NetworkBinding)
//!   trait, never a real socket.
//! - **`infrastructure`** – OS-facing adapters: the UDP endpoint, TOML
//!   configuration, the JSON tile inventory, and image decoding.

pub mod application;
pub mod infrastructure;
