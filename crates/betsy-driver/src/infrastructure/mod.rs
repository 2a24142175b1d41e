//! Infrastructure layer for the driver.
//!
//! Contains OS-facing adapters: the UDP network endpoint, file-system
//! storage (config and tile inventory), image decoding, and the wall
//! bootstrap that ties the endpoint and inventory together.
//!
//! **Dependency rule**: this layer may depend on `betsy_core`, but the
//! `application` layer only reaches it through the
//! [`network::NetworkBinding`] trait and plain data types.

pub mod image_source;
pub mod network;
pub mod storage;
pub mod wall;
