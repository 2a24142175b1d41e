//! Network infrastructure for the driver.
//!
//! # Sub-modules
//!
//! - **`udp`** – [`udp::UdpEndpoint`], the real binding: one IPv6 UDP socket
//!   on a named interface, used for unicast data chunks to each tile and for
//!   the all-nodes multicast present command.
//!
//! - **`fake`** – [`fake::RecordingBinding`], an in-memory binding that
//!   records every datagram instead of sending it.  Used by tests here and in
//!   the web crate.
//!
//! # Why a trait? (for beginners)
//!
//! The frame transport only needs three things from the network: turn a
//! textual address into a [`Tile`], send bytes to one tile, and send bytes to
//! every tile.  Expressing that as the [`NetworkBinding`] trait lets the
//! transport be tested without root privileges, real interfaces, or LED
//! hardware.

use std::net::SocketAddrV6;

use async_trait::async_trait;
use betsy_core::{AddressError, Tile};
use thiserror::Error;

pub mod fake;
pub mod udp;

pub use fake::RecordingBinding;
pub use udp::{InterfaceInfo, UdpEndpoint};

/// Errors raised while binding, resolving, or sending.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// No interface with the given name exists on this host.
    #[error("network interface not found: {0}")]
    InterfaceNotFound(String),

    /// A tile address could not be turned into a scoped IPv6 address.
    #[error("cannot resolve tile address '{input}': {source}")]
    AddressResolution {
        input: String,
        #[source]
        source: AddressError,
    },

    /// The UDP socket could not be created or pinned to the interface.
    #[error("failed to bind UDP socket on {interface}: {source}")]
    Bind {
        interface: String,
        #[source]
        source: std::io::Error,
    },

    /// A datagram could not be handed to the OS.
    #[error("failed to send datagram to {dest}: {source}")]
    Transmission {
        dest: SocketAddrV6,
        #[source]
        source: std::io::Error,
    },
}

/// Capability to reach tiles over the network.
///
/// Binding (creating the socket) is a constructor of each implementation,
/// not part of the trait; a `NetworkBinding` value is always ready to send.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NetworkBinding: Send + Sync {
    /// Turns a textual IPv6 address into a tile reachable through this
    /// binding.
    fn resolve(&self, ip: &str) -> Result<Tile, NetworkError>;

    /// Sends one datagram to a single tile.
    async fn send_unicast(&self, tile: &Tile, datagram: &[u8]) -> Result<(), NetworkError>;

    /// Sends one datagram to every tile on the link.
    async fn send_broadcast(&self, datagram: &[u8]) -> Result<(), NetworkError>;
}
