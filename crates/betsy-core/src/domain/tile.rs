//! Network identity of a single tile.
//!
//! Tiles are reached at their IPv6 link-local address.  A link-local address
//! is only meaningful together with the interface it lives on, so a [`Tile`]
//! always carries a fully scoped [`SocketAddrV6`] (address + port + scope id).

use std::fmt;
use std::net::{Ipv6Addr, SocketAddrV6};
use thiserror::Error;

/// Errors produced while turning a textual address into a tile address.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    /// The input is empty after trimming.
    #[error("tile address is empty")]
    Empty,

    /// The input is not a syntactically valid IPv6 address.
    #[error("'{0}' is not a valid IPv6 address")]
    Malformed(String),

    /// The input parsed as IPv4; tiles are IPv6-only.
    #[error("'{0}' is an IPv4 address; tiles are addressed over IPv6")]
    NotIpv6(String),
}

/// A resolved tile address.
///
/// Immutable once created and reusable across frames.  Sending to a tile
/// always goes through a network binding that is passed alongside it, so a
/// `Tile` never owns socket resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tile {
    addr: SocketAddrV6,
}

impl Tile {
    /// Wraps an already scoped socket address.
    pub fn new(addr: SocketAddrV6) -> Self {
        Self { addr }
    }

    /// Unicast destination for this tile's data chunks.
    pub fn addr(&self) -> SocketAddrV6 {
        self.addr
    }

    /// The bare IPv6 address, without port or scope.
    pub fn ip(&self) -> &Ipv6Addr {
        self.addr.ip()
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// Builds the scoped socket address `[ip%scope_id]:port`.
///
/// Accepts an optional pair of surrounding brackets and an optional
/// `%zone` suffix; the zone is discarded and replaced by `scope_id`, the
/// index of the interface the caller has bound.
///
/// # Errors
///
/// - [`AddressError::Empty`] for blank input.
/// - [`AddressError::NotIpv6`] if the input is a valid IPv4 address.
/// - [`AddressError::Malformed`] for anything else that fails to parse.
///
/// # Examples
///
/// ```rust
/// use betsy_core::domain::tile::scoped_address;
///
/// let addr = scoped_address("fe80::1%eth0", 3, 48757).unwrap();
/// assert_eq!(addr.scope_id(), 3);
/// assert_eq!(addr.port(), 48757);
/// ```
pub fn scoped_address(ip: &str, scope_id: u32, port: u16) -> Result<SocketAddrV6, AddressError> {
    let trimmed = ip.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Empty);
    }

    let unbracketed = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    let host = match unbracketed.split_once('%') {
        Some((host, _zone)) => host,
        None => unbracketed,
    };

    match host.parse::<Ipv6Addr>() {
        Ok(addr) => Ok(SocketAddrV6::new(addr, port, 0, scope_id)),
        Err(_) if host.parse::<std::net::Ipv4Addr>().is_ok() => {
            Err(AddressError::NotIpv6(trimmed.to_string()))
        }
        Err(_) => Err(AddressError::Malformed(trimmed.to_string())),
    }
}
