//! IPv6 UDP endpoint bound to one network interface.
//!
//! # Link-local addressing (for beginners)
//!
//! Betsy tiles have no routable address; they answer on their IPv6
//! link-local address (`fe80::…`).  The same link-local prefix exists on
//! every interface of a host, so an address like `fe80::1` is ambiguous until
//! it is paired with an interface, written `fe80::1%eth0`.  In a
//! [`SocketAddrV6`] the interface is carried as a numeric *scope id*.
//!
//! [`UdpEndpoint::bind`] looks the interface index up once and stamps it on
//! the all-nodes multicast address (`ff02::1`) and on every tile it
//! resolves.  A single socket bound to `[::]:0` then serves both unicast and
//! multicast sends.

use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6};

use async_trait::async_trait;
use betsy_core::protocol::ALL_NODES_MULTICAST;
use betsy_core::{scoped_address, Tile};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use super::{NetworkBinding, NetworkError};
use crate::infrastructure::storage::config::NetworkConfig;

/// Name and OS index of the interface an endpoint is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub index: u32,
}

/// A bound UDP socket plus the multicast destination for present commands.
///
/// Owned by the process entry point for its whole lifetime and borrowed by
/// everything that sends.  Dropping it (or calling [`close`](Self::close))
/// releases the socket.
#[derive(Debug)]
pub struct UdpEndpoint {
    socket: UdpSocket,
    multicast: SocketAddrV6,
    interface: InterfaceInfo,
    port: u16,
}

impl UdpEndpoint {
    /// Binds a socket for the interface named in `config`.
    ///
    /// # Errors
    ///
    /// - [`NetworkError::InterfaceNotFound`] if the interface does not exist.
    /// - [`NetworkError::Bind`] if the socket cannot be created or, with
    ///   `bind_to_device`, pinned to the interface.
    pub async fn bind(config: &NetworkConfig) -> Result<Self, NetworkError> {
        let index = interface_index(&config.interface)?;
        let interface = InterfaceInfo {
            name: config.interface.clone(),
            index,
        };
        let multicast = SocketAddrV6::new(ALL_NODES_MULTICAST, config.port, 0, index);

        let socket = UdpSocket::bind(SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, 0, 0, 0))
            .await
            .map_err(|source| NetworkError::Bind {
                interface: interface.name.clone(),
                source,
            })?;

        if config.bind_to_device {
            bind_to_device(&socket, &interface.name).map_err(|source| NetworkError::Bind {
                interface: interface.name.clone(),
                source,
            })?;
        }

        match socket.local_addr() {
            Ok(local) => info!(
                "bound UDP endpoint {local} on {} (index {index}), multicast {multicast}",
                interface.name
            ),
            Err(e) => warn!("bound UDP endpoint on {} but local address is unknown: {e}", interface.name),
        }

        Ok(Self {
            socket,
            multicast,
            interface,
            port: config.port,
        })
    }

    /// The interface this endpoint sends through.
    pub fn interface(&self) -> &InterfaceInfo {
        &self.interface
    }

    /// Scoped all-nodes multicast destination.
    pub fn multicast_addr(&self) -> SocketAddrV6 {
        self.multicast
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Releases the socket.
    pub fn close(self) {
        info!("closing UDP endpoint on {}", self.interface.name);
        drop(self.socket);
    }

    async fn send_to(&self, datagram: &[u8], dest: SocketAddrV6) -> Result<(), NetworkError> {
        self.socket
            .send_to(datagram, SocketAddr::V6(dest))
            .await
            .map(|_| ())
            .map_err(|source| NetworkError::Transmission { dest, source })
    }
}

#[async_trait]
impl NetworkBinding for UdpEndpoint {
    fn resolve(&self, ip: &str) -> Result<Tile, NetworkError> {
        let addr = scoped_address(ip, self.interface.index, self.port).map_err(|source| {
            NetworkError::AddressResolution {
                input: ip.to_string(),
                source,
            }
        })?;
        debug!("resolved tile {ip} to {addr}");
        Ok(Tile::new(addr))
    }

    async fn send_unicast(&self, tile: &Tile, datagram: &[u8]) -> Result<(), NetworkError> {
        self.send_to(datagram, tile.addr()).await
    }

    async fn send_broadcast(&self, datagram: &[u8]) -> Result<(), NetworkError> {
        self.send_to(datagram, self.multicast).await
    }
}

// ── Platform helpers ──────────────────────────────────────────────────────────

/// Looks up the OS index of the interface called `name`.
#[cfg(unix)]
fn interface_index(name: &str) -> Result<u32, NetworkError> {
    let c_name = std::ffi::CString::new(name)
        .map_err(|_| NetworkError::InterfaceNotFound(name.to_string()))?;
    // SAFETY: `c_name` is a valid NUL-terminated string that outlives the call.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        Err(NetworkError::InterfaceNotFound(name.to_string()))
    } else {
        Ok(index)
    }
}

/// Without `if_nametoindex` the interface must be given as its numeric index.
#[cfg(not(unix))]
fn interface_index(name: &str) -> Result<u32, NetworkError> {
    name.parse::<u32>()
        .ok()
        .filter(|&index| index != 0)
        .ok_or_else(|| NetworkError::InterfaceNotFound(name.to_string()))
}

#[cfg(target_os = "linux")]
fn bind_to_device(socket: &UdpSocket, name: &str) -> io::Result<()> {
    use std::os::fd::AsRawFd;

    let bytes = name.as_bytes();
    // SAFETY: the fd is valid while `socket` is borrowed, and the pointer and
    // length describe `bytes` exactly.
    let rc = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_BINDTODEVICE,
            bytes.as_ptr().cast(),
            bytes.len() as libc::socklen_t,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
fn bind_to_device(_socket: &UdpSocket, name: &str) -> io::Result<()> {
    warn!("bind_to_device is only supported on Linux; relying on scope id for {name}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interface_is_reported() {
        // Act
        let result = interface_index("betsy-does-not-exist0");

        // Assert
        assert!(matches!(result, Err(NetworkError::InterfaceNotFound(name)) if name == "betsy-does-not-exist0"));
    }

    #[test]
    fn test_interface_name_with_nul_is_rejected() {
        assert!(matches!(
            interface_index("eth\0"),
            Err(NetworkError::InterfaceNotFound(_))
        ));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_bind_loopback_and_send_to_self() {
        // Arrange – loopback exists on every Linux host
        let config = NetworkConfig {
            interface: "lo".into(),
            port: 0,
            bind_to_device: false,
        };
        let endpoint = match UdpEndpoint::bind(&config).await {
            Ok(endpoint) => endpoint,
            // Hosts without IPv6 cannot run this test.
            Err(NetworkError::Bind { .. }) => return,
            Err(e) => panic!("unexpected bind error: {e}"),
        };
        let receiver = match tokio::net::UdpSocket::bind("[::1]:0").await {
            Ok(socket) => socket,
            Err(_) => return,
        };
        let port = receiver.local_addr().expect("local addr").port();
        let tile = Tile::new(SocketAddrV6::new(Ipv6Addr::LOCALHOST, port, 0, 0));

        // Act
        endpoint.send_unicast(&tile, b"dpc! upload 0;").await.expect("send");
        let mut buf = [0u8; 64];
        let (n, _) = receiver.recv_from(&mut buf).await.expect("recv");

        // Assert
        assert_eq!(&buf[..n], b"dpc! upload 0;");
        assert_eq!(endpoint.interface().name, "lo");
        assert_eq!(endpoint.multicast_addr().scope_id(), endpoint.interface().index);
        endpoint.close();
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_resolve_uses_interface_scope() {
        let config = NetworkConfig {
            interface: "lo".into(),
            port: 48757,
            bind_to_device: false,
        };
        let Ok(endpoint) = UdpEndpoint::bind(&config).await else {
            return;
        };

        let tile = endpoint.resolve("fe80::1").expect("resolve");

        assert_eq!(tile.addr().scope_id(), endpoint.interface().index);
        assert_eq!(tile.addr().port(), 48757);
        assert!(matches!(
            endpoint.resolve("10.0.0.1"),
            Err(NetworkError::AddressResolution { .. })
        ));
    }
}
