//! In-memory network binding for tests.
//!
//! [`RecordingBinding`] resolves addresses exactly like the real endpoint
//! (with a fixed scope id) but appends every datagram to a log instead of
//! sending it.  It can also be told to fail after a number of sends, which is
//! how transport abort paths are exercised.

use std::io;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use betsy_core::protocol::{ALL_NODES_MULTICAST, PROTOCOL_PORT};
use betsy_core::{scoped_address, Tile};

use super::{NetworkBinding, NetworkError};

/// One datagram captured by [`RecordingBinding`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentDatagram {
    Unicast { dest: SocketAddrV6, bytes: Vec<u8> },
    Broadcast { bytes: Vec<u8> },
}

impl SentDatagram {
    pub fn bytes(&self) -> &[u8] {
        match self {
            SentDatagram::Unicast { bytes, .. } | SentDatagram::Broadcast { bytes } => bytes,
        }
    }
}

/// A [`NetworkBinding`] that records instead of sending.
pub struct RecordingBinding {
    scope_id: u32,
    port: u16,
    sent: Mutex<Vec<SentDatagram>>,
    attempts: AtomicUsize,
    fail_after: Option<usize>,
}

impl RecordingBinding {
    /// Creates a binding that accepts every send.
    pub fn new() -> Self {
        Self {
            scope_id: 1,
            port: PROTOCOL_PORT,
            sent: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_after: None,
        }
    }

    /// Creates a binding whose sends start failing once `successes`
    /// datagrams have been accepted.
    pub fn failing_after(successes: usize) -> Self {
        Self {
            fail_after: Some(successes),
            ..Self::new()
        }
    }

    /// Every datagram accepted so far, in send order.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.sent.lock().expect("lock poisoned").clone()
    }

    /// Only the unicast datagrams.
    pub fn unicasts(&self) -> Vec<(SocketAddrV6, Vec<u8>)> {
        self.sent()
            .into_iter()
            .filter_map(|d| match d {
                SentDatagram::Unicast { dest, bytes } => Some((dest, bytes)),
                SentDatagram::Broadcast { .. } => None,
            })
            .collect()
    }

    /// Only the broadcast datagrams.
    pub fn broadcasts(&self) -> Vec<Vec<u8>> {
        self.sent()
            .into_iter()
            .filter_map(|d| match d {
                SentDatagram::Broadcast { bytes } => Some(bytes),
                SentDatagram::Unicast { .. } => None,
            })
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.sent.lock().expect("lock poisoned").clear();
    }

    fn record(&self, dest: SocketAddrV6, datagram: SentDatagram) -> Result<(), NetworkError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| attempt >= limit) {
            return Err(NetworkError::Transmission {
                dest,
                source: io::Error::new(io::ErrorKind::Other, "injected send failure"),
            });
        }
        self.sent.lock().expect("lock poisoned").push(datagram);
        Ok(())
    }
}

impl Default for RecordingBinding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkBinding for RecordingBinding {
    fn resolve(&self, ip: &str) -> Result<Tile, NetworkError> {
        scoped_address(ip, self.scope_id, self.port)
            .map(Tile::new)
            .map_err(|source| NetworkError::AddressResolution {
                input: ip.to_string(),
                source,
            })
    }

    async fn send_unicast(&self, tile: &Tile, datagram: &[u8]) -> Result<(), NetworkError> {
        self.record(
            tile.addr(),
            SentDatagram::Unicast {
                dest: tile.addr(),
                bytes: datagram.to_vec(),
            },
        )
    }

    async fn send_broadcast(&self, datagram: &[u8]) -> Result<(), NetworkError> {
        let dest = SocketAddrV6::new(ALL_NODES_MULTICAST, self.port, 0, self.scope_id);
        self.record(
            dest,
            SentDatagram::Broadcast {
                bytes: datagram.to_vec(),
            },
        )
    }
}

/// Convenience for tests that need a tile without a binding.
pub fn test_tile(last_group: u16) -> Tile {
    Tile::new(SocketAddrV6::new(
        Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, last_group),
        PROTOCOL_PORT,
        0,
        1,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_unicast_and_broadcast_in_order() {
        // Arrange
        let binding = RecordingBinding::new();
        let tile = binding.resolve("fe80::2").expect("resolve");

        // Act
        binding.send_unicast(&tile, b"a").await.expect("unicast");
        binding.send_broadcast(b"b").await.expect("broadcast");

        // Assert
        assert_eq!(
            binding.sent(),
            vec![
                SentDatagram::Unicast {
                    dest: tile.addr(),
                    bytes: b"a".to_vec()
                },
                SentDatagram::Broadcast { bytes: b"b".to_vec() },
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_after_rejects_later_sends() {
        // Arrange
        let binding = RecordingBinding::failing_after(1);

        // Act
        let first = binding.send_broadcast(b"1").await;
        let second = binding.send_broadcast(b"2").await;

        // Assert
        assert!(first.is_ok());
        assert!(matches!(second, Err(NetworkError::Transmission { .. })));
        assert_eq!(binding.broadcasts(), vec![b"1".to_vec()]);
    }

    #[test]
    fn test_resolve_rejects_ipv4() {
        let binding = RecordingBinding::new();

        assert!(matches!(
            binding.resolve("127.0.0.1"),
            Err(NetworkError::AddressResolution { .. })
        ));
    }

    #[test]
    fn test_clear_forgets_history() {
        let binding = RecordingBinding::new();
        binding.sent.lock().expect("lock poisoned").push(SentDatagram::Broadcast { bytes: vec![] });

        binding.clear();

        assert!(binding.sent().is_empty());
    }
}
