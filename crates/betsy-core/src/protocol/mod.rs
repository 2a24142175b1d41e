//! Wire protocol: text-prefixed commands, frame chunking, and buffer slots.
//!
//! Tiles understand two commands, both starting with an ASCII prefix and
//! terminated by `;`:
//!
//! | Command  | Form                                   | Sent as   |
//! |----------|----------------------------------------|-----------|
//! | Data     | `dpc! data <buf> <offset>;<raw bytes>` | unicast   |
//! | Present  | `dpc! upload <buf>;`                   | multicast |
//!
//! A data command writes its raw payload at `offset` into device buffer
//! `buf`.  A present command makes every tile that hears it display buffer
//! `buf`.  There are no acknowledgments.

use std::net::Ipv6Addr;

pub mod buffer_ring;
pub mod chunk;
pub mod command;

pub use buffer_ring::BufferRing;
pub use chunk::{chunk_count, chunks, Chunk};
pub use command::{decode_command, upload_command, Command, ProtocolError};

/// UDP port every tile listens on.
pub const PROTOCOL_PORT: u16 = 48757;

/// IPv6 all-nodes link-local multicast group used for present commands.
pub const ALL_NODES_MULTICAST: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 1);

/// ASCII prefix shared by every command.
pub const COMMAND_PREFIX: &str = "dpc!";

/// Maximum raw payload carried by one data command.
pub const FRAME_CHUNK_SIZE: usize = 1024;
