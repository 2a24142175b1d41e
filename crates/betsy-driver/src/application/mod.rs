//! Application layer use cases for the driver.
//!
//! Use cases in this layer orchestrate `betsy_core` domain objects and
//! depend only on the [`NetworkBinding`](crate::infrastructure::network::NetworkBinding)
//! abstraction, never on a concrete socket.
//!
//! # Sub-modules
//!
//! - **`transport`** – Converts each mapped tile's crop of an image and sends
//!   it as chunked data commands, then presents a buffer with one broadcast.
//!   This runs once per frame for every tile on the wall.
//!
//! - **`settings`** – Validates and publishes color settings changes
//!   (gamma, brightness, color transform) and produces the per-frame
//!   settings snapshot with the brightness ceiling enforced.
//!
//! - **`play_sequence`** – Loops a decoded image sequence at a fixed frame
//!   rate, cycling device buffers and presenting each frame.

pub mod play_sequence;
pub mod settings;
pub mod transport;
