//! Thread-safe ring of device buffer slots.
//!
//! # Why more than one buffer? (for beginners)
//!
//! Each tile holds several frame buffers, selected by the small integer in
//! every `data` and `upload` command.  Writing frame *n + 1* into a different
//! slot than the one currently on screen means a tile never displays a
//! half-written image, even if the next present arrives late.
//!
//! [`BufferRing`] hands out slot indices `0, 1, …, slots − 1, 0, 1, …` with a
//! single lock-free atomic update, so a sequence player and an HTTP handler
//! can share one ring.

use std::num::NonZeroU8;
use std::sync::atomic::{AtomicU8, Ordering};

/// Cyclic allocator of device buffer indices.
///
/// # Examples
///
/// ```rust
/// use std::num::NonZeroU8;
/// use betsy_core::protocol::BufferRing;
///
/// let ring = BufferRing::new(NonZeroU8::new(2).unwrap());
/// assert_eq!(ring.next(), 0);
/// assert_eq!(ring.next(), 1);
/// assert_eq!(ring.next(), 0);
/// ```
#[derive(Debug)]
pub struct BufferRing {
    slots: NonZeroU8,
    cursor: AtomicU8,
}

impl BufferRing {
    /// Creates a ring of `slots` buffers starting at slot 0.
    pub fn new(slots: NonZeroU8) -> Self {
        Self {
            slots,
            cursor: AtomicU8::new(0),
        }
    }

    /// Returns the next slot to write and advances the ring.
    pub fn next(&self) -> u8 {
        let slots = self.slots.get();
        // The closure always returns Some, so fetch_update cannot fail.
        match self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(((cur as u16 + 1) % slots as u16) as u8)
            }) {
            Ok(prev) | Err(prev) => prev,
        }
    }
}

impl Default for BufferRing {
    /// Single-slot ring: every frame goes to buffer 0.
    fn default() -> Self {
        Self::new(NonZeroU8::MIN)
    }
}
