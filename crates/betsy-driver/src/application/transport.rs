//! FrameTransport: converts tile crops and sends them to the wall.
//!
//! # Frame lifecycle (for beginners)
//!
//! ```text
//! for each mapped tile (row-major order):
//!     convert crop ──► 6 × w × h byte frame buffer
//!     split into 1024-byte chunks
//!     unicast "dpc! data <buf> <offset>;<bytes>" per chunk
//! broadcast "dpc! upload <buf>;"          (caller, after all tiles)
//! ```
//!
//! Data commands only fill a device buffer; nothing changes on the LEDs until
//! the present command arrives.  Because the present is broadcast once, all
//! tiles switch together.  Nothing is acknowledged and nothing is retried: a
//! lost chunk leaves stale bytes in that tile's buffer until the next frame.
//!
//! Sending stops at the first error and the frame is abandoned, so a caller
//! that sees an error must not present the buffer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use betsy_core::protocol::FRAME_CHUNK_SIZE;
use betsy_core::{
    chunk_count, chunks, upload_command, ColorError, ColorSettings, Command, Display,
    PixelConverter, PixelSource, Tile, TileGeometry,
};
use futures_util::stream::{self, TryStreamExt};
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::network::{NetworkBinding, NetworkError};

/// Room for the longest data command header in front of a full chunk.
const COMMAND_CAPACITY: usize = FRAME_CHUNK_SIZE + 32;

/// Error type for frame transmission.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Color(#[from] ColorError),

    /// A frame buffer handed to the transport has the wrong size.
    #[error("frame buffer must be {expected} bytes, got {actual}")]
    FrameLength { expected: usize, actual: usize },
}

/// Summary of one transmitted frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Tiles whose buffers were sent completely.
    pub tiles: usize,
    /// Unicast data datagrams sent.
    pub datagrams: usize,
    /// Frame buffer bytes sent (excluding command headers).
    pub bytes: usize,
    /// Wall-clock time spent converting and sending.
    pub elapsed: Duration,
}

/// Sends frame buffers through a borrowed [`NetworkBinding`].
pub struct FrameTransport<'a, B: NetworkBinding + ?Sized> {
    binding: &'a B,
    geometry: TileGeometry,
}

impl<'a, B: NetworkBinding + ?Sized> FrameTransport<'a, B> {
    /// Creates a transport for tiles of `geometry`.
    pub fn new(binding: &'a B, geometry: TileGeometry) -> Self {
        Self { binding, geometry }
    }

    pub fn geometry(&self) -> TileGeometry {
        self.geometry
    }

    /// Sends one complete frame buffer to `tile` as chunked data commands.
    ///
    /// Returns the number of datagrams sent.
    ///
    /// # Errors
    ///
    /// [`TransportError::FrameLength`] if `frame` is not exactly one tile
    /// buffer long (nothing is sent), or the first send failure.
    pub async fn send_frame_buffer(
        &self,
        tile: &Tile,
        buffer: u8,
        frame: &[u8],
    ) -> Result<usize, TransportError> {
        let mut command = Vec::with_capacity(COMMAND_CAPACITY);
        self.send_chunks(tile, buffer, frame, &mut command).await
    }

    /// Broadcasts raw command text to every tile.
    pub async fn broadcast_command(&self, text: &str) -> Result<(), TransportError> {
        self.binding.send_broadcast(text.as_bytes()).await?;
        Ok(())
    }

    /// Tells every tile to display `buffer`.
    pub async fn present(&self, buffer: u8) -> Result<(), TransportError> {
        self.broadcast_command(&upload_command(buffer)).await?;
        debug!("presented buffer {buffer}");
        Ok(())
    }

    /// Converts and sends every tile of `display`, one after another, into
    /// device buffer `buffer`.  Does not present.
    pub async fn send_frame<S>(
        &self,
        display: &Display,
        buffer: u8,
        image: &S,
        settings: &ColorSettings,
    ) -> Result<FrameReport, TransportError>
    where
        S: PixelSource + ?Sized,
    {
        let started = Instant::now();
        let converter = PixelConverter::new(settings);
        let mut scratch = vec![0u8; self.geometry.frame_len()];
        let mut command = Vec::with_capacity(COMMAND_CAPACITY);
        let mut report = FrameReport::default();

        for mapped in display.mapping() {
            converter.convert_crop(image, mapped.crop, &mut scratch)?;
            report.datagrams += self
                .send_chunks(&mapped.tile, buffer, &scratch, &mut command)
                .await?;
            report.tiles += 1;
            report.bytes += scratch.len();
        }

        report.elapsed = started.elapsed();
        debug!(
            "sent frame to buffer {buffer}: {} tiles, {} datagrams in {:?}",
            report.tiles, report.datagrams, report.elapsed
        );
        Ok(report)
    }

    /// Like [`send_frame`](Self::send_frame) but converts and sends up to
    /// `workers` tiles at once.
    ///
    /// Each tile gets its own scratch buffer.  The first error stops all
    /// remaining work, and every send has finished (or been abandoned) when
    /// this returns, so a following [`present`](Self::present) is ordered
    /// after all data commands.
    pub async fn send_frame_concurrent<S>(
        &self,
        display: &Display,
        buffer: u8,
        image: &S,
        settings: &ColorSettings,
        workers: usize,
    ) -> Result<FrameReport, TransportError>
    where
        S: PixelSource + ?Sized,
    {
        if workers <= 1 {
            return self.send_frame(display, buffer, image, settings).await;
        }

        let started = Instant::now();
        let converter = PixelConverter::new(settings);
        let frame_len = self.geometry.frame_len();
        let tiles = AtomicUsize::new(0);
        let datagrams = AtomicUsize::new(0);
        let (tiles_ref, datagrams_ref) = (&tiles, &datagrams);

        stream::iter(display.mapping().iter().map(Ok::<_, TransportError>))
            .try_for_each_concurrent(workers, |mapped| async move {
                let mut scratch = vec![0u8; frame_len];
                converter.convert_crop(image, mapped.crop, &mut scratch)?;
                let mut command = Vec::with_capacity(COMMAND_CAPACITY);
                let sent = self
                    .send_chunks(&mapped.tile, buffer, &scratch, &mut command)
                    .await?;
                datagrams_ref.fetch_add(sent, Ordering::Relaxed);
                tiles_ref.fetch_add(1, Ordering::Relaxed);
                Ok::<(), TransportError>(())
            })
            .await?;

        let tiles = tiles.into_inner();
        let report = FrameReport {
            tiles,
            datagrams: datagrams.into_inner(),
            bytes: tiles * frame_len,
            elapsed: started.elapsed(),
        };
        debug!(
            "sent frame to buffer {buffer} with {workers} workers: {} tiles, {} datagrams in {:?}",
            report.tiles, report.datagrams, report.elapsed
        );
        Ok(report)
    }

    async fn send_chunks(
        &self,
        tile: &Tile,
        buffer: u8,
        frame: &[u8],
        command: &mut Vec<u8>,
    ) -> Result<usize, TransportError> {
        let expected = self.geometry.frame_len();
        if frame.len() != expected {
            return Err(TransportError::FrameLength {
                expected,
                actual: frame.len(),
            });
        }

        for chunk in chunks(frame, FRAME_CHUNK_SIZE) {
            command.clear();
            Command::Data {
                buffer,
                offset: chunk.offset,
                payload: chunk.bytes,
            }
            .encode_into(command);
            self.binding.send_unicast(tile, command).await?;
        }
        Ok(chunk_count(frame.len(), FRAME_CHUNK_SIZE))
    }
}
