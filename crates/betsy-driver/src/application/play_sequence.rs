//! SequencePlayer: loops decoded frames onto the wall at a fixed rate.
//!
//! Every tick takes the next device buffer from the [`BufferRing`], sends the
//! frame into it, and presents it.  Ticks that are missed because a frame
//! took too long are skipped rather than bunched up, so playback slows down
//! instead of bursting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use betsy_core::{BufferRing, ColorSettings, Display, PixelSource};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::application::transport::{FrameTransport, TransportError};
use crate::infrastructure::network::NetworkBinding;

/// Error type for sequence playback.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no frames to play")]
    NoFrames,

    #[error("frame rate must be between 1 and 1000000000 fps")]
    InvalidFrameRate,

    #[error("frame {frame} of loop {loop_index} failed: {source}")]
    Frame {
        loop_index: u64,
        frame: usize,
        #[source]
        source: TransportError,
    },
}

/// How a sequence is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub fps: u32,
    /// Stop after this many complete passes; `None` loops until stopped.
    pub max_loops: Option<u64>,
    /// Concurrent tile sends per frame.
    pub workers: usize,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            fps: 30,
            max_loops: None,
            workers: 1,
        }
    }
}

/// Counters returned when playback ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Complete passes over the sequence.
    pub loops: u64,
    /// Frames sent and presented.
    pub frames: u64,
}

/// Tick period for `fps`; rejects rates whose period rounds to zero.
fn frame_period(fps: u32) -> Result<Duration, PlaybackError> {
    Duration::from_secs(1)
        .checked_div(fps)
        .filter(|period| !period.is_zero())
        .ok_or(PlaybackError::InvalidFrameRate)
}

pub struct SequencePlayer<'a, B: NetworkBinding + ?Sized> {
    transport: FrameTransport<'a, B>,
    display: &'a Display,
    ring: &'a BufferRing,
    running: Arc<AtomicBool>,
}

impl<'a, B: NetworkBinding + ?Sized> SequencePlayer<'a, B> {
    /// `running` is polled before every frame; clearing it stops playback.
    pub fn new(
        transport: FrameTransport<'a, B>,
        display: &'a Display,
        ring: &'a BufferRing,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            display,
            ring,
            running,
        }
    }

    /// Plays `frames` in order, looping, until stopped or `max_loops` is
    /// reached.
    ///
    /// # Errors
    ///
    /// Returns the first frame failure; playback does not continue past it.
    pub async fn play<S: PixelSource>(
        &self,
        frames: &[S],
        settings: &ColorSettings,
        options: PlaybackOptions,
    ) -> Result<PlaybackStats, PlaybackError> {
        if frames.is_empty() {
            return Err(PlaybackError::NoFrames);
        }
        let period = frame_period(options.fps)?;
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stats = PlaybackStats::default();
        let total = frames.len();
        info!(
            "playing {total} frames at {} fps on {} tiles",
            options.fps,
            self.display.len()
        );

        loop {
            for (index, frame) in frames.iter().enumerate() {
                if !self.running.load(Ordering::Relaxed) {
                    info!("playback stopped after {} frames", stats.frames);
                    return Ok(stats);
                }
                ticker.tick().await;

                let buffer = self.ring.next();
                let frame_error = |source| PlaybackError::Frame {
                    loop_index: stats.loops,
                    frame: index,
                    source,
                };
                let report = self
                    .transport
                    .send_frame_concurrent(self.display, buffer, frame, settings, options.workers)
                    .await
                    .map_err(frame_error)?;
                self.transport.present(buffer).await.map_err(frame_error)?;
                stats.frames += 1;
                debug!(
                    "{}/{index}/{total}: sent frame in {:?}",
                    stats.loops, report.elapsed
                );
            }

            stats.loops += 1;
            if options.max_loops.is_some_and(|max| stats.loops >= max) {
                info!("playback finished: {} loops, {} frames", stats.loops, stats.frames);
                return Ok(stats);
            }
        }
    }
}
