//! ControlService: the state behind every HTTP request.
//!
//! Owns the network binding, the mapped display, the published color
//! settings and the device buffer ring.  Handlers receive it as
//! `Arc<ControlService<B>>` router state.
//!
//! Frames are sent one at a time: a frame request holds the frame lock from
//! the first data chunk until its present command has gone out, so buffers
//! are always presented in the order they were filled.

use betsy_core::{BufferRing, Display, TileGeometry};
use betsy_driver::application::settings::{SettingsError, SettingsStore, SettingsUpdate};
use betsy_driver::application::transport::{FrameTransport, TransportError};
use betsy_driver::infrastructure::image_source::{decode_image, ImageLoadError};
use betsy_driver::infrastructure::network::NetworkBinding;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{FrameResponse, SettingsResponse};

/// Application-level failures of the control surface.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("cannot decode uploaded image: {0}")]
    Image(#[from] ImageLoadError),

    #[error("frame transmission failed: {0}")]
    Transport(#[from] TransportError),
}

pub struct ControlService<B: NetworkBinding> {
    binding: B,
    display: Display,
    settings: SettingsStore,
    ring: BufferRing,
    geometry: TileGeometry,
    workers: usize,
    frame_lock: Mutex<()>,
}

impl<B: NetworkBinding> ControlService<B> {
    /// `workers` is the number of tiles sent concurrently per frame.
    pub fn new(
        binding: B,
        display: Display,
        settings: SettingsStore,
        ring: BufferRing,
        workers: usize,
    ) -> Self {
        let geometry = display.geometry();
        Self {
            binding,
            display,
            settings,
            ring,
            geometry,
            workers,
            frame_lock: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub(crate) fn binding(&self) -> &B {
        &self.binding
    }

    /// Gives back the binding so the caller can close it.
    pub fn into_binding(self) -> B {
        self.binding
    }

    /// The published settings.
    pub fn settings(&self) -> SettingsResponse {
        SettingsResponse::from(self.settings.snapshot().as_ref())
    }

    /// Validates and publishes `update`.
    pub fn update_settings(&self, update: &SettingsUpdate) -> Result<SettingsResponse, ControlError> {
        let published = self.settings.update(update)?;
        Ok(SettingsResponse::from(published.as_ref()))
    }

    /// Restores the startup settings.
    pub fn reset_settings(&self) -> SettingsResponse {
        SettingsResponse::from(self.settings.reset().as_ref())
    }

    /// Decodes `image`, sends it to every tile in the next device buffer,
    /// and presents that buffer.
    ///
    /// `overrides` apply to this frame only.  The brightness ceiling still
    /// applies to them.
    ///
    /// # Errors
    ///
    /// Settings and decode errors are reported before anything is sent.
    pub async fn update_frame(
        &self,
        image: &[u8],
        overrides: &SettingsUpdate,
    ) -> Result<FrameResponse, ControlError> {
        let settings = self.settings.frame_settings(Some(overrides))?;
        let source = decode_image(image)?;
        let transport = FrameTransport::new(&self.binding, self.geometry);

        let _guard = self.frame_lock.lock().await;
        let buffer = self.ring.next();
        let report = transport
            .send_frame_concurrent(&self.display, buffer, &source, &settings, self.workers)
            .await?;
        transport.present(buffer).await?;
        debug!("frame presented in buffer {buffer} after {:?}", report.elapsed);

        Ok(FrameResponse::new(buffer, &report))
    }
}
