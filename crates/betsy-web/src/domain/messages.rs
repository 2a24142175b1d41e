//! JSON bodies returned by the HTTP API.
//!
//! ```json
//! {"gamma":2.4,"max_brightness":0.5,"brightness":1.0,
//!  "transform":[[1.0,0.0,0.0],[0.0,1.0,0.0],[0.0,0.0,1.0]]}
//! ```

use betsy_driver::application::settings::ActiveSettings;
use betsy_driver::application::transport::FrameReport;
use serde::{Deserialize, Serialize};

/// Current color settings, as returned by every settings endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub gamma: f64,
    pub max_brightness: f32,
    pub brightness: f32,
    /// Row-major color transform.
    pub transform: [[f32; 3]; 3],
}

impl From<&ActiveSettings> for SettingsResponse {
    fn from(active: &ActiveSettings) -> Self {
        Self {
            gamma: active.color.gamma().value(),
            max_brightness: active.max_brightness,
            brightness: active.color.postscaler(),
            transform: active.color.transform().0,
        }
    }
}

/// Result of `POST /api/v1/frame`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameResponse {
    /// Device buffer the frame was written into and presented.
    pub buffer: u8,
    pub tiles: usize,
    pub datagrams: usize,
    pub bytes: usize,
    /// Conversion and transmission time in milliseconds.
    pub elapsed_ms: f64,
}

impl FrameResponse {
    pub fn new(buffer: u8, report: &FrameReport) -> Self {
        Self {
            buffer,
            tiles: report.tiles,
            datagrams: report.datagrams,
            bytes: report.bytes,
            elapsed_ms: report.elapsed.as_secs_f64() * 1000.0,
        }
    }
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_default_settings_serialize_with_expected_keys() {
        // Arrange
        let response = SettingsResponse::from(&ActiveSettings::default());

        // Act
        let json = serde_json::to_value(&response).expect("serialize");

        // Assert
        assert_eq!(json["gamma"], 2.4);
        assert_eq!(json["max_brightness"], 0.5);
        assert_eq!(json["brightness"], 1.0);
        assert_eq!(json["transform"][1][1], 1.0);
        assert_eq!(json["transform"][0][1], 0.0);
    }

    #[test]
    fn test_frame_response_converts_elapsed_to_millis() {
        let report = FrameReport {
            tiles: 3,
            datagrams: 6,
            bytes: 5832,
            elapsed: Duration::from_micros(2500),
        };

        let response = FrameResponse::new(1, &report);

        assert_eq!(response.buffer, 1);
        assert_eq!(response.tiles, 3);
        assert!((response.elapsed_ms - 2.5).abs() < 1e-9);
    }
}
