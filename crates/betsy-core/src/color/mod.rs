//! Color pipeline: from source pixels to tile PWM values.
//!
//! [`settings`] holds the tunable parameters (gamma, color transform,
//! post-scaler) together with the derived gamma lookup table.  [`pipeline`]
//! applies them to a [`pipeline::PixelSource`] and packs the results into a
//! tile frame buffer.

pub mod pipeline;
pub mod settings;

pub use pipeline::{PixelConverter, PixelSource, PwmPixel, RgbaFrame, PWM_FULL_SCALE};
pub use settings::{ColorError, ColorSettings, Gamma, GammaTable, Matrix3x3};
