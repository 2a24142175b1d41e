//! Color settings and the derived gamma lookup table.
//!
//! # Why a lookup table? (for beginners)
//!
//! Gamma correction raises every normalized channel value to a power
//! (`v^gamma`).  Calling `powf` three times per pixel for every tile of
//! every frame is wasteful when the input only has 256 possible values, so
//! the 256 results are computed once whenever the gamma changes and then
//! looked up by index.
//!
//! The table lives *inside* [`ColorSettings`] and can only be regenerated by
//! [`ColorSettings::set_gamma`].  Because that method needs `&mut self`, no
//! other code can observe a gamma that disagrees with its table.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gamma applied when no other value is configured.
pub const DEFAULT_GAMMA: f64 = 2.4;

/// Post-scaler applied when no other value is configured.
pub const DEFAULT_POSTSCALER: f32 = 1.0;

/// Errors raised when constructing or converting with color settings.
#[derive(Debug, Error, PartialEq)]
pub enum ColorError {
    /// Gamma must be a finite number greater than zero.
    #[error("invalid gamma {0}: must be finite and greater than zero")]
    InvalidGamma(f64),

    /// The post-scaler must be finite and non-negative.
    #[error("invalid post-scaler {0}: must be finite and non-negative")]
    InvalidPostscaler(f32),

    /// Every matrix coefficient must be finite.
    #[error("invalid transform: coefficient [{row}][{col}] is not finite")]
    NonFiniteTransform { row: usize, col: usize },

    /// The destination buffer does not match the crop size.
    #[error("frame buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },
}

// ── Gamma ─────────────────────────────────────────────────────────────────────

/// A validated gamma exponent.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Gamma(f64);

impl Gamma {
    /// Validates and wraps `value`.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError::InvalidGamma`] for NaN, infinities, zero, or
    /// negative values.
    pub fn new(value: f64) -> Result<Self, ColorError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ColorError::InvalidGamma(value))
        }
    }

    /// The raw exponent.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for Gamma {
    fn default() -> Self {
        Self(DEFAULT_GAMMA)
    }
}

impl TryFrom<f64> for Gamma {
    type Error = ColorError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Gamma::new(value)
    }
}

impl From<Gamma> for f64 {
    fn from(gamma: Gamma) -> f64 {
        gamma.0
    }
}

/// 256-entry table mapping an 8-bit channel value to `(i / 255)^gamma`.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaTable([f32; 256]);

impl GammaTable {
    /// Computes the table for `gamma`.
    pub fn new(gamma: Gamma) -> Self {
        let mut table = [0.0f32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = (i as f64 / 255.0).powf(gamma.value()) as f32;
        }
        Self(table)
    }

    /// Gamma-corrected value of the 8-bit channel `index`.
    #[inline]
    pub fn lookup(&self, index: u8) -> f32 {
        self.0[index as usize]
    }

    /// The whole table.
    pub fn as_slice(&self) -> &[f32; 256] {
        &self.0
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::new(Gamma::default())
    }
}

// ── Transform ─────────────────────────────────────────────────────────────────

/// Row-major 3×3 color transform applied as a row vector times the matrix:
/// `out[c] = Σ_k in[k] · M[k][c]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix3x3(pub [[f32; 3]; 3]);

impl Matrix3x3 {
    pub const IDENTITY: Matrix3x3 = Matrix3x3([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    /// Checks that every coefficient is finite.
    pub fn validate(&self) -> Result<(), ColorError> {
        for (row, values) in self.0.iter().enumerate() {
            for (col, v) in values.iter().enumerate() {
                if !v.is_finite() {
                    return Err(ColorError::NonFiniteTransform { row, col });
                }
            }
        }
        Ok(())
    }

    /// Multiplies the row vector `v` by this matrix.
    #[inline]
    pub fn apply(&self, v: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        [
            v[0] * m[0][0] + v[1] * m[1][0] + v[2] * m[2][0],
            v[0] * m[0][1] + v[1] * m[1][1] + v[2] * m[2][1],
            v[0] * m[0][2] + v[1] * m[1][2] + v[2] * m[2][2],
        ]
    }
}

impl Default for Matrix3x3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ── ColorSettings ─────────────────────────────────────────────────────────────

/// Complete parameter set for converting pixels to PWM values.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorSettings {
    gamma: Gamma,
    lut: GammaTable,
    transform: Matrix3x3,
    postscaler: f32,
}

impl ColorSettings {
    /// Builds settings from validated parts.
    ///
    /// # Errors
    ///
    /// Returns an error if the transform has a non-finite coefficient or the
    /// post-scaler is negative or non-finite.
    pub fn new(gamma: Gamma, transform: Matrix3x3, postscaler: f32) -> Result<Self, ColorError> {
        transform.validate()?;
        validate_postscaler(postscaler)?;
        Ok(Self {
            gamma,
            lut: GammaTable::new(gamma),
            transform,
            postscaler,
        })
    }

    pub fn gamma(&self) -> Gamma {
        self.gamma
    }

    pub fn lut(&self) -> &GammaTable {
        &self.lut
    }

    pub fn transform(&self) -> &Matrix3x3 {
        &self.transform
    }

    pub fn postscaler(&self) -> f32 {
        self.postscaler
    }

    /// Replaces the gamma and regenerates the lookup table in one step.
    pub fn set_gamma(&mut self, gamma: Gamma) {
        self.gamma = gamma;
        self.lut = GammaTable::new(gamma);
    }

    /// Replaces the whole transform.
    pub fn set_transform(&mut self, transform: Matrix3x3) -> Result<(), ColorError> {
        transform.validate()?;
        self.transform = transform;
        Ok(())
    }

    /// Replaces the post-scaler.
    pub fn set_postscaler(&mut self, postscaler: f32) -> Result<(), ColorError> {
        validate_postscaler(postscaler)?;
        self.postscaler = postscaler;
        Ok(())
    }

    /// Lowers the post-scaler to `max` if it is currently above it.
    pub fn clamp_postscaler(&mut self, max: f32) {
        if self.postscaler > max {
            self.postscaler = max.max(0.0);
        }
    }
}

impl Default for ColorSettings {
    fn default() -> Self {
        Self {
            gamma: Gamma::default(),
            lut: GammaTable::default(),
            transform: Matrix3x3::IDENTITY,
            postscaler: DEFAULT_POSTSCALER,
        }
    }
}

fn validate_postscaler(value: f32) -> Result<(), ColorError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ColorError::InvalidPostscaler(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_gamma_rejects_non_positive_and_non_finite() {
        assert_eq!(Gamma::new(0.0), Err(ColorError::InvalidGamma(0.0)));
        assert_eq!(Gamma::new(-1.5), Err(ColorError::InvalidGamma(-1.5)));
        assert!(Gamma::new(f64::NAN).is_err());
        assert!(Gamma::new(f64::INFINITY).is_err());
        assert!(Gamma::new(0.01).is_ok());
    }

    #[test]
    fn test_lut_endpoints_are_zero_and_one() {
        for g in [0.5, 1.0, 2.2, 2.4, 4.0] {
            // Arrange / Act
            let lut = GammaTable::new(Gamma::new(g).unwrap());

            // Assert
            assert_eq!(lut.lookup(0), 0.0, "gamma {g}");
            assert_eq!(lut.lookup(255), 1.0, "gamma {g}");
        }
    }

    #[test]
    fn test_lut_is_monotonic() {
        for g in [0.3, 1.0, 2.4, 7.0] {
            let lut = GammaTable::new(Gamma::new(g).unwrap());

            for pair in lut.as_slice().windows(2) {
                assert!(pair[1] >= pair[0], "gamma {g} table must not decrease");
            }
        }
    }

    #[test]
    fn test_lut_matches_power_curve() {
        let lut = GammaTable::new(Gamma::new(2.0).unwrap());

        assert_relative_eq!(lut.lookup(128), (128.0f32 / 255.0).powi(2), epsilon = 1e-6);
    }

    #[test]
    fn test_set_gamma_regenerates_table() {
        // Arrange
        let mut settings = ColorSettings::default();
        let before = settings.lut().lookup(128);

        // Act
        settings.set_gamma(Gamma::new(1.0).unwrap());

        // Assert
        assert_ne!(settings.lut().lookup(128), before);
        assert_relative_eq!(settings.lut().lookup(128), 128.0 / 255.0, epsilon = 1e-6);
        assert_eq!(*settings.lut(), GammaTable::new(settings.gamma()));
    }

    #[test]
    fn test_default_settings() {
        let settings = ColorSettings::default();

        assert_eq!(settings.gamma().value(), 2.4);
        assert_eq!(*settings.transform(), Matrix3x3::IDENTITY);
        assert_eq!(settings.postscaler(), 1.0);
    }

    #[test]
    fn test_matrix_apply_uses_row_vector_convention() {
        // Arrange – swap red into green and green into red
        let m = Matrix3x3([[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);

        // Act
        let out = m.apply([0.25, 0.5, 1.0]);

        // Assert
        assert_eq!(out, [0.5, 0.25, 1.0]);
    }

    #[test]
    fn test_non_finite_transform_is_rejected() {
        let mut m = Matrix3x3::IDENTITY;
        m.0[2][1] = f32::NAN;

        assert_eq!(
            ColorSettings::new(Gamma::default(), m, 1.0),
            Err(ColorError::NonFiniteTransform { row: 2, col: 1 })
        );
    }

    #[test]
    fn test_negative_postscaler_is_rejected() {
        let mut settings = ColorSettings::default();

        assert_eq!(
            settings.set_postscaler(-0.1),
            Err(ColorError::InvalidPostscaler(-0.1))
        );
        assert_eq!(settings.postscaler(), 1.0, "failed update leaves value untouched");
    }

    #[test]
    fn test_clamp_postscaler_only_lowers() {
        let mut settings = ColorSettings::default();

        settings.clamp_postscaler(2.0);
        assert_eq!(settings.postscaler(), 1.0);

        settings.clamp_postscaler(0.5);
        assert_eq!(settings.postscaler(), 0.5);
    }

    #[test]
    fn test_gamma_deserialize_validates() {
        let ok: Gamma = serde_json::from_str("2.2").unwrap();
        assert_eq!(ok.value(), 2.2);

        assert!(serde_json::from_str::<Gamma>("0").is_err());
    }
}
