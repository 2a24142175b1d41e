//! SettingsStore: validated, copy-on-write color settings.
//!
//! # Publishing settings without locks (for beginners)
//!
//! Settings are read once per frame by the transport and changed rarely, from
//! an HTTP request.  [`SettingsStore`] keeps the current settings in an
//! `ArcSwap`: readers grab an `Arc` snapshot in one atomic load and keep it for
//! the whole frame, while a writer builds a complete new value and swaps it
//! in.  A frame can therefore never see a gamma from one update and a
//! lookup table from another.
//!
//! Every change arrives as a [`SettingsUpdate`].  It is validated as a whole
//! first; if any field is invalid nothing is applied.

use std::sync::Arc;

use arc_swap::ArcSwap;
use betsy_core::{ColorError, ColorSettings, Gamma, Matrix3x3};
use thiserror::Error;
use tracing::info;

use crate::infrastructure::storage::config::{ColorConfig, DEFAULT_MAX_BRIGHTNESS};

/// Error type for settings updates.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl SettingsError {
    fn invalid(field: impl Into<String>, reason: impl ToString) -> Self {
        SettingsError::Invalid {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Replacement for the whole color transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformUpdate {
    Identity,
    Matrix(Matrix3x3),
}

/// A partial change to the color settings.
///
/// Application order: `gamma`, `brightness`, `max_brightness`, whole
/// `transform`, then for each row its individual `cells` followed by its
/// whole-row vector from `rows`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub gamma: Option<f64>,
    pub brightness: Option<f32>,
    pub max_brightness: Option<f32>,
    pub transform: Option<TransformUpdate>,
    pub rows: [Option<[f32; 3]>; 3],
    pub cells: [[Option<f32>; 3]; 3],
}

impl SettingsUpdate {
    /// Returns `true` if the update changes nothing.
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }

    /// Checks every present field.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some(g) = self.gamma {
            Gamma::new(g).map_err(|e| SettingsError::invalid("gamma", e))?;
        }
        if let Some(b) = self.brightness {
            check_scaler("brightness", b)?;
        }
        if let Some(b) = self.max_brightness {
            check_scaler("max_brightness", b)?;
        }
        if let Some(TransformUpdate::Matrix(m)) = &self.transform {
            m.validate().map_err(|e| SettingsError::invalid("transform", e))?;
        }
        for (row, vector) in self.rows.iter().enumerate() {
            if let Some(v) = vector {
                if v.iter().any(|x| !x.is_finite()) {
                    return Err(SettingsError::invalid(
                        format!("transform[{row}]"),
                        "coefficients must be finite",
                    ));
                }
            }
        }
        for (row, cells) in self.cells.iter().enumerate() {
            for (col, cell) in cells.iter().enumerate() {
                if cell.is_some_and(|x| !x.is_finite()) {
                    return Err(SettingsError::invalid(
                        format!("transform[{row}][{col}]"),
                        "coefficient must be finite",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Applies the color fields (everything except `max_brightness`) to
    /// `color`.  Validates first; on error `color` is unchanged.
    pub fn apply_to(&self, color: &mut ColorSettings) -> Result<(), SettingsError> {
        self.validate()?;
        let mut next = color.clone();

        if let Some(g) = self.gamma {
            next.set_gamma(Gamma::new(g).map_err(|e| SettingsError::invalid("gamma", e))?);
        }
        if let Some(b) = self.brightness {
            next.set_postscaler(b)
                .map_err(|e| SettingsError::invalid("brightness", e))?;
        }

        let mut matrix = match self.transform {
            Some(TransformUpdate::Identity) => Matrix3x3::IDENTITY,
            Some(TransformUpdate::Matrix(m)) => m,
            None => *next.transform(),
        };
        for row in 0..3 {
            for col in 0..3 {
                if let Some(v) = self.cells[row][col] {
                    matrix.0[row][col] = v;
                }
            }
            if let Some(v) = self.rows[row] {
                matrix.0[row] = v;
            }
        }
        next.set_transform(matrix)
            .map_err(|e: ColorError| SettingsError::invalid("transform", e))?;

        *color = next;
        Ok(())
    }
}

fn check_scaler(field: &str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::invalid(field, format!("{value} must be finite and non-negative")))
    }
}

/// The published settings: color parameters plus the brightness ceiling.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSettings {
    pub color: ColorSettings,
    /// Upper bound applied to the post-scaler of every transmitted frame.
    pub max_brightness: f32,
}

impl Default for ActiveSettings {
    fn default() -> Self {
        Self {
            color: ColorSettings::default(),
            max_brightness: DEFAULT_MAX_BRIGHTNESS,
        }
    }
}

impl ActiveSettings {
    /// Builds settings from the `[color]` config section.
    pub fn from_config(config: &ColorConfig) -> Result<Self, SettingsError> {
        let gamma = Gamma::new(config.gamma).map_err(|e| SettingsError::invalid("gamma", e))?;
        check_scaler("max_brightness", config.max_brightness)?;
        let color = ColorSettings::new(gamma, config.transform, config.brightness)
            .map_err(|e| SettingsError::invalid("color", e))?;
        Ok(Self {
            color,
            max_brightness: config.max_brightness,
        })
    }

    fn with_update(&self, update: &SettingsUpdate) -> Result<Self, SettingsError> {
        let mut next = self.clone();
        update.apply_to(&mut next.color)?;
        if let Some(max) = update.max_brightness {
            next.max_brightness = max;
        }
        Ok(next)
    }
}

/// Shared, atomically replaceable settings.
#[derive(Debug)]
pub struct SettingsStore {
    current: ArcSwap<ActiveSettings>,
    defaults: ActiveSettings,
}

impl SettingsStore {
    /// Creates a store that starts at, and resets to, `defaults`.
    pub fn new(defaults: ActiveSettings) -> Self {
        Self {
            current: ArcSwap::from_pointee(defaults.clone()),
            defaults,
        }
    }

    /// The settings every frame started from now will use.
    pub fn snapshot(&self) -> Arc<ActiveSettings> {
        self.current.load_full()
    }

    /// Validates `update` and publishes the result.
    ///
    /// # Errors
    ///
    /// [`SettingsError::Invalid`]; the published settings are unchanged.
    pub fn update(&self, update: &SettingsUpdate) -> Result<Arc<ActiveSettings>, SettingsError> {
        update.validate()?;
        let mut failure = None;
        self.current.rcu(|current| match current.with_update(update) {
            Ok(next) => Arc::new(next),
            Err(e) => {
                failure = Some(e);
                Arc::clone(current)
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        let published = self.snapshot();
        info!(
            "settings updated: gamma {}, brightness {}, max brightness {}",
            published.color.gamma().value(),
            published.color.postscaler(),
            published.max_brightness
        );
        Ok(published)
    }

    /// Restores the startup settings.
    pub fn reset(&self) -> Arc<ActiveSettings> {
        self.current.store(Arc::new(self.defaults.clone()));
        info!("settings reset to defaults");
        self.snapshot()
    }

    /// Settings for one frame: the published settings with optional
    /// per-request `overrides` applied (not published), and the post-scaler
    /// clamped to the brightness ceiling.
    ///
    /// `overrides.max_brightness` is ignored; the ceiling can only be changed
    /// through [`update`](Self::update).
    pub fn frame_settings(&self, overrides: Option<&SettingsUpdate>) -> Result<ColorSettings, SettingsError> {
        let active = self.snapshot();
        let mut color = active.color.clone();
        if let Some(update) = overrides {
            update.apply_to(&mut color)?;
        }
        color.clamp_postscaler(active.max_brightness);
        Ok(color)
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(ActiveSettings::default())
    }
}
