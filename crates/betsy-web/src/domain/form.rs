//! Settings form parsing.
//!
//! The settings and frame endpoints accept the same flat fields, either in
//! the query string or in the request body:
//!
//! | Field              | Value                                   |
//! |--------------------|-----------------------------------------|
//! | `gamma`            | number                                  |
//! | `brightness`       | number                                  |
//! | `max_brightness`   | number                                  |
//! | `transform`        | `id`, or a JSON 3×3 matrix              |
//! | `transform[r]`     | JSON row vector, e.g. `[0,1,0]`         |
//! | `transform[r][c]`  | number                                  |
//!
//! Empty values are treated as absent and unknown fields are ignored.  Any
//! value that is present but cannot be parsed is an error; the range checks
//! (positive gamma, finite coefficients, ...) happen later in
//! [`SettingsUpdate::validate`].

use std::collections::HashMap;
use std::str::FromStr;

use betsy_core::Matrix3x3;
use betsy_driver::application::settings::{SettingsUpdate, TransformUpdate};
use thiserror::Error;

/// A form field whose value could not be parsed.
#[derive(Debug, Error, PartialEq)]
#[error("invalid value for {field}: {reason}")]
pub struct FormError {
    pub field: String,
    pub reason: String,
}

impl FormError {
    fn new(field: &str, reason: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Indexed transform fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransformKey {
    Row(usize),
    Cell(usize, usize),
}

/// Builds a [`SettingsUpdate`] from form fields.
///
/// # Errors
///
/// Returns [`FormError`] naming the first field that does not parse.
pub fn parse_settings_form(fields: &HashMap<String, String>) -> Result<SettingsUpdate, FormError> {
    let mut update = SettingsUpdate::default();

    for (name, value) in fields {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            "gamma" => update.gamma = Some(parse_number(name, value)?),
            "brightness" => update.brightness = Some(parse_number(name, value)?),
            "max_brightness" => update.max_brightness = Some(parse_number(name, value)?),
            "transform" => update.transform = Some(parse_transform(name, value)?),
            other => match parse_transform_key(other) {
                Some(TransformKey::Row(row)) => {
                    let vector: [f32; 3] =
                        serde_json::from_str(value).map_err(|e| FormError::new(name, e))?;
                    update.rows[row] = Some(vector);
                }
                Some(TransformKey::Cell(row, col)) => {
                    update.cells[row][col] = Some(parse_number(name, value)?);
                }
                None => {}
            },
        }
    }

    Ok(update)
}

fn parse_number<T>(field: &str, value: &str) -> Result<T, FormError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| FormError::new(field, e))
}

fn parse_transform(field: &str, value: &str) -> Result<TransformUpdate, FormError> {
    if value == "id" {
        return Ok(TransformUpdate::Identity);
    }
    let rows: [[f32; 3]; 3] = serde_json::from_str(value).map_err(|e| FormError::new(field, e))?;
    Ok(TransformUpdate::Matrix(Matrix3x3(rows)))
}

/// `transform[r]` or `transform[r][c]` with indices in `0..3`.
fn parse_transform_key(name: &str) -> Option<TransformKey> {
    let rest = name.strip_prefix("transform[")?;
    let (row, rest) = rest.split_once(']')?;
    let row = index(row)?;
    if rest.is_empty() {
        return Some(TransformKey::Row(row));
    }
    let col = rest.strip_prefix('[')?.strip_suffix(']')?;
    Some(TransformKey::Cell(row, index(col)?))
}

fn index(s: &str) -> Option<usize> {
    s.parse().ok().filter(|&i| i < 3)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
