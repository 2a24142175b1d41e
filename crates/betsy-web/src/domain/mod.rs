//! Domain layer for betsy-web.
//!
//! Pure types shared by the HTTP handlers and the control service:
//!
//! - **`form`** – turns the flat `name=value` fields of a settings form (or
//!   query string) into a [`SettingsUpdate`](betsy_driver::application::settings::SettingsUpdate).
//! - **`messages`** – the JSON bodies the API returns.

pub mod form;
pub mod messages;

pub use form::{parse_settings_form, FormError};
pub use messages::{ErrorResponse, FrameResponse, SettingsResponse};
