//! Application layer for betsy-web.
//!
//! [`ControlService`] is the only use case: it publishes settings changes
//! and pushes uploaded frames through the driver's frame transport.  It
//! knows nothing about HTTP.

pub mod control_service;

pub use control_service::{ControlError, ControlService};
