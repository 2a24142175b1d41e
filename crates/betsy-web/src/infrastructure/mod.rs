//! Infrastructure layer for betsy-web.
//!
//! - Building the axum router over a shared [`ControlService`](crate::application::ControlService)
//! - Extracting form, query, and multipart fields
//! - Mapping errors to HTTP status codes
//! - Binding the TCP listener and shutting down on the running flag

pub mod http_server;

pub use http_server::{build_router, run_server, ApiError};
