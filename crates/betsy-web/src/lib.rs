//! betsy-web library crate.
//!
//! HTTP control surface for a Betsy tile wall: read and change the color
//! settings, and push single frames uploaded as images.
//!
//! # Architecture
//!
//! ```text
//! HTTP client (forms, multipart, JSON)
//!         ↕
//! [betsy-web]
//!   ├── domain/           Form field parsing, JSON response types
//!   ├── application/      ControlService: settings store + frame transport
//!   └── infrastructure/
//!         └── http_server/ axum router and listener
//!         ↕
//! betsy-driver (NetworkBinding over IPv6 UDP)
//! ```
//!
//! # Layer rules
//!
//! - `domain` does no I/O.
//! - `application` depends on `domain` and `betsy-driver` only; it never sees
//!   an HTTP type.
//! - `infrastructure` maps HTTP requests onto the application layer.

/// Domain layer: request parsing and response types (no I/O).
pub mod domain;

/// Application layer: the control service shared by all requests.
pub mod application;

/// Infrastructure layer: the axum HTTP server.
pub mod infrastructure;
