//! axum HTTP server: routes, extraction, and error mapping.
//!
//! # Routes
//!
//! | Method | Path                     | Body                                 |
//! |--------|--------------------------|--------------------------------------|
//! | GET    | `/api/v1/settings`       | –                                    |
//! | POST   | `/api/v1/settings`       | urlencoded settings fields           |
//! | POST   | `/api/v1/settings/reset` | –                                    |
//! | POST   | `/api/v1/frame`          | multipart: `data` file + overrides   |
//!
//! Settings fields may also be passed in the query string; body fields win
//! when both name the same field.  See [`crate::domain::form`] for the
//! field syntax.
//!
//! Every error is answered with a JSON [`ErrorResponse`]: 400 for anything
//! the client sent wrong, 500 when the wall could not be reached.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Form, Multipart, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use betsy_driver::infrastructure::network::NetworkBinding;
use betsy_driver::infrastructure::storage::config::WebConfig;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::application::{ControlError, ControlService};
use crate::domain::{parse_settings_form, ErrorResponse, FormError, FrameResponse, SettingsResponse};

/// Largest accepted request body (frame uploads).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Multipart field carrying the encoded image.
const FRAME_FIELD: &str = "data";

type SharedService<B> = Arc<ControlService<B>>;

// ── Errors ────────────────────────────────────────────────────────────────────

/// An error ready to be sent back as a JSON response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<FormError> for ApiError {
    fn from(e: FormError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<ControlError> for ApiError {
    fn from(e: ControlError) -> Self {
        match e {
            ControlError::Settings(_) | ControlError::Image(_) => Self::bad_request(e.to_string()),
            ControlError::Transport(_) => {
                error!("frame request failed: {e}");
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: e.to_string(),
                }
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_client_error() {
            warn!("rejected request: {}", self.message);
        }
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Builds the API router over `service`.
pub fn build_router<B>(service: SharedService<B>) -> Router
where
    B: NetworkBinding + 'static,
{
    Router::new()
        .route(
            "/api/v1/settings",
            get(get_settings::<B>).post(update_settings::<B>),
        )
        .route("/api/v1/settings/reset", post(reset_settings::<B>))
        .route("/api/v1/frame", post(update_frame::<B>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(middleware::from_fn(log_request))
        .with_state(service)
}

async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let started = Instant::now();
    let response = next.run(req).await;
    info!(
        "{method} {uri} -> {} in {:?}",
        response.status(),
        started.elapsed()
    );
    response
}

/// GET /api/v1/settings
async fn get_settings<B>(State(service): State<SharedService<B>>) -> Json<SettingsResponse>
where
    B: NetworkBinding + 'static,
{
    Json(service.settings())
}

/// POST /api/v1/settings
async fn update_settings<B>(
    State(service): State<SharedService<B>>,
    Query(mut fields): Query<HashMap<String, String>>,
    form: Option<Form<HashMap<String, String>>>,
) -> Result<Json<SettingsResponse>, ApiError>
where
    B: NetworkBinding + 'static,
{
    if let Some(Form(body)) = form {
        fields.extend(body);
    }
    let update = parse_settings_form(&fields)?;
    Ok(Json(service.update_settings(&update)?))
}

/// POST /api/v1/settings/reset
async fn reset_settings<B>(State(service): State<SharedService<B>>) -> Json<SettingsResponse>
where
    B: NetworkBinding + 'static,
{
    Json(service.reset_settings())
}

/// POST /api/v1/frame
async fn update_frame<B>(
    State(service): State<SharedService<B>>,
    Query(mut fields): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> Result<Json<FrameResponse>, ApiError>
where
    B: NetworkBinding + 'static,
{
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == FRAME_FIELD {
            image = Some(field.bytes().await?);
        } else {
            fields.insert(name, field.text().await?);
        }
    }

    let image =
        image.ok_or_else(|| ApiError::bad_request(format!("missing multipart field '{FRAME_FIELD}'")))?;
    let overrides = parse_settings_form(&fields)?;
    Ok(Json(service.update_frame(&image, &overrides).await?))
}

// ── Listener ──────────────────────────────────────────────────────────────────

/// Serves the API on `config.bind_address:config.port` until `running` is
/// cleared.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn run_server<B>(
    service: SharedService<B>,
    config: &WebConfig,
    running: Arc<AtomicBool>,
) -> anyhow::Result<()>
where
    B: NetworkBinding + 'static,
{
    let listener = TcpListener::bind((config.bind_address.as_str(), config.port))
        .await
        .with_context(|| {
            format!(
                "failed to bind control surface on {}:{}",
                config.bind_address, config.port
            )
        })?;
    info!("control surface listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(service).into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(running))
        .await
        .context("HTTP server failed")?;

    info!("control surface stopped");
    Ok(())
}

/// Resolves once `running` is cleared, polling every 200 ms.
async fn wait_for_shutdown(running: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    while running.load(Ordering::Relaxed) {
        ticker.tick().await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
