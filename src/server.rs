//! HTTP surface: multipart upload in, CSV download out.
//!
//! Two routes only. `POST /convert` accepts one multipart file field,
//! runs [`crate::process::process_upload`], and streams the persisted CSV
//! back with the token as the download name. `GET /health` reports
//! liveness. Failures collapse to two client-visible categories: a
//! rejected upload is 400, everything else is 500, both carrying the
//! innermost failure's message as a plain string.

use crate::config::ServiceConfig;
use crate::error::{ErrorKind, MtoError};
use crate::pipeline::extract::VisionExtractor;
use crate::process;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Hard cap on the upload body. Isometric sheets run a few MB; anything
/// near this limit is not a drawing.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared per-process state handed to every request.
///
/// The config (and its precomputed crop box) is immutable; the extractor
/// is the provider seam, so tests mount the router over a stub.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServiceConfig>,
    pub extractor: Arc<dyn VisionExtractor>,
}

impl IntoResponse for MtoError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }
        (status, self.to_string()).into_response()
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/convert", post(convert_drawing))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /convert
///
/// Accepts one multipart field carrying a PDF; replies with the extracted
/// CSV as an attachment named `{token}.csv`.
async fn convert_drawing(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, MtoError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| MtoError::BadUpload(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| MtoError::BadUpload(e.to_string()))?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| MtoError::BadUpload("no file field in request".into()))?;

    let completed =
        process::process_upload(&filename, &bytes, &state.config, state.extractor.as_ref())
            .await?;

    let csv = tokio::fs::read(&completed.result_path)
        .await
        .map_err(|e| MtoError::StorageIo {
            path: completed.result_path.clone(),
            source: e,
        })?;

    let headers = [
        (header::CONTENT_TYPE, "text/csv".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.csv\"", completed.token),
        ),
    ];
    Ok((headers, csv).into_response())
}
