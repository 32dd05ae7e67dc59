//! Session proof retrieval, for scanning the channel's login QR out of band.

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use herald_common::error::AppError;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/qr", get(session_proof))
}

/// GET /qr: Latest screenshot taken when the channel was opened.
async fn session_proof(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let path = state.config.session_proof_path();
    match tokio::fs::read(&path).await {
        Ok(png) => Ok(([(header::CONTENT_TYPE, "image/png")], png)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
            "No QR yet. Trigger /run to open the channel and capture one.".to_string(),
        )),
        Err(e) => Err(AppError::Internal(e.to_string())),
    }
}
