//! Run trigger.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use herald_common::error::AppError;

use crate::middleware::auth::RunAuthorized;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/run", get(trigger_run))
}

/// GET /run: Execute one notification run and report its summary.
///
/// Answers 409 while another run holds the guard. The run executes on its
/// own task so a dropped connection cannot interrupt it halfway.
async fn trigger_run(
    State(state): State<AppState>,
    _auth: RunAuthorized,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(permit) = state.guard.try_acquire() else {
        tracing::warn!("Run requested while another run is in progress");
        return Err(AppError::Busy);
    };

    let job = state.job.clone();
    let handle = tokio::spawn(async move {
        let _permit = permit;
        job.run().await
    });

    let summary = handle
        .await
        .map_err(|e| AppError::Internal(format!("Run task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!(error = %format!("{:#}", e), "Notification run failed");
            AppError::Run(format!("{:#}", e))
        })?;

    Ok(Json(json!({
        "ok": true,
        "msg": summary.to_string(),
        "summary": summary,
    })))
}
