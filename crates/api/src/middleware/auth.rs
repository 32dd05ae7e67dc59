//! Shared-secret gate for the run trigger.
//!
//! When `RUN_TOKEN` is configured, callers must pass it as `?key=<token>`.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use herald_common::error::AppError;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: Option<String>,
}

/// Extractor that admits the request only with the configured run key.
///
/// ```ignore
/// async fn handler(_auth: RunAuthorized) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct RunAuthorized;

impl FromRequestParts<AppState> for RunAuthorized {
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let expected = state.config.run_token.clone();
        let provided = Query::<KeyQuery>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(q)| q.key);

        async move {
            match expected {
                None => Ok(RunAuthorized),
                Some(expected) if provided.as_deref() == Some(expected.as_str()) => {
                    Ok(RunAuthorized)
                }
                Some(_) => {
                    tracing::warn!("Rejected run trigger with missing or wrong key");
                    Err(AppError::Unauthorized)
                }
            }
        }
    }
}
