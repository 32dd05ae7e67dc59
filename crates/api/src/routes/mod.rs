pub mod health;
pub mod qr;
pub mod run;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(run::router())
        .merge(qr::router())
        .with_state(state)
}
