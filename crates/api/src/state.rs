//! Shared application state for the Axum API server.

use std::sync::Arc;

use herald_common::config::AppConfig;

use crate::guard::RunGuard;
use crate::job::RunJob;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub guard: RunGuard,
    pub job: Arc<dyn RunJob>,
}

impl AppState {
    pub fn new(config: AppConfig, job: Arc<dyn RunJob>) -> Self {
        Self {
            config,
            guard: RunGuard::new(),
            job,
        }
    }
}
