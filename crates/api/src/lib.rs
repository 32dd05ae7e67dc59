//! HTTP trigger surface for notification runs.
//!
//! - `GET /` and `GET /health`: liveness
//! - `GET /run`: start a run, single-flight, optionally gated by `?key=`
//! - `GET /qr`: latest session proof captured during channel bootstrap

pub mod credentials;
pub mod guard;
pub mod job;
pub mod middleware;
pub mod routes;
pub mod state;
