//! Google Sheets record store.
//!
//! Reads the whole worksheet once per run and updates single ledger cells
//! through the Sheets API v4, authenticated as a service account.

pub mod auth;
pub mod client;
pub mod error;

pub use auth::{Credentials, ServiceAccountKey, TokenSource};
pub use client::SheetsStore;
pub use error::SheetsError;
