use thiserror::Error;

use herald_notifier::NotifierError;

use crate::store::StoreError;

/// Fatal errors that abort a notification run.
///
/// Per-record and per-recipient problems never surface here; they are
/// logged and folded into the run summary.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingRequiredColumns(Vec<String>),

    #[error("Ledger column {0:?} does not exist")]
    MissingLedgerColumn(String),

    #[error("Could not load records: {0}")]
    Load(#[source] StoreError),

    #[error("Channel bootstrap failed: {0}")]
    Bootstrap(#[from] NotifierError),
}
