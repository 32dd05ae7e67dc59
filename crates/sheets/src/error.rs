use thiserror::Error;

use herald_engine::store::StoreError;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid credentials: {0}")]
    Credentials(String),

    #[error("Token signing failed: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Spreadsheet has no worksheets")]
    NoWorksheet,

    #[error("Column {0:?} not found in header row")]
    MissingColumn(String),
}

impl From<SheetsError> for StoreError {
    fn from(err: SheetsError) -> Self {
        match err {
            SheetsError::MissingColumn(column) => StoreError::MissingColumn(column),
            other => StoreError::Backend(Box::new(other)),
        }
    }
}
