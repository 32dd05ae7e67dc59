use async_trait::async_trait;
use thiserror::Error;

use herald_common::types::Table;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Column {0:?} not found in header row")]
    MissingColumn(String),

    #[error("Record store error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Tabular source of anniversary records.
///
/// Rows are addressed by worksheet row number (header is row 1). Writes
/// touch exactly one cell; a store must never rewrite the whole table.
#[async_trait]
pub trait RecordStore: Send {
    /// Header row plus every data row.
    async fn load(&mut self) -> Result<Table, StoreError>;

    /// Current value of one cell; `None` when the cell is empty or absent.
    async fn read_cell(&mut self, row: u32, column: &str) -> Result<Option<String>, StoreError>;

    async fn write_cell(&mut self, row: u32, column: &str, value: &str) -> Result<(), StoreError>;
}
