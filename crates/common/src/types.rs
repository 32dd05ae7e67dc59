use serde::{Deserialize, Serialize};

/// Raw worksheet contents: the header row plus every data row below it.
///
/// Rows are ragged; trailing empty cells may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Position of a header, matched after trimming.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }

    /// Worksheet row number (1-based) of the data row at `index` (0-based).
    ///
    /// The header occupies row 1, so data starts at row 2.
    pub fn sheet_row(index: usize) -> u32 {
        index as u32 + 2
    }
}

/// One anniversary entry read from the worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Worksheet row number (1-based, header is row 1)
    pub row: u32,
    pub name: String,
    pub role: String,
    /// Free-form day/month[/year] text
    pub date: String,
    /// Years already notified; `None` when the cell is absent
    pub notified_years: Option<String>,
}

/// Aggregate result of one notification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Records delivered to at least one recipient and marked in the ledger
    pub sent: u32,
    /// Due records already notified for the occurrence year
    pub skipped: u32,
    /// Due records no recipient received
    pub failed: u32,
    /// Delivered records whose ledger write failed; not counted in `sent`
    pub unmarked: u32,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sent: {} | Skipped: {}", self.sent, self.skipped)?;
        if self.failed > 0 {
            write!(f, " | Failed: {}", self.failed)?;
        }
        if self.unmarked > 0 {
            write!(f, " | Unmarked: {}", self.unmarked)?;
        }
        Ok(())
    }
}
