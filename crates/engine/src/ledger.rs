//! Per-record "years notified" ledger.
//!
//! The ledger lives in a free-form worksheet cell such as `"2023, 2024"`.
//! It is read as a set of tokens and only ever appended to, keeping the
//! comma-separated convention other readers of the sheet rely on.

use std::collections::BTreeSet;

use herald_common::types::Record;

use crate::store::{RecordStore, StoreError};

/// Parsed form of a ledger cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifiedYears {
    tokens: BTreeSet<String>,
}

impl NotifiedYears {
    /// Split on runs of commas and/or whitespace.
    pub fn parse(raw: Option<&str>) -> Self {
        let tokens = raw
            .unwrap_or_default()
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self { tokens }
    }

    pub fn contains(&self, year: i32) -> bool {
        self.tokens.contains(&year.to_string())
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Whether `year` is already recorded in the ledger cell.
pub fn already_sent(raw: Option<&str>, year: i32) -> bool {
    NotifiedYears::parse(raw).contains(year)
}

/// New ledger cell value with `year` recorded. Returns the current value
/// unchanged when the year is already present.
pub fn with_year(raw: Option<&str>, year: i32) -> String {
    match raw {
        Some(current) if already_sent(Some(current), year) => current.to_string(),
        Some(current) if !current.trim().is_empty() => format!("{},{}", current, year),
        _ => year.to_string(),
    }
}

/// Record `year` for `record`, re-reading the cell first so edits made since
/// the table was loaded are kept. Returns the value written.
pub async fn mark_sent<S>(
    store: &mut S,
    column: &str,
    record: &Record,
    year: i32,
) -> Result<String, StoreError>
where
    S: RecordStore + ?Sized,
{
    let current = store.read_cell(record.row, column).await?;
    let updated = with_year(current.as_deref(), year);
    store.write_cell(record.row, column, &updated).await?;

    tracing::debug!(
        record = %record.name,
        row = record.row,
        year,
        value = %updated,
        "Ledger updated"
    );
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_sent_tokenization() {
        assert!(already_sent(Some("2024, 2025"), 2025));
        assert!(already_sent(Some("2024,2025"), 2024));
        assert!(already_sent(Some(" 2023 \n 2025 "), 2025));
        assert!(already_sent(Some("2025"), 2025));
        assert!(!already_sent(Some("2024"), 2025));
        assert!(!already_sent(None, 2025));
        assert!(!already_sent(Some(""), 2025));
    }

    #[test]
    fn test_already_sent_requires_exact_token() {
        assert!(!already_sent(Some("20250"), 2025));
        assert!(!already_sent(Some("2025x"), 2025));
        assert!(!already_sent(Some("12025"), 2025));
    }

    #[test]
    fn test_with_year_on_empty_cell() {
        assert_eq!(with_year(None, 2024), "2024");
        assert_eq!(with_year(Some(""), 2024), "2024");
        assert_eq!(with_year(Some("   "), 2024), "2024");
    }

    #[test]
    fn test_with_year_appends() {
        assert_eq!(with_year(Some("2023"), 2024), "2023,2024");
        assert_eq!(with_year(Some("2022, 2023"), 2024), "2022, 2023,2024");
    }

    #[test]
    fn test_with_year_is_idempotent() {
        let once = with_year(Some("2023"), 2024);
        let twice = with_year(Some(&once), 2024);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_with_two_years_keeps_both() {
        let first = with_year(None, 2024);
        let value = with_year(Some(&first), 2025);
        let years = NotifiedYears::parse(Some(&value));
        assert!(years.contains(2024));
        assert!(years.contains(2025));
        assert_eq!(years.len(), 2);
    }

    #[test]
    fn test_parse_ignores_repeated_separators() {
        let years = NotifiedYears::parse(Some(",, 2021 ,\t2022,,"));
        assert_eq!(years.len(), 2);
        assert!(NotifiedYears::parse(None).is_empty());
    }
}
