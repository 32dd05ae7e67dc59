//! Notification run pipeline.
//!
//! One run:
//! 1. Loads the worksheet and checks the required columns
//! 2. Bootstraps a single delivery channel for the whole run
//! 3. For every due record not yet notified this year, sends the message to
//!    each recipient in order
//! 4. Appends the occurrence year to the record's ledger cell when at least
//!    one recipient was reached
//!
//! The channel is closed on every exit path once it has been launched,
//! including a panic inside the record loop, which is re-raised after closing.

use std::panic::AssertUnwindSafe;

use chrono::NaiveDate;
use futures_util::FutureExt;
use uuid::Uuid;

use herald_common::config::{AppConfig, ColumnNames};
use herald_common::types::{Record, RunSummary, Table};
use herald_notifier::{ChannelLauncher, DeliveryChannel};

use crate::composer::compose_message;
use crate::date_window::{Occurrence, next_occurrence, parse_date};
use crate::error::EngineError;
use crate::ledger;
use crate::store::{RecordStore, StoreError};

/// Default look-ahead: today, tomorrow and the day after.
pub const DEFAULT_WINDOW_DAYS: u32 = 3;

/// Inputs that shape a run.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub window_days: u32,
    pub recipients: Vec<String>,
    pub columns: ColumnNames,
}

impl EngineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            window_days: config.window_days,
            recipients: config.recipients.clone(),
            columns: config.columns.clone(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            recipients: Vec::new(),
            columns: ColumnNames::default(),
        }
    }
}

/// What happened to a single due record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    AlreadySent,
    Delivered { marked: bool },
    Undelivered,
}

/// Orchestrates date checks, dedup, delivery and ledger updates.
pub struct NotificationEngine {
    settings: EngineSettings,
}

impl NotificationEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Due iff the occurrence falls within `[0, window_days)` days.
    pub fn is_due(days_until: i64, window_days: u32) -> bool {
        (0..i64::from(window_days)).contains(&days_until)
    }

    /// Run one full scan against `today`.
    ///
    /// Only configuration-level failures are returned as errors.
    pub async fn run<S, L>(
        &self,
        store: &mut S,
        launcher: &L,
        today: NaiveDate,
    ) -> Result<RunSummary, EngineError>
    where
        S: RecordStore + ?Sized,
        L: ChannelLauncher + ?Sized,
    {
        let run_id = Uuid::new_v4();
        tracing::info!(run_id = %run_id, today = %today, "Notification run started");

        let table = store.load().await.map_err(EngineError::Load)?;
        if table.headers.is_empty() {
            tracing::info!(run_id = %run_id, "Worksheet is empty, nothing to do");
            return Ok(RunSummary::default());
        }

        let records = self.records(&table)?;
        if records.is_empty() {
            tracing::info!(run_id = %run_id, "No records");
            return Ok(RunSummary::default());
        }

        let mut channel = launcher.launch().await?;
        let result = AssertUnwindSafe(self.process(&records, store, &mut channel, today))
            .catch_unwind()
            .await;
        channel.close().await;
        let result = match result {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        if let Ok(summary) = &result {
            tracing::info!(
                run_id = %run_id,
                sent = summary.sent,
                skipped = summary.skipped,
                failed = summary.failed,
                unmarked = summary.unmarked,
                "Notification run finished"
            );
        }
        result
    }

    /// Map rows to records after checking the header row.
    fn records(&self, table: &Table) -> Result<Vec<Record>, EngineError> {
        let columns = &self.settings.columns;
        let missing: Vec<String> = columns
            .required()
            .iter()
            .filter(|c| table.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::MissingRequiredColumns(missing));
        }

        let index = |name: &str| table.column_index(name).unwrap_or_default();
        let (name, role, date, notified) = (
            index(&columns.name),
            index(&columns.role),
            index(&columns.date),
            index(&columns.notified_years),
        );
        let text = |row: &[String], i: usize| {
            row.get(i)
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        Ok(table
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| Record {
                row: Table::sheet_row(i),
                name: text(row, name),
                role: text(row, role),
                date: text(row, date),
                notified_years: row.get(notified).cloned(),
            })
            .collect())
    }

    async fn process<S, C>(
        &self,
        records: &[Record],
        store: &mut S,
        channel: &mut C,
        today: NaiveDate,
    ) -> Result<RunSummary, EngineError>
    where
        S: RecordStore + ?Sized,
        C: DeliveryChannel,
    {
        let mut summary = RunSummary::default();

        for record in records {
            let Some(occurrence) = self.due_occurrence(record, today) else {
                continue;
            };

            match self.notify(record, &occurrence, store, channel).await? {
                Outcome::AlreadySent => summary.skipped += 1,
                Outcome::Delivered { marked: true } => summary.sent += 1,
                Outcome::Delivered { marked: false } => summary.unmarked += 1,
                Outcome::Undelivered => summary.failed += 1,
            }
        }

        Ok(summary)
    }

    /// The record's next occurrence if it falls inside the window.
    fn due_occurrence(&self, record: &Record, today: NaiveDate) -> Option<Occurrence> {
        if record.name.is_empty() || record.date.is_empty() {
            return None;
        }

        let occurrence = parse_date(&record.date)
            .and_then(|(day, month)| next_occurrence(day, month, today));
        let occurrence = match occurrence {
            Ok(occurrence) => occurrence,
            Err(e) => {
                tracing::warn!(
                    record = %record.name,
                    row = record.row,
                    date = %record.date,
                    error = %e,
                    "Skipping record with invalid date"
                );
                return None;
            }
        };

        Self::is_due(occurrence.days_until, self.settings.window_days).then_some(occurrence)
    }

    async fn notify<S, C>(
        &self,
        record: &Record,
        occurrence: &Occurrence,
        store: &mut S,
        channel: &mut C,
    ) -> Result<Outcome, EngineError>
    where
        S: RecordStore + ?Sized,
        C: DeliveryChannel,
    {
        if ledger::already_sent(record.notified_years.as_deref(), occurrence.year) {
            tracing::debug!(
                record = %record.name,
                year = occurrence.year,
                "Already notified this year"
            );
            return Ok(Outcome::AlreadySent);
        }

        let body = compose_message(&record.name, &record.role, &occurrence.display_date());
        let mut delivered = false;
        for recipient in &self.settings.recipients {
            match channel.send(recipient, &body).await {
                Ok(_) => delivered = true,
                Err(e) => tracing::warn!(
                    record = %record.name,
                    recipient = %recipient,
                    error = %e,
                    "Recipient not reached"
                ),
            }
        }

        if !delivered {
            tracing::warn!(
                record = %record.name,
                row = record.row,
                recipients = self.settings.recipients.len(),
                "Notification not delivered to any recipient"
            );
            return Ok(Outcome::Undelivered);
        }

        let column = &self.settings.columns.notified_years;
        let marked = match ledger::mark_sent(store, column, record, occurrence.year).await {
            Ok(_) => true,
            Err(StoreError::MissingColumn(column)) => {
                return Err(EngineError::MissingLedgerColumn(column));
            }
            Err(e) => {
                tracing::error!(
                    record = %record.name,
                    row = record.row,
                    year = occurrence.year,
                    error = %e,
                    "Delivered but could not update ledger"
                );
                false
            }
        };

        tracing::info!(
            record = %record.name,
            days_until = occurrence.days_until,
            date = %occurrence.display_date(),
            "Notification delivered"
        );
        Ok(Outcome::Delivered { marked })
    }
}
