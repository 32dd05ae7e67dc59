//! The unit of work behind `GET /run`.

use async_trait::async_trait;
use chrono::Local;

use herald_common::config::AppConfig;
use herald_common::types::RunSummary;
use herald_engine::{EngineSettings, NotificationEngine};
use herald_notifier::launcher::WebDriverLauncher;
use herald_sheets::SheetsStore;

/// A complete notification run, started by the trigger.
#[async_trait]
pub trait RunJob: Send + Sync {
    async fn run(&self) -> anyhow::Result<RunSummary>;
}

/// Production job: Google Sheets records delivered over WhatsApp Web.
pub struct NotifyJob {
    config: AppConfig,
}

impl NotifyJob {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RunJob for NotifyJob {
    async fn run(&self) -> anyhow::Result<RunSummary> {
        let mut store = SheetsStore::from_config(&self.config).await?;
        let launcher = WebDriverLauncher::from_config(&self.config)?;
        let engine = NotificationEngine::new(EngineSettings::from_config(&self.config));

        let today = Local::now().date_naive();
        let summary = engine.run(&mut store, &launcher, today).await?;
        Ok(summary)
    }
}
