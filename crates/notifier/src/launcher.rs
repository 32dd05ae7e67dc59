use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use herald_common::config::AppConfig;

use crate::channel::{ChannelLauncher, ChannelSettings, DeliveryChannel, WhatsAppChannel};
use crate::error::NotifierError;
use crate::webdriver::{ChromeOptions, WebDriverSession};

/// Upper bound for a single WebDriver command (page loads included).
const COMMAND_TIMEOUT: Duration = Duration::from_secs(90);

/// Launches Chrome through a WebDriver server and bootstraps WhatsApp Web.
pub struct WebDriverLauncher {
    http: Client,
    webdriver_url: String,
    options: ChromeOptions,
    settings: ChannelSettings,
}

impl WebDriverLauncher {
    pub fn new(
        webdriver_url: impl Into<String>,
        options: ChromeOptions,
        settings: ChannelSettings,
    ) -> Result<Self, NotifierError> {
        let http = Client::builder().timeout(COMMAND_TIMEOUT).build()?;
        Ok(Self {
            http,
            webdriver_url: webdriver_url.into(),
            options,
            settings,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, NotifierError> {
        let options =
            ChromeOptions::new(config.profile_dir()).with_binary(config.chrome_binary.clone());
        Self::new(
            config.webdriver_url.clone(),
            options,
            ChannelSettings::from_config(config),
        )
    }
}

#[async_trait]
impl ChannelLauncher for WebDriverLauncher {
    type Channel = WhatsAppChannel<WebDriverSession>;

    async fn launch(&self) -> Result<Self::Channel, NotifierError> {
        let session =
            WebDriverSession::start(self.http.clone(), &self.webdriver_url, &self.options).await?;
        let session_id = session.session_id().to_string();
        let mut channel = WhatsAppChannel::new(session, self.settings.clone());

        if let Err(e) = channel.bootstrap().await {
            tracing::warn!(
                session_id = %session_id,
                error = %e,
                "Channel bootstrap failed, closing browser session"
            );
            channel.close().await;
            return Err(e);
        }

        Ok(channel)
    }
}
