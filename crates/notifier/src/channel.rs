//! WhatsApp Web delivery channel over a single stateful browser session.
//!
//! Lifecycle:
//! `Unbootstrapped → SessionPending → SessionReady ⇄ Sending → Closed`
//!
//! The session is bootstrapped once per run. Each send navigates to a chat
//! deep link, waits for the composer to render, then tries the send button and
//! falls back to pressing Enter in the message box. Readiness is only ever
//! detected by timers; the channel never acknowledges delivery.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use herald_common::config::AppConfig;

use crate::error::{NotifierError, SendError};
use crate::webdriver::{BrowserDriver, ENTER_KEY};

/// Channel entry surface; opening it shows the QR code when logged out.
pub const WHATSAPP_HOME_URL: &str = "https://web.whatsapp.com/";

const WHATSAPP_SEND_URL: &str = "https://web.whatsapp.com/send";

const MESSAGE_BOX_XPATH: &str = "//div[@contenteditable='true' and starts-with(@data-tab,'1')]";

/// Session state of a delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Unbootstrapped,
    SessionPending,
    SessionReady,
    Sending,
    Closed,
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelState::Unbootstrapped => write!(f, "unbootstrapped"),
            ChannelState::SessionPending => write!(f, "session_pending"),
            ChannelState::SessionReady => write!(f, "session_ready"),
            ChannelState::Sending => write!(f, "sending"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// Which UI control delivered the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendAction {
    /// The labelled send button
    Primary,
    /// Enter key inside the message box
    Fallback,
}

/// A bootstrapped session that can deliver messages to recipients.
#[async_trait]
pub trait DeliveryChannel: Send {
    /// Deliver `body` to one recipient. "Delivered" only means a send control
    /// was activated.
    async fn send(&mut self, recipient: &str, body: &str) -> Result<SendAction, SendError>;

    /// Release the underlying session. Safe to call more than once.
    async fn close(&mut self);
}

/// Opens and bootstraps a fresh channel session.
#[async_trait]
pub trait ChannelLauncher: Send + Sync {
    type Channel: DeliveryChannel;

    async fn launch(&self) -> Result<Self::Channel, NotifierError>;
}

/// Fixed waits and UI details of the channel.
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// Wait after opening the entry surface, before capturing the session proof
    pub session_settle: Duration,
    /// Wait after navigating to a chat, before trying to send
    pub chat_settle: Duration,
    /// Pause after every recipient attempt, successful or not
    pub recipient_pause: Duration,
    /// Wait after a send control was activated
    pub post_send_settle: Duration,
    /// aria-label of the send button
    pub send_button_label: String,
    /// Where the session proof screenshot is written
    pub session_proof_path: PathBuf,
}

impl ChannelSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            session_settle: Duration::from_secs(config.session_settle_secs),
            chat_settle: Duration::from_secs(config.chat_settle_secs),
            recipient_pause: Duration::from_secs(config.recipient_pause_secs),
            post_send_settle: Duration::from_millis(config.post_send_settle_ms),
            send_button_label: config.send_button_label.clone(),
            session_proof_path: config.session_proof_path(),
        }
    }

    fn send_button_xpath(&self) -> String {
        format!("//button[@aria-label='{}']", self.send_button_label)
    }
}

/// Build the chat deep link for one recipient and message.
pub fn deep_link(recipient: &str, body: &str) -> String {
    format!(
        "{}?phone={}&text={}",
        WHATSAPP_SEND_URL,
        urlencoding::encode(recipient),
        urlencoding::encode(body)
    )
}

/// WhatsApp Web session driven through a browser.
#[derive(Debug)]
pub struct WhatsAppChannel<D> {
    driver: D,
    settings: ChannelSettings,
    state: ChannelState,
}

impl<D: BrowserDriver> WhatsAppChannel<D> {
    pub fn new(driver: D, settings: ChannelSettings) -> Self {
        Self {
            driver,
            settings,
            state: ChannelState::Unbootstrapped,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Open the entry surface, let it settle and capture the session proof.
    ///
    /// Navigation failure is fatal. Proof capture failure is logged only.
    pub async fn bootstrap(&mut self) -> Result<(), NotifierError> {
        if self.state != ChannelState::Unbootstrapped {
            return Err(NotifierError::InvalidState {
                expected: ChannelState::Unbootstrapped,
                found: self.state,
            });
        }

        self.driver.navigate(WHATSAPP_HOME_URL).await?;
        self.state = ChannelState::SessionPending;
        tracing::debug!(
            settle_ms = self.settings.session_settle.as_millis() as u64,
            "Waiting for channel session to settle"
        );
        tokio::time::sleep(self.settings.session_settle).await;

        if let Err(e) = self.capture_session_proof().await {
            tracing::warn!(
                error = %e,
                path = %self.settings.session_proof_path.display(),
                "Could not capture session proof"
            );
        }

        self.state = ChannelState::SessionReady;
        tracing::info!("Channel session ready");
        Ok(())
    }

    async fn capture_session_proof(&mut self) -> Result<(), NotifierError> {
        let png = self.driver.screenshot().await?;
        let path = &self.settings.session_proof_path;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, png).await?;
        tracing::info!(path = %path.display(), "Session proof captured");
        Ok(())
    }

    /// Navigate to the chat and activate the primary, then the fallback control.
    async fn attempt(&mut self, recipient: &str, body: &str) -> Result<SendAction, SendError> {
        self.driver
            .navigate(&deep_link(recipient, body))
            .await
            .map_err(SendError::Navigation)?;
        tokio::time::sleep(self.settings.chat_settle).await;

        let button = self.settings.send_button_xpath();
        let primary = match self.driver.find_element(&button).await {
            Ok(element) => self.driver.click(&element).await,
            Err(e) => Err(e),
        };
        let action = match primary {
            Ok(()) => SendAction::Primary,
            Err(primary) => {
                tracing::debug!(recipient, error = %primary, "Send button unavailable, pressing Enter");
                let fallback = match self.driver.find_element(MESSAGE_BOX_XPATH).await {
                    Ok(element) => self.driver.send_keys(&element, ENTER_KEY).await,
                    Err(e) => Err(e),
                };
                match fallback {
                    Ok(()) => SendAction::Fallback,
                    Err(fallback) => return Err(SendError::NoSendControl { primary, fallback }),
                }
            }
        };

        tokio::time::sleep(self.settings.post_send_settle).await;
        Ok(action)
    }
}

#[async_trait]
impl<D: BrowserDriver> DeliveryChannel for WhatsAppChannel<D> {
    async fn send(&mut self, recipient: &str, body: &str) -> Result<SendAction, SendError> {
        if self.state != ChannelState::SessionReady {
            return Err(SendError::InvalidState(self.state));
        }

        self.state = ChannelState::Sending;
        let result = self.attempt(recipient, body).await;
        self.state = ChannelState::SessionReady;

        match &result {
            Ok(action) => tracing::info!(recipient, action = ?action, "Message sent"),
            Err(e) => tracing::warn!(recipient, error = %e, "Message not sent"),
        }

        tokio::time::sleep(self.settings.recipient_pause).await;
        result
    }

    async fn close(&mut self) {
        if self.state == ChannelState::Closed {
            return;
        }
        if let Err(e) = self.driver.quit().await {
            tracing::warn!(error = %e, "Failed to close browser session");
        }
        self.state = ChannelState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::webdriver::ElementId;

    /// Scripted browser: records every call, fails on demand.
    #[derive(Default)]
    struct FakeDriver {
        calls: Vec<String>,
        screenshot_at: Option<tokio::time::Instant>,
        missing: HashSet<String>,
        fail_navigation: bool,
        fail_screenshot: bool,
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn navigate(&mut self, url: &str) -> Result<(), NotifierError> {
            self.calls.push(format!("navigate {}", url));
            if self.fail_navigation {
                return Err(NotifierError::Protocol("timeout".to_string()));
            }
            Ok(())
        }

        async fn find_element(&mut self, xpath: &str) -> Result<ElementId, NotifierError> {
            self.calls.push(format!("find {}", xpath));
            if self.missing.contains(xpath) {
                return Err(NotifierError::WebDriver {
                    error: "no such element".to_string(),
                    message: xpath.to_string(),
                });
            }
            Ok(ElementId(xpath.to_string()))
        }

        async fn click(&mut self, element: &ElementId) -> Result<(), NotifierError> {
            self.calls.push(format!("click {}", element.0));
            Ok(())
        }

        async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<(), NotifierError> {
            self.calls
                .push(format!("keys {} {}", element.0, text.escape_unicode()));
            Ok(())
        }

        async fn screenshot(&mut self) -> Result<Vec<u8>, NotifierError> {
            self.calls.push("screenshot".to_string());
            self.screenshot_at = Some(tokio::time::Instant::now());
            if self.fail_screenshot {
                return Err(NotifierError::Protocol("no screen".to_string()));
            }
            Ok(b"\x89PNG".to_vec())
        }

        async fn quit(&mut self) -> Result<(), NotifierError> {
            self.calls.push("quit".to_string());
            Ok(())
        }
    }

    fn settings(proof: PathBuf) -> ChannelSettings {
        ChannelSettings {
            session_settle: Duration::ZERO,
            chat_settle: Duration::ZERO,
            recipient_pause: Duration::ZERO,
            post_send_settle: Duration::ZERO,
            send_button_label: "Enviar".to_string(),
            session_proof_path: proof,
        }
    }

    fn timed_settings(proof: PathBuf) -> ChannelSettings {
        ChannelSettings {
            session_settle: Duration::from_secs(12),
            chat_settle: Duration::from_secs(8),
            recipient_pause: Duration::from_secs(2),
            post_send_settle: Duration::from_millis(1500),
            ..settings(proof)
        }
    }

    async fn ready_channel(driver: FakeDriver, dir: &tempfile::TempDir) -> WhatsAppChannel<FakeDriver> {
        let mut channel = WhatsAppChannel::new(driver, settings(dir.path().join("qr.png")));
        channel.bootstrap().await.unwrap();
        channel
    }

    #[test]
    fn test_deep_link_escapes_body() {
        let link = deep_link("5215550001", "Hola *Ana*\n05/03/2024");
        assert_eq!(
            link,
            "https://web.whatsapp.com/send?phone=5215550001&text=Hola%20%2AAna%2A%0A05%2F03%2F2024"
        );
    }

    #[tokio::test]
    async fn test_bootstrap_captures_proof() {
        let dir = tempfile::tempdir().unwrap();
        let channel = ready_channel(FakeDriver::default(), &dir).await;

        assert_eq!(channel.state(), ChannelState::SessionReady);
        assert_eq!(channel.driver.calls[0], format!("navigate {}", WHATSAPP_HOME_URL));
        assert_eq!(std::fs::read(dir.path().join("qr.png")).unwrap(), b"\x89PNG");
    }

    #[tokio::test]
    async fn test_bootstrap_survives_proof_failure() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver {
            fail_screenshot: true,
            ..Default::default()
        };
        let channel = ready_channel(driver, &dir).await;

        assert_eq!(channel.state(), ChannelState::SessionReady);
        assert!(!dir.path().join("qr.png").exists());
    }

    #[tokio::test]
    async fn test_bootstrap_navigation_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let driver = FakeDriver {
            fail_navigation: true,
            ..Default::default()
        };
        let mut channel = WhatsAppChannel::new(driver, settings(dir.path().join("qr.png")));

        assert!(channel.bootstrap().await.is_err());
        assert_eq!(channel.state(), ChannelState::Unbootstrapped);
    }

    #[tokio::test]
    async fn test_bootstrap_only_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ready_channel(FakeDriver::default(), &dir).await;

        let err = channel.bootstrap().await.unwrap_err();
        assert!(matches!(
            err,
            NotifierError::InvalidState {
                found: ChannelState::SessionReady,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_send_uses_primary_button() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ready_channel(FakeDriver::default(), &dir).await;

        let action = channel.send("5215550001", "hola").await.unwrap();

        assert_eq!(action, SendAction::Primary);
        assert_eq!(channel.state(), ChannelState::SessionReady);
        let calls = &channel.driver.calls;
        assert!(calls.contains(&"click //button[@aria-label='Enviar']".to_string()));
        assert!(!calls.iter().any(|c| c.starts_with("keys")));
    }

    #[tokio::test]
    async fn test_send_falls_back_to_enter() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = FakeDriver::default();
        driver
            .missing
            .insert("//button[@aria-label='Enviar']".to_string());
        let mut channel = ready_channel(driver, &dir).await;

        let action = channel.send("5215550001", "hola").await.unwrap();

        assert_eq!(action, SendAction::Fallback);
        let last = channel.driver.calls.last().unwrap();
        assert!(last.starts_with(&format!("keys {}", MESSAGE_BOX_XPATH)));
        assert!(last.ends_with("\\u{e007}"));
    }

    #[tokio::test]
    async fn test_send_fails_without_controls() {
        let dir = tempfile::tempdir().unwrap();
        let mut driver = FakeDriver::default();
        driver
            .missing
            .insert("//button[@aria-label='Enviar']".to_string());
        driver.missing.insert(MESSAGE_BOX_XPATH.to_string());
        let mut channel = ready_channel(driver, &dir).await;

        let err = channel.send("5215550001", "hola").await.unwrap_err();

        assert!(matches!(err, SendError::NoSendControl { .. }));
        // A failed recipient leaves the session usable.
        assert_eq!(channel.state(), ChannelState::SessionReady);
    }

    #[tokio::test]
    async fn test_send_navigation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ready_channel(FakeDriver::default(), &dir).await;
        channel.driver.fail_navigation = true;

        let err = channel.send("5215550001", "hola").await.unwrap_err();
        assert!(matches!(err, SendError::Navigation(_)));
        assert_eq!(channel.state(), ChannelState::SessionReady);
    }

    #[tokio::test]
    async fn test_send_requires_ready_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel =
            WhatsAppChannel::new(FakeDriver::default(), settings(dir.path().join("qr.png")));

        let err = channel.send("5215550001", "hola").await.unwrap_err();
        assert!(matches!(
            err,
            SendError::InvalidState(ChannelState::Unbootstrapped)
        ));
        assert!(channel.driver.calls.is_empty());
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut channel = ready_channel(FakeDriver::default(), &dir).await;

        channel.close().await;
        channel.close().await;

        assert_eq!(channel.state(), ChannelState::Closed);
        let quits = channel.driver.calls.iter().filter(|c| *c == "quit").count();
        assert_eq!(quits, 1);
        assert!(matches!(
            channel.send("5215550001", "hola").await,
            Err(SendError::InvalidState(ChannelState::Closed))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bootstrap_settles_before_proof() {
        let dir = tempfile::tempdir().unwrap();
        let settings = timed_settings(dir.path().join("qr.png"));
        let mut channel = WhatsAppChannel::new(FakeDriver::default(), settings.clone());

        let start = tokio::time::Instant::now();
        channel.bootstrap().await.unwrap();

        let shot = channel.driver.screenshot_at.unwrap();
        assert!(shot - start >= settings.session_settle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivered_send_waits_every_delay() {
        let dir = tempfile::tempdir().unwrap();
        let settings = timed_settings(dir.path().join("qr.png"));
        let mut channel = ready_channel(FakeDriver::default(), &dir).await;
        channel.settings = settings.clone();

        let start = tokio::time::Instant::now();
        channel.send("5215550001", "hola").await.unwrap();

        assert!(
            start.elapsed()
                >= settings.chat_settle + settings.post_send_settle + settings.recipient_pause
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_send_still_pauses_before_next_recipient() {
        let dir = tempfile::tempdir().unwrap();
        let settings = timed_settings(dir.path().join("qr.png"));
        let mut driver = FakeDriver::default();
        driver
            .missing
            .insert("//button[@aria-label='Enviar']".to_string());
        driver.missing.insert(MESSAGE_BOX_XPATH.to_string());
        let mut channel = ready_channel(driver, &dir).await;
        channel.settings = settings.clone();

        let start = tokio::time::Instant::now();
        let err = channel.send("5215550001", "hola").await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, SendError::NoSendControl { .. }));
        assert!(elapsed >= settings.chat_settle + settings.recipient_pause);
        // No post-send settle after a failed attempt.
        assert!(elapsed < settings.chat_settle + settings.recipient_pause + settings.post_send_settle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_failure_still_pauses() {
        let dir = tempfile::tempdir().unwrap();
        let settings = timed_settings(dir.path().join("qr.png"));
        let mut channel = ready_channel(FakeDriver::default(), &dir).await;
        channel.settings = settings.clone();
        channel.driver.fail_navigation = true;

        let start = tokio::time::Instant::now();
        assert!(channel.send("5215550001", "hola").await.is_err());

        let elapsed = start.elapsed();
        assert!(elapsed >= settings.recipient_pause);
        assert!(elapsed < settings.chat_settle);
    }
}
