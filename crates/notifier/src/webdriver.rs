//! Minimal W3C WebDriver client.
//!
//! Only the commands the channel needs: new session, navigate, find element
//! by XPath, click, send keys, screenshot and delete session. Every response
//! is wrapped in `{"value": ...}`; failures carry `value.error` and
//! `value.message`.

use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Method};
use serde_json::{Value, json};

use crate::error::NotifierError;

/// Key under which WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// WebDriver code point for the Enter key.
pub const ENTER_KEY: &str = "\u{E007}";

/// Opaque element reference returned by `find_element`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

/// Browser operations the delivery channel relies on.
#[async_trait]
pub trait BrowserDriver: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), NotifierError>;

    async fn find_element(&mut self, xpath: &str) -> Result<ElementId, NotifierError>;

    async fn click(&mut self, element: &ElementId) -> Result<(), NotifierError>;

    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<(), NotifierError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&mut self) -> Result<Vec<u8>, NotifierError>;

    /// End the browser session.
    async fn quit(&mut self) -> Result<(), NotifierError>;
}

/// Chrome launch options for a new session.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// Persistent profile; keeps the channel logged in between runs
    pub profile_dir: PathBuf,
    pub binary: Option<String>,
    pub headless: bool,
}

impl ChromeOptions {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            binary: None,
            headless: true,
        }
    }

    pub fn with_binary(mut self, binary: Option<String>) -> Self {
        self.binary = binary;
        self
    }

    /// Capabilities payload for `POST /session`.
    pub fn capabilities(&self) -> Value {
        let mut args = vec![
            format!("--user-data-dir={}", self.profile_dir.display()),
            "--profile-directory=Default".to_string(),
            "--window-size=1280,900".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut chrome = json!({ "args": args });
        if let Some(binary) = &self.binary {
            chrome["binary"] = json!(binary);
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome
                }
            }
        })
    }
}

/// A live WebDriver session.
#[derive(Debug)]
pub struct WebDriverSession {
    http: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Create a new browser session on the WebDriver server at `base_url`.
    pub async fn start(
        http: Client,
        base_url: &str,
        options: &ChromeOptions,
    ) -> Result<Self, NotifierError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let url = format!("{}/session", base_url);
        let response = http.post(&url).json(&options.capabilities()).send().await?;
        let value = unwrap_value(response).await?;

        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| NotifierError::Protocol("new session without sessionId".to_string()))?
            .to_string();

        tracing::info!(session_id = %session_id, "WebDriver session started");

        Ok(Self {
            http,
            base_url,
            session_id,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Issue a session-scoped command and return its `value`.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, NotifierError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        unwrap_value(response).await
    }
}

#[async_trait]
impl BrowserDriver for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), NotifierError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find_element(&mut self, xpath: &str) -> Result<ElementId, NotifierError> {
        let value = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "xpath", "value": xpath })),
            )
            .await?;

        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(|id| ElementId(id.to_string()))
            .ok_or_else(|| NotifierError::Protocol(format!("element reference missing: {}", value)))
    }

    async fn click(&mut self, element: &ElementId) -> Result<(), NotifierError> {
        let path = format!("/element/{}/click", element.0);
        self.command(Method::POST, &path, Some(json!({}))).await?;
        Ok(())
    }

    async fn send_keys(&mut self, element: &ElementId, text: &str) -> Result<(), NotifierError> {
        let path = format!("/element/{}/value", element.0);
        self.command(Method::POST, &path, Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>, NotifierError> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| NotifierError::Protocol("screenshot is not a string".to_string()))?;
        STANDARD
            .decode(encoded)
            .map_err(|e| NotifierError::Protocol(format!("invalid screenshot encoding: {}", e)))
    }

    async fn quit(&mut self) -> Result<(), NotifierError> {
        self.command(Method::DELETE, "", None).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}

/// Extract `value` from a WebDriver response, mapping error payloads.
async fn unwrap_value(response: reqwest::Response) -> Result<Value, NotifierError> {
    let status = response.status();
    let body: Value = response.json().await?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let error = field("error");
        return Err(NotifierError::WebDriver {
            error: if error.is_empty() {
                status.to_string()
            } else {
                error
            },
            message: field("message"),
        });
    }

    Ok(value)
}
