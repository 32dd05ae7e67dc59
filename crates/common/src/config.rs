use std::path::PathBuf;

use serde::Deserialize;

/// Header names of the four columns the engine reads from the worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnNames {
    pub name: String,
    pub role: String,
    pub date: String,
    /// Comma/whitespace separated list of years already notified.
    pub notified_years: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Nombre".to_string(),
            role: "Cargo".to_string(),
            date: "Fecha".to_string(),
            notified_years: "Enviado".to_string(),
        }
    }
}

impl ColumnNames {
    /// All required headers, in declaration order.
    pub fn required(&self) -> [&str; 4] {
        [
            self.name.as_str(),
            self.role.as_str(),
            self.date.as_str(),
            self.notified_years.as_str(),
        ]
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Google spreadsheet identifier
    pub spreadsheet_id: String,

    /// Worksheet title; the first worksheet is used when unset
    pub worksheet_name: Option<String>,

    /// Sheets API base URL (overridable for tests)
    pub sheets_api_url: String,

    /// Path of the service-account key file
    pub credentials_file: PathBuf,

    /// Service-account key contents, written to `credentials_file` at startup
    pub google_credentials_json: Option<String>,

    /// Pre-issued bearer token; when set the key file is not read
    pub sheets_access_token: Option<String>,

    /// Look-ahead window in days (default: 3 = today, tomorrow, day after)
    pub window_days: u32,

    /// Recipient phone numbers, contacted in this order
    pub recipients: Vec<String>,

    /// Wait after opening the channel before capturing the session proof
    pub session_settle_secs: u64,

    /// Wait after navigating to a chat before trying to send
    pub chat_settle_secs: u64,

    /// Pause after every recipient attempt
    pub recipient_pause_secs: u64,

    /// Wait after a send control was activated
    pub post_send_settle_ms: u64,

    /// aria-label of the channel's send button
    pub send_button_label: String,

    /// WebDriver (chromedriver) endpoint
    pub webdriver_url: String,

    /// Optional Chrome binary override passed to the WebDriver session
    pub chrome_binary: Option<String>,

    /// Directory holding the browser profile and the session proof
    pub persist_dir: PathBuf,

    /// Shared secret required as `?key=` on the run trigger, when set
    pub run_token: Option<String>,

    /// HTTP listen port
    pub port: u16,

    /// Worksheet header names
    pub columns: ColumnNames,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ColumnNames::default();

        let window_days: u32 = parse_or(&lookup, "NOTIFY_WINDOW_DAYS", 3)?;
        if window_days == 0 {
            anyhow::bail!("NOTIFY_WINDOW_DAYS must be at least 1");
        }

        Ok(Self {
            spreadsheet_id: non_empty("SPREADSHEET_ID")
                .ok_or_else(|| anyhow::anyhow!("SPREADSHEET_ID environment variable is required"))?,
            worksheet_name: non_empty("WORKSHEET_NAME"),
            sheets_api_url: lookup("SHEETS_API_URL")
                .unwrap_or_else(|| "https://sheets.googleapis.com/v4".to_string()),
            credentials_file: lookup("CREDENTIALS_FILE")
                .unwrap_or_else(|| "credentials.json".to_string())
                .into(),
            google_credentials_json: non_empty("GOOGLE_CREDENTIALS_JSON"),
            sheets_access_token: non_empty("SHEETS_ACCESS_TOKEN"),
            window_days,
            recipients: lookup("RECIPIENTS")
                .map(|raw| parse_recipients(&raw))
                .unwrap_or_default(),
            session_settle_secs: parse_or(&lookup, "SESSION_SETTLE_SECS", 12)?,
            chat_settle_secs: parse_or(&lookup, "CHAT_SETTLE_SECS", 8)?,
            recipient_pause_secs: parse_or(&lookup, "RECIPIENT_PAUSE_SECS", 2)?,
            post_send_settle_ms: parse_or(&lookup, "POST_SEND_SETTLE_MS", 1500)?,
            send_button_label: non_empty("SEND_BUTTON_LABEL")
                .unwrap_or_else(|| "Enviar".to_string()),
            webdriver_url: lookup("WEBDRIVER_URL")
                .unwrap_or_else(|| "http://localhost:9515".to_string()),
            chrome_binary: non_empty("CHROME_BINARY"),
            persist_dir: lookup("PERSIST_DIR")
                .unwrap_or_else(|| "/data".to_string())
                .into(),
            run_token: non_empty("RUN_TOKEN"),
            port: parse_or(&lookup, "PORT", 10000)?,
            columns: ColumnNames {
                name: non_empty("COLUMN_NAME").unwrap_or(defaults.name),
                role: non_empty("COLUMN_ROLE").unwrap_or(defaults.role),
                date: non_empty("COLUMN_DATE").unwrap_or(defaults.date),
                notified_years: non_empty("COLUMN_NOTIFIED").unwrap_or(defaults.notified_years),
            },
        })
    }

    /// Browser profile directory; holds the channel's login state between runs.
    pub fn profile_dir(&self) -> PathBuf {
        self.persist_dir.join("chrome-profile")
    }

    /// Well-known location of the latest session proof.
    pub fn session_proof_path(&self) -> PathBuf {
        self.persist_dir.join("qr.png")
    }
}

/// Split a comma-separated recipient list, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            anyhow::anyhow!(
                "{} must be a valid {}",
                key,
                std::any::type_name::<T>()
            )
        }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("SPREADSHEET_ID", "sheet-1")]).unwrap();
        assert_eq!(config.window_days, 3);
        assert_eq!(config.session_settle_secs, 12);
        assert_eq!(config.chat_settle_secs, 8);
        assert_eq!(config.recipient_pause_secs, 2);
        assert_eq!(config.port, 10000);
        assert!(config.recipients.is_empty());
        assert!(config.worksheet_name.is_none());
        assert!(config.run_token.is_none());
        assert!(config.sheets_access_token.is_none());
        assert_eq!(config.columns, ColumnNames::default());
        assert_eq!(config.session_proof_path(), PathBuf::from("/data/qr.png"));
        assert_eq!(config.profile_dir(), PathBuf::from("/data/chrome-profile"));
    }

    #[test]
    fn test_spreadsheet_id_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("SPREADSHEET_ID", "  ")]).is_err());
    }

    #[test]
    fn test_recipients_split_and_trimmed() {
        let config = config_from(&[
            ("SPREADSHEET_ID", "s"),
            ("RECIPIENTS", " 5215550001, ,5215550002 ,"),
        ])
        .unwrap();
        assert_eq!(config.recipients, vec!["5215550001", "5215550002"]);
    }

    #[test]
    fn test_invalid_number_rejected() {
        let err = config_from(&[("SPREADSHEET_ID", "s"), ("CHAT_SETTLE_SECS", "eight")])
            .unwrap_err();
        assert!(err.to_string().contains("CHAT_SETTLE_SECS"));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(config_from(&[("SPREADSHEET_ID", "s"), ("NOTIFY_WINDOW_DAYS", "0")]).is_err());
    }

    #[test]
    fn test_column_overrides() {
        let config = config_from(&[
            ("SPREADSHEET_ID", "s"),
            ("COLUMN_NAME", "Name"),
            ("COLUMN_NOTIFIED", "Notified"),
        ])
        .unwrap();
        assert_eq!(config.columns.name, "Name");
        assert_eq!(config.columns.role, "Cargo");
        assert_eq!(config.columns.notified_years, "Notified");
    }
}
