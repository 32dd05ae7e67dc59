use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};

use herald_common::config::AppConfig;
use herald_common::types::Table;
use herald_engine::store::{RecordStore, StoreError};

use crate::auth::{Credentials, ServiceAccountKey, TokenSource};
use crate::error::SheetsError;

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// One worksheet of a Google spreadsheet, accessed through the Sheets API v4.
pub struct SheetsStore {
    http: Client,
    base_url: String,
    spreadsheet_id: String,
    /// Worksheet title; resolved to the first worksheet when not configured
    worksheet: Option<String>,
    tokens: TokenSource,
}

impl SheetsStore {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        spreadsheet_id: impl Into<String>,
        worksheet: Option<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            tokens: TokenSource::new(http.clone(), credentials),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            worksheet,
        }
    }

    /// Build a store from configuration. A configured access token wins over
    /// the service-account key file.
    pub async fn from_config(config: &AppConfig) -> Result<Self, SheetsError> {
        let credentials = match &config.sheets_access_token {
            Some(token) => Credentials::Token(token.clone()),
            None => {
                let key = ServiceAccountKey::from_file(&config.credentials_file).await?;
                Credentials::ServiceAccount(key)
            }
        };
        Ok(Self::new(
            Client::new(),
            config.sheets_api_url.clone(),
            config.spreadsheet_id.clone(),
            config.worksheet_name.clone(),
            credentials,
        ))
    }

    async fn authorized(&mut self, request: RequestBuilder) -> Result<RequestBuilder, SheetsError> {
        let token = self.tokens.access_token().await?;
        Ok(request.bearer_auth(token))
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &mut self,
        request: RequestBuilder,
    ) -> Result<T, SheetsError> {
        let response = self.authorized(request).await?.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("no error message")
                .to_string();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }

    fn spreadsheet_url(&self) -> String {
        format!("{}/spreadsheets/{}", self.base_url, self.spreadsheet_id)
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/values/{}",
            self.spreadsheet_url(),
            urlencoding::encode(range)
        )
    }

    /// Configured worksheet title, or the first worksheet's.
    async fn worksheet_title(&mut self) -> Result<String, SheetsError> {
        if let Some(title) = &self.worksheet {
            return Ok(title.clone());
        }

        let request = self
            .http
            .get(self.spreadsheet_url())
            .query(&[("fields", "sheets.properties.title")]);
        let meta: SpreadsheetMeta = self.send(request).await?;
        let title = meta
            .sheets
            .into_iter()
            .next()
            .map(|s| s.properties.title)
            .ok_or(SheetsError::NoWorksheet)?;

        tracing::debug!(worksheet = %title, "Using first worksheet");
        self.worksheet = Some(title.clone());
        Ok(title)
    }

    async fn get_values(&mut self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let request = self
            .http
            .get(self.values_url(range))
            .query(&[("valueRenderOption", "FORMATTED_VALUE")]);
        let range: ValueRange = self.send(request).await?;
        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// A1 reference of `column` on `row`, looked up in the current header row.
    async fn cell_range(&mut self, row: u32, column: &str) -> Result<String, SheetsError> {
        let sheet = quote_sheet(&self.worksheet_title().await?);
        let headers = self
            .get_values(&format!("{}!1:1", sheet))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        let index = headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| SheetsError::MissingColumn(column.to_string()))?;

        Ok(format!("{}!{}{}", sheet, column_letter(index), row))
    }
}

#[async_trait]
impl RecordStore for SheetsStore {
    async fn load(&mut self) -> Result<Table, StoreError> {
        let sheet = quote_sheet(&self.worksheet_title().await?);
        let mut rows = self.get_values(&sheet).await?.into_iter();
        let table = Table {
            headers: rows.next().unwrap_or_default(),
            rows: rows.collect(),
        };

        tracing::info!(
            spreadsheet_id = %self.spreadsheet_id,
            rows = table.rows.len(),
            "Worksheet loaded"
        );
        Ok(table)
    }

    async fn read_cell(&mut self, row: u32, column: &str) -> Result<Option<String>, StoreError> {
        let range = self.cell_range(row, column).await?;
        let value = self
            .get_values(&range)
            .await?
            .into_iter()
            .next()
            .and_then(|r| r.into_iter().next())
            .filter(|v| !v.is_empty());
        Ok(value)
    }

    async fn write_cell(&mut self, row: u32, column: &str, value: &str) -> Result<(), StoreError> {
        let range = self.cell_range(row, column).await?;
        let request = self
            .http
            .put(self.values_url(&range))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": [[value]],
            }));
        let _: Value = self.send(request).await?;

        tracing::debug!(range = %range, value, "Cell updated");
        Ok(())
    }
}

/// Render a cell as text; numbers and booleans keep their literal form.
fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Quote a worksheet title for use in an A1 range.
pub fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Zero-based column index to A1 letters (`0 → A`, `26 → AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}
