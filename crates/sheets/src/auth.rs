//! Service-account OAuth2 for the Sheets API.
//!
//! A signed RS256 JWT assertion is exchanged at the key's `token_uri` for a
//! short-lived bearer token, which is cached until shortly before it expires.

use std::path::Path;

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

/// Read/write access to spreadsheets.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the cached token expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The parts of a Google service-account key file we use.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, SheetsError> {
        serde_json::from_str(json).map_err(|e| SheetsError::Credentials(e.to_string()))
    }

    pub async fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}

/// How requests are authorized.
#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    /// Pre-issued bearer token, used as-is
    Token(String),
}

/// JWT assertion claims for the service-account grant.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Hands out bearer tokens, exchanging a new assertion when needed.
pub struct TokenSource {
    http: Client,
    credentials: Credentials,
    cached: Option<(String, i64)>,
}

impl TokenSource {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self {
            http,
            credentials,
            cached: None,
        }
    }

    pub async fn access_token(&mut self) -> Result<String, SheetsError> {
        let key = match &self.credentials {
            Credentials::Token(token) => return Ok(token.clone()),
            Credentials::ServiceAccount(key) => key,
        };

        let now = Utc::now().timestamp();
        if let Some((token, expires_at)) = &self.cached
            && *expires_at - EXPIRY_MARGIN_SECS > now
        {
            return Ok(token.clone());
        }

        let assertion = sign_assertion(key, SHEETS_SCOPE)?;
        let response = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = now + token.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        tracing::debug!(
            client_email = %key.client_email,
            expires_at,
            "Obtained Sheets access token"
        );
        self.cached = Some((token.access_token.clone(), expires_at));
        Ok(token.access_token)
    }
}

/// Build and sign the RS256 assertion for `scope`.
pub fn sign_assertion(key: &ServiceAccountKey, scope: &str) -> Result<String, SheetsError> {
    let now = Utc::now();
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
    };

    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &signing_key)?)
}
