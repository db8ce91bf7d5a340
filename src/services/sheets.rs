//! Google Sheets service implementation
//!
//! This service appends completed registrations as rows to the first
//! worksheet of a spreadsheet. It authenticates with a service-account key
//! using the OAuth2 JWT-bearer flow and talks to the Sheets v4 and Drive v3
//! REST APIs directly.

use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};
use crate::config::GoogleConfig;
use crate::state::RegistrationRecord;
use crate::utils::errors::{SheetsError, SheetsResult};

const SCOPES: &str = "https://spreadsheets.google.com/feeds https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";
const TOKEN_LIFETIME_SECONDS: i64 = 3600;
/// Tokens this close to expiry are refreshed before use
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 60;

/// Destination for completed registrations
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Append one record as a single row
    async fn append_record(&self, record: &RegistrationRecord) -> SheetsResult<()>;
}

/// The subset of a Google service-account key file we need
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    /// Read a service-account key from a JSON file
    pub async fn from_file(path: impl AsRef<Path>) -> SheetsResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            SheetsError::Credentials(format!("cannot read {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| SheetsError::Credentials(format!("invalid key file {}: {}", path.display(), e)))
    }
}

/// JWT claims for the service-account assertion
#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    TOKEN_LIFETIME_SECONDS
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at - chrono::Duration::seconds(TOKEN_REFRESH_MARGIN_SECONDS) > Utc::now()
    }
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

/// Spreadsheet and worksheet rows are appended to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_title: String,
}

/// Google Sheets client for registration rows
pub struct SheetsService {
    client: Client,
    config: GoogleConfig,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    token: Mutex<Option<AccessToken>>,
    target: OnceCell<SheetTarget>,
}

impl SheetsService {
    /// Create a new SheetsService, loading the key file named in the configuration
    pub async fn new(config: GoogleConfig) -> SheetsResult<Self> {
        let key = ServiceAccountKey::from_file(&config.service_account_path).await?;
        Self::with_key(config, key)
    }

    /// Create a new SheetsService from an already loaded key
    pub fn with_key(config: GoogleConfig, key: ServiceAccountKey) -> SheetsResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("invalid private key: {}", e)))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("RegBot/1.0")
            .build()
            .map_err(|e| SheetsError::Http(e.to_string()))?;

        info!(client_email = %key.client_email, "Google Sheets client configured");

        Ok(Self {
            client,
            config,
            key,
            encoding_key,
            token: Mutex::new(None),
            target: OnceCell::new(),
        })
    }

    /// Append a row of cell values to the first worksheet
    pub async fn append_row(&self, row: Vec<Value>) -> SheetsResult<()> {
        let target = self.target().await?;
        let token = self.access_token().await?;

        let range = format!("'{}'", target.sheet_title.replace('\'', "''"));
        let url = format!(
            "{}/v4/spreadsheets/{}/values/{}:append",
            self.config.sheets_api_url,
            target.spreadsheet_id,
            urlencoding::encode(&range)
        );

        debug!(spreadsheet_id = %target.spreadsheet_id, sheet = %target.sheet_title, "Appending row");

        let response = self.client
            .post(&url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }))
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(())
    }

    /// Spreadsheet and worksheet rows go to, resolved on first use
    pub async fn target(&self) -> SheetsResult<&SheetTarget> {
        self.target.get_or_try_init(|| self.resolve_target()).await
    }

    async fn resolve_target(&self) -> SheetsResult<SheetTarget> {
        let spreadsheet_id = match self.config.spreadsheet_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.find_spreadsheet_by_name(&self.config.spreadsheet_name).await?,
        };
        let sheet_title = self.first_sheet_title(&spreadsheet_id).await?;

        info!(spreadsheet_id = %spreadsheet_id, sheet = %sheet_title, "Resolved registration sheet");
        Ok(SheetTarget { spreadsheet_id, sheet_title })
    }

    async fn find_spreadsheet_by_name(&self, name: &str) -> SheetsResult<String> {
        let token = self.access_token().await?;
        let escaped = name.replace('\\', "\\\\").replace('\'', "\\'");
        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escaped, SPREADSHEET_MIME_TYPE
        );
        let url = format!("{}/drive/v3/files", self.config.drive_api_url);

        let response = self.client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)"), ("pageSize", "1")])
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("Drive lookup HTTP {}: {}", status, error_text)));
        }

        let list: DriveFileList = response.json().await
            .map_err(|e| SheetsError::Api(format!("invalid Drive response: {}", e)))?;

        list.files
            .into_iter()
            .next()
            .map(|file| file.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(name.to_string()))
    }

    async fn first_sheet_title(&self, spreadsheet_id: &str) -> SheetsResult<String> {
        let token = self.access_token().await?;
        let url = format!("{}/v4/spreadsheets/{}", self.config.sheets_api_url, spreadsheet_id);

        let response = self.client
            .get(&url)
            .bearer_auth(&token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await
            .map_err(http_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SheetsError::SpreadsheetNotFound(spreadsheet_id.to_string()));
        }
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let metadata: SpreadsheetMetadata = response.json().await
            .map_err(|e| SheetsError::Api(format!("invalid spreadsheet metadata: {}", e)))?;

        metadata.sheets
            .into_iter()
            .next()
            .map(|sheet| sheet.properties.title)
            .ok_or_else(|| SheetsError::Api(format!("spreadsheet {} has no worksheets", spreadsheet_id)))
    }

    /// Current access token, exchanging a fresh assertion when needed
    async fn access_token(&self) -> SheetsResult<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let token = self.fetch_access_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn fetch_access_token(&self) -> SheetsResult<AccessToken> {
        let now = Utc::now();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPES,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + TOKEN_LIFETIME_SECONDS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| SheetsError::Auth(format!("cannot sign assertion: {}", e)))?;

        debug!(token_uri = %self.key.token_uri, "Requesting Google access token");

        let response = self.client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(SheetsError::Auth(format!("HTTP {}: {}", status, error_text)));
        }

        let token: TokenResponse = response.json().await
            .map_err(|e| SheetsError::Auth(format!("invalid token response: {}", e)))?;

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + chrono::Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl RecordSink for SheetsService {
    async fn append_record(&self, record: &RegistrationRecord) -> SheetsResult<()> {
        self.append_row(record.to_row()).await
    }
}

impl std::fmt::Debug for SheetsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsService")
            .field("client_email", &self.key.client_email)
            .field("spreadsheet_name", &self.config.spreadsheet_name)
            .finish_non_exhaustive()
    }
}

fn http_error(e: reqwest::Error) -> SheetsError {
    if e.is_timeout() {
        SheetsError::Http("request timed out".to_string())
    } else {
        SheetsError::Http(e.to_string())
    }
}
