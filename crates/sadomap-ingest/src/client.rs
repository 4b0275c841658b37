//! HTTP client for the Google Sheets `values.get` endpoint.
//!
//! Wraps `reqwest` with credential management and typed response decoding.
//! Credentials are checked when the client is built, so a misconfigured
//! deployment fails before any request is sent.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use sadomap_core::{AppConfig, AreaConfig, ConfigError};

use crate::error::IngestError;
use crate::source::SourceReader;
use crate::types::{SheetData, ValueRange};

/// Longest error body kept in [`IngestError::Network`].
const MAX_ERROR_BODY: usize = 512;

/// Client for one spreadsheet.
///
/// Use [`SheetsClient::from_config`] for production or
/// [`SheetsClient::with_base_url`] to point at a mock server in tests.
pub struct SheetsClient {
    client: Client,
    api_key: String,
    spreadsheet_id: String,
    base_url: Url,
}

impl std::fmt::Debug for SheetsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetsClient")
            .field("api_key", &"[redacted]")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl SheetsClient {
    /// Creates a client from the loaded application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`SheetsClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, IngestError> {
        Self::with_base_url(
            config.sheets_api_key.as_deref(),
            config.spreadsheet_id.as_deref(),
            config.request_timeout_secs,
            &config.user_agent,
            &config.sheets_base_url,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// - [`IngestError::Config`] if a credential is absent or `base_url` is
    ///   not a valid URL.
    /// - [`IngestError::Http`] if the underlying `reqwest::Client` cannot be
    ///   constructed.
    pub fn with_base_url(
        api_key: Option<&str>,
        spreadsheet_id: Option<&str>,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, IngestError> {
        let api_key = require(api_key, "SADOMAP_SHEETS_API_KEY")?;
        let spreadsheet_id = require(spreadsheet_id, "SADOMAP_SPREADSHEET_ID")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so path segments are appended, not
        // substituted for the last one.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            ConfigError::Validation(format!("invalid sheets base URL '{base_url}': {e}"))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::Validation(format!(
                "sheets base URL '{base_url}' cannot carry a path"
            ))
            .into());
        }

        Ok(Self {
            client,
            api_key,
            spreadsheet_id,
            base_url,
        })
    }

    /// Fetches every populated cell of `sheet` and splits off the header row.
    ///
    /// # Errors
    ///
    /// - [`IngestError::Network`] on a non-2xx status (with a truncated body).
    /// - [`IngestError::Http`] on network failure.
    /// - [`IngestError::Deserialize`] if the body is not a value range.
    pub async fn fetch_values(&self, sheet: &str) -> Result<SheetData, IngestError> {
        let url = self.values_url(sheet);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Network {
                status: status.as_u16(),
                url: redact_key(&url),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        let body = response.text().await?;
        let range: ValueRange =
            serde_json::from_str(&body).map_err(|e| IngestError::Deserialize {
                context: format!("values(sheet={sheet})"),
                source: e,
            })?;

        let data = range.into_sheet();
        tracing::debug!(sheet, rows = data.rows.len(), "fetched sheet values");
        Ok(data)
    }

    /// `{base}/v4/spreadsheets/{id}/values/{sheet}?key=...`, with every path
    /// segment percent-encoded.
    fn values_url(&self, sheet: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str(), "values", sheet]);
        }
        url.query_pairs_mut().append_pair("key", &self.api_key);
        url
    }
}

#[async_trait]
impl SourceReader for SheetsClient {
    async fn fetch(&self, area: &AreaConfig) -> Result<SheetData, IngestError> {
        self.fetch_values(&area.sheet).await
    }
}

fn require(value: Option<&str>, name: &str) -> Result<String, ConfigError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::MissingCredential(name.to_owned()))
}

/// URL for logs and errors, without the API key.
fn redact_key(url: &Url) -> String {
    let mut clean = url.clone();
    clean.set_query(None);
    clean.to_string()
}

fn truncate(body: &str, max_chars: usize) -> String {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &body[..idx]),
        None => body.to_owned(),
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
