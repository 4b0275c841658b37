use std::time::Duration;

use sadomap_core::{AreaId, ConfigError};
use serde::Serialize;
use thiserror::Error;

/// Errors raised while fetching or parsing one area's sheet.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Credentials or identifiers are missing. Never retried.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The API answered with a non-2xx status.
    #[error("HTTP {status} from {url}: {body}")]
    Network {
        status: u16,
        url: String,
        body: String,
    },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// A single attempt exceeded its time budget.
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV parse error for {context}: {source}")]
    Csv {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// The header row does not contain a column the area cannot do without.
    #[error("sheet '{sheet}' has no '{header}' header")]
    MissingColumn { sheet: String, header: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("fetch cancelled")]
    Cancelled,
}

/// A row that cannot become a POI. Rows are skipped, never the whole area.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowValidationError {
    #[error("row {row} of area {area} has no name")]
    MissingName { area: AreaId, row: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AreaErrorKind {
    /// Transport, timeout, or non-2xx response (after retries, if transient).
    Network,
    /// The response arrived but could not be turned into rows.
    Parse,
    /// Local source problem such as a missing CSV file.
    Source,
    /// The caller abandoned the request.
    Cancelled,
}

/// Area-scoped failure reported alongside the data of sibling areas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("area {area} failed after {attempts} attempt(s): {message}")]
pub struct AreaError {
    pub area: AreaId,
    pub kind: AreaErrorKind,
    pub message: String,
    pub attempts: u32,
}

impl AreaError {
    #[must_use]
    pub fn from_ingest(area: AreaId, err: &IngestError, attempts: u32) -> Self {
        let kind = match err {
            IngestError::Network { .. } | IngestError::Http(_) | IngestError::Timeout(_) => {
                AreaErrorKind::Network
            }
            IngestError::Deserialize { .. }
            | IngestError::Csv { .. }
            | IngestError::MissingColumn { .. } => AreaErrorKind::Parse,
            IngestError::Config(_) | IngestError::Io { .. } => AreaErrorKind::Source,
            IngestError::Cancelled => AreaErrorKind::Cancelled,
        };
        Self {
            area,
            kind,
            message: err.to_string(),
            attempts,
        }
    }

    #[must_use]
    pub fn cancelled(area: AreaId) -> Self {
        Self {
            area,
            kind: AreaErrorKind::Cancelled,
            message: IngestError::Cancelled.to_string(),
            attempts: 0,
        }
    }
}
