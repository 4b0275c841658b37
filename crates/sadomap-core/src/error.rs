use thiserror::Error;

use crate::poi::AreaId;

/// Configuration problems. Always fatal: they are raised before any fetch is
/// attempted and abort the whole request.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("missing credential {0}; the sheets reader cannot be built without it")]
    MissingCredential(String),

    #[error("failed to read areas file {path}: {source}")]
    AreasFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse areas file: {0}")]
    AreasFileParse(#[from] serde_yaml::Error),

    #[error("areas validation failed: {0}")]
    Validation(String),

    #[error("area '{0}' is not configured")]
    UnknownArea(AreaId),
}
