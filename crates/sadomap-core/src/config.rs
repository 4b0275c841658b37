use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Sheets credentials are optional here: CSV ingestion runs without them, and
/// the sheets reader refuses to build when they are absent.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("SADOMAP_ENV", "development"))?;
    let log_level = or_default("SADOMAP_LOG_LEVEL", "info");
    let areas_path = PathBuf::from(or_default("SADOMAP_AREAS_PATH", "./config/areas.yaml"));

    let sheets_api_key = optional("SADOMAP_SHEETS_API_KEY");
    let spreadsheet_id = optional("SADOMAP_SPREADSHEET_ID");
    let sheets_base_url = or_default("SADOMAP_SHEETS_BASE_URL", "https://sheets.googleapis.com");

    let request_timeout_secs = parse_u64("SADOMAP_REQUEST_TIMEOUT_SECS", "10")?;
    if request_timeout_secs == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "SADOMAP_REQUEST_TIMEOUT_SECS".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    let user_agent = or_default("SADOMAP_USER_AGENT", "sadomap/0.1 (poi-ingest)");
    let max_retries = parse_u32("SADOMAP_MAX_RETRIES", "3")?;
    let retry_base_delay_ms = parse_u64("SADOMAP_RETRY_BASE_DELAY_MS", "1000")?;

    Ok(AppConfig {
        env,
        log_level,
        areas_path,
        sheets_api_key,
        spreadsheet_id,
        sheets_base_url,
        request_timeout_secs,
        user_agent,
        max_retries,
        retry_base_delay_ms,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "SADOMAP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
