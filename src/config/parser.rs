use std::path::{Path, PathBuf};
use std::time::Duration;
use reqwest::Url;
use crate::errors::IqFetchError;
use super::credentials::resolve_credential;
use super::types::*;
use tracing::{debug, warn};

pub const ENV_SERVER_URL: &str = "IQ_SERVER_URL";
pub const ENV_USERNAME: &str = "IQ_USERNAME";
pub const ENV_PASSWORD: &str = "IQ_PASSWORD";
pub const ENV_ORGANIZATION_ID: &str = "ORGANIZATION_ID";

const MAX_CONFIG_BYTES: u64 = 1_048_576;

pub async fn parse_config(path: &Path) -> Result<FileConfig, IqFetchError> {
    if !path.exists() {
        return Err(IqFetchError::Config(format!("Config file not found: {}", path.display())));
    }

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > MAX_CONFIG_BYTES {
        return Err(IqFetchError::Config("Config file exceeds 1MB limit".into()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    let config: FileConfig = serde_yaml::from_str(&content)?;
    debug!(path = %path.display(), "Parsed config file");
    Ok(config)
}

/// Load the config file if one is given, else the default path if it exists.
pub async fn load_file_config(path: Option<&Path>) -> Result<Option<FileConfig>, IqFetchError> {
    match path {
        Some(p) => parse_config(p).await.map(Some),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.exists() {
                parse_config(default).await.map(Some)
            } else {
                Ok(None)
            }
        }
    }
}

/// Merge the file config with environment values (which win) and defaults.
///
/// The result is not validated; callers apply command-line overrides first
/// and then call [`validate_config`].
pub fn resolve_config<F>(file: Option<&FileConfig>, env: F) -> Result<AppConfig, IqFetchError>
where
    F: Fn(&str) -> Option<String>,
{
    let server = file.and_then(|c| c.server.as_ref());
    let report = file.and_then(|c| c.report.as_ref());
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

    let server_url = non_empty(ENV_SERVER_URL)
        .or_else(|| server.and_then(|s| s.url.clone()))
        .unwrap_or_default();
    let username = non_empty(ENV_USERNAME)
        .or_else(|| server.and_then(|s| s.username.clone()))
        .unwrap_or_default();
    let password = non_empty(ENV_PASSWORD)
        .or_else(|| {
            server
                .and_then(|s| s.password.as_deref())
                .map(|p| resolve_credential(p, &env))
        })
        .unwrap_or_default();
    let organization_id = non_empty(ENV_ORGANIZATION_ID)
        .or_else(|| report.and_then(|r| r.organization_id.clone()))
        .filter(|id| !id.is_empty());

    let output_dir = report
        .and_then(|r| r.output_dir.clone())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    let timeout_secs = report
        .and_then(|r| r.timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let merge_order = report.and_then(|r| r.merge_order).unwrap_or_default();

    Ok(AppConfig {
        server_url,
        username,
        password,
        organization_id,
        output_dir,
        timeout: Duration::from_secs(timeout_secs),
        merge_order,
    })
}

pub fn validate_config(config: &AppConfig) -> Result<(), IqFetchError> {
    if config.server_url.trim().is_empty() {
        return Err(IqFetchError::Config(format!(
            "IQ Server URL is required (set {} or server.url)",
            ENV_SERVER_URL
        )));
    }
    let url = Url::parse(config.server_url.trim())
        .map_err(|e| IqFetchError::Config(format!("Invalid IQ Server URL {:?}: {}", config.server_url, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(IqFetchError::Config(format!(
            "IQ Server URL must use http or https, got {}",
            url.scheme()
        )));
    }
    if !url.path().trim_end_matches('/').ends_with("/api/v2") {
        warn!(url = %config.server_url, "IQ Server URL does not end with /api/v2");
    }

    if config.username.is_empty() {
        return Err(IqFetchError::Config(format!(
            "IQ username is required (set {} or server.username)",
            ENV_USERNAME
        )));
    }
    if config.password.is_empty() {
        return Err(IqFetchError::Config(format!(
            "IQ password is required (set {} or server.password)",
            ENV_PASSWORD
        )));
    }
    if config.timeout.is_zero() {
        return Err(IqFetchError::Config("timeout must be greater than zero".into()));
    }
    if config.timeout.as_secs() > MAX_TIMEOUT_SECS {
        return Err(IqFetchError::Config(format!(
            "timeout must be at most {}s, got {}s",
            MAX_TIMEOUT_SECS,
            config.timeout.as_secs()
        )));
    }
    if config.output_dir.as_os_str().is_empty() {
        return Err(IqFetchError::Config("output directory must not be empty".into()));
    }
    Ok(())
}
