use std::path::PathBuf;
use std::time::Duration;
use serde::Deserialize;

pub const DEFAULT_OUTPUT_DIR: &str = "reports_output";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// One day; longer runs are a misconfiguration.
pub const MAX_TIMEOUT_SECS: u64 = 86_400;
pub const DEFAULT_CONFIG_PATH: &str = "config/iqfetch.yaml";

/// Contents of the optional YAML configuration file.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct FileConfig {
    pub server: Option<ServerConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServerConfig {
    pub url: Option<String>,
    pub username: Option<String>,
    /// Literal value or `$VAR` environment reference
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ReportConfig {
    pub organization_id: Option<String>,
    pub output_dir: Option<String>,
    pub timeout_secs: Option<u64>,
    pub merge_order: Option<MergeOrder>,
}

/// How per-application contributions are concatenated.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeOrder {
    /// Order in which applications finish
    #[default]
    Arrival,
    /// Order in which IQ Server listed the applications
    Application,
}

impl std::fmt::Display for MergeOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeOrder::Arrival => write!(f, "arrival"),
            MergeOrder::Application => write!(f, "application"),
        }
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_url: String,
    pub username: String,
    pub password: String,
    pub organization_id: Option<String>,
    pub output_dir: PathBuf,
    pub timeout: Duration,
    pub merge_order: MergeOrder,
}
