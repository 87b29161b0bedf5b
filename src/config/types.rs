// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub files: FilesConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_host: String,
    pub api_port: u16,
    pub workers: Option<usize>,
}

/// Static file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FilesConfig {
    /// Directory every request path is resolved against
    pub root_dir: String,
    /// Maximum bytes read from disk per chunk
    pub buffer_size: usize,
    /// Page served with 404 responses (plain text if unset)
    #[serde(default)]
    pub not_found_page: Option<String>,
    /// Page served with 403 responses (plain text if unset)
    #[serde(default)]
    pub forbidden_page: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds allowed for a client to send the request head
    pub header_read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Runtime-adjustable file settings, as exchanged with the admin API
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FilesUpdate {
    #[serde(default)]
    pub root_dir: Option<String>,
    #[serde(default)]
    pub buffer_size: Option<usize>,
}
