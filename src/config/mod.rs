// Configuration module entry point
// Loads, validates and shares application configuration

mod state;
mod types;

use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::fileserver::MAX_BUFFER_SIZE;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, FilesConfig, FilesUpdate, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("buffer_size must be between 1 and {max}, got {0}", max = MAX_BUFFER_SIZE)]
    BufferSize(usize),
    #[error("{0} must not be zero")]
    ZeroPort(&'static str),
    #[error("root_dir is not a directory: {0}")]
    RootDir(String),
    #[error("invalid address: {0}")]
    Address(String),
}

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("SERVER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.api_host", "127.0.0.1")?
            .set_default("server.api_port", 8000)?
            .set_default("files.root_dir", "public")?
            .set_default("files.buffer_size", 32_768)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_buffer_size(self.files.buffer_size)?;
        if self.server.port == 0 {
            return Err(ConfigError::ZeroPort("server.port"));
        }
        if self.server.api_port == 0 {
            return Err(ConfigError::ZeroPort("server.api_port"));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| ConfigError::Address(format!("{e}")))
    }

    pub fn get_api_socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.api_host, self.server.api_port)
            .parse()
            .map_err(|e| ConfigError::Address(format!("{e}")))
    }
}

pub fn validate_buffer_size(size: usize) -> Result<(), ConfigError> {
    if size == 0 || size > MAX_BUFFER_SIZE {
        return Err(ConfigError::BufferSize(size));
    }
    Ok(())
}

pub fn validate_root_dir(root_dir: &str) -> Result<(), ConfigError> {
    if !Path::new(root_dir).is_dir() {
        return Err(ConfigError::RootDir(root_dir.to_string()));
    }
    Ok(())
}
