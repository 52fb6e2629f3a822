use std::path::PathBuf;

use thiserror::Error;

use deploy_ipam_core::IpamError;
use deploy_ipam_types::SharedTypeError;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid provider settings: {0}")]
    InvalidSettings(#[from] SharedTypeError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Unsupported manifest format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to parse YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Network '{0}' is defined more than once")]
    DuplicateNetwork(String),

    #[error(transparent)]
    Network(#[from] IpamError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
