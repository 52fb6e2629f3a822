use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};

pub const DEFAULT_STATE_DIR: &str = "/var/lib/deploy-ipam";
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum RepositoryBackend {
    /// Lives for one planning pass only
    InMemory,
    /// Persisted in the state directory, shared by every planning pass
    Database,
}

impl std::fmt::Display for RepositoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryBackend::InMemory => write!(f, "in-memory"),
            RepositoryBackend::Database => write!(f, "database"),
        }
    }
}

impl std::str::FromStr for RepositoryBackend {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in-memory" | "in_memory" | "memory" => Ok(RepositoryBackend::InMemory),
            "database" | "db" => Ok(RepositoryBackend::Database),
            other => Err(SharedTypeError::Unsupported(other.to_string())),
        }
    }
}

/// Settings for one IP provider session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Deployment the provider plans for
    pub deployment: String,
    /// Addresses are unique across every network instead of per network
    #[serde(default)]
    pub global_networking: bool,
    /// Explicit backend; derived from `global_networking` when absent
    #[serde(default)]
    pub backend: Option<RepositoryBackend>,
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

fn default_lock_timeout() -> u64 {
    DEFAULT_LOCK_TIMEOUT_SECS
}

impl ProviderSettings {
    pub fn new(deployment: impl Into<String>) -> Self {
        Self {
            deployment: deployment.into(),
            global_networking: false,
            backend: None,
            state_dir: default_state_dir(),
            lock_timeout_secs: DEFAULT_LOCK_TIMEOUT_SECS,
        }
    }

    pub fn effective_backend(&self) -> RepositoryBackend {
        match self.backend {
            Some(backend) => backend,
            None if self.global_networking => RepositoryBackend::Database,
            None => RepositoryBackend::InMemory,
        }
    }

    pub fn validate(&self) -> SharedResult<()> {
        if self.deployment.is_empty() {
            return Err(SharedTypeError::InvalidValue {
                field: "deployment",
                value: String::new(),
            });
        }

        if self.global_networking && self.effective_backend() == RepositoryBackend::InMemory {
            return Err(SharedTypeError::InvalidValue {
                field: "backend",
                value: "global networking requires the database backend".to_string(),
            });
        }

        if self.lock_timeout_secs == 0 {
            return Err(SharedTypeError::InvalidValue {
                field: "lock_timeout_secs",
                value: "0".to_string(),
            });
        }

        Ok(())
    }
}
