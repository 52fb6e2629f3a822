//! Provider settings loading
//!
//! Settings come from an optional file (TOML, YAML or JSON, picked by
//! extension) overridden by `DEPLOY_IPAM_*` environment variables.

use std::path::Path;

use deploy_ipam_types::{ProviderSettings, DEFAULT_LOCK_TIMEOUT_SECS, DEFAULT_STATE_DIR};

use crate::error::Result;

pub const ENV_PREFIX: &str = "DEPLOY_IPAM";

/// Load settings from `path` (if any) and the process environment.
pub fn load_settings(path: Option<&Path>) -> Result<ProviderSettings> {
    load_settings_with_env(path, config::Environment::with_prefix(ENV_PREFIX))
}

pub(crate) fn load_settings_with_env(
    path: Option<&Path>,
    environment: config::Environment,
) -> Result<ProviderSettings> {
    let mut builder = config::Config::builder()
        .set_default("global_networking", false)?
        .set_default("state_dir", DEFAULT_STATE_DIR)?
        .set_default("lock_timeout_secs", DEFAULT_LOCK_TIMEOUT_SECS)?;

    if let Some(path) = path {
        log::debug!("Loading IP provider settings from {}", path.display());
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings: ProviderSettings = builder
        .add_source(environment.try_parsing(true))
        .build()?
        .try_deserialize()?;
    settings.validate()?;

    log::debug!(
        "Loaded settings for deployment '{}' (backend: {}, global networking: {})",
        settings.deployment,
        settings.effective_backend(),
        settings.global_networking
    );
    Ok(settings)
}
