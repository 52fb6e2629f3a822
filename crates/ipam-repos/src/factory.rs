//! Repository factory
//!
//! Creates the reservation backend selected by the provider settings

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use deploy_ipam_core::{IpProvider, IpRepository};
use deploy_ipam_types::{ProviderSettings, RepositoryBackend};

use crate::{DatabaseIpRepo, InMemoryIpRepo};

/// Repository factory
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create the repository from settings
    pub fn create(settings: &ProviderSettings) -> Result<Arc<dyn IpRepository>> {
        settings
            .validate()
            .context("Invalid IP provider settings")?;

        match settings.effective_backend() {
            RepositoryBackend::InMemory => {
                log::debug!(
                    "Using in-memory reservations for deployment '{}'",
                    settings.deployment
                );
                Ok(Arc::new(InMemoryIpRepo::new()))
            }
            RepositoryBackend::Database => {
                let repo = DatabaseIpRepo::open(&settings.state_dir)
                    .with_context(|| {
                        format!(
                            "Failed to open reservation table in {}",
                            settings.state_dir.display()
                        )
                    })?
                    .with_lock_timeout(Duration::from_secs(settings.lock_timeout_secs))
                    .with_deployment(settings.deployment.clone());
                log::debug!(
                    "Using reservation table {} for deployment '{}'",
                    repo.table_path().display(),
                    settings.deployment
                );
                Ok(Arc::new(repo))
            }
        }
    }

    /// Create an IP provider backed by the configured repository
    pub fn create_provider(settings: &ProviderSettings) -> Result<IpProvider> {
        let repository = Self::create(settings)?;
        log::info!(
            "IP provider for deployment '{}' uses the {} repository (global networking: {})",
            settings.deployment,
            repository.kind(),
            settings.global_networking
        );
        Ok(IpProvider::new(repository, settings.global_networking))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_ipam_core::RepositoryKind;

    #[test]
    fn backend_follows_settings() {
        let dir = tempfile::tempdir().unwrap();

        let mut settings = ProviderSettings::new("fake-deployment");
        settings.state_dir = dir.path().to_path_buf();
        assert_eq!(
            RepositoryFactory::create(&settings).unwrap().kind(),
            RepositoryKind::InMemory
        );

        settings.global_networking = true;
        let provider = RepositoryFactory::create_provider(&settings).unwrap();
        assert_eq!(provider.repository().kind(), RepositoryKind::Database);
        assert!(provider.using_global_networking());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let mut settings = ProviderSettings::new("fake-deployment");
        settings.global_networking = true;
        settings.backend = Some(RepositoryBackend::InMemory);

        let err = RepositoryFactory::create(&settings).err().unwrap();
        assert!(err.to_string().contains("Invalid IP provider settings"));
    }
}
