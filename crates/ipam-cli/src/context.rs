//! Shared state of one `ipamctl` invocation

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use indexmap::IndexMap;

use deploy_ipam_config::{load_settings, NetworkManifest};
use deploy_ipam_core::{IpProvider, Network};
use deploy_ipam_repos::RepositoryFactory;
use deploy_ipam_types::{ProviderSettings, RepositoryBackend};

pub const DEFAULT_MANIFEST: &str = "/etc/deploy-ipam/networks.yml";

/// Settings and networks loaded once per invocation
pub struct CliContext {
    settings: ProviderSettings,
    manifest_path: PathBuf,
    networks: IndexMap<String, Arc<Network>>,
}

impl CliContext {
    pub fn load(config: Option<&Path>, manifest: &Path) -> Result<Self> {
        let settings = load_settings(config).context("Failed to load IP provider settings")?;
        let networks = NetworkManifest::load(manifest)
            .and_then(|loaded| loaded.build_networks())
            .with_context(|| format!("Failed to load network manifest {}", manifest.display()))?;

        Ok(Self::new(settings, manifest, networks))
    }

    pub fn new(
        settings: ProviderSettings,
        manifest_path: impl Into<PathBuf>,
        networks: IndexMap<String, Arc<Network>>,
    ) -> Self {
        Self {
            settings,
            manifest_path: manifest_path.into(),
            networks,
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn networks(&self) -> &IndexMap<String, Arc<Network>> {
        &self.networks
    }

    pub fn network(&self, name: &str) -> Result<Arc<Network>> {
        self.networks
            .get(name)
            .cloned()
            .with_context(|| format!("Network '{}' is not defined in {}", name, self.manifest_path.display()))
    }

    pub fn provider(&self) -> Result<IpProvider> {
        if self.settings.effective_backend() == RepositoryBackend::InMemory {
            log::warn!("Using the in-memory repository: reservations are dropped when ipamctl exits");
        }
        RepositoryFactory::create_provider(&self.settings)
    }
}
