//! Network manifest
//!
//! The networks section of a deployment manifest: known availability zones,
//! network definitions and address ranges still held by legacy deployments.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use deploy_ipam_core::Network;
use deploy_ipam_types::{AddressSet, NetworkSpec};

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkManifest {
    #[serde(default)]
    pub azs: Vec<String>,
    #[serde(default)]
    pub networks: Vec<NetworkSpec>,
    #[serde(default)]
    pub legacy_reserved: AddressSet,
}

impl NetworkManifest {
    /// Load a manifest, YAML (`.yml`, `.yaml`) or JSON (`.json`).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let manifest = match path.extension().and_then(|ext| ext.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml_str(&content)?,
            Some("json") => Self::from_json_str(&content)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };

        log::debug!(
            "Loaded {} network(s) and {} availability zone(s) from {}",
            manifest.networks.len(),
            manifest.azs.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Build every network, keyed by name in manifest order.
    pub fn build_networks(&self) -> Result<IndexMap<String, Arc<Network>>> {
        let mut networks = IndexMap::with_capacity(self.networks.len());
        for spec in &self.networks {
            if networks.contains_key(&spec.name) {
                return Err(ConfigError::DuplicateNetwork(spec.name.clone()));
            }
            let network = Network::from_spec(spec, &self.azs, &self.legacy_reserved)?;
            networks.insert(spec.name.clone(), Arc::new(network));
        }
        Ok(networks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_ipam_core::{AddressClass, IpamError};
    use std::net::IpAddr;

    const MANIFEST: &str = r#"
azs: [az-1, az-2]
legacy_reserved:
  - 10.10.0.2 - 10.10.0.9
networks:
  - name: default
    type: manual
    subnets:
      - range: 10.10.0.0/24
        gateway: 10.10.0.1
        dns: [10.10.0.1]
        static: [10.10.0.100 - 10.10.0.110]
        reserved: [10.10.0.250]
        az: az-1
      - range: 10.20.0.0/24
        gateway: 10.20.0.1
        azs: [az-2]
        cloud_properties:
          subnet: subnet-2
  - name: public
    type: vip
  - name: cloud
    type: dynamic
    dns: [8.8.8.8]
"#;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn builds_networks_in_manifest_order() {
        let manifest = NetworkManifest::from_yaml_str(MANIFEST).unwrap();
        let networks = manifest.build_networks().unwrap();

        let names: Vec<&str> = networks.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["default", "public", "cloud"]);

        let default = &networks["default"];
        assert_eq!(default.classify(&ip("10.10.0.105")), Some(AddressClass::Static));
        assert_eq!(default.classify(&ip("10.10.0.250")), Some(AddressClass::Reserved));
        assert_eq!(default.classify(&ip("10.10.0.5")), Some(AddressClass::Reserved));
        assert_eq!(default.classify(&ip("10.20.0.5")), Some(AddressClass::Dynamic));
        assert_eq!(networks["cloud"].classify(&ip("10.10.0.5")), None);
    }

    #[test]
    fn duplicate_network_names_are_rejected() {
        let manifest = NetworkManifest::from_yaml_str(
            "networks:\n  - name: public\n    type: vip\n  - name: public\n    type: vip\n",
        )
        .unwrap();
        assert!(matches!(
            manifest.build_networks(),
            Err(ConfigError::DuplicateNetwork(name)) if name == "public"
        ));
    }

    #[test]
    fn unknown_az_is_rejected() {
        let manifest = NetworkManifest::from_json_str(
            r#"{
                "azs": ["az-1"],
                "networks": [{
                    "name": "default",
                    "subnets": [{"range": "10.0.0.0/24", "gateway": "10.0.0.1", "az": "az-3"}]
                }]
            }"#,
        )
        .unwrap();
        assert!(matches!(
            manifest.build_networks(),
            Err(ConfigError::Network(IpamError::InvalidNetwork { .. }))
        ));
    }

    #[test]
    fn load_detects_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("networks.yml");
        std::fs::write(&yaml, MANIFEST).unwrap();
        assert_eq!(NetworkManifest::load(&yaml).unwrap().networks.len(), 3);

        let json = dir.path().join("networks.json");
        std::fs::write(&json, r#"{"networks": [{"name": "public", "type": "vip"}]}"#).unwrap();
        assert_eq!(NetworkManifest::load(&json).unwrap().networks.len(), 1);

        let text = dir.path().join("networks.txt");
        std::fs::write(&text, "").unwrap();
        assert!(matches!(
            NetworkManifest::load(&text),
            Err(ConfigError::UnsupportedFormat(_))
        ));

        assert!(matches!(
            NetworkManifest::load(dir.path().join("missing.yml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
