use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::address::AddressSet;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    #[default]
    Manual,
    Dynamic,
    Vip,
}

impl std::fmt::Display for NetworkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkType::Manual => write!(f, "manual"),
            NetworkType::Dynamic => write!(f, "dynamic"),
            NetworkType::Vip => write!(f, "vip"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub name: String,
    #[serde(rename = "type", default)]
    pub network_type: NetworkType,
    #[serde(default)]
    pub subnets: Vec<SubnetSpec>,
    #[serde(default)]
    pub dns: Vec<IpAddr>,
    #[serde(default)]
    pub cloud_properties: serde_json::Value,
}

impl NetworkSpec {
    pub fn new(name: impl Into<String>, network_type: NetworkType) -> Self {
        Self {
            name: name.into(),
            network_type,
            subnets: Vec::new(),
            dns: Vec::new(),
            cloud_properties: serde_json::Value::Null,
        }
    }

    pub fn manual(name: impl Into<String>, subnets: Vec<SubnetSpec>) -> Self {
        let mut spec = Self::new(name, NetworkType::Manual);
        spec.subnets = subnets;
        spec
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub range: IpNet,
    pub gateway: IpAddr,
    #[serde(default)]
    pub dns: Vec<IpAddr>,
    #[serde(rename = "static", default)]
    pub static_ips: AddressSet,
    #[serde(default)]
    pub reserved: AddressSet,
    #[serde(default)]
    pub az: Option<String>,
    #[serde(default)]
    pub azs: Option<Vec<String>>,
    #[serde(default)]
    pub cloud_properties: serde_json::Value,
}

impl SubnetSpec {
    pub fn new(range: IpNet, gateway: IpAddr) -> Self {
        Self {
            range,
            gateway,
            dns: Vec::new(),
            static_ips: AddressSet::new(),
            reserved: AddressSet::new(),
            az: None,
            azs: None,
            cloud_properties: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_manual_network() {
        let spec: NetworkSpec = serde_json::from_str(
            r#"{
                "name": "my-manual-network",
                "subnets": [{
                    "range": "192.168.1.0/24",
                    "gateway": "192.168.1.1",
                    "dns": ["192.168.1.1"],
                    "static": ["192.168.1.5 - 192.168.1.9"],
                    "reserved": ["192.168.1.200 - 192.168.1.254"],
                    "az": "z1",
                    "cloud_properties": {"name": "vlan-a"}
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(spec.network_type, NetworkType::Manual);
        assert_eq!(spec.subnets.len(), 1);
        let subnet = &spec.subnets[0];
        assert!(subnet.static_ips.contains(&"192.168.1.7".parse().unwrap()));
        assert!(subnet.reserved.contains(&"192.168.1.250".parse().unwrap()));
        assert_eq!(subnet.az.as_deref(), Some("z1"));
        assert_eq!(subnet.cloud_properties["name"], "vlan-a");
    }

    #[test]
    fn deserialize_vip_network() {
        let spec: NetworkSpec =
            serde_json::from_str(r#"{"name": "my-vip-network", "type": "vip"}"#).unwrap();
        assert_eq!(spec.network_type, NetworkType::Vip);
        assert!(spec.subnets.is_empty());
    }
}
