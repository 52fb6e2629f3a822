//! Deployment networks

use std::net::IpAddr;

use deploy_ipam_types::{AddressSet, NetworkSpec, NetworkType, SubnetSpec};

use crate::error::IpamError;
use crate::subnet::{AddressClass, AzAffinity, ManualSubnet};
use crate::Result;

#[derive(Debug, Clone)]
pub enum Network {
    Manual(ManualNetwork),
    Dynamic(DynamicNetwork),
    Vip(VipNetwork),
}

impl Network {
    pub fn name(&self) -> &str {
        match self {
            Network::Manual(network) => &network.name,
            Network::Dynamic(network) => &network.name,
            Network::Vip(network) => &network.name,
        }
    }

    pub fn network_type(&self) -> NetworkType {
        match self {
            Network::Manual(_) => NetworkType::Manual,
            Network::Dynamic(_) => NetworkType::Dynamic,
            Network::Vip(_) => NetworkType::Vip,
        }
    }

    /// `None` for dynamic networks, whose addresses are not managed here.
    pub fn classify(&self, ip: &IpAddr) -> Option<AddressClass> {
        match self {
            Network::Manual(network) => Some(network.classify(ip)),
            Network::Dynamic(_) => None,
            Network::Vip(network) => Some(network.classify(ip)),
        }
    }

    pub fn as_manual(&self) -> Option<&ManualNetwork> {
        match self {
            Network::Manual(network) => Some(network),
            _ => None,
        }
    }

    /// Build a network from its loaded definition.
    ///
    /// `legacy_reserved` holds ranges still owned by legacy deployments; they
    /// are added to the reserved pool of every subnet.
    pub fn from_spec(
        spec: &NetworkSpec,
        known_azs: &[String],
        legacy_reserved: &AddressSet,
    ) -> Result<Self> {
        if spec.name.is_empty() {
            return Err(IpamError::invalid_network("", "network name cannot be empty"));
        }

        match spec.network_type {
            NetworkType::Manual => {
                let subnets = spec
                    .subnets
                    .iter()
                    .map(|subnet| build_subnet(&spec.name, subnet, known_azs, legacy_reserved))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Network::Manual(ManualNetwork::new(spec.name.clone(), subnets)))
            }
            NetworkType::Dynamic => {
                if !spec.subnets.is_empty() {
                    log::warn!(
                        "Ignoring {} subnet(s) declared on dynamic network '{}'",
                        spec.subnets.len(),
                        spec.name
                    );
                }
                Ok(Network::Dynamic(
                    DynamicNetwork::new(spec.name.clone()).with_dns(spec.dns.clone()),
                ))
            }
            NetworkType::Vip => {
                if !spec.subnets.is_empty() {
                    return Err(IpamError::invalid_network(
                        &spec.name,
                        "vip networks cannot declare subnets",
                    ));
                }
                Ok(Network::Vip(VipNetwork::new(spec.name.clone())))
            }
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} network '{}'", self.network_type(), self.name())
    }
}

fn build_subnet(
    network: &str,
    spec: &SubnetSpec,
    known_azs: &[String],
    legacy_reserved: &AddressSet,
) -> Result<ManualSubnet> {
    if !spec.range.contains(&spec.gateway) {
        return Err(IpamError::invalid_network(
            network,
            format!(
                "gateway '{}' is not within subnet range '{}'",
                spec.gateway, spec.range
            ),
        ));
    }

    if let Some(range) = spec
        .static_ips
        .ranges()
        .iter()
        .find(|range| !range.is_within(&spec.range))
    {
        return Err(IpamError::invalid_network(
            network,
            format!(
                "static IP range '{}' is out of subnet range '{}'",
                range, spec.range
            ),
        ));
    }

    let az = match (&spec.az, &spec.azs) {
        (Some(_), Some(_)) => {
            return Err(IpamError::invalid_network(
                network,
                format!(
                    "subnet '{}' can only use one of 'az' or 'azs'",
                    spec.range
                ),
            ));
        }
        (Some(az), None) => AzAffinity::single(az.clone()),
        (None, Some(azs)) => AzAffinity::Zones(azs.clone()),
        (None, None) => AzAffinity::Any,
    };

    if let Some(unknown) = az.zones().iter().find(|zone| !known_azs.contains(zone)) {
        return Err(IpamError::invalid_network(
            network,
            format!(
                "subnet '{}' refers to unknown availability zone '{}'",
                spec.range, unknown
            ),
        ));
    }

    let mut reserved = spec.reserved.clone();
    reserved.extend_from(legacy_reserved);

    Ok(ManualSubnet::new(spec.range, spec.gateway)
        .with_dns(spec.dns.clone())
        .with_static(spec.static_ips.clone())
        .with_reserved(reserved)
        .with_az(az)
        .with_cloud_properties(spec.cloud_properties.clone()))
}

/// Network whose addresses are allocated from operator-declared subnets
#[derive(Debug, Clone)]
pub struct ManualNetwork {
    name: String,
    subnets: Vec<ManualSubnet>,
}

impl ManualNetwork {
    pub fn new(name: impl Into<String>, subnets: Vec<ManualSubnet>) -> Self {
        Self {
            name: name.into(),
            subnets,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Subnets in manifest order
    pub fn subnets(&self) -> &[ManualSubnet] {
        &self.subnets
    }

    /// Subnets serving `az`, in manifest order.
    pub fn subnets_for<'a>(
        &'a self,
        az: Option<&'a str>,
    ) -> impl Iterator<Item = &'a ManualSubnet> + 'a {
        self.subnets.iter().filter(move |subnet| subnet.matches_az(az))
    }

    /// First subnet in manifest order whose range contains `ip`.
    pub fn find_subnet_containing(&self, ip: &IpAddr) -> Option<&ManualSubnet> {
        self.subnets.iter().find(|subnet| subnet.contains(ip))
    }

    pub fn classify(&self, ip: &IpAddr) -> AddressClass {
        self.find_subnet_containing(ip)
            .map_or(AddressClass::NotInPool, |subnet| subnet.classify(ip))
    }
}

/// Network whose addresses are assigned by the infrastructure
#[derive(Debug, Clone)]
pub struct DynamicNetwork {
    name: String,
    dns: Vec<IpAddr>,
}

impl DynamicNetwork {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dns: Vec::new(),
        }
    }

    pub fn with_dns(mut self, dns: Vec<IpAddr>) -> Self {
        self.dns = dns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dns(&self) -> &[IpAddr] {
        &self.dns
    }
}

/// Virtual IP network: every address is static and explicitly requested
#[derive(Debug, Clone)]
pub struct VipNetwork {
    name: String,
}

impl VipNetwork {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classify(&self, _ip: &IpAddr) -> AddressClass {
        AddressClass::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_ipam_types::AddressRange;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn azs() -> Vec<String> {
        vec!["az-1".to_string(), "az-2".to_string()]
    }

    fn subnet_spec(range: &str, gateway: &str) -> SubnetSpec {
        SubnetSpec::new(range.parse().unwrap(), ip(gateway))
    }

    #[test]
    fn subnets_for_preserves_manifest_order() {
        let mut s1 = subnet_spec("10.0.1.0/24", "10.0.1.1");
        s1.az = Some("az-1".to_string());
        let mut s2 = subnet_spec("10.0.2.0/24", "10.0.2.1");
        s2.az = Some("az-2".to_string());
        let mut s3 = subnet_spec("10.0.3.0/24", "10.0.3.1");
        s3.azs = Some(vec!["az-2".to_string()]);

        let spec = NetworkSpec::manual("net", vec![s1, s2, s3]);
        let network = Network::from_spec(&spec, &azs(), &AddressSet::new()).unwrap();
        let manual = network.as_manual().unwrap();

        let ranges: Vec<String> = manual
            .subnets_for(Some("az-2"))
            .map(|subnet| subnet.range().to_string())
            .collect();
        assert_eq!(ranges, vec!["10.0.2.0/24", "10.0.3.0/24"]);
        assert_eq!(manual.subnets_for(None).count(), 3);
    }

    #[test]
    fn classify_uses_first_matching_subnet() {
        let mut first = subnet_spec("10.0.0.0/24", "10.0.0.1");
        first.static_ips.push(ip("10.0.0.10"));
        let second = subnet_spec("10.0.0.0/16", "10.0.255.254");

        let spec = NetworkSpec::manual("overlap", vec![first, second]);
        let network = Network::from_spec(&spec, &[], &AddressSet::new()).unwrap();

        assert_eq!(network.classify(&ip("10.0.0.10")), Some(AddressClass::Static));
        assert_eq!(network.classify(&ip("10.0.1.10")), Some(AddressClass::Dynamic));
        assert_eq!(network.classify(&ip("10.1.0.1")), Some(AddressClass::NotInPool));
    }

    #[test]
    fn legacy_ranges_become_reserved() {
        let spec = NetworkSpec::manual("net", vec![subnet_spec("10.0.0.0/24", "10.0.0.1")]);
        let mut legacy = AddressSet::new();
        legacy.push("10.0.0.2 - 10.0.0.9".parse::<AddressRange>().unwrap());

        let network = Network::from_spec(&spec, &[], &legacy).unwrap();
        assert_eq!(network.classify(&ip("10.0.0.5")), Some(AddressClass::Reserved));
        let first_free = network.as_manual().unwrap().subnets()[0]
            .allocatable_addresses()
            .next();
        assert_eq!(first_free, Some(ip("10.0.0.10")));
    }

    #[test]
    fn invalid_definitions_are_rejected() {
        let spec = NetworkSpec::manual("net", vec![subnet_spec("10.0.0.0/24", "10.0.1.1")]);
        assert!(matches!(
            Network::from_spec(&spec, &[], &AddressSet::new()),
            Err(IpamError::InvalidNetwork { .. })
        ));

        let mut outside_static = subnet_spec("10.0.0.0/24", "10.0.0.1");
        outside_static.static_ips.push(ip("10.0.1.5"));
        let spec = NetworkSpec::manual("net", vec![outside_static]);
        assert!(Network::from_spec(&spec, &[], &AddressSet::new()).is_err());

        let mut unknown_az = subnet_spec("10.0.0.0/24", "10.0.0.1");
        unknown_az.az = Some("az-9".to_string());
        let spec = NetworkSpec::manual("net", vec![unknown_az]);
        assert!(Network::from_spec(&spec, &azs(), &AddressSet::new()).is_err());

        let mut vip = NetworkSpec::new("vip", NetworkType::Vip);
        vip.subnets.push(subnet_spec("10.0.0.0/24", "10.0.0.1"));
        assert!(Network::from_spec(&vip, &[], &AddressSet::new()).is_err());
    }

    #[test]
    fn vip_and_dynamic_classification() {
        let vip = Network::Vip(VipNetwork::new("vip"));
        assert_eq!(vip.classify(&ip("1.2.3.4")), Some(AddressClass::Static));

        let dynamic = Network::Dynamic(DynamicNetwork::new("dyn"));
        assert_eq!(dynamic.classify(&ip("1.2.3.4")), None);
    }
}
