//! Manual network subnets (address pools)

use std::net::IpAddr;

use ipnet::{IpAddrRange, IpNet};

use deploy_ipam_types::AddressSet;

/// Which instances a subnet may serve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AzAffinity {
    /// No AZ declared; serves every instance
    #[default]
    Any,
    Zones(Vec<String>),
}

impl AzAffinity {
    pub fn single(az: impl Into<String>) -> Self {
        AzAffinity::Zones(vec![az.into()])
    }

    /// An instance without an AZ may use any subnet.
    pub fn matches(&self, az: Option<&str>) -> bool {
        match (self, az) {
            (_, None) | (AzAffinity::Any, Some(_)) => true,
            (AzAffinity::Zones(zones), Some(az)) => zones.iter().any(|zone| zone == az),
        }
    }

    pub fn zones(&self) -> &[String] {
        match self {
            AzAffinity::Any => &[],
            AzAffinity::Zones(zones) => zones,
        }
    }
}

/// Pool an address falls into within a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Static,
    Dynamic,
    /// Reserved range, gateway, network or broadcast address
    Reserved,
    NotInPool,
}

#[derive(Debug, Clone)]
pub struct ManualSubnet {
    range: IpNet,
    gateway: IpAddr,
    dns: Vec<IpAddr>,
    static_ips: AddressSet,
    reserved: AddressSet,
    az: AzAffinity,
    cloud_properties: serde_json::Value,
}

impl ManualSubnet {
    pub fn new(range: IpNet, gateway: IpAddr) -> Self {
        Self {
            range,
            gateway,
            dns: Vec::new(),
            static_ips: AddressSet::new(),
            reserved: AddressSet::new(),
            az: AzAffinity::Any,
            cloud_properties: serde_json::Value::Null,
        }
    }

    pub fn with_dns(mut self, dns: Vec<IpAddr>) -> Self {
        self.dns = dns;
        self
    }

    pub fn with_static(mut self, static_ips: AddressSet) -> Self {
        self.static_ips = static_ips;
        self
    }

    pub fn with_reserved(mut self, reserved: AddressSet) -> Self {
        self.reserved = reserved;
        self
    }

    pub fn with_az(mut self, az: AzAffinity) -> Self {
        self.az = az;
        self
    }

    pub fn with_cloud_properties(mut self, cloud_properties: serde_json::Value) -> Self {
        self.cloud_properties = cloud_properties;
        self
    }

    pub fn range(&self) -> &IpNet {
        &self.range
    }

    pub fn gateway(&self) -> IpAddr {
        self.gateway
    }

    pub fn dns(&self) -> &[IpAddr] {
        &self.dns
    }

    pub fn static_ips(&self) -> &AddressSet {
        &self.static_ips
    }

    pub fn reserved(&self) -> &AddressSet {
        &self.reserved
    }

    pub fn az(&self) -> &AzAffinity {
        &self.az
    }

    pub fn cloud_properties(&self) -> &serde_json::Value {
        &self.cloud_properties
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.range.contains(ip)
    }

    pub fn matches_az(&self, az: Option<&str>) -> bool {
        self.az.matches(az)
    }

    /// Gateway plus, for ranges larger than a point-to-point link, the
    /// network and broadcast addresses.
    pub fn is_restricted(&self, ip: &IpAddr) -> bool {
        if *ip == self.gateway {
            return true;
        }
        let has_edges = self.range.prefix_len() + 1 < self.range.max_prefix_len();
        has_edges && (*ip == self.range.network() || *ip == self.range.broadcast())
    }

    pub fn is_reserved(&self, ip: &IpAddr) -> bool {
        self.is_restricted(ip) || self.reserved.contains(ip)
    }

    /// Reserved status wins over static pool membership.
    pub fn classify(&self, ip: &IpAddr) -> AddressClass {
        if !self.contains(ip) {
            AddressClass::NotInPool
        } else if self.is_reserved(ip) {
            AddressClass::Reserved
        } else if self.static_ips.contains(ip) {
            AddressClass::Static
        } else {
            AddressClass::Dynamic
        }
    }

    /// Dynamic-pool addresses in ascending order. Each call starts a fresh scan.
    pub fn allocatable_addresses(&self) -> AllocatableAddresses<'_> {
        AllocatableAddresses {
            subnet: self,
            hosts: self.range.hosts(),
        }
    }
}

impl std::fmt::Display for ManualSubnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.range)
    }
}

/// Lazy scan over a subnet's dynamic pool
#[derive(Debug)]
pub struct AllocatableAddresses<'a> {
    subnet: &'a ManualSubnet,
    hosts: IpAddrRange,
}

impl Iterator for AllocatableAddresses<'_> {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        let subnet = self.subnet;
        self.hosts
            .find(|ip| subnet.classify(ip) == AddressClass::Dynamic)
    }
}
