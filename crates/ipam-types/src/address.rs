use std::net::IpAddr;
use std::str::FromStr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{SharedResult, SharedTypeError};

/// Inclusive range of addresses of a single family.
///
/// Parsed from a single address (`10.0.0.5`), a dashed range
/// (`10.0.0.5 - 10.0.0.9`) or a CIDR block (`10.0.0.0/28`, covering the
/// network and broadcast addresses too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    first: IpAddr,
    last: IpAddr,
}

impl AddressRange {
    pub fn new(first: IpAddr, last: IpAddr) -> SharedResult<Self> {
        if first.is_ipv4() != last.is_ipv4() {
            return Err(SharedTypeError::InvalidRange {
                range: format!("{} - {}", first, last),
                reason: "mixed address families".to_string(),
            });
        }
        if first > last {
            return Err(SharedTypeError::InvalidRange {
                range: format!("{} - {}", first, last),
                reason: "first address is greater than last".to_string(),
            });
        }
        Ok(Self { first, last })
    }

    pub fn single(ip: IpAddr) -> Self {
        Self { first: ip, last: ip }
    }

    pub fn from_net(net: IpNet) -> Self {
        Self {
            first: net.network(),
            last: net.broadcast(),
        }
    }

    pub fn first(&self) -> IpAddr {
        self.first
    }

    pub fn last(&self) -> IpAddr {
        self.last
    }

    pub fn is_single(&self) -> bool {
        self.first == self.last
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        ip.is_ipv4() == self.first.is_ipv4() && self.first <= *ip && *ip <= self.last
    }

    /// True when every address of this range lies inside `net`.
    pub fn is_within(&self, net: &IpNet) -> bool {
        net.contains(&self.first) && net.contains(&self.last)
    }
}

impl FromStr for AddressRange {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_ip = |value: &str| {
            value
                .trim()
                .parse::<IpAddr>()
                .map_err(|_| SharedTypeError::InvalidValue {
                    field: "ip_address",
                    value: value.trim().to_string(),
                })
        };

        if let Some((first, last)) = s.split_once('-') {
            return Self::new(parse_ip(first)?, parse_ip(last)?);
        }

        if s.contains('/') {
            let net = s
                .trim()
                .parse::<IpNet>()
                .map_err(|_| SharedTypeError::InvalidValue {
                    field: "cidr",
                    value: s.trim().to_string(),
                })?;
            return Ok(Self::from_net(net));
        }

        parse_ip(s).map(Self::single)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{} - {}", self.first, self.last)
        }
    }
}

impl From<IpAddr> for AddressRange {
    fn from(ip: IpAddr) -> Self {
        Self::single(ip)
    }
}

struct AddressRangeVisitor;

impl<'de> serde::de::Visitor<'de> for AddressRangeVisitor {
    type Value = AddressRange;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an address, an 'a - b' range or a CIDR block")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        v.parse::<AddressRange>().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for AddressRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(AddressRangeVisitor)
    }
}

impl Serialize for AddressRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Ordered collection of address ranges, as written in a manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressSet {
    ranges: Vec<AddressRange>,
}

impl AddressSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, range: impl Into<AddressRange>) {
        self.ranges.push(range.into());
    }

    pub fn extend_from(&mut self, other: &AddressSet) {
        self.ranges.extend(other.ranges.iter().copied());
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }

    pub fn ranges(&self) -> &[AddressRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl FromIterator<AddressRange> for AddressSet {
    fn from_iter<I: IntoIterator<Item = AddressRange>>(iter: I) -> Self {
        Self {
            ranges: iter.into_iter().collect(),
        }
    }
}

impl FromIterator<IpAddr> for AddressSet {
    fn from_iter<I: IntoIterator<Item = IpAddr>>(iter: I) -> Self {
        iter.into_iter().map(AddressRange::single).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn parse_single_address() {
        let range: AddressRange = "192.168.1.5".parse().unwrap();
        assert!(range.is_single());
        assert!(range.contains(&ip("192.168.1.5")));
        assert!(!range.contains(&ip("192.168.1.6")));
        assert_eq!(range.to_string(), "192.168.1.5");
    }

    #[test]
    fn parse_dashed_range() {
        let range: AddressRange = "192.168.1.10 - 192.168.1.20".parse().unwrap();
        assert!(range.contains(&ip("192.168.1.10")));
        assert!(range.contains(&ip("192.168.1.15")));
        assert!(range.contains(&ip("192.168.1.20")));
        assert!(!range.contains(&ip("192.168.1.21")));
        assert_eq!(range.to_string(), "192.168.1.10 - 192.168.1.20");
    }

    #[test]
    fn parse_cidr_range() {
        let range: AddressRange = "10.0.0.0/30".parse().unwrap();
        assert_eq!(range.first(), ip("10.0.0.0"));
        assert_eq!(range.last(), ip("10.0.0.3"));
    }

    #[test]
    fn reject_inverted_and_mixed_ranges() {
        assert!("10.0.0.9 - 10.0.0.1".parse::<AddressRange>().is_err());
        assert!("10.0.0.1 - fd00::1".parse::<AddressRange>().is_err());
        assert!("not-an-ip".parse::<AddressRange>().is_err());
    }

    #[test]
    fn families_never_match() {
        let range: AddressRange = "0.0.0.0 - 255.255.255.255".parse().unwrap();
        assert!(!range.contains(&ip("::1")));
    }

    #[test]
    fn set_deserializes_from_strings() {
        let set: AddressSet =
            serde_json::from_str(r#"["10.0.0.2", "10.0.0.10 - 10.0.0.12"]"#).unwrap();
        assert_eq!(set.ranges().len(), 2);
        assert!(set.contains(&ip("10.0.0.11")));
        assert!(!set.contains(&ip("10.0.0.3")));

        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["10.0.0.2","10.0.0.10 - 10.0.0.12"]"#);
    }
}
