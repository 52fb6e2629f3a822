//! Check command
//!
//! Reports the allocatable capacity of every manual subnet in the manifest.

use anyhow::Result;
use serde::Serialize;

use deploy_ipam_core::{AzAffinity, Network};

use crate::context::CliContext;
use crate::output::Render;

/// Counting stops here; larger subnets are reported as "at least".
pub const CAPACITY_LIMIT: usize = 65_536;

#[derive(Debug, Serialize)]
pub struct SubnetCapacity {
    pub network: String,
    pub range: String,
    pub azs: Vec<String>,
    pub allocatable: usize,
    pub truncated: bool,
}

#[derive(Debug, Serialize)]
pub struct NetworkSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub network_type: String,
}

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub networks: Vec<NetworkSummary>,
    pub subnets: Vec<SubnetCapacity>,
}

impl Render for CheckReport {
    fn render_text(&self) -> String {
        let mut out = format!("Manifest OK: {} network(s)\n", self.networks.len());
        for network in &self.networks {
            out.push_str(&format!("  {} ({})\n", network.name, network.network_type));
        }

        if !self.subnets.is_empty() {
            out.push_str(&format!(
                "\n{:<24} {:<24} {:<16} {}\n",
                "Network", "Range", "AZs", "Allocatable"
            ));
            out.push_str(&"-".repeat(80));
            for subnet in &self.subnets {
                let azs = if subnet.azs.is_empty() {
                    "any".to_string()
                } else {
                    subnet.azs.join(",")
                };
                let count = if subnet.truncated {
                    format!(">= {}", subnet.allocatable)
                } else {
                    subnet.allocatable.to_string()
                };
                out.push_str(&format!(
                    "\n{:<24} {:<24} {:<16} {}",
                    subnet.network, subnet.range, azs, count
                ));
            }
        }
        out
    }
}

/// Check command implementation
pub struct CheckCommand<'a> {
    context: &'a CliContext,
}

impl<'a> CheckCommand<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub fn execute(&self) -> Result<CheckReport> {
        let mut networks = Vec::new();
        let mut subnets = Vec::new();

        for (name, network) in self.context.networks() {
            networks.push(NetworkSummary {
                name: name.clone(),
                network_type: network.network_type().to_string(),
            });

            let Network::Manual(manual) = network.as_ref() else {
                continue;
            };
            for subnet in manual.subnets() {
                let allocatable = subnet.allocatable_addresses().take(CAPACITY_LIMIT + 1).count();
                if allocatable == 0 {
                    log::warn!("Subnet {} of network '{}' has no dynamic IPs", subnet, name);
                }
                let azs = match subnet.az() {
                    AzAffinity::Any => Vec::new(),
                    AzAffinity::Zones(zones) => zones.clone(),
                };
                subnets.push(SubnetCapacity {
                    network: name.clone(),
                    range: subnet.range().to_string(),
                    azs,
                    allocatable: allocatable.min(CAPACITY_LIMIT),
                    truncated: allocatable > CAPACITY_LIMIT,
                });
            }
        }

        Ok(CheckReport { networks, subnets })
    }
}
