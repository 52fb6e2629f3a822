//! Reserve command

use std::net::IpAddr;

use anyhow::{Context, Result};

use deploy_ipam_core::{InstanceRef, IpProvider, NetworkReservation};

use crate::context::CliContext;
use crate::output::ReservationReport;

/// What to reserve
#[derive(Debug, Clone)]
pub struct ReserveRequest {
    pub network: String,
    pub instance: String,
    pub az: Option<String>,
    pub ip: Option<IpAddr>,
    /// Request the IP from the static pool
    pub static_ip: bool,
}

/// Reserve command implementation
pub struct ReserveCommand<'a> {
    context: &'a CliContext,
    provider: &'a IpProvider,
}

impl<'a> ReserveCommand<'a> {
    pub fn new(context: &'a CliContext, provider: &'a IpProvider) -> Self {
        Self { context, provider }
    }

    /// Without an IP, one is allocated from the dynamic pool.
    pub fn execute(&self, request: &ReserveRequest) -> Result<ReservationReport> {
        let network = self.context.network(&request.network)?;
        let instance = match &request.az {
            Some(az) => InstanceRef::in_zone(request.instance.as_str(), az.as_str()),
            None => InstanceRef::new(request.instance.as_str()),
        };

        let mut reservation = match (request.ip, request.static_ip) {
            (Some(ip), true) => NetworkReservation::new_static(instance, network, ip),
            (None, true) => anyhow::bail!("A static reservation needs an IP (--ip)"),
            (ip, false) => {
                let mut reservation = NetworkReservation::new_dynamic(instance, network);
                if let Some(ip) = ip {
                    reservation.resolve_ip(ip);
                }
                reservation
            }
        };

        self.provider
            .reserve(&mut reservation)
            .with_context(|| format!("Failed to reserve IP on network '{}'", request.network))?;

        Ok(ReservationReport::from(&reservation))
    }
}
