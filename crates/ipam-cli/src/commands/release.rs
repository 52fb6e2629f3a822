//! Release command

use std::net::IpAddr;

use anyhow::{Context, Result};

use deploy_ipam_core::{InstanceRef, IpProvider, NetworkReservation};

use crate::context::CliContext;
use crate::output::ReservationReport;

/// Release command implementation
pub struct ReleaseCommand<'a> {
    context: &'a CliContext,
    provider: &'a IpProvider,
}

impl<'a> ReleaseCommand<'a> {
    pub fn new(context: &'a CliContext, provider: &'a IpProvider) -> Self {
        Self { context, provider }
    }

    pub fn execute(&self, network: &str, instance: &str, ip: IpAddr) -> Result<ReservationReport> {
        let mut reservation = NetworkReservation::existing(
            InstanceRef::new(instance),
            self.context.network(network)?,
            ip,
        );

        self.provider
            .release(&mut reservation)
            .with_context(|| format!("Failed to release IP {} on network '{}'", ip, network))?;

        Ok(ReservationReport::from(&reservation))
    }
}
