//! Reconcile command
//!
//! Records an IP observed on a running instance.

use std::net::IpAddr;

use anyhow::{Context, Result};

use deploy_ipam_core::{InstanceRef, IpProvider, NetworkReservation};

use crate::context::CliContext;
use crate::output::ReservationReport;

pub struct ReconcileCommand<'a> {
    context: &'a CliContext,
    provider: &'a IpProvider,
}

impl<'a> ReconcileCommand<'a> {
    pub fn new(context: &'a CliContext, provider: &'a IpProvider) -> Self {
        Self { context, provider }
    }

    pub fn execute(
        &self,
        network: &str,
        instance: &str,
        az: Option<&str>,
        ip: IpAddr,
    ) -> Result<ReservationReport> {
        let instance = match az {
            Some(az) => InstanceRef::in_zone(instance, az),
            None => InstanceRef::new(instance),
        };
        let mut reservation =
            NetworkReservation::existing(instance, self.context.network(network)?, ip);

        self.provider
            .reserve_existing_ips(&mut reservation)
            .with_context(|| format!("Failed to reconcile IP {} on network '{}'", ip, network))?;

        if !reservation.is_reserved() {
            log::info!("Skipped {}: not managed by this network", reservation);
        }
        Ok(ReservationReport::from(&reservation))
    }
}
