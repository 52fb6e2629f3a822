//! Network reservations

use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use deploy_ipam_types::InstanceRef;

use crate::network::Network;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationType {
    Static,
    Dynamic,
}

impl std::fmt::Display for ReservationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationType::Static => write!(f, "static"),
            ReservationType::Dynamic => write!(f, "dynamic"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Unresolved,
    Resolved,
    Reserved,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationOrigin {
    /// Built by planning code for the desired state
    Desired,
    /// Observed on a running instance
    Existing,
}

/// Claim of an address on a network by one instance.
///
/// Only the IP provider moves a reservation past `Resolved`.
#[derive(Debug, Clone)]
pub struct NetworkReservation {
    instance: InstanceRef,
    network: Arc<Network>,
    origin: ReservationOrigin,
    reservation_type: Option<ReservationType>,
    ip: Option<IpAddr>,
    state: ReservationState,
}

impl NetworkReservation {
    pub fn new_dynamic(instance: InstanceRef, network: Arc<Network>) -> Self {
        Self {
            instance,
            network,
            origin: ReservationOrigin::Desired,
            reservation_type: Some(ReservationType::Dynamic),
            ip: None,
            state: ReservationState::Unresolved,
        }
    }

    pub fn new_static(instance: InstanceRef, network: Arc<Network>, ip: IpAddr) -> Self {
        Self {
            instance,
            network,
            origin: ReservationOrigin::Desired,
            reservation_type: Some(ReservationType::Static),
            ip: Some(ip),
            state: ReservationState::Resolved,
        }
    }

    /// Its type is unknown until it is reconciled.
    pub fn existing(instance: InstanceRef, network: Arc<Network>, ip: IpAddr) -> Self {
        Self {
            instance,
            network,
            origin: ReservationOrigin::Existing,
            reservation_type: None,
            ip: Some(ip),
            state: ReservationState::Resolved,
        }
    }

    /// Pin the address, e.g. a dynamic IP kept from a previous deploy.
    pub fn resolve_ip(&mut self, ip: IpAddr) {
        self.ip = Some(ip);
        self.state = ReservationState::Resolved;
    }

    pub fn instance(&self) -> &InstanceRef {
        &self.instance
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn origin(&self) -> ReservationOrigin {
        self.origin
    }

    pub fn reservation_type(&self) -> Option<ReservationType> {
        self.reservation_type
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn state(&self) -> ReservationState {
        self.state
    }

    pub fn is_resolved(&self) -> bool {
        self.ip.is_some()
    }

    pub fn is_reserved(&self) -> bool {
        self.state == ReservationState::Reserved
    }

    pub fn is_static(&self) -> bool {
        self.reservation_type == Some(ReservationType::Static)
    }

    pub fn is_dynamic(&self) -> bool {
        self.reservation_type == Some(ReservationType::Dynamic)
    }

    pub(crate) fn set_type(&mut self, reservation_type: ReservationType) {
        self.reservation_type = Some(reservation_type);
    }

    pub(crate) fn mark_reserved(&mut self) {
        debug_assert!(self.ip.is_some(), "reserved reservation must carry an IP");
        self.state = ReservationState::Reserved;
    }

    pub(crate) fn mark_released(&mut self) {
        self.state = ReservationState::Released;
    }
}

impl std::fmt::Display for NetworkReservation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.reservation_type {
            Some(reservation_type) => reservation_type.to_string(),
            None => "existing".to_string(),
        };
        write!(
            f,
            "{} reservation for instance '{}' on network '{}'",
            kind,
            self.instance.id,
            self.network.name()
        )?;
        if let Some(ip) = self.ip {
            write!(f, " ({})", ip)?;
        }
        Ok(())
    }
}
