//! Error types for reservation operations

use std::net::IpAddr;

use thiserror::Error;

use deploy_ipam_types::InstanceId;

use crate::reservation::ReservationType;
use crate::repository::ReservationScope;

/// Rejection of a single `reserve`, `release` or `reserve_existing_ips` call
#[derive(Debug, Error)]
pub enum IpamError {
    #[error("Can't release reservation without an IP")]
    IpMissing,

    #[error("Failed to reserve IP for instance '{instance}' on network '{network}': no IP provided")]
    IpRequired {
        instance: InstanceId,
        network: String,
    },

    #[error(
        "Can't reserve IP for instance '{instance}' on network '{network}': reservation was observed on a running instance and must be reconciled"
    )]
    ExistingReservation {
        instance: InstanceId,
        network: String,
    },

    #[error("Failed to reserve IP '{ip}' for network '{network}': IP does not belong to any subnet")]
    IpOutsideSubnet { ip: IpAddr, network: String },

    #[error("Failed to reserve IP '{ip}' for network '{network}': IP belongs to reserved range")]
    IpReserved { ip: IpAddr, network: String },

    #[error("IP '{ip}' on network '{network}' does not belong to {expected} pool")]
    WrongType {
        ip: IpAddr,
        network: String,
        expected: ReservationType,
    },

    #[error("Failed to reserve IP '{ip}' for instance '{instance}': already reserved by instance '{holder}' in {scope}")]
    AlreadyInUse {
        ip: IpAddr,
        instance: InstanceId,
        holder: InstanceId,
        scope: ReservationScope,
    },

    #[error(
        "Failed to reserve IP for instance '{instance}': no more available in network '{network}'{zone}",
        zone = zone_suffix(.az)
    )]
    NotEnoughCapacity {
        instance: InstanceId,
        network: String,
        az: Option<String>,
    },

    #[error("Invalid network '{network}': {message}")]
    InvalidNetwork { network: String, message: String },

    #[error("Repository storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn zone_suffix(az: &Option<String>) -> String {
    match az {
        Some(az) => format!(" for availability zone '{}'", az),
        None => String::new(),
    }
}

impl IpamError {
    pub(crate) fn invalid_network(network: &str, message: impl Into<String>) -> Self {
        IpamError::InvalidNetwork {
            network: network.to_string(),
            message: message.into(),
        }
    }
}
