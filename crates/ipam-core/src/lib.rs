//! Deployment IPAM Core
//!
//! Network models, reservations and the IP provider that allocates and
//! records addresses for deployment instances.

pub mod error;
pub mod network;
pub mod provider;
pub mod repository;
pub mod reservation;
pub mod subnet;

pub use error::IpamError;
pub use network::{DynamicNetwork, ManualNetwork, Network, VipNetwork};
pub use provider::IpProvider;
pub use repository::{IpRepository, RepositoryKind, ReservationScope};
pub use reservation::{NetworkReservation, ReservationOrigin, ReservationState, ReservationType};
pub use subnet::{AddressClass, AllocatableAddresses, AzAffinity, ManualSubnet};

pub use deploy_ipam_types::{
    AddressRange, AddressSet, InstanceId, InstanceRef, NetworkSpec, NetworkType, SubnetSpec,
};

/// Result type for reservation operations
pub type Result<T> = std::result::Result<T, IpamError>;
