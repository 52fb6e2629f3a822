//! Reservation repository abstraction

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use deploy_ipam_types::InstanceId;

use crate::Result;

/// Namespace in which an address must be unique
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationScope {
    /// Per-network uniqueness
    Network(String),
    /// Global networking: one namespace shared by every network
    Global,
}

impl std::fmt::Display for ReservationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReservationScope::Network(name) => write!(f, "network '{}'", name),
            ReservationScope::Global => write!(f, "global scope"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    InMemory,
    Database,
}

impl std::fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryKind::InMemory => write!(f, "in-memory"),
            RepositoryKind::Database => write!(f, "database"),
        }
    }
}

/// Exclusivity ledger keyed by (scope, address).
///
/// Implementations must make `insert` an atomic insert-if-absent.
#[cfg_attr(test, mockall::automock)]
pub trait IpRepository: Send + Sync {
    fn kind(&self) -> RepositoryKind;

    /// Claim `ip` for `owner`.
    ///
    /// Fails with `AlreadyInUse` when the pair is taken, even by `owner`.
    fn insert(&self, scope: &ReservationScope, ip: IpAddr, owner: &InstanceId) -> Result<()>;

    /// Returns whether an entry was removed; absent pairs are not an error.
    fn remove(&self, scope: &ReservationScope, ip: IpAddr) -> Result<bool>;

    fn contains(&self, scope: &ReservationScope, ip: IpAddr) -> Result<bool>;

    fn holder(&self, scope: &ReservationScope, ip: IpAddr) -> Result<Option<InstanceId>>;

    /// Snapshot of the addresses taken in `scope`.
    fn occupied(&self, scope: &ReservationScope) -> Result<BTreeSet<IpAddr>>;
}
