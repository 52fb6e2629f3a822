//! In-memory reservation repository

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use parking_lot::Mutex;

use deploy_ipam_core::{IpRepository, IpamError, RepositoryKind, ReservationScope, Result};
use deploy_ipam_types::InstanceId;

/// Repository living for a single planning pass
#[derive(Debug, Default)]
pub struct InMemoryIpRepo {
    ips: Mutex<BTreeMap<(ReservationScope, IpAddr), InstanceId>>,
}

impl InMemoryIpRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ips.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ips.lock().is_empty()
    }
}

impl IpRepository for InMemoryIpRepo {
    fn kind(&self) -> RepositoryKind {
        RepositoryKind::InMemory
    }

    fn insert(&self, scope: &ReservationScope, ip: IpAddr, owner: &InstanceId) -> Result<()> {
        let mut ips = self.ips.lock();
        match ips.entry((scope.clone(), ip)) {
            Entry::Occupied(entry) => Err(IpamError::AlreadyInUse {
                ip,
                instance: owner.clone(),
                holder: entry.get().clone(),
                scope: scope.clone(),
            }),
            Entry::Vacant(entry) => {
                entry.insert(owner.clone());
                log::debug!("Reserved IP {} in {} for instance '{}'", ip, scope, owner);
                Ok(())
            }
        }
    }

    fn remove(&self, scope: &ReservationScope, ip: IpAddr) -> Result<bool> {
        let removed = self.ips.lock().remove(&(scope.clone(), ip));
        if let Some(owner) = &removed {
            log::debug!("Released IP {} in {} held by instance '{}'", ip, scope, owner);
        }
        Ok(removed.is_some())
    }

    fn contains(&self, scope: &ReservationScope, ip: IpAddr) -> Result<bool> {
        Ok(self.ips.lock().contains_key(&(scope.clone(), ip)))
    }

    fn holder(&self, scope: &ReservationScope, ip: IpAddr) -> Result<Option<InstanceId>> {
        Ok(self.ips.lock().get(&(scope.clone(), ip)).cloned())
    }

    fn occupied(&self, scope: &ReservationScope) -> Result<BTreeSet<IpAddr>> {
        Ok(self
            .ips
            .lock()
            .keys()
            .filter(|(taken_scope, _)| taken_scope == scope)
            .map(|(_, ip)| *ip)
            .collect())
    }
}
