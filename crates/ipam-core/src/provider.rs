//! IP Provider
//!
//! Validates, allocates and records network reservations against a
//! reservation repository.

use std::net::IpAddr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::IpamError;
use crate::network::{ManualNetwork, Network};
use crate::repository::{IpRepository, ReservationScope};
use crate::reservation::{NetworkReservation, ReservationOrigin, ReservationType};
use crate::subnet::AddressClass;
use crate::Result;

/// IP Provider
///
/// Owns no occupancy state of its own: the repository is the single source
/// of truth for which addresses are taken.
pub struct IpProvider {
    repository: Arc<dyn IpRepository>,
    using_global_networking: bool,
    // Serializes operations issued through this provider so the first-fit
    // scan stays deterministic within a process.
    lock: Mutex<()>,
}

impl IpProvider {
    pub fn new(repository: Arc<dyn IpRepository>, using_global_networking: bool) -> Self {
        log::debug!(
            "Creating IP provider (repository: {}, global networking: {})",
            repository.kind(),
            using_global_networking
        );
        Self {
            repository,
            using_global_networking,
            lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn IpRepository> {
        &self.repository
    }

    pub fn using_global_networking(&self) -> bool {
        self.using_global_networking
    }

    pub fn scope_for(&self, network: &Network) -> ReservationScope {
        self.scope_for_name(network.name())
    }

    fn scope_for_name(&self, network: &str) -> ReservationScope {
        if self.using_global_networking {
            ReservationScope::Global
        } else {
            ReservationScope::Network(network.to_string())
        }
    }

    /// Reserve the reservation's address, allocating one first when it is an
    /// unresolved dynamic reservation on a manual network.
    ///
    /// Reservations observed on running instances are recorded through
    /// [`IpProvider::reserve_existing_ips`] and rejected here.
    pub fn reserve(&self, reservation: &mut NetworkReservation) -> Result<()> {
        let network = Arc::clone(reservation.network());
        if reservation.origin() == ReservationOrigin::Existing {
            return Err(IpamError::ExistingReservation {
                instance: reservation.instance().id.clone(),
                network: network.name().to_string(),
            });
        }
        let _guard = self.lock.lock();

        match network.as_ref() {
            Network::Vip(_) => self.reserve_vip(reservation),
            Network::Dynamic(_) => {
                if reservation.reservation_type().is_none() {
                    reservation.set_type(ReservationType::Dynamic);
                }
                log::debug!(
                    "Not reserving {}: address is assigned by the infrastructure",
                    reservation
                );
                Ok(())
            }
            Network::Manual(manual) => match reservation.ip() {
                Some(ip) => self.reserve_manual_ip(manual, reservation, ip),
                None => self.allocate_dynamic_ip(manual, reservation),
            },
        }
    }

    /// Release the reservation's address.
    ///
    /// Addresses that no longer fall in any subnet are still released, and
    /// releasing an address that is not recorded is not an error.
    pub fn release(&self, reservation: &mut NetworkReservation) -> Result<()> {
        let ip = reservation.ip().ok_or(IpamError::IpMissing)?;
        let _guard = self.lock.lock();
        let scope = self.scope_for(reservation.network());

        if self.repository.remove(&scope, ip)? {
            log::info!("Released IP {} in {} for {}", ip, scope, reservation);
        } else {
            log::debug!("IP {} was not reserved in {}, nothing to release", ip, scope);
        }
        reservation.mark_released();
        Ok(())
    }

    /// Record an address observed on a running instance.
    ///
    /// Addresses outside every subnet, or in a reserved range, are skipped
    /// and leave the reservation unreserved. The type is inferred from the
    /// pool the address falls in.
    pub fn reserve_existing_ips(&self, reservation: &mut NetworkReservation) -> Result<()> {
        let _guard = self.lock.lock();
        let network = Arc::clone(reservation.network());

        if let Network::Dynamic(_) = network.as_ref() {
            log::debug!("Not reserving {}: dynamic network", reservation);
            return Ok(());
        }

        let ip = reservation.ip().ok_or_else(|| IpamError::IpRequired {
            instance: reservation.instance().id.clone(),
            network: network.name().to_string(),
        })?;

        let reservation_type = match network.classify(&ip) {
            Some(AddressClass::Static) => ReservationType::Static,
            Some(AddressClass::Dynamic) => ReservationType::Dynamic,
            Some(AddressClass::Reserved) => {
                log::debug!("Not reserving {}: IP belongs to reserved range", reservation);
                return Ok(());
            }
            Some(AddressClass::NotInPool) | None => {
                log::debug!(
                    "Not reserving {}: IP does not belong to any subnet",
                    reservation
                );
                return Ok(());
            }
        };

        let scope = self.scope_for(&network);
        self.repository
            .insert(&scope, ip, &reservation.instance().id)?;
        reservation.set_type(reservation_type);
        reservation.mark_reserved();

        log::debug!("Reserved existing {} in {}", reservation, scope);
        Ok(())
    }

    fn reserve_vip(&self, reservation: &mut NetworkReservation) -> Result<()> {
        let network = reservation.network().name().to_string();
        let ip = reservation.ip().ok_or_else(|| IpamError::IpRequired {
            instance: reservation.instance().id.clone(),
            network: network.clone(),
        })?;

        let scope = self.scope_for_name(&network);
        self.repository
            .insert(&scope, ip, &reservation.instance().id)?;
        reservation.set_type(ReservationType::Static);
        reservation.mark_reserved();

        log::info!("Reserved {} in {}", reservation, scope);
        Ok(())
    }

    fn reserve_manual_ip(
        &self,
        network: &ManualNetwork,
        reservation: &mut NetworkReservation,
        ip: IpAddr,
    ) -> Result<()> {
        let reservation_type = validate_manual_ip(network, reservation, ip)?;

        let scope = self.scope_for_name(network.name());
        self.repository
            .insert(&scope, ip, &reservation.instance().id)?;
        reservation.set_type(reservation_type);
        reservation.mark_reserved();

        log::info!("Reserved {} in {}", reservation, scope);
        Ok(())
    }

    /// First-fit scan: subnets serving the instance's AZ in manifest order,
    /// addresses in ascending order. Addresses taken at snapshot time are
    /// skipped without a repository call; for the rest the repository's
    /// insert-if-absent decides, and an address claimed concurrently is
    /// skipped.
    fn allocate_dynamic_ip(
        &self,
        network: &ManualNetwork,
        reservation: &mut NetworkReservation,
    ) -> Result<()> {
        let scope = self.scope_for_name(network.name());
        let owner = reservation.instance().id.clone();
        let az = reservation.instance().availability_zone.clone();
        let occupied = self.repository.occupied(&scope)?;

        for subnet in network.subnets_for(az.as_deref()) {
            let candidates = subnet
                .allocatable_addresses()
                .filter(|ip| !occupied.contains(ip));
            for ip in candidates {
                match self.repository.insert(&scope, ip, &owner) {
                    Ok(()) => {
                        reservation.resolve_ip(ip);
                        reservation.set_type(ReservationType::Dynamic);
                        reservation.mark_reserved();
                        log::info!("Allocated {} from subnet {} in {}", reservation, subnet, scope);
                        return Ok(());
                    }
                    Err(IpamError::AlreadyInUse { .. }) => continue,
                    Err(err) => return Err(err),
                }
            }
            log::debug!(
                "Subnet {} of network '{}' has no free dynamic IPs",
                subnet,
                network.name()
            );
        }

        log::warn!(
            "Network '{}' has no capacity left for instance '{}'",
            network.name(),
            owner
        );
        Err(IpamError::NotEnoughCapacity {
            instance: owner,
            network: network.name().to_string(),
            az,
        })
    }
}

/// Checks run in a fixed order, stopping at the first failure: subnet
/// membership, reserved range, pool type.
fn validate_manual_ip(
    network: &ManualNetwork,
    reservation: &NetworkReservation,
    ip: IpAddr,
) -> Result<ReservationType> {
    let subnet =
        network
            .find_subnet_containing(&ip)
            .ok_or_else(|| IpamError::IpOutsideSubnet {
                ip,
                network: network.name().to_string(),
            })?;

    let wrong_type = |expected| IpamError::WrongType {
        ip,
        network: network.name().to_string(),
        expected,
    };

    match (subnet.classify(&ip), reservation.reservation_type()) {
        (AddressClass::Reserved, _) => Err(IpamError::IpReserved {
            ip,
            network: network.name().to_string(),
        }),
        (AddressClass::Static, Some(ReservationType::Dynamic)) => {
            Err(wrong_type(ReservationType::Dynamic))
        }
        (AddressClass::Dynamic, Some(ReservationType::Static)) => {
            Err(wrong_type(ReservationType::Static))
        }
        (AddressClass::Static, _) => Ok(ReservationType::Static),
        (AddressClass::Dynamic, _) => Ok(ReservationType::Dynamic),
        (AddressClass::NotInPool, _) => Err(IpamError::IpOutsideSubnet {
            ip,
            network: network.name().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{DynamicNetwork, VipNetwork};
    use crate::repository::MockIpRepository;
    use crate::subnet::ManualSubnet;
    use deploy_ipam_types::{AddressSet, InstanceId, InstanceRef};
    use std::collections::BTreeSet;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn manual_network() -> Arc<Network> {
        let static_ips: AddressSet = vec![ip("192.168.1.5")].into_iter().collect();
        let reserved: AddressSet = vec![ip("192.168.1.11")].into_iter().collect();
        let subnet = ManualSubnet::new("192.168.1.0/24".parse().unwrap(), ip("192.168.1.1"))
            .with_static(static_ips)
            .with_reserved(reserved);
        Arc::new(Network::Manual(ManualNetwork::new(
            "my-manual-network",
            vec![subnet],
        )))
    }

    fn provider(repo: MockIpRepository, global: bool) -> IpProvider {
        IpProvider::new(Arc::new(repo), global)
    }

    fn mock_repo() -> MockIpRepository {
        let mut repo = MockIpRepository::new();
        repo.expect_kind()
            .return_const(crate::repository::RepositoryKind::InMemory);
        repo
    }

    #[test]
    fn validation_failures_never_touch_the_repository() {
        let mut repo = mock_repo();
        repo.expect_insert().never();
        let provider = provider(repo, false);
        let network = manual_network();

        let mut outside = NetworkReservation::new_static(
            InstanceRef::new("web/0"),
            Arc::clone(&network),
            ip("10.0.0.1"),
        );
        assert!(matches!(
            provider.reserve(&mut outside),
            Err(IpamError::IpOutsideSubnet { .. })
        ));

        // reserved and also not in the static pool: reserved wins
        let mut reserved = NetworkReservation::new_static(
            InstanceRef::new("web/0"),
            Arc::clone(&network),
            ip("192.168.1.11"),
        );
        let err = provider.reserve(&mut reserved).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to reserve IP '192.168.1.11' for network 'my-manual-network': IP belongs to reserved range"
        );

        let mut gateway = NetworkReservation::new_dynamic(InstanceRef::new("web/0"), Arc::clone(&network));
        gateway.resolve_ip(ip("192.168.1.1"));
        assert!(matches!(
            provider.reserve(&mut gateway),
            Err(IpamError::IpReserved { .. })
        ));

        let mut wrong_type =
            NetworkReservation::new_dynamic(InstanceRef::new("web/0"), Arc::clone(&network));
        wrong_type.resolve_ip(ip("192.168.1.5"));
        let err = provider.reserve(&mut wrong_type).unwrap_err();
        assert_eq!(
            err.to_string(),
            "IP '192.168.1.5' on network 'my-manual-network' does not belong to dynamic pool"
        );
        assert!(!wrong_type.is_reserved());

        let mut static_in_dynamic_pool = NetworkReservation::new_static(
            InstanceRef::new("web/0"),
            network,
            ip("192.168.1.20"),
        );
        assert!(matches!(
            provider.reserve(&mut static_in_dynamic_pool),
            Err(IpamError::WrongType {
                expected: ReservationType::Static,
                ..
            })
        ));
    }

    #[test]
    fn global_networking_uses_the_shared_scope() {
        let mut repo = mock_repo();
        repo.expect_insert()
            .withf(|scope, ip, owner| {
                *scope == ReservationScope::Global
                    && *ip == "192.168.1.5".parse::<IpAddr>().unwrap()
                    && owner.as_str() == "web/0"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        let provider = provider(repo, true);

        let mut reservation =
            NetworkReservation::new_static(InstanceRef::new("web/0"), manual_network(), ip("192.168.1.5"));
        provider.reserve(&mut reservation).unwrap();
        assert!(reservation.is_reserved());
        assert!(reservation.is_static());
    }

    #[test]
    fn allocation_skips_addresses_claimed_concurrently() {
        let first = ip("192.168.1.2");
        let second = ip("192.168.1.3");

        let mut repo = mock_repo();
        repo.expect_occupied()
            .times(1)
            .returning(|_| Ok(BTreeSet::new()));
        repo.expect_insert()
            .withf(move |_, ip, _| *ip == first)
            .times(1)
            .returning(|scope, ip, owner| {
                Err(IpamError::AlreadyInUse {
                    ip,
                    instance: owner.clone(),
                    holder: InstanceId::new("other-deployment/0"),
                    scope: scope.clone(),
                })
            });
        repo.expect_insert()
            .withf(move |_, ip, _| *ip == second)
            .times(1)
            .returning(|_, _, _| Ok(()));
        let provider = provider(repo, false);

        let mut reservation =
            NetworkReservation::new_dynamic(InstanceRef::new("web/0"), manual_network());
        provider.reserve(&mut reservation).unwrap();
        assert_eq!(reservation.ip(), Some(second));
        assert!(reservation.is_dynamic());
        assert!(reservation.is_reserved());
    }

    #[test]
    fn allocation_reads_occupancy_once_and_inserts_only_free_addresses() {
        let mut repo = mock_repo();
        repo.expect_occupied()
            .withf(|scope| *scope == ReservationScope::Network("my-manual-network".to_string()))
            .times(1)
            .returning(|_| {
                Ok(["192.168.1.2", "192.168.1.3", "192.168.1.4", "192.168.1.6"]
                    .iter()
                    .map(|s| s.parse().unwrap())
                    .collect())
            });
        // .5 is static, so the first free dynamic address is .7
        repo.expect_insert()
            .withf(|_, ip, _| *ip == "192.168.1.7".parse::<IpAddr>().unwrap())
            .times(1)
            .returning(|_, _, _| Ok(()));
        repo.expect_contains().never();
        repo.expect_holder().never();
        let provider = provider(repo, false);

        let mut reservation =
            NetworkReservation::new_dynamic(InstanceRef::new("web/0"), manual_network());
        provider.reserve(&mut reservation).unwrap();
        assert_eq!(reservation.ip(), Some(ip("192.168.1.7")));
    }

    #[test]
    fn occupancy_errors_abort_allocation() {
        let mut repo = mock_repo();
        repo.expect_occupied().times(1).returning(|_| {
            Err(IpamError::Storage {
                message: "table unreadable".to_string(),
            })
        });
        repo.expect_insert().never();
        let provider = provider(repo, false);

        let mut reservation =
            NetworkReservation::new_dynamic(InstanceRef::new("web/0"), manual_network());
        assert!(matches!(
            provider.reserve(&mut reservation),
            Err(IpamError::Storage { .. })
        ));
        assert!(!reservation.is_reserved());
    }

    #[test]
    fn observed_reservations_are_not_reserved_directly() {
        let mut repo = mock_repo();
        repo.expect_insert().never();
        repo.expect_occupied().never();
        let provider = provider(repo, false);

        let mut existing = NetworkReservation::existing(
            InstanceRef::new("web/0"),
            manual_network(),
            ip("192.168.1.20"),
        );
        let err = provider.reserve(&mut existing).unwrap_err();
        assert!(matches!(err, IpamError::ExistingReservation { .. }));
        assert!(err.to_string().contains("must be reconciled"));
        assert!(!existing.is_reserved());
        assert_eq!(existing.reservation_type(), None);
    }

    #[test]
    fn storage_errors_abort_allocation() {
        let mut repo = mock_repo();
        repo.expect_occupied().returning(|_| Ok(BTreeSet::new()));
        repo.expect_insert().times(1).returning(|_, _, _| {
            Err(IpamError::Storage {
                message: "lock timeout".to_string(),
            })
        });
        let provider = provider(repo, false);

        let mut reservation =
            NetworkReservation::new_dynamic(InstanceRef::new("web/0"), manual_network());
        assert!(matches!(
            provider.reserve(&mut reservation),
            Err(IpamError::Storage { .. })
        ));
        assert!(!reservation.is_resolved());
    }

    #[test]
    fn release_without_ip_fails_before_touching_the_repository() {
        let mut repo = mock_repo();
        repo.expect_remove().never();
        let provider = provider(repo, false);

        let mut reservation =
            NetworkReservation::new_dynamic(InstanceRef::new("web/0"), manual_network());
        let err = provider.release(&mut reservation).unwrap_err();
        assert!(matches!(err, IpamError::IpMissing));
        assert_eq!(err.to_string(), "Can't release reservation without an IP");
    }

    #[test]
    fn vip_reservation_requires_an_ip() {
        let mut repo = mock_repo();
        repo.expect_insert().never();
        let provider = provider(repo, false);

        let vip = Arc::new(Network::Vip(VipNetwork::new("my-vip-network")));
        let mut reservation = NetworkReservation::new_dynamic(InstanceRef::new("web/0"), vip);
        assert!(matches!(
            provider.reserve(&mut reservation),
            Err(IpamError::IpRequired { .. })
        ));
    }

    #[test]
    fn dynamic_network_is_left_to_the_infrastructure() {
        let mut repo = mock_repo();
        repo.expect_insert().never();
        let provider = provider(repo, false);

        let dynamic = Arc::new(Network::Dynamic(DynamicNetwork::new("fake-dynamic-network")));
        let mut existing = NetworkReservation::existing(
            InstanceRef::new("web/0"),
            Arc::clone(&dynamic),
            ip("192.168.1.2"),
        );
        provider.reserve_existing_ips(&mut existing).unwrap();
        assert!(!existing.is_reserved());
        assert!(!existing.is_static());

        let mut desired = NetworkReservation::new_dynamic(InstanceRef::new("web/1"), dynamic);
        provider.reserve(&mut desired).unwrap();
        assert!(!desired.is_reserved());
        assert!(desired.is_dynamic());
    }
}
