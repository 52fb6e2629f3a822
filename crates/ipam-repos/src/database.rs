//! Durable reservation repository
//!
//! Reservations live in a JSON table inside the state directory. Every write
//! is a transaction: in-process mutex, cross-process lock file, re-read,
//! apply, then an atomic replace of the table file.

use std::collections::BTreeSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use deploy_ipam_core::{IpRepository, IpamError, RepositoryKind, ReservationScope, Result};
use deploy_ipam_types::{InstanceId, DEFAULT_LOCK_TIMEOUT_SECS};

use crate::lock::TableLock;

pub const TABLE_FILE: &str = "ip_addresses.json";
pub const LOCK_FILE: &str = "ip_addresses.lock";

const TABLE_VERSION: u32 = 1;

/// One reserved address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAddressRecord {
    pub address: IpAddr,
    pub scope: ReservationScope,
    pub instance: InstanceId,
    /// Deployment that made the reservation, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    pub reserved_at: DateTime<Utc>,
}

impl IpAddressRecord {
    fn key(&self) -> (&ReservationScope, IpAddr) {
        (&self.scope, self.address)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct IpAddressTable {
    version: u32,
    #[serde(default)]
    records: Vec<IpAddressRecord>,
}

impl Default for IpAddressTable {
    fn default() -> Self {
        Self {
            version: TABLE_VERSION,
            records: Vec::new(),
        }
    }
}

impl IpAddressTable {
    fn find(&self, scope: &ReservationScope, ip: IpAddr) -> Option<&IpAddressRecord> {
        self.records
            .iter()
            .find(|record| record.scope == *scope && record.address == ip)
    }
}

/// Repository shared by every planning pass that uses the same state directory
#[derive(Debug)]
pub struct DatabaseIpRepo {
    dir: PathBuf,
    lock_timeout: Duration,
    deployment: Option<String>,
    mutex: Mutex<()>,
}

impl DatabaseIpRepo {
    /// Open the table in `dir`, creating the directory when needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        log::debug!("Opened reservation table in {}", dir.display());

        Ok(Self {
            dir,
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
            deployment: None,
            mutex: Mutex::new(()),
        })
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Stamp new records with the deployment name.
    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = Some(deployment.into());
        self
    }

    pub fn table_path(&self) -> PathBuf {
        self.dir.join(TABLE_FILE)
    }

    fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE)
    }

    /// Snapshot of every record, ordered by scope then address.
    pub fn records(&self) -> Result<Vec<IpAddressRecord>> {
        let _guard = self.mutex.lock();
        Ok(load_table(&self.table_path())?.records)
    }

    fn read<T>(&self, f: impl FnOnce(&IpAddressTable) -> T) -> Result<T> {
        let _guard = self.mutex.lock();
        let table = load_table(&self.table_path())?;
        Ok(f(&table))
    }

    /// `f` returns its result and whether the table changed.
    fn transaction<T>(
        &self,
        operation: &str,
        f: impl FnOnce(&mut IpAddressTable) -> Result<(T, bool)>,
    ) -> Result<T> {
        let _guard = self.mutex.lock();
        let _lock = TableLock::acquire(&self.lock_path(), operation, self.lock_timeout)?;

        let path = self.table_path();
        let mut table = load_table(&path)?;
        let (result, changed) = f(&mut table)?;
        if changed {
            save_table(&path, &mut table)?;
        }
        Ok(result)
    }
}

fn load_table(path: &Path) -> Result<IpAddressTable> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(IpAddressTable::default());
        }
        Err(e) => return Err(e.into()),
    };

    let table: IpAddressTable = serde_json::from_str(&content)?;
    if table.version > TABLE_VERSION {
        return Err(IpamError::Storage {
            message: format!(
                "table {} has unsupported version {}",
                path.display(),
                table.version
            ),
        });
    }

    let mut seen = BTreeSet::new();
    for record in &table.records {
        if !seen.insert(record.key()) {
            return Err(IpamError::Storage {
                message: format!(
                    "table {} holds duplicate records for IP {} in {}",
                    path.display(),
                    record.address,
                    record.scope
                ),
            });
        }
    }

    Ok(table)
}

fn save_table(path: &Path, table: &mut IpAddressTable) -> Result<()> {
    table.version = TABLE_VERSION;
    table
        .records
        .sort_by(|a, b| a.scope.cmp(&b.scope).then(a.address.cmp(&b.address)));

    let content = serde_json::to_string_pretty(table)?;
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;

    log::debug!(
        "Saved {} reservation record(s) to {}",
        table.records.len(),
        path.display()
    );
    Ok(())
}

impl IpRepository for DatabaseIpRepo {
    fn kind(&self) -> RepositoryKind {
        RepositoryKind::Database
    }

    fn insert(&self, scope: &ReservationScope, ip: IpAddr, owner: &InstanceId) -> Result<()> {
        self.transaction("insert", |table| {
            if let Some(record) = table.find(scope, ip) {
                return Err(IpamError::AlreadyInUse {
                    ip,
                    instance: owner.clone(),
                    holder: record.instance.clone(),
                    scope: scope.clone(),
                });
            }

            table.records.push(IpAddressRecord {
                address: ip,
                scope: scope.clone(),
                instance: owner.clone(),
                deployment: self.deployment.clone(),
                reserved_at: Utc::now(),
            });
            log::debug!("Recorded IP {} in {} for instance '{}'", ip, scope, owner);
            Ok(((), true))
        })
    }

    fn remove(&self, scope: &ReservationScope, ip: IpAddr) -> Result<bool> {
        self.transaction("remove", |table| {
            let before = table.records.len();
            table
                .records
                .retain(|record| !(record.scope == *scope && record.address == ip));
            let removed = table.records.len() != before;
            if removed {
                log::debug!("Removed IP {} in {} from the table", ip, scope);
            }
            Ok((removed, removed))
        })
    }

    fn contains(&self, scope: &ReservationScope, ip: IpAddr) -> Result<bool> {
        self.read(|table| table.find(scope, ip).is_some())
    }

    fn holder(&self, scope: &ReservationScope, ip: IpAddr) -> Result<Option<InstanceId>> {
        self.read(|table| table.find(scope, ip).map(|record| record.instance.clone()))
    }

    fn occupied(&self, scope: &ReservationScope) -> Result<BTreeSet<IpAddr>> {
        self.read(|table| {
            table
                .records
                .iter()
                .filter(|record| record.scope == *scope)
                .map(|record| record.address)
                .collect()
        })
    }
}
