//! Deployment IPAM Repositories
//!
//! Backends recording which instance holds which address: an in-memory map
//! for a single planning pass and a durable table shared across passes.

pub mod database;
pub mod factory;
mod lock;
pub mod memory;

pub use database::{DatabaseIpRepo, IpAddressRecord};
pub use factory::RepositoryFactory;
pub use memory::InMemoryIpRepo;
