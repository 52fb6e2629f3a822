pub mod address;
pub mod error;
pub mod instance;
pub mod network;
pub mod settings;

pub use address::{AddressRange, AddressSet};
pub use error::{SharedResult, SharedTypeError};
pub use instance::{InstanceId, InstanceRef};
pub use network::{NetworkSpec, NetworkType, SubnetSpec};
pub use settings::{
    ProviderSettings, RepositoryBackend, DEFAULT_LOCK_TIMEOUT_SECS, DEFAULT_STATE_DIR,
};
