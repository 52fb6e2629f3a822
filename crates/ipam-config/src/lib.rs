//! Deployment IPAM Configuration
//!
//! Loads IP provider settings and the networks of a deployment manifest.

pub mod error;
pub mod manifest;
pub mod settings;

pub use error::{ConfigError, Result};
pub use manifest::NetworkManifest;
pub use settings::{load_settings, ENV_PREFIX};
