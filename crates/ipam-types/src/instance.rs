use serde::{Deserialize, Serialize};

/// Stable identity of the instance owning a reservation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InstanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for InstanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Instance as seen by the allocator: identity plus AZ placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceRef {
    pub id: InstanceId,
    pub availability_zone: Option<String>,
}

impl InstanceRef {
    pub fn new(id: impl Into<InstanceId>) -> Self {
        Self {
            id: id.into(),
            availability_zone: None,
        }
    }

    pub fn in_zone(id: impl Into<InstanceId>, az: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            availability_zone: Some(az.into()),
        }
    }

    pub fn availability_zone(&self) -> Option<&str> {
        self.availability_zone.as_deref()
    }
}
