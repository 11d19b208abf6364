use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Request parameter that selects the backend volume type
pub const VTYPE_PARAM: &str = "vtype";

/// Longest volume name the block-storage API accepts
pub const MAX_VOLUME_NAME_LEN: usize = 255;

/// Attributes requested for a volume that may need to be created
///
/// The `name` is the idempotency key: two specs with the same name refer to
/// the same backend volume, whatever their other fields say.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Volume name (idempotency key)
    pub name: String,
    /// Requested size in GiB
    pub size_gib: u64,
    /// Backend-specific volume class
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    /// Informational description stored on the backend volume
    #[serde(default)]
    pub description: String,
}

impl VolumeSpec {
    pub fn new(name: impl Into<String>, size_gib: u64) -> Self {
        Self {
            name: name.into(),
            size_gib,
            volume_type: None,
            description: String::new(),
        }
    }

    /// Set the volume type. Empty strings mean "backend default".
    pub fn with_volume_type(mut self, volume_type: Option<impl Into<String>>) -> Self {
        self.volume_type = volume_type
            .map(Into::into)
            .filter(|t: &String| !t.is_empty());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// The backend's view of an existing volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeRecord {
    /// Backend-assigned identifier, unique
    pub id: String,
    /// Volume name, not unique on the backend
    pub name: String,
    /// Backend status string (e.g., "creating", "available")
    pub status: String,
    /// Size in GiB
    pub size_gib: u64,
    /// Volume type as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    /// Description as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl VolumeRecord {
    /// Describe how this record differs from a requested spec.
    ///
    /// Only attributes the backend actually reports are compared, and a spec
    /// without a volume type matches any type the backend picked.
    pub fn differences(&self, spec: &VolumeSpec) -> Vec<String> {
        let mut diffs = Vec::new();

        if self.size_gib != spec.size_gib {
            diffs.push(format!(
                "size_gib: existing {} requested {}",
                self.size_gib, spec.size_gib
            ));
        }

        if let (Some(requested), Some(existing)) = (&spec.volume_type, &self.volume_type) {
            if requested != existing {
                diffs.push(format!(
                    "volume_type: existing '{}' requested '{}'",
                    existing, requested
                ));
            }
        }

        if let Some(existing) = &self.description {
            if *existing != spec.description {
                diffs.push(format!(
                    "description: existing '{}' requested '{}'",
                    existing, spec.description
                ));
            }
        }

        diffs
    }
}

/// Inbound CreateVolume request from the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateVolumeRequest {
    /// Requested volume name
    pub name: String,
    /// Free-form parameters; only `vtype` is recognized
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

impl CreateVolumeRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: HashMap::new(),
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// The requested volume type, if any
    pub fn volume_type(&self) -> Option<&str> {
        self.parameters
            .get(VTYPE_PARAM)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }
}

/// Check that a name can be used both as a backend volume name and as a
/// single path component under the mount root
pub fn is_valid_volume_name(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_VOLUME_NAME_LEN {
        return false;
    }

    if name == "." || name == ".." {
        return false;
    }

    !name.contains(['/', '\\', '\0'])
}
