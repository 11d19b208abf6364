use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// What to do when an existing volume does not match the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Return the existing volume and log the differences
    #[default]
    Ignore,
    /// Fail with an already-exists error
    Reject,
}

impl MismatchPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MismatchPolicy::Ignore => "ignore",
            MismatchPolicy::Reject => "reject",
        }
    }
}

impl fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(MismatchPolicy::Ignore),
            "reject" => Ok(MismatchPolicy::Reject),
            other => Err(format!(
                "unknown mismatch policy '{}' (expected 'ignore' or 'reject')",
                other
            )),
        }
    }
}

/// Configuration for the provisioning controller
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    /// Directory under which a per-volume mount directory is created.
    /// `None` disables the local step.
    pub mount_root: Option<PathBuf>,
    /// Size of every new volume, in GiB
    pub default_size_gib: u64,
    /// Description stored on every new volume
    pub description: String,
    /// Handling of existing volumes whose attributes differ from the request
    pub mismatch_policy: MismatchPolicy,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            mount_root: None,
            default_size_gib: 1,
            description: "CSI Volume".to_string(),
            mismatch_policy: MismatchPolicy::Ignore,
        }
    }
}
