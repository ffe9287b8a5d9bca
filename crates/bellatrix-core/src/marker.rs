//! Ownership marker carried in subscription descriptions.
//!
//! The broker is shared with subscriptions created by hand or by other tools.
//! Bellatrix only ever touches subscriptions whose description starts with
//! `<instance_prefix><marker>`, and the tagged description is the sole key
//! used to correlate declared and observed subscriptions.

use serde::{Deserialize, Serialize};

/// Marker used when no override is configured.
pub const DEFAULT_MANAGED_MARKER: &str = "BELLATRIX_MANAGED_";

/// Process-wide ownership configuration, threaded into every component that
/// lists, diffs or tags subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipMarker {
    instance_prefix: String,
    marker: String,
}

impl OwnershipMarker {
    /// Marker with the default constant and the given deployment-instance prefix.
    pub fn new(instance_prefix: impl Into<String>) -> Self {
        Self::with_marker(instance_prefix, DEFAULT_MANAGED_MARKER)
    }

    pub fn with_marker(instance_prefix: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            instance_prefix: instance_prefix.into(),
            marker: marker.into(),
        }
    }

    pub fn instance_prefix(&self) -> &str {
        &self.instance_prefix
    }

    /// Full description prefix: `<instance_prefix><marker>`.
    pub fn prefix(&self) -> String {
        format!("{}{}", self.instance_prefix, self.marker)
    }

    /// Tagged form of a declared description.
    pub fn tag(&self, description: &str) -> String {
        format!("{}{}{}", self.instance_prefix, self.marker, description)
    }

    /// Whether a description carries this marker.
    pub fn owns(&self, description: &str) -> bool {
        description
            .strip_prefix(self.instance_prefix.as_str())
            .is_some_and(|rest| rest.starts_with(self.marker.as_str()))
    }
}

impl Default for OwnershipMarker {
    fn default() -> Self {
        Self::new("")
    }
}
