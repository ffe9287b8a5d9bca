//! Declared state document.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::marker::OwnershipMarker;
use crate::scope::Scope;
use crate::subscription::Subscription;

/// Connection options for the single context broker a state file targets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientOptions {
    /// Extra headers sent with every broker request (e.g. `Authorization`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_headers: BTreeMap<String, String>,

    /// Broker base URL.
    pub client_url: String,
}

/// Desired subscriptions for one scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_path: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fiware_service: String,

    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

impl SubscriptionRequest {
    pub fn scope(&self) -> Scope {
        Scope::new(self.fiware_service.clone(), self.service_path.clone())
    }

    /// Declared subscription with the given (tagged) description.
    pub fn find(&self, description: &str) -> Option<&Subscription> {
        self.subscriptions
            .iter()
            .find(|sub| sub.description == description)
    }
}

/// The operator's desired state, as read from the state file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclaredState {
    pub client_options: ClientOptions,

    #[serde(default)]
    pub subscriptions_state: Vec<SubscriptionRequest>,
}

impl DeclaredState {
    pub fn from_json(content: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read and parse a state file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(InputError::EmptyPath);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::debug!(file_path = %path.display(), error = %source, "could not read the state file");
            InputError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        serde_json::from_str(&content).map_err(|source| {
            tracing::debug!(file_path = %path.display(), error = %source, "could not unmarshal the state file");
            InputError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    /// Prepend the ownership marker to every declared description.
    ///
    /// Consumes the state so a run can only ever tag once.
    pub fn tag(mut self, marker: &OwnershipMarker) -> TaggedState {
        for request in &mut self.subscriptions_state {
            for sub in &mut request.subscriptions {
                sub.description = marker.tag(&sub.description);
            }
        }
        TaggedState {
            state: self,
            marker: marker.clone(),
        }
    }
}

/// Declared state whose descriptions carry the ownership marker.
///
/// Every engine component takes this type, so comparisons always happen on
/// tagged descriptions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedState {
    state: DeclaredState,
    marker: OwnershipMarker,
}

impl TaggedState {
    pub fn client_options(&self) -> &ClientOptions {
        &self.state.client_options
    }

    pub fn requests(&self) -> &[SubscriptionRequest] {
        &self.state.subscriptions_state
    }

    pub fn marker(&self) -> &OwnershipMarker {
        &self.marker
    }

    /// Number of declared subscriptions across all scopes.
    pub fn subscription_count(&self) -> usize {
        self.requests().iter().map(|r| r.subscriptions.len()).sum()
    }
}
