//! Error taxonomy for reconciliation runs.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::scope::Scope;

/// Result type for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors raised by a [`SubscriptionService`](crate::service::SubscriptionService)
/// implementation.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Could not decode broker response: {0}")]
    Decode(String),

    #[error("Broker response did not carry a subscription id")]
    MissingId,

    #[error("Invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Invalid broker url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ServiceError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Errors reading or parsing the declared state document.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid path provided")]
    EmptyPath,

    #[error("could not read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse state file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not parse state document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote mutation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationAction {
    /// Create issued for an add patch.
    Create,
    /// Delete issued for a delete patch.
    Delete,
    /// Delete of a subscription in failed delivery state.
    DeleteFailed,
    /// Create replacing a subscription in failed delivery state.
    Recreate,
}

impl fmt::Display for MutationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "apply the add subscription patch for"),
            Self::Delete => write!(f, "apply the delete subscription patch for"),
            Self::DeleteFailed => write!(f, "delete failed"),
            Self::Recreate => write!(f, "recreate failed"),
        }
    }
}

/// Errors that abort a reconciliation run.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("could not get subscriptions on context broker for {scope}: {source}")]
    RemoteQuery {
        scope: Scope,
        #[source]
        source: ServiceError,
    },

    #[error(
        "could not {action} subscription with description {description:?}{} in {scope}: {source}",
        id_suffix(.id)
    )]
    RemoteMutation {
        action: MutationAction,
        scope: Scope,
        description: String,
        id: Option<String>,
        #[source]
        source: ServiceError,
    },

    #[error(
        "subscription with description {description:?} (id {id}) in {scope} must be recreated \
         but is not present in the declared state"
    )]
    StateMismatch {
        scope: Scope,
        id: String,
        description: String,
    },

    #[error(transparent)]
    Input(#[from] InputError),
}

impl ReconcileError {
    pub fn remote_query(scope: &Scope, source: ServiceError) -> Self {
        Self::RemoteQuery {
            scope: scope.clone(),
            source,
        }
    }

    pub fn remote_mutation(
        action: MutationAction,
        scope: &Scope,
        description: impl Into<String>,
        id: Option<&str>,
        source: ServiceError,
    ) -> Self {
        Self::RemoteMutation {
            action,
            scope: scope.clone(),
            description: description.into(),
            id: id.map(str::to_owned),
            source,
        }
    }

    pub fn state_mismatch(
        scope: &Scope,
        id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::StateMismatch {
            scope: scope.clone(),
            id: id.into(),
            description: description.into(),
        }
    }
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_ref()
        .map(|id| format!(" (id {id})"))
        .unwrap_or_default()
}
