//! # bellatrix-core
//!
//! Building blocks for reconciling declared NGSIv2 subscriptions against a
//! context broker.
//!
//! - [`subscription`]: the NGSIv2 subscription model and its delivery outcome
//! - [`state`]: the declared state document and the tagging step
//! - [`marker`]: the ownership marker used to recognise managed subscriptions
//! - [`diff`]: description-keyed add/delete diff and per-scope patches
//! - [`service`]: the remote subscription capability trait
//! - [`memory`]: an in-memory implementation of that trait
//!
//! ## Example
//!
//! ```ignore
//! use bellatrix_core::{DeclaredState, OwnershipMarker, diff_subscriptions, owned_subscriptions};
//!
//! let marker = OwnershipMarker::new("staging_");
//! let state = DeclaredState::from_path("state.json")?.tag(&marker);
//! for request in state.requests() {
//!     let listed = service.list(&request.scope()).await?;
//!     let owned = owned_subscriptions(listed, &marker);
//!     let diff = diff_subscriptions(&request.subscriptions, &owned);
//! }
//! ```

pub mod diff;
pub mod error;
pub mod marker;
pub mod memory;
pub mod scope;
pub mod service;
pub mod state;
pub mod subscription;

pub use diff::{SubscriptionDiff, SubscriptionsPatch, diff_subscriptions, owned_subscriptions};
pub use error::{InputError, MutationAction, ReconcileError, ReconcileResult, ServiceError};
pub use marker::{DEFAULT_MANAGED_MARKER, OwnershipMarker};
pub use memory::{InMemorySubscriptionService, ServiceCall};
pub use scope::Scope;
pub use service::{DynSubscriptionService, SubscriptionService};
pub use state::{ClientOptions, DeclaredState, SubscriptionRequest, TaggedState};
pub use subscription::{
    EntitySelector, HttpCustomTarget, HttpTarget, Notification, NotificationOutcome,
    SubjectCondition, Subscription, SubscriptionStatus, SubscriptionSubject,
};
