//! NGSIv2 subscription model.
//!
//! One type covers both the declared definitions read from the state file and
//! the records listed from the context broker. Broker-managed fields (`id`,
//! the notification outcome and statuses such as `failed`) are only ever
//! populated on observed subscriptions and are stripped before a create
//! request.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// An NGSIv2 subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Broker-assigned identifier. Only used for delete calls, never for matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Description, carrying the ownership marker once tagged.
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub subject: SubscriptionSubject,

    #[serde(default)]
    pub notification: Notification,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expires: Option<OffsetDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SubscriptionStatus>,

    /// Minimum seconds between two notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throttling: Option<u64>,

    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Subscription {
    /// Copy of this definition suitable for a create request: the id, the
    /// notification outcome and any broker-written status are cleared. A
    /// requested `active`, `inactive` or `oneshot` status is kept.
    pub fn to_create_request(&self) -> Self {
        let mut request = self.clone();
        request.id = None;
        request.status = self.status.filter(|status| status.is_requestable());
        request.notification.clear_outcome();
        request
    }

    /// Delivery health summary reported by the broker.
    pub fn outcome(&self) -> NotificationOutcome<'_> {
        NotificationOutcome {
            last_failure: self.notification.last_failure.as_ref(),
            last_failure_reason: self.notification.last_failure_reason.as_deref(),
            last_success_code: self.notification.last_success_code,
        }
    }
}

/// Subscription lifecycle status reported by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Failed,
    Expired,
    Oneshot,
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    /// Statuses a client may set on create. The others are written by the broker.
    pub fn is_requestable(self) -> bool {
        matches!(self, Self::Active | Self::Inactive | Self::Oneshot)
    }
}

/// Which entities and which changes trigger the subscription.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSubject {
    #[serde(default)]
    pub entities: Vec<EntitySelector>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<SubjectCondition>,
}

/// Entity matcher: exact id/type or regex patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_pattern: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_pattern: Option<String>,

    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCondition {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<String>,

    /// Filter expression (`q`, `mq`, `georel`, ...), passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alteration_types: Vec<String>,

    /// Fields not modelled above, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Notification target plus the delivery outcome the broker records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpTarget>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_custom: Option<HttpCustomTarget>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except_attrs: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs_format: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only_changed_attrs: Option<bool>,

    // Outcome, written by the broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times_sent: Option<u64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_notification: Option<OffsetDateTime>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_failure: Option<OffsetDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_failure_reason: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub last_success: Option<OffsetDateTime>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_success_code: Option<u16>,

    /// Fields not modelled above (`mqtt`, `covered`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notification {
    fn clear_outcome(&mut self) {
        self.times_sent = None;
        self.last_notification = None;
        self.last_failure = None;
        self.last_failure_reason = None;
        self.last_success = None;
        self.last_success_code = None;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpTarget {
    pub url: String,

    /// `timeout` and other target options, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HttpTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpCustomTarget {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qs: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,

    /// `json`, `ngsi`, `timeout` and other target options, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Borrowed view of the delivery-health fields of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationOutcome<'a> {
    pub last_failure: Option<&'a OffsetDateTime>,
    pub last_failure_reason: Option<&'a str>,
    pub last_success_code: Option<u16>,
}

impl NotificationOutcome<'_> {
    /// Whether the broker recorded a delivery failure.
    ///
    /// Failed iff a last failure timestamp is present, or a last success code
    /// is recorded and is >= 300. Some receivers answer 404 on a successful
    /// delivery, so an absent code never counts as failure.
    pub fn is_failed(&self) -> bool {
        self.last_failure.is_some() || self.last_success_code.is_some_and(|code| code >= 300)
    }
}
