//! NGSIv2 subscription client.
//!
//! [`NgsiClient`] implements [`SubscriptionService`](bellatrix_core::SubscriptionService)
//! against the `/v2/subscriptions` resource of an Orion context broker.

mod client;

pub use client::{DEFAULT_PAGE_SIZE, DEFAULT_TIMEOUT, NgsiClient, NgsiClientOptions};
