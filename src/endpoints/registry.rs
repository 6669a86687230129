//! # Endpoint registry: named outputs and their subscribers.
//!
//! Maps `(owner, endpoint)` to the set of destinations that receive a copy of
//! every message published on that endpoint.
//!
//! ## Architecture
//! ```text
//! Context::publish("data", payload)
//!     └─► supervisor inbox ─► EndpointRegistry::publish(owner, "data", msg)
//!                                  ├─► copy → "C"
//!                                  └─► copy → "ui"
//! ```
//!
//! ## Rules
//! - Only the supervisor task mutates the registry (no locking).
//! - `subscribe`/`unsubscribe` are idempotent.
//! - A subscriber receives at most one copy per publication (set semantics).
//! - Publishing to an endpoint without subscribers drops the message.
//! - Delivery order across subscribers is unspecified.

use std::collections::{BTreeSet, HashMap};

use crate::error::MessageError;
use crate::message::Message;

type EndpointKey = (String, String);

/// Per-worker endpoint subscriptions.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    entries: HashMap<EndpointKey, BTreeSet<String>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscriber` to `owner`'s `endpoint`.
    ///
    /// Returns `true` if the subscriber was not already present.
    pub fn subscribe(&mut self, owner: &str, endpoint: &str, subscriber: &str) -> bool {
        self.entries
            .entry((owner.to_string(), endpoint.to_string()))
            .or_default()
            .insert(subscriber.to_string())
    }

    /// Removes `subscriber` from `owner`'s `endpoint`.
    ///
    /// Returns `true` if it was present.
    pub fn unsubscribe(&mut self, owner: &str, endpoint: &str, subscriber: &str) -> bool {
        let key = (owner.to_string(), endpoint.to_string());
        let Some(set) = self.entries.get_mut(&key) else {
            return false;
        };
        let removed = set.remove(subscriber);
        if set.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }

    /// Drops `subscriber` from every endpoint it is attached to.
    pub fn remove_subscriber(&mut self, subscriber: &str) {
        self.entries.retain(|_, set| {
            set.remove(subscriber);
            !set.is_empty()
        });
    }

    /// Snapshot of the current subscribers, sorted.
    pub fn subscribers(&self, owner: &str, endpoint: &str) -> Vec<String> {
        self.entries
            .get(&(owner.to_string(), endpoint.to_string()))
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Builds one copy of `message` per current subscriber, addressed to it.
    ///
    /// The subscriber set is read once; the returned deliveries are independent
    /// of later registry changes.
    pub fn publish(
        &self,
        owner: &str,
        endpoint: &str,
        message: &Message,
    ) -> Result<Vec<Message>, MessageError> {
        self.subscribers(owner, endpoint)
            .into_iter()
            .map(|sub| message.readdressed([sub]))
            .collect()
    }

    /// Number of endpoints with at least one subscriber.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
