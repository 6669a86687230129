//! Subscription request payload.

use serde::{Deserialize, Serialize};

use crate::message::Payload;

/// Body of a `THREAD_SUBSCRIBE` / `THREAD_UNSUBSCRIBE` message.
///
/// ```text
/// { "owner": "A", "endpoint": "data", "subscriber": "C" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Worker whose output is subscribed to.
    pub owner: String,
    /// Endpoint name on that worker.
    pub endpoint: String,
    /// Destination that receives the copies.
    pub subscriber: String,
}

impl Subscription {
    pub fn new(
        owner: impl Into<String>,
        endpoint: impl Into<String>,
        subscriber: impl Into<String>,
    ) -> Self {
        Self {
            owner: owner.into(),
            endpoint: endpoint.into(),
            subscriber: subscriber.into(),
        }
    }

    /// Parses a request body; `None` if the payload is missing or malformed.
    pub fn from_payload(payload: Option<&Payload>) -> Option<Self> {
        payload.and_then(|p| Self::deserialize(p).ok())
    }

    pub fn to_payload(&self) -> Payload {
        serde_json::json!({
            "owner": self.owner,
            "endpoint": self.endpoint,
            "subscriber": self.subscriber,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_round_trip() {
        let sub = Subscription::new("A", "data", "C");
        let payload = sub.to_payload();
        assert_eq!(
            payload,
            json!({"owner": "A", "endpoint": "data", "subscriber": "C"})
        );
        assert_eq!(Subscription::from_payload(Some(&payload)), Some(sub));
    }

    #[test]
    fn test_malformed_payload() {
        assert_eq!(Subscription::from_payload(None), None);
        assert_eq!(
            Subscription::from_payload(Some(&json!({"owner": "A"}))),
            None
        );
    }
}
