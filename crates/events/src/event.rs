use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handler::HandlerError;

/// An emitted occurrence: topic plus a JSON copy of the domain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    topic: String,
    payload: serde_json::Value,
    occurred_at: DateTime<Utc>,
}

impl Event {
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            topic: topic.into(),
            payload,
            occurred_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Decode the payload into the type a handler expects.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        T::deserialize(&self.payload).map_err(|e| HandlerError::Payload {
            topic: self.topic.clone(),
            expected: core::any::type_name::<T>(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ping {
        n: u32,
    }

    #[test]
    fn payload_decodes_into_the_expected_type() {
        let event = Event::new("ping", serde_json::json!({ "n": 7 }));
        assert_eq!(event.payload_as::<Ping>().unwrap(), Ping { n: 7 });
    }

    #[test]
    fn payload_mismatch_is_an_error_value() {
        let event = Event::new("ping", serde_json::json!("not a ping"));
        let err = event.payload_as::<Ping>().unwrap_err();
        assert!(matches!(err, HandlerError::Payload { ref topic, .. } if topic == "ping"));
    }
}
