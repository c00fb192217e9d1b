//! Fire-and-forget emission seam used by application code.

use parking_lot::Mutex;

/// What request handlers depend on to publish events.
///
/// Emission never fails from the caller's point of view: problems are logged
/// by the implementation.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, topic: &str, payload: serde_json::Value);
    fn emit_with_delay(&self, topic: &str, payload: serde_json::Value);
}

/// Recorded call on a [`RecordingEmitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct Emitted {
    pub topic: String,
    pub payload: serde_json::Value,
    pub delayed: bool,
}

/// Test double that records every emission instead of dispatching it.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    emitted: Mutex<Vec<Emitted>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<Emitted> {
        self.emitted.lock().clone()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.emitted.lock().iter().filter(|e| e.topic == topic).count()
    }

    fn record(&self, topic: &str, payload: serde_json::Value, delayed: bool) {
        self.emitted.lock().push(Emitted {
            topic: topic.to_string(),
            payload,
            delayed,
        });
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.record(topic, payload, false);
    }

    fn emit_with_delay(&self, topic: &str, payload: serde_json::Value) {
        self.record(topic, payload, true);
    }
}
