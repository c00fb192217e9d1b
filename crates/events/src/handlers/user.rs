//! Reactions to user lifecycle events.

use std::sync::Arc;

use authn_core::UserId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::event::Event;
use crate::handler::{EventHandler, Execution, HandlerError, Reaction};
use crate::notify::{Notifier, confirmation_token};
use crate::system::{EventSystem, EventsError, Lane};
use crate::topic::TopicMatcher;

pub const USER_CREATED: &str = "user:created";
pub const USER_UPDATED: &str = "user:updated";

/// Public copy of a user carried in user event payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

pub struct UserEventHandler {
    notifier: Arc<dyn Notifier>,
}

impl UserEventHandler {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    fn on_created(&self, event: &Event) -> Result<Reaction, HandlerError> {
        let user: UserSnapshot = event.payload_as()?;
        let notifier = self.notifier.clone();

        Ok(Box::new(move || {
            let token = confirmation_token();
            if let Err(e) = notifier.send_confirmation(&user.email, &token) {
                warn!(user_id = %user.id, error = %e, "confirmation not sent");
            }
            info!(user_id = %user.id, email = %user.email, "new user registered");
        }))
    }
}

impl EventHandler for UserEventHandler {
    fn handle(&self, event: &Event) -> Result<Option<Reaction>, HandlerError> {
        match event.topic() {
            USER_CREATED => self.on_created(event).map(Some),
            other => {
                warn!(topic = other, event_id = %event.id(), "unexpected topic for user handler");
                Ok(None)
            }
        }
    }
}

/// Bind the user handler to the `user:` topics on both lanes.
pub fn register(system: &mut EventSystem, notifier: Arc<dyn Notifier>) -> Result<(), EventsError> {
    let handler: Arc<dyn EventHandler> = Arc::new(UserEventHandler::new(notifier));
    system.register_handler(
        Lane::Immediate,
        "user_event_immediate",
        TopicMatcher::prefix("user:"),
        handler.clone(),
        Execution::Pooled,
    )?;
    system.register_handler(
        Lane::Delayed,
        "user_event_delayed",
        TopicMatcher::prefix("user:"),
        handler,
        Execution::Pooled,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::emitter::EventEmitter;
    use crate::handlers::register_all;
    use crate::notify::RecordingNotifier;
    use crate::system::EventsConfig;

    fn snapshot(email: &str) -> UserSnapshot {
        UserSnapshot {
            id: UserId::new(),
            name: "Ada".into(),
            email: email.into(),
        }
    }

    fn system(notifier: Arc<RecordingNotifier>, delay: Duration) -> EventSystem {
        let mut system = EventSystem::new(EventsConfig {
            immediate_workers: 2,
            delayed_workers: 2,
            delay,
        });
        register_all(&mut system, notifier).unwrap();
        system.init().unwrap();
        system
    }

    #[test]
    fn created_user_gets_exactly_one_confirmation() {
        let notifier = Arc::new(RecordingNotifier::new());
        let system = system(notifier.clone(), Duration::ZERO);

        let user = snapshot("ada@example.com");
        system.emit(USER_CREATED, serde_json::to_value(&user).unwrap());
        system.close();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].email, "ada@example.com");
        assert!(!sent[0].token.is_empty());
    }

    #[test]
    fn delayed_lane_sends_after_close_drains() {
        let notifier = Arc::new(RecordingNotifier::new());
        let system = system(notifier.clone(), Duration::from_millis(40));

        system.emit_with_delay(USER_CREATED, serde_json::to_value(snapshot("b@example.com")).unwrap());
        assert_eq!(notifier.count_for("b@example.com"), 0);
        system.close();

        assert_eq!(notifier.count_for("b@example.com"), 1);
    }

    #[test]
    fn updated_topic_is_matched_but_has_no_reaction() {
        let handler = UserEventHandler::new(Arc::new(RecordingNotifier::new()));
        let event = Event::new(USER_UPDATED, serde_json::to_value(snapshot("c@example.com")).unwrap());
        assert!(handler.handle(&event).unwrap().is_none());
    }

    #[test]
    fn malformed_payload_is_a_handler_error() {
        let notifier = Arc::new(RecordingNotifier::new());
        let handler = UserEventHandler::new(notifier.clone());
        let event = Event::new(USER_CREATED, serde_json::json!({ "email": 42 }));

        let err = handler.handle(&event).err().expect("payload rejected");
        assert!(matches!(err, HandlerError::Payload { .. }));
        assert!(notifier.sent().is_empty());
    }

    #[test]
    fn bad_payload_on_the_bus_is_swallowed() {
        let notifier = Arc::new(RecordingNotifier::new());
        let system = system(notifier.clone(), Duration::ZERO);

        system.emit(USER_CREATED, serde_json::json!("not a user"));
        system.close();

        assert!(notifier.sent().is_empty());
    }
}
