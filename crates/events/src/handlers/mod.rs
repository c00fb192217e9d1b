//! Application event handlers and the topics they serve.

pub mod user;

use std::sync::Arc;

use crate::notify::Notifier;
use crate::system::{EventSystem, EventsError};

/// Every topic the application emits.
pub const TOPICS: &[&str] = &[user::USER_CREATED, user::USER_UPDATED];

/// Register the application's topics and handlers on both lanes.
pub fn register_all(system: &mut EventSystem, notifier: Arc<dyn Notifier>) -> Result<(), EventsError> {
    system.register_topics(TOPICS)?;
    user::register(system, notifier)
}
