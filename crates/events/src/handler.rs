use thiserror::Error;

use crate::event::Event;

/// Deferred side effect produced by a handler.
pub type Reaction = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("payload for `{topic}` is not a {expected}: {reason}")]
    Payload {
        topic: String,
        expected: &'static str,
        reason: String,
    },

    #[error("handler failed: {0}")]
    Failed(String),
}

/// Reacts to events on the topics it was registered for.
///
/// `handle` runs synchronously inside `emit` and must stay cheap: it decides
/// whether a reaction is needed and captures what the reaction needs. The
/// returned closure is what actually does the work.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event) -> Result<Option<Reaction>, HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&Event) -> Result<Option<Reaction>, HandlerError> + Send + Sync,
{
    fn handle(&self, event: &Event) -> Result<Option<Reaction>, HandlerError> {
        self(event)
    }
}

/// Where a handler's reaction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// On the emitting thread, before `emit` returns.
    Inline,
    /// On the lane's worker pool.
    #[default]
    Pooled,
}
