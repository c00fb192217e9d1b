//! Topic-addressed in-process event bus (one lane).
//!
//! A bus owns a topic registry and a handler registry, both fixed before the
//! bus is started. On `emit`, every handler whose matcher accepts the topic
//! is asked for a reaction; pooled reactions go to the bus's [`Dispatcher`],
//! optionally with a not-before delay (the delayed lane).
//!
//! Emission is fire-and-forget: handler failures are logged here and never
//! reach the emitting caller. Only caller mistakes (unknown topic, bus not
//! started) come back as [`BusError`].

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::dispatcher::Dispatcher;
use crate::event::Event;
use crate::handler::{EventHandler, Execution};
use crate::topic::TopicMatcher;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("topic `{0}` is not registered")]
    UnknownTopic(String),

    #[error("handler `{0}` is already registered")]
    DuplicateHandler(String),

    #[error("bus `{0}` has not been started")]
    NotStarted(String),

    #[error("bus `{0}` is already started; registrations are closed")]
    Sealed(String),

    #[error("payload could not be serialized: {0}")]
    Payload(String),
}

/// Outcome of a successful emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub event_id: Uuid,
    /// Number of handlers whose matcher accepted the topic.
    pub matched: usize,
}

struct Registration {
    key: String,
    matcher: TopicMatcher,
    handler: Arc<dyn EventHandler>,
    execution: Execution,
}

pub struct Bus {
    name: String,
    topics: HashSet<String>,
    registrations: Vec<Registration>,
    dispatcher: Option<Arc<Dispatcher>>,
    delay: Option<Duration>,
}

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topics: HashSet::new(),
            registrations: Vec::new(),
            dispatcher: None,
            delay: None,
        }
    }

    /// Defer every pooled reaction on this bus by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn is_started(&self) -> bool {
        self.dispatcher.is_some()
    }

    pub fn dispatcher(&self) -> Option<&Arc<Dispatcher>> {
        self.dispatcher.as_ref()
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.topics.contains(topic)
    }

    pub fn register_topics<I, S>(&mut self, topics: I) -> Result<(), BusError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_open()?;
        self.topics.extend(topics.into_iter().map(Into::into));
        Ok(())
    }

    pub fn register_handler(
        &mut self,
        key: impl Into<String>,
        matcher: impl Into<TopicMatcher>,
        handler: Arc<dyn EventHandler>,
        execution: Execution,
    ) -> Result<(), BusError> {
        self.ensure_open()?;
        let key = key.into();
        if self.registrations.iter().any(|r| r.key == key) {
            return Err(BusError::DuplicateHandler(key));
        }
        self.registrations.push(Registration {
            key,
            matcher: matcher.into(),
            handler,
            execution,
        });
        Ok(())
    }

    /// Attach the worker pool and seal the registries.
    pub fn start(&mut self, dispatcher: Arc<Dispatcher>) -> Result<(), BusError> {
        self.ensure_open()?;
        self.dispatcher = Some(dispatcher);
        Ok(())
    }

    /// Serialize `payload` and emit it on `topic`.
    pub fn emit_serialized<T: serde::Serialize>(
        &self,
        topic: &str,
        payload: &T,
    ) -> Result<Delivery, BusError> {
        let payload = serde_json::to_value(payload).map_err(|e| BusError::Payload(e.to_string()))?;
        self.emit(topic, payload)
    }

    pub fn emit(&self, topic: &str, payload: serde_json::Value) -> Result<Delivery, BusError> {
        let dispatcher = self
            .dispatcher
            .as_ref()
            .ok_or_else(|| BusError::NotStarted(self.name.clone()))?;
        if !self.topics.contains(topic) {
            return Err(BusError::UnknownTopic(topic.to_string()));
        }

        let event = Event::new(topic, payload);
        let mut matched = 0;

        for registration in self.registrations.iter().filter(|r| r.matcher.matches(topic)) {
            matched += 1;

            let reaction = match registration.handler.handle(&event) {
                Ok(Some(reaction)) => reaction,
                Ok(None) => continue,
                Err(e) => {
                    warn!(
                        bus = %self.name,
                        handler = %registration.key,
                        topic,
                        event_id = %event.id(),
                        error = %e,
                        "event handler failed"
                    );
                    continue;
                }
            };

            match registration.execution {
                Execution::Inline => reaction(),
                Execution::Pooled => {
                    let sent = match self.delay {
                        None => dispatcher.send(reaction),
                        Some(delay) => match Instant::now().checked_add(delay) {
                            Some(at) => dispatcher.send_at(reaction, at),
                            None => {
                                error!(
                                    bus = %self.name,
                                    handler = %registration.key,
                                    topic,
                                    delay_secs = delay.as_secs(),
                                    "reaction delay out of range, dropped"
                                );
                                continue;
                            }
                        },
                    };
                    if let Err(e) = sent {
                        error!(
                            bus = %self.name,
                            handler = %registration.key,
                            topic,
                            error = %e,
                            "could not schedule reaction"
                        );
                    }
                }
            }
        }

        if matched == 0 {
            debug!(bus = %self.name, topic, "no handler matched");
        }

        Ok(Delivery {
            event_id: event.id(),
            matched,
        })
    }

    fn ensure_open(&self) -> Result<(), BusError> {
        if self.is_started() {
            return Err(BusError::Sealed(self.name.clone()));
        }
        Ok(())
    }
}

impl core::fmt::Debug for Bus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.name)
            .field("topics", &self.topics)
            .field(
                "handlers",
                &self.registrations.iter().map(|r| r.key.as_str()).collect::<Vec<_>>(),
            )
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::dispatcher::DispatcherConfig;
    use crate::handler::{HandlerError, Reaction};

    fn started(mut bus: Bus) -> Bus {
        let config = DispatcherConfig::default()
            .with_name(bus.name().to_string())
            .with_workers(2);
        bus.start(Arc::new(Dispatcher::start(config).unwrap())).unwrap();
        bus
    }

    fn counting_handler(count: Arc<AtomicUsize>) -> Arc<dyn EventHandler> {
        Arc::new(move |_: &Event| -> Result<Option<Reaction>, HandlerError> {
            let count = count.clone();
            Ok(Some(Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })))
        })
    }

    #[test]
    fn unknown_topic_is_an_error_not_a_panic() {
        let mut bus = Bus::new("t");
        bus.register_topics(["user:created"]).unwrap();
        let bus = started(bus);

        assert_eq!(
            bus.emit("user:deleted", serde_json::Value::Null),
            Err(BusError::UnknownTopic("user:deleted".into()))
        );
        bus.dispatcher().unwrap().close();
    }

    #[test]
    fn emit_before_start_is_rejected() {
        let mut bus = Bus::new("t");
        bus.register_topics(["a"]).unwrap();
        assert_eq!(bus.emit("a", serde_json::Value::Null), Err(BusError::NotStarted("t".into())));
    }

    #[test]
    fn registrations_are_sealed_after_start() {
        let mut bus = started(Bus::new("t"));
        assert_eq!(bus.register_topics(["late"]), Err(BusError::Sealed("t".into())));
        bus.dispatcher().unwrap().close();
    }

    #[test]
    fn duplicate_handler_keys_are_rejected() {
        let mut bus = Bus::new("t");
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler("h", "*", counting_handler(count.clone()), Execution::Pooled)
            .unwrap();
        assert_eq!(
            bus.register_handler("h", "*", counting_handler(count), Execution::Pooled),
            Err(BusError::DuplicateHandler("h".into()))
        );
    }

    #[test]
    fn pooled_reaction_runs_once_per_matching_handler() {
        let mut bus = Bus::new("t");
        bus.register_topics(["user:created", "user:updated", "org:created"]).unwrap();
        let users = Arc::new(AtomicUsize::new(0));
        let created = Arc::new(AtomicUsize::new(0));
        bus.register_handler("users", "user:*", counting_handler(users.clone()), Execution::Pooled)
            .unwrap();
        bus.register_handler(
            "created",
            TopicMatcher::exact("user:created"),
            counting_handler(created.clone()),
            Execution::Pooled,
        )
        .unwrap();
        let bus = started(bus);

        assert_eq!(bus.emit("user:created", serde_json::json!({})).unwrap().matched, 2);
        assert_eq!(bus.emit("user:updated", serde_json::json!({})).unwrap().matched, 1);
        assert_eq!(bus.emit("org:created", serde_json::json!({})).unwrap().matched, 0);

        bus.dispatcher().unwrap().close();
        assert_eq!(users.load(Ordering::SeqCst), 2);
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn inline_reaction_runs_before_emit_returns() {
        let mut bus = Bus::new("t");
        bus.register_topics(["a"]).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler("inline", "a", counting_handler(count.clone()), Execution::Inline)
            .unwrap();
        let bus = started(bus);

        bus.emit("a", serde_json::Value::Null).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        bus.dispatcher().unwrap().close();
    }

    #[test]
    fn failing_handler_does_not_stop_the_others() {
        let mut bus = Bus::new("t");
        bus.register_topics(["a"]).unwrap();
        let failing: Arc<dyn EventHandler> =
            Arc::new(|_: &Event| -> Result<Option<Reaction>, HandlerError> {
                Err(HandlerError::Failed("boom".into()))
            });
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler("failing", "a", failing, Execution::Pooled).unwrap();
        bus.register_handler("counting", "a", counting_handler(count.clone()), Execution::Pooled)
            .unwrap();
        let bus = started(bus);

        let delivery = bus.emit("a", serde_json::Value::Null).unwrap();
        assert_eq!(delivery.matched, 2);
        bus.dispatcher().unwrap().close();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn emit_on_a_closed_pool_is_swallowed() {
        let mut bus = Bus::new("t");
        bus.register_topics(["a"]).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler("counting", "a", counting_handler(count.clone()), Execution::Pooled)
            .unwrap();
        let bus = started(bus);
        bus.dispatcher().unwrap().close();

        assert!(bus.emit("a", serde_json::Value::Null).is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unrepresentable_delay_drops_the_reaction_without_panicking() {
        let mut bus = Bus::new("t").with_delay(Duration::from_secs(u64::MAX));
        bus.register_topics(["a"]).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        bus.register_handler("counting", "a", counting_handler(count.clone()), Execution::Pooled)
            .unwrap();
        let bus = started(bus);

        assert_eq!(bus.emit("a", serde_json::Value::Null).unwrap().matched, 1);
        let dispatcher = bus.dispatcher().unwrap();
        dispatcher.close();
        assert_eq!(dispatcher.stats().submitted, 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn serialized_payload_reaches_the_handler() {
        #[derive(serde::Serialize)]
        struct Ping {
            n: u32,
        }

        let mut bus = Bus::new("t");
        bus.register_topics(["ping"]).unwrap();
        let seen = Arc::new(AtomicUsize::new(0));
        let handler: Arc<dyn EventHandler> = {
            let seen = seen.clone();
            Arc::new(move |e: &Event| -> Result<Option<Reaction>, HandlerError> {
                seen.store(e.payload()["n"].as_u64().unwrap_or(0) as usize, Ordering::SeqCst);
                Ok(None)
            })
        };
        bus.register_handler("ping", "ping", handler, Execution::Inline).unwrap();
        let bus = started(bus);

        bus.emit_serialized("ping", &Ping { n: 42 }).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 42);
        bus.dispatcher().unwrap().close();
    }
}
