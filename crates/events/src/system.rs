//! Two-lane event system: an immediate bus and a delayed bus, each backed by
//! its own dispatcher.
//!
//! Lifecycle: register topics and handlers, `init()` once, share behind an
//! `Arc` for emission, `close()` on shutdown. Both dispatchers observe one
//! cancellation token so [`EventSystem::cancel`] stops everything at once.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::bus::{Bus, BusError};
use crate::cancel::CancellationToken;
use crate::dispatcher::{DispatchError, Dispatcher, DispatcherConfig, DispatcherStats, max_parallelism};
use crate::emitter::EventEmitter;
use crate::handler::{EventHandler, Execution};
use crate::topic::TopicMatcher;

/// Delay applied on the delayed lane unless configured otherwise.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsConfig {
    pub immediate_workers: usize,
    pub delayed_workers: usize,
    pub delay: Duration,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            immediate_workers: max_parallelism(),
            delayed_workers: max_parallelism(),
            delay: DEFAULT_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    Immediate,
    Delayed,
}

impl Lane {
    pub fn as_str(self) -> &'static str {
        match self {
            Lane::Immediate => "immediate",
            Lane::Delayed => "delayed",
        }
    }
}

#[derive(Debug, Error)]
pub enum EventsError {
    #[error(transparent)]
    Bus(#[from] BusError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EventsStats {
    pub immediate: DispatcherStats,
    pub delayed: DispatcherStats,
}

#[derive(Debug)]
pub struct EventSystem {
    config: EventsConfig,
    immediate: Bus,
    delayed: Bus,
    cancel: CancellationToken,
}

impl EventSystem {
    pub fn new(config: EventsConfig) -> Self {
        let delayed = Bus::new("events-delayed").with_delay(config.delay);
        Self {
            config,
            immediate: Bus::new("events-immediate"),
            delayed,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &EventsConfig {
        &self.config
    }

    /// Register topics on both lanes.
    pub fn register_topics(&mut self, topics: &[&str]) -> Result<(), EventsError> {
        self.immediate.register_topics(topics.iter().copied())?;
        self.delayed.register_topics(topics.iter().copied())?;
        Ok(())
    }

    pub fn register_handler(
        &mut self,
        lane: Lane,
        key: impl Into<String>,
        matcher: impl Into<TopicMatcher>,
        handler: Arc<dyn EventHandler>,
        execution: Execution,
    ) -> Result<(), EventsError> {
        self.lane_mut(lane)
            .register_handler(key, matcher, handler, execution)?;
        Ok(())
    }

    /// Start both lanes' worker pools. Calling it again is a no-op.
    pub fn init(&mut self) -> Result<(), EventsError> {
        if self.is_running() {
            return Ok(());
        }

        let immediate = Dispatcher::start_with_cancellation(
            DispatcherConfig::default()
                .with_name(self.immediate.name().to_string())
                .with_workers(self.config.immediate_workers),
            self.cancel.clone(),
        )?;
        let delayed = match Dispatcher::start_with_cancellation(
            DispatcherConfig::default()
                .with_name(self.delayed.name().to_string())
                .with_workers(self.config.delayed_workers),
            self.cancel.clone(),
        ) {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                immediate.close();
                return Err(e.into());
            }
        };

        self.immediate.start(Arc::new(immediate))?;
        self.delayed.start(Arc::new(delayed))?;

        info!(
            immediate_workers = self.config.immediate_workers,
            delayed_workers = self.config.delayed_workers,
            delay_ms = self.config.delay.as_millis() as u64,
            "event system started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.immediate.is_started()
    }

    /// Emit on a specific lane, surfacing caller mistakes.
    pub fn try_emit(
        &self,
        lane: Lane,
        topic: &str,
        payload: serde_json::Value,
    ) -> Result<crate::bus::Delivery, BusError> {
        self.lane(lane).emit(topic, payload)
    }

    pub fn lane(&self, lane: Lane) -> &Bus {
        match lane {
            Lane::Immediate => &self.immediate,
            Lane::Delayed => &self.delayed,
        }
    }

    fn lane_mut(&mut self, lane: Lane) -> &mut Bus {
        match lane {
            Lane::Immediate => &mut self.immediate,
            Lane::Delayed => &mut self.delayed,
        }
    }

    pub fn stats(&self) -> Option<EventsStats> {
        Some(EventsStats {
            immediate: self.immediate.dispatcher()?.stats(),
            delayed: self.delayed.dispatcher()?.stats(),
        })
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drain both lanes: every accepted reaction runs, including delayed
    /// ones still waiting for their start time.
    pub fn close(&self) {
        info!("event system closing, waiting for pending tasks");
        for lane in [Lane::Immediate, Lane::Delayed] {
            if let Some(dispatcher) = self.lane(lane).dispatcher() {
                dispatcher.close();
            }
        }
    }

    /// Stop both lanes without draining.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    fn emit_on(&self, lane: Lane, topic: &str, payload: serde_json::Value) {
        if let Err(e) = self.try_emit(lane, topic, payload) {
            warn!(lane = lane.as_str(), topic, error = %e, "event not emitted");
        }
    }
}

impl EventEmitter for EventSystem {
    fn emit(&self, topic: &str, payload: serde_json::Value) {
        self.emit_on(Lane::Immediate, topic, payload);
    }

    fn emit_with_delay(&self, topic: &str, payload: serde_json::Value) {
        self.emit_on(Lane::Delayed, topic, payload);
    }
}
