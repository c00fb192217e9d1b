//! In-process event pipeline.
//!
//! - [`Dispatcher`]: bounded pool of worker threads fed through a rendezvous
//!   queue, with graceful drain and external cancellation.
//! - [`Bus`]: topic registry plus handler registry for one lane.
//! - [`EventSystem`]: the immediate and delayed lanes together, exposed to
//!   application code as an [`EventEmitter`].
//! - [`handlers`]: the application's reactions (user lifecycle).

pub mod bus;
pub mod cancel;
pub mod dispatcher;
pub mod emitter;
pub mod event;
pub mod handler;
pub mod handlers;
pub mod job;
pub mod notify;
pub mod system;
pub mod topic;

mod worker;

pub use bus::{Bus, BusError, Delivery};
pub use cancel::CancellationToken;
pub use dispatcher::{DispatchError, Dispatcher, DispatcherConfig, DispatcherStats, max_parallelism};
pub use emitter::{Emitted, EventEmitter, RecordingEmitter};
pub use event::Event;
pub use handler::{EventHandler, Execution, HandlerError, Reaction};
pub use handlers::user::{USER_CREATED, USER_UPDATED, UserSnapshot};
pub use job::Job;
pub use notify::{LogNotifier, Notifier, NotifyError, RecordingNotifier, confirmation_token};
pub use system::{DEFAULT_DELAY, EventSystem, EventsConfig, EventsError, EventsStats, Lane};
pub use topic::TopicMatcher;
