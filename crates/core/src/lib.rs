//! `authn-core` — shared primitives for the identity service.
//!
//! This crate contains no IO: identifiers, the clock abstraction and the
//! error type for parsing them.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use id::UserId;
