//! Outbound user notifications.

use parking_lot::Mutex;
use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tracing::info;

/// Length of a generated confirmation token.
pub const CONFIRMATION_TOKEN_LEN: usize = 22;

/// Random URL-safe token sent to a new user to confirm their address.
pub fn confirmation_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("notification to {recipient} failed: {reason}")]
    Delivery { recipient: String, reason: String },
}

pub trait Notifier: Send + Sync {
    fn send_confirmation(&self, email: &str, token: &str) -> Result<(), NotifyError>;
}

/// Writes notifications to the log. Used until a mail transport exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_confirmation(&self, email: &str, token: &str) -> Result<(), NotifyError> {
        info!(email, token, "sending confirmation");
        Ok(())
    }
}

/// A confirmation captured by [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    pub email: String,
    pub token: String,
}

/// Test double capturing every confirmation it is asked to send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentConfirmation>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentConfirmation> {
        self.sent.lock().clone()
    }

    pub fn count_for(&self, email: &str) -> usize {
        self.sent.lock().iter().filter(|s| s.email == email).count()
    }
}

impl Notifier for RecordingNotifier {
    fn send_confirmation(&self, email: &str, token: &str) -> Result<(), NotifyError> {
        self.sent.lock().push(SentConfirmation {
            email: email.to_string(),
            token: token.to_string(),
        });
        Ok(())
    }
}
