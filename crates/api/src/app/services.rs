//! Service wiring shared by every route handler.

use std::sync::Arc;

use authn_auth::{Authenticator, TokenCodec};
use authn_events::EventEmitter;

use crate::config::AppConfig;
use crate::store::InMemoryUserStore;

/// The gate, keyed by the in-memory store.
pub type Gate = Authenticator<Arc<InMemoryUserStore>>;

/// Application services (injected into handlers via `Extension`).
pub struct AppServices {
    pub auth: Arc<Gate>,
    pub users: Arc<InMemoryUserStore>,
    pub events: Arc<dyn EventEmitter>,
}

impl AppServices {
    pub fn new(
        auth: Arc<Gate>,
        users: Arc<InMemoryUserStore>,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            auth,
            users,
            events,
        }
    }

    /// Wire a fresh store and gate from configuration.
    pub fn from_config(config: &AppConfig, events: Arc<dyn EventEmitter>) -> Self {
        let users = Arc::new(InMemoryUserStore::new());
        let codec = TokenCodec::with_secret(config.jwt_secret.clone().into_bytes());
        let auth = Authenticator::new(codec, users.clone())
            .with_access_token_ttl(config.access_token_ttl_minutes);
        Self::new(Arc::new(auth), users, events)
    }
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}
