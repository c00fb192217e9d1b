use axum::{Router, routing::get};

pub mod auth;
pub mod system;

/// Router for endpoints that need no token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .merge(auth::public_router())
}

/// Router for all authenticated endpoints.
pub fn protected_router() -> Router {
    auth::protected_router()
}
