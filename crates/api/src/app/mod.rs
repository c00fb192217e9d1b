//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: the gate, the user store and the event emitter
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs and payload checks
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let protected = middleware::protect(routes::protected_router(), services.auth.clone());

    Router::new()
        .merge(routes::public_router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
