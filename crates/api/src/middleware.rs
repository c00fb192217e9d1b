use std::sync::Arc;

use axum::{
    Router,
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use authn_auth::{AuthError, Authenticator, UserLookup};

use crate::app::errors;

pub struct AuthState<L> {
    pub auth: Arc<Authenticator<L>>,
}

impl<L> AuthState<L> {
    pub fn new(auth: Arc<Authenticator<L>>) -> Self {
        Self { auth }
    }
}

impl<L> Clone for AuthState<L> {
    fn clone(&self) -> Self {
        Self {
            auth: self.auth.clone(),
        }
    }
}

/// Reject the request unless it carries a valid bearer token for an existing
/// user; on success the [`authn_auth::Principal`] is stored in the request
/// extensions for [`crate::context::CurrentUser`].
pub async fn auth_middleware<L: UserLookup>(
    State(state): State<AuthState<L>>,
    mut req: Request,
    next: Next,
) -> Response {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => match value.to_str() {
            Ok(value) => Some(value.to_owned()),
            Err(_) => return errors::auth_error_to_response(&AuthError::InvalidHeaderFormat),
        },
    };

    match state.auth.authenticate(header.as_deref()).await {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => errors::auth_error_to_response(&e),
    }
}

/// Put every route of `router` behind the gate.
pub fn protect<L: UserLookup>(router: Router, auth: Arc<Authenticator<L>>) -> Router {
    router.layer(axum::middleware::from_fn_with_state(
        AuthState::new(auth),
        auth_middleware::<L>,
    ))
}
