use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{error, info, warn};

use authn_events::USER_CREATED;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::CurrentUser;
use crate::store::{NewUser, UserRecord};

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// Endpoints that need an authenticated user.
pub fn protected_router() -> Router {
    Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterRequest>,
) -> Response {
    let mut field_errors = body.validate();
    match services.users.email_taken(&body.email) {
        Ok(true) => field_errors.add("email", "user with this email already exists"),
        Ok(false) => {}
        Err(e) => return errors::store_error_to_response(e),
    }
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors.into_map());
    }

    // Hashing is CPU-bound; run it on the blocking pool.
    let auth = services.auth.clone();
    let password = body.password;
    let digest = match tokio::task::spawn_blocking(move || auth.hash_password(&password)).await {
        Ok(Ok(digest)) => digest,
        Ok(Err(e)) => {
            error!(error = %e, "password hashing failed");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "could not create user, try again",
            );
        }
        Err(e) => {
            error!(error = %e, "password hashing task failed");
            return errors::internal_error();
        }
    };

    let user = match services.users.insert(NewUser {
        name: body.name.trim().to_string(),
        email: body.email.trim().to_string(),
        password_hash: digest,
    }) {
        Ok(user) => user,
        Err(e) => return errors::store_error_to_response(e),
    };

    match serde_json::to_value(user.snapshot()) {
        Ok(payload) => {
            // Emission blocks until each lane's dispatch loop accepts the job.
            let events = services.events.clone();
            let emitted =
                tokio::task::spawn_blocking(move || events.emit(USER_CREATED, payload)).await;
            if let Err(e) = emitted {
                error!(user_id = %user.id, error = %e, "user:created emit task failed");
            }
        }
        Err(e) => warn!(user_id = %user.id, error = %e, "user:created payload not serializable"),
    }
    info!(user_id = %user.id, "user registered");

    (StatusCode::CREATED, Json(dto::UserResponse::from(&user))).into_response()
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::LoginRequest>,
) -> Response {
    let field_errors = body.validate();
    if !field_errors.is_empty() {
        return errors::validation_error(field_errors.into_map());
    }

    let user = match services.users.find_by_email(body.email.trim()) {
        Ok(Some(user)) => user,
        Ok(None) => return invalid_credentials(),
        Err(e) => return errors::store_error_to_response(e),
    };

    let auth = services.auth.clone();
    let password = body.password;
    let verified = {
        let user = user.clone();
        tokio::task::spawn_blocking(move || auth.verify_credentials(&user, &password)).await
    };
    match verified {
        Ok(true) => {}
        Ok(false) => return invalid_credentials(),
        Err(e) => {
            error!(error = %e, "credential check task failed");
            return errors::internal_error();
        }
    }

    match services.auth.issue_access_token(&user.email) {
        Ok(token) => (StatusCode::CREATED, Json(dto::TokenResponse { token })).into_response(),
        Err(e) => {
            error!(user_id = %user.id, error = %e, "token signing failed");
            errors::internal_error()
        }
    }
}

pub async fn me(CurrentUser(principal): CurrentUser<UserRecord>) -> impl IntoResponse {
    Json(dto::UserResponse::from(principal.user()))
}

/// Tokens are stateless; there is nothing to revoke server-side.
pub async fn logout(CurrentUser(_principal): CurrentUser<UserRecord>) -> StatusCode {
    StatusCode::NO_CONTENT
}

fn invalid_credentials() -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_credentials", "invalid credentials")
}
