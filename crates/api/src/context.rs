use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Response,
};
use tracing::error;

use authn_auth::Principal;

use crate::app::errors;

/// The authenticated user of the current request.
///
/// Only available behind [`crate::middleware::protect`]; using it on an
/// unprotected route is a wiring bug and answers 500.
#[derive(Clone)]
pub struct CurrentUser<U>(pub Principal<U>);

#[async_trait]
impl<S, U> FromRequestParts<S> for CurrentUser<U>
where
    S: Send + Sync,
    U: Clone + Send + Sync + 'static,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Principal<U>>() {
            Some(principal) => Ok(Self(principal.clone())),
            None => {
                error!(path = %parts.uri.path(), "no principal in request context");
                Err(errors::internal_error())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::{Request, StatusCode};

    use crate::store::UserRecord;

    #[tokio::test]
    async fn missing_principal_is_an_internal_error() {
        let (mut parts, _) = Request::builder().uri("/me").body(()).unwrap().into_parts();
        let rejection = CurrentUser::<UserRecord>::from_request_parts(&mut parts, &())
            .await
            .err()
            .expect("request without principal is rejected");
        assert_eq!(rejection.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
