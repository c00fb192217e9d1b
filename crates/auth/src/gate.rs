//! Authentication gate: header → token → principal.
//!
//! This is the transport-agnostic half of the request gate. The HTTP
//! middleware hands it the raw `Authorization` header value and renders the
//! resulting [`AuthError`] itself.

use tracing::debug;

use crate::error::AuthError;
use crate::lookup::UserLookup;
use crate::password::{PasswordError, PasswordHasher};
use crate::principal::{AuthUser, Principal};
use crate::resolver::PrincipalResolver;
use crate::token::{TokenCodec, TokenError};

/// Default lifetime of access tokens issued by [`Authenticator::issue_access_token`].
pub const DEFAULT_ACCESS_TOKEN_TTL_MINUTES: i64 = 60;

/// Pull the token out of an `Authorization` header value.
///
/// The value must be exactly two whitespace-separated parts, the first being
/// `bearer` in any case.
pub fn extract_bearer(header: Option<&str>) -> Result<&str, AuthError> {
    let header = match header {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(AuthError::MissingHeader),
    };

    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::InvalidHeaderFormat),
    }
}

/// Composes the token codec and principal resolver.
///
/// Construct once at startup and share by `Arc`.
#[derive(Debug)]
pub struct Authenticator<L> {
    codec: TokenCodec,
    resolver: PrincipalResolver<L>,
    hasher: PasswordHasher,
    access_token_ttl_minutes: i64,
}

impl<L: UserLookup> Authenticator<L> {
    pub fn new(codec: TokenCodec, lookup: L) -> Self {
        Self {
            codec,
            resolver: PrincipalResolver::new(lookup),
            hasher: PasswordHasher::new(),
            access_token_ttl_minutes: DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
        }
    }

    pub fn with_access_token_ttl(mut self, minutes: i64) -> Self {
        self.access_token_ttl_minutes = minutes;
        self
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn lookup(&self) -> &L {
        self.resolver.lookup()
    }

    pub fn issue_token(&self, identity: &str, ttl_minutes: i64) -> Result<String, TokenError> {
        self.codec.issue(identity, ttl_minutes)
    }

    /// Issue a token with the configured access-token lifetime.
    pub fn issue_access_token(&self, identity: &str) -> Result<String, TokenError> {
        self.codec.issue(identity, self.access_token_ttl_minutes)
    }

    pub fn hash_password(&self, password: &str) -> Result<String, PasswordError> {
        self.hasher.hash(password)
    }

    pub fn verify_password(&self, password: &str, digest: &str) -> bool {
        self.hasher.verify(password, digest)
    }

    /// Check a login attempt against the user's stored hash.
    pub fn verify_credentials(&self, user: &impl AuthUser, password: &str) -> bool {
        self.hasher.verify(password, user.password_hash())
    }

    /// Run the full gate for one request.
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<Principal<L::User>, AuthError> {
        let token = extract_bearer(authorization).inspect_err(|e| {
            debug!(code = e.code(), "rejected authorization header");
        })?;

        let claims = self.codec.parse(token).map_err(|e| {
            debug!(error = %e, "rejected bearer token");
            AuthError::from(e)
        })?;

        self.resolver.resolve(claims.subject()).await
    }
}
