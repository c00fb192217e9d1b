//! Bearer token codec (JWT, HMAC family only).

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use authn_core::{Clock, SystemClock};

use crate::claims::{validate_claims, Claims, ClaimsValidationError};

/// Algorithms accepted by [`TokenCodec::parse`]. Anything else, including
/// `none` and every asymmetric algorithm, is rejected before verification.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Provides the HMAC signing secret.
pub trait SecretProvider: Send + Sync {
    fn signing_secret(&self) -> &[u8];
}

/// A secret fixed at startup (typically from configuration).
#[derive(Clone)]
pub struct StaticSecret(Vec<u8>);

impl StaticSecret {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self(secret.into())
    }
}

impl core::fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("StaticSecret(<redacted>)")
    }
}

impl SecretProvider for StaticSecret {
    fn signing_secret(&self) -> &[u8] {
        &self.0
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token is expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("unexpected signing method: {0}")]
    UnexpectedAlgorithm(String),

    #[error("token is invalid: {0}")]
    Invalid(String),

    #[error("token lifetime must be positive and representable, got {0} minutes")]
    InvalidLifetime(i64),

    #[error("could not sign token: {0}")]
    Signing(String),
}

impl From<ClaimsValidationError> for TokenError {
    fn from(value: ClaimsValidationError) -> Self {
        match value {
            ClaimsValidationError::Expired => Self::Expired,
            ClaimsValidationError::NotYetValid => Self::NotYetValid,
            ClaimsValidationError::InvalidTimeWindow => Self::Invalid(value.to_string()),
        }
    }
}

fn classify(err: JwtError) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed
        }
        ErrorKind::InvalidSignature => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            TokenError::UnexpectedAlgorithm(err.to_string())
        }
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::ImmatureSignature => TokenError::NotYetValid,
        _ => TokenError::Invalid(err.to_string()),
    }
}

/// Issues and parses signed, time-bounded bearer tokens.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Arc<dyn SecretProvider>,
    clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: Arc<dyn SecretProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { secret, clock }
    }

    /// Codec with a static secret and the system clock.
    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self::new(Arc::new(StaticSecret::new(secret)), Arc::new(SystemClock))
    }

    /// Issue an HS256 token for `subject`, valid for `ttl_minutes` from now.
    pub fn issue(&self, subject: &str, ttl_minutes: i64) -> Result<String, TokenError> {
        if ttl_minutes <= 0 {
            return Err(TokenError::InvalidLifetime(ttl_minutes));
        }
        let claims = Duration::try_minutes(ttl_minutes)
            .and_then(|ttl| Claims::new(subject, self.clock.now(), ttl))
            .ok_or(TokenError::InvalidLifetime(ttl_minutes))?;
        self.sign(&claims)
    }

    /// Sign arbitrary claims with the service secret.
    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.signing_secret()),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify algorithm, signature and time window, returning the claims.
    pub fn parse(&self, token: &str) -> Result<Claims, TokenError> {
        let header = jsonwebtoken::decode_header(token).map_err(classify)?;
        if !HMAC_ALGORITHMS.contains(&header.alg) {
            return Err(TokenError::UnexpectedAlgorithm(format!("{:?}", header.alg)));
        }

        // Time checks run against our clock below, not jsonwebtoken's.
        let mut validation = Validation::new(header.alg);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.set_required_spec_claims(&["sub", "exp", "nbf", "iat"]);

        let data = jsonwebtoken::decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.signing_secret()),
            &validation,
        )
        .map_err(classify)?;

        validate_claims(&data.claims, self.clock.now())?;
        Ok(data.claims)
    }
}
