//! Client-renderable authentication failures.

use thiserror::Error;

use crate::token::TokenError;

/// A classified authentication failure.
///
/// Each variant maps to an HTTP status and a stable machine code; the
/// `Display` output is the client-facing message. Internal causes are kept
/// out of the message and surfaced to logs only.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("No authorization header present")]
    MissingHeader,

    #[error("authorization header format must be bearer type")]
    InvalidHeaderFormat,

    #[error("malformed token")]
    MalformedToken,

    #[error("token is expired")]
    TokenExpired,

    #[error("token is not valid yet")]
    TokenNotYetValid,

    #[error("token signature is invalid")]
    InvalidSignature,

    #[error("Unexpected signing method: {0}")]
    UnexpectedSigningMethod(String),

    #[error("Token is invalid")]
    InvalidToken,

    #[error("user not found")]
    UserNotFound,

    #[error("internal server error")]
    Internal,
}

impl AuthError {
    /// HTTP status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            AuthError::UserNotFound => 404,
            AuthError::Internal => 500,
            _ => 400,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "missing_authorization_header",
            AuthError::InvalidHeaderFormat => "invalid_authorization_header",
            AuthError::MalformedToken => "malformed_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::UnexpectedSigningMethod(_) => "unexpected_signing_method",
            AuthError::InvalidToken => "invalid_token",
            AuthError::UserNotFound => "user_not_found",
            AuthError::Internal => "internal_error",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status())
    }
}

impl From<TokenError> for AuthError {
    fn from(value: TokenError) -> Self {
        match value {
            TokenError::Malformed => AuthError::MalformedToken,
            TokenError::Expired => AuthError::TokenExpired,
            TokenError::NotYetValid => AuthError::TokenNotYetValid,
            TokenError::InvalidSignature => AuthError::InvalidSignature,
            TokenError::UnexpectedAlgorithm(alg) => AuthError::UnexpectedSigningMethod(alg),
            TokenError::Invalid(_) => AuthError::InvalidToken,
            // Only produced when issuing, never by parse.
            TokenError::InvalidLifetime(_) | TokenError::Signing(_) => AuthError::Internal,
        }
    }
}
