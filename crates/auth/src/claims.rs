use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT claims carried by every bearer token.
///
/// Timestamps are whole seconds on the wire (`iat`, `nbf`, `exp`), so values
/// built here are truncated to the second to compare equal after a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the login identity (email) the token was issued for.
    pub sub: String,

    /// Unique token id.
    pub jti: Uuid,

    #[serde(rename = "iat", with = "chrono::serde::ts_seconds")]
    pub issued_at: DateTime<Utc>,

    #[serde(rename = "nbf", with = "chrono::serde::ts_seconds")]
    pub not_before: DateTime<Utc>,

    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    /// Claims valid from `now` for `ttl`, with a fresh token id.
    ///
    /// `None` when `now + ttl` is not a representable timestamp.
    pub fn new(subject: impl Into<String>, now: DateTime<Utc>, ttl: Duration) -> Option<Self> {
        let now = truncate_to_seconds(now);
        let expires_at = now.checked_add_signed(ttl)?;
        Some(Self {
            sub: subject.into(),
            jti: Uuid::new_v4(),
            issued_at: now,
            not_before: now,
            expires_at,
        })
    }

    pub fn subject(&self) -> &str {
        &self.sub
    }

    pub fn lifetime(&self) -> Duration {
        self.expires_at - self.issued_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClaimsValidationError {
    #[error("token is expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Check the claims' time window against `now`.
///
/// Signature verification happens before this in the token codec; this only
/// looks at the timestamps.
pub fn validate_claims(claims: &Claims, now: DateTime<Utc>) -> Result<(), ClaimsValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(ClaimsValidationError::InvalidTimeWindow);
    }
    if now >= claims.expires_at {
        return Err(ClaimsValidationError::Expired);
    }
    if now < claims.not_before {
        return Err(ClaimsValidationError::NotYetValid);
    }
    Ok(())
}

fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn new_claims_truncate_subsecond_precision() {
        let now = DateTime::from_timestamp(1_700_000_000, 999_000_000).unwrap();
        let claims = Claims::new("a@example.com", now, Duration::minutes(5)).unwrap();
        assert_eq!(claims.issued_at, at(1_700_000_000));
        assert_eq!(claims.not_before, claims.issued_at);
        assert_eq!(claims.lifetime(), Duration::minutes(5));
    }

    #[test]
    fn window_checks() {
        let claims = Claims::new("a@example.com", at(1_000), Duration::seconds(60)).unwrap();

        assert_eq!(validate_claims(&claims, at(1_000)), Ok(()));
        assert_eq!(validate_claims(&claims, at(1_059)), Ok(()));
        assert_eq!(
            validate_claims(&claims, at(1_060)),
            Err(ClaimsValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims, at(999)),
            Err(ClaimsValidationError::NotYetValid)
        );
    }

    #[test]
    fn inverted_window_is_rejected_before_time_checks() {
        let mut claims = Claims::new("a@example.com", at(1_000), Duration::seconds(60)).unwrap();
        claims.expires_at = claims.issued_at;
        assert_eq!(
            validate_claims(&claims, at(1_000)),
            Err(ClaimsValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn unrepresentable_expiry_is_none() {
        assert!(Claims::new("a@example.com", at(1_000), Duration::MAX).is_none());
        assert!(Claims::new("a@example.com", DateTime::<Utc>::MAX_UTC, Duration::seconds(1)).is_none());
    }

    #[test]
    fn wire_names_are_registered_claim_names() {
        let claims = Claims::new("a@example.com", at(1_000), Duration::seconds(60)).unwrap();
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["sub"], "a@example.com");
        assert_eq!(json["iat"], 1_000);
        assert_eq!(json["nbf"], 1_000);
        assert_eq!(json["exp"], 1_060);
        assert!(json["jti"].is_string());
    }
}
