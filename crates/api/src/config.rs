//! Process configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use authn_auth::DEFAULT_ACCESS_TOKEN_TTL_MINUTES;
use authn_events::{DEFAULT_DELAY, EventsConfig, max_parallelism};
use thiserror::Error;
use tracing::warn;

pub const BIND_ADDR: &str = "AUTHN_BIND_ADDR";
pub const JWT_SECRET: &str = "AUTHN_JWT_SECRET";
pub const ACCESS_TOKEN_TTL_MINUTES: &str = "AUTHN_ACCESS_TOKEN_TTL_MINUTES";
pub const IMMEDIATE_WORKERS: &str = "AUTHN_IMMEDIATE_WORKERS";
pub const DELAYED_WORKERS: &str = "AUTHN_DELAYED_WORKERS";
pub const CONFIRMATION_DELAY_SECS: &str = "AUTHN_CONFIRMATION_DELAY_SECS";

const DEV_JWT_SECRET: &str = "dev-secret";

/// One year.
pub const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 366 * 24 * 60;
/// One day.
pub const MAX_CONFIRMATION_DELAY_SECS: u64 = 24 * 60 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value `{value}` for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub access_token_ttl_minutes: i64,
    pub events: EventsConfig,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl_minutes", &self.access_token_ttl_minutes)
            .field("events", &self.events)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = parse_or(&lookup, BIND_ADDR, || SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let jwt_secret = match lookup(JWT_SECRET).filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                warn!("{JWT_SECRET} not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let access_token_ttl_minutes: i64 =
            parse_or(&lookup, ACCESS_TOKEN_TTL_MINUTES, || DEFAULT_ACCESS_TOKEN_TTL_MINUTES)?;
        if !(1..=MAX_ACCESS_TOKEN_TTL_MINUTES).contains(&access_token_ttl_minutes) {
            return Err(ConfigError::Invalid {
                key: ACCESS_TOKEN_TTL_MINUTES,
                value: access_token_ttl_minutes.to_string(),
            });
        }

        let delay_secs: u64 =
            parse_or(&lookup, CONFIRMATION_DELAY_SECS, || DEFAULT_DELAY.as_secs())?;
        if delay_secs > MAX_CONFIRMATION_DELAY_SECS {
            return Err(ConfigError::Invalid {
                key: CONFIRMATION_DELAY_SECS,
                value: delay_secs.to_string(),
            });
        }

        let events = EventsConfig {
            immediate_workers: parse_or(&lookup, IMMEDIATE_WORKERS, max_parallelism)?,
            delayed_workers: parse_or(&lookup, DELAYED_WORKERS, max_parallelism)?,
            delay: Duration::from_secs(delay_secs),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            access_token_ttl_minutes,
            events,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: impl FnOnce() -> T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default()),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(cfg.access_token_ttl_minutes, 60);
        assert_eq!(cfg.events.delay, Duration::from_secs(15));
        assert_eq!(cfg.events.immediate_workers, max_parallelism());
    }

    #[test]
    fn values_are_read_from_the_lookup() {
        let cfg = config(&[
            (BIND_ADDR, "127.0.0.1:9000"),
            (JWT_SECRET, "s3cret"),
            (ACCESS_TOKEN_TTL_MINUTES, "5"),
            (IMMEDIATE_WORKERS, "3"),
            (DELAYED_WORKERS, "1"),
            (CONFIRMATION_DELAY_SECS, "0"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.jwt_secret, "s3cret");
        assert_eq!(cfg.access_token_ttl_minutes, 5);
        assert_eq!(cfg.events.immediate_workers, 3);
        assert_eq!(cfg.events.delayed_workers, 1);
        assert_eq!(cfg.events.delay, Duration::ZERO);
    }

    #[test]
    fn unparseable_values_name_the_key() {
        let err = config(&[(IMMEDIATE_WORKERS, "many")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: IMMEDIATE_WORKERS,
                value: "many".into()
            }
        );
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        assert!(matches!(
            config(&[(ACCESS_TOKEN_TTL_MINUTES, "0")]),
            Err(ConfigError::Invalid { key: ACCESS_TOKEN_TTL_MINUTES, .. })
        ));
    }

    #[test]
    fn ttl_beyond_a_year_is_rejected() {
        let max = MAX_ACCESS_TOKEN_TTL_MINUTES.to_string();
        assert_eq!(
            config(&[(ACCESS_TOKEN_TTL_MINUTES, &max)])
                .unwrap()
                .access_token_ttl_minutes,
            MAX_ACCESS_TOKEN_TTL_MINUTES
        );
        assert_eq!(
            config(&[(ACCESS_TOKEN_TTL_MINUTES, "1000000000000")]).unwrap_err(),
            ConfigError::Invalid {
                key: ACCESS_TOKEN_TTL_MINUTES,
                value: "1000000000000".into()
            }
        );
    }

    #[test]
    fn confirmation_delay_beyond_a_day_is_rejected() {
        let max = MAX_CONFIRMATION_DELAY_SECS.to_string();
        assert_eq!(
            config(&[(CONFIRMATION_DELAY_SECS, &max)]).unwrap().events.delay,
            Duration::from_secs(MAX_CONFIRMATION_DELAY_SECS)
        );
        assert_eq!(
            config(&[(CONFIRMATION_DELAY_SECS, "18446744073709551615")]).unwrap_err(),
            ConfigError::Invalid {
                key: CONFIRMATION_DELAY_SECS,
                value: "18446744073709551615".into()
            }
        );
    }

    #[test]
    fn secret_is_redacted_in_debug() {
        let cfg = config(&[(JWT_SECRET, "hunter2")]).unwrap();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }
}
