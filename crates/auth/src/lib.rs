//! `authn-auth` — bearer-token authentication boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: persistence
//! is reached through [`UserLookup`], transport through the raw header value
//! passed to [`Authenticator::authenticate`].

pub mod claims;
pub mod error;
pub mod gate;
pub mod lookup;
pub mod password;
pub mod principal;
pub mod resolver;
pub mod token;

pub use claims::{validate_claims, Claims, ClaimsValidationError};
pub use error::AuthError;
pub use gate::{extract_bearer, Authenticator, DEFAULT_ACCESS_TOKEN_TTL_MINUTES};
pub use lookup::{LookupError, UserLookup};
pub use password::{hash_password, verify_password, PasswordError, PasswordHasher};
pub use principal::{AuthUser, Principal};
pub use resolver::PrincipalResolver;
pub use token::{SecretProvider, StaticSecret, TokenCodec, TokenError};
