//! User lookup collaborator (implemented by the persistence layer).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::principal::AuthUser;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("user not found")]
    NotFound,

    /// Storage or transport fault; the message is for logs only.
    #[error("user lookup failed: {0}")]
    Other(String),
}

/// Finds users by login identity.
///
/// Implementations must read fresh state on every call: the gate relies on
/// this to reject users deleted or disabled after their token was issued.
#[async_trait]
pub trait UserLookup: Send + Sync + 'static {
    type User: AuthUser + Clone + Send + Sync + 'static;

    async fn exists_by_identity(&self, identity: &str) -> bool;

    async fn get_by_identity(&self, identity: &str) -> Result<Self::User, LookupError>;
}

#[async_trait]
impl<L> UserLookup for Arc<L>
where
    L: UserLookup + ?Sized,
{
    type User = L::User;

    async fn exists_by_identity(&self, identity: &str) -> bool {
        (**self).exists_by_identity(identity).await
    }

    async fn get_by_identity(&self, identity: &str) -> Result<Self::User, LookupError> {
        (**self).get_by_identity(identity).await
    }
}
