use tracing::{debug, error};

use crate::error::AuthError;
use crate::lookup::{LookupError, UserLookup};
use crate::principal::Principal;

/// Maps a verified token subject to a full principal.
#[derive(Debug, Clone)]
pub struct PrincipalResolver<L> {
    lookup: L,
}

impl<L: UserLookup> PrincipalResolver<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Resolve `identity`, hitting the lookup every time (no caching).
    pub async fn resolve(&self, identity: &str) -> Result<Principal<L::User>, AuthError> {
        if !self.lookup.exists_by_identity(identity).await {
            debug!(identity, "token subject has no matching user");
            return Err(AuthError::UserNotFound);
        }

        match self.lookup.get_by_identity(identity).await {
            Ok(user) => Ok(Principal::new(user)),
            // Deleted between the existence check and the fetch.
            Err(LookupError::NotFound) => Err(AuthError::UserNotFound),
            Err(LookupError::Other(cause)) => {
                error!(identity, error = %cause, "principal lookup failed");
                Err(AuthError::Internal)
            }
        }
    }
}
