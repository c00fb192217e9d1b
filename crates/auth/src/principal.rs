use authn_core::UserId;

/// Capability the gate needs from a user record.
///
/// Keeps the auth boundary independent of the full user schema: any record
/// that can report its id, login identity and stored password hash can be
/// authenticated.
pub trait AuthUser {
    fn id(&self) -> UserId;

    /// Login identity (email).
    fn email(&self) -> &str;

    /// Stored password digest. Never rendered outward.
    fn password_hash(&self) -> &str;
}

/// The authenticated identity attached to a request.
///
/// Only the principal resolver constructs these, after a token has been
/// validated and its subject looked up, so a `Principal` is never partially
/// populated.
#[derive(Clone, PartialEq, Eq)]
pub struct Principal<U> {
    user: U,
}

impl<U: AuthUser> Principal<U> {
    pub(crate) fn new(user: U) -> Self {
        Self { user }
    }

    pub fn id(&self) -> UserId {
        self.user.id()
    }

    pub fn email(&self) -> &str {
        self.user.email()
    }

    /// The full user record the lookup returned.
    pub fn user(&self) -> &U {
        &self.user
    }

    pub fn into_user(self) -> U {
        self.user
    }
}

impl<U: AuthUser> core::fmt::Debug for Principal<U> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.user.id())
            .field("email", &self.user.email())
            .finish_non_exhaustive()
    }
}
