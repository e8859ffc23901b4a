//! The user-directory capability.
//!
//! User and group records live outside the session subsystem.  The gateway
//! hands an implementation of [`UserDirectory`] to whoever needs to resolve a
//! principal at login time or flip an account's disabled flag.

use serde::Serialize;

/// Public view of a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub username: String,
    pub admin: bool,
    pub disabled: bool,
}

/// Lookup and credential checks against the user store.
pub trait UserDirectory: Send + Sync {
    /// Return the account for `username`, if one exists.
    fn find(&self, username: &str) -> Option<UserInfo>;

    /// Check `password` against the stored credential.  Unknown users and
    /// disabled accounts never verify.
    fn verify_password(&self, username: &str, password: &str) -> bool;

    /// Set the disabled flag.  Returns `false` when the user does not exist.
    fn set_disabled(&self, username: &str, disabled: bool) -> bool;

    /// All known accounts, in no particular order.
    fn list(&self) -> Vec<UserInfo>;
}
