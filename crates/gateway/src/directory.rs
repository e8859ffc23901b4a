//! User directory backed by the `[[users]]` config table.
//!
//! Passwords are stored as hex SHA-256 digests.  Verification hashes the
//! candidate and compares in constant time.  The disabled flag can be flipped
//! at runtime but is not written back to the config file.

use std::collections::HashMap;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use sk_domain::config::UserEntry;
use sk_domain::directory::{UserDirectory, UserInfo};

struct Account {
    password_hash: Vec<u8>,
    admin: bool,
    disabled: bool,
}

pub struct ConfigUserDirectory {
    accounts: RwLock<HashMap<String, Account>>,
}

impl ConfigUserDirectory {
    /// Build from config entries.  Entries with an undecodable hash are kept
    /// but can never log in.
    pub fn from_config(users: &[UserEntry]) -> Self {
        let mut accounts = HashMap::new();
        for user in users {
            let password_hash = hex::decode(&user.password_sha256).unwrap_or_else(|_| {
                tracing::warn!(username = %user.username, "invalid password hash, login disabled");
                Vec::new()
            });
            accounts.insert(
                user.username.clone(),
                Account {
                    password_hash,
                    admin: user.admin,
                    disabled: user.disabled,
                },
            );
        }
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }
}

impl UserDirectory for ConfigUserDirectory {
    fn find(&self, username: &str) -> Option<UserInfo> {
        self.accounts.read().get(username).map(|a| UserInfo {
            username: username.to_owned(),
            admin: a.admin,
            disabled: a.disabled,
        })
    }

    fn verify_password(&self, username: &str, password: &str) -> bool {
        let accounts = self.accounts.read();
        let Some(account) = accounts.get(username) else {
            return false;
        };
        if account.disabled || account.password_hash.len() != 32 {
            return false;
        }
        let candidate = Sha256::digest(password.as_bytes());
        bool::from(candidate.ct_eq(account.password_hash.as_slice()))
    }

    fn set_disabled(&self, username: &str, disabled: bool) -> bool {
        match self.accounts.write().get_mut(username) {
            Some(account) => {
                account.disabled = disabled;
                true
            }
            None => false,
        }
    }

    fn list(&self) -> Vec<UserInfo> {
        self.accounts
            .read()
            .iter()
            .map(|(name, a)| UserInfo {
                username: name.clone(),
                admin: a.admin,
                disabled: a.disabled,
            })
            .collect()
    }
}
