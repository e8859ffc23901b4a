use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Users
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A statically configured account (`[[users]]` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub username: String,
    /// Hex-encoded SHA-256 digest of the password.
    pub password_sha256: String,
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl UserEntry {
    /// Whether `password_sha256` looks like a hex SHA-256 digest.
    pub fn has_valid_hash(&self) -> bool {
        self.password_sha256.len() == 64
            && self.password_sha256.chars().all(|c| c.is_ascii_hexdigit())
    }
}
