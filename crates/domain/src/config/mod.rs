mod observability;
mod server;
mod sessions;
mod users;

pub use observability::*;
pub use server::*;
pub use sessions::*;
pub use users::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.sessions.timeout_sec == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.timeout_sec".into(),
                message: "timeout must be greater than 0".into(),
            });
        }

        if self.sessions.store_file.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.store_file".into(),
                message: "store file name must not be empty".into(),
            });
        }

        if self.sessions.cookie_name.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "sessions.cookie_name".into(),
                message: "cookie name must not be empty".into(),
            });
        }

        if self.observability.log_filter.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "observability.log_filter".into(),
                message: "empty log filter; nothing but errors will be logged".into(),
            });
        }

        // Expired sessions would only leave at shutdown.
        if !self.sessions.sweep_on_touch && self.sessions.sweep_interval_sec == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "sessions.sweep_interval_sec".into(),
                message: "both lazy and background sweeping are disabled".into(),
            });
        }

        if self.users.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "users".into(),
                message: "no users configured; nobody can log in".into(),
            });
        }

        let mut seen = HashSet::new();
        for (i, user) in self.users.iter().enumerate() {
            if user.username.is_empty() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("users[{i}].username"),
                    message: "username must not be empty".into(),
                });
            } else if !seen.insert(user.username.as_str()) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("users[{i}].username"),
                    message: format!("duplicate username \"{}\"", user.username),
                });
            }
            if !user.has_valid_hash() {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Error,
                    field: format!("users[{i}].password_sha256"),
                    message: "expected 64 hex characters".into(),
                });
            }
        }

        errors
    }
}
