use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Session registry configuration: inactivity timeout, eviction strategy
/// and where the registry is saved across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Inactivity timeout in seconds.  A session whose last access is older
    /// than this is evicted at the next sweep.  Also used as the token
    /// max-age handed to the transport.
    #[serde(default = "d_timeout_sec")]
    pub timeout_sec: u64,

    /// Directory holding the durable session file.
    #[serde(default = "d_state_path")]
    pub state_path: PathBuf,

    /// File name of the durable session file under `state_path`.
    #[serde(default = "d_store_file")]
    pub store_file: String,

    /// Run a full expiry sweep before every touch.
    #[serde(default = "d_true")]
    pub sweep_on_touch: bool,

    /// Period of the background sweeper in seconds.  `0` disables it.
    #[serde(default = "d_sweep_interval_sec")]
    pub sweep_interval_sec: u64,

    /// Name of the cookie carrying the session token.
    #[serde(default = "d_cookie_name")]
    pub cookie_name: String,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            timeout_sec: d_timeout_sec(),
            state_path: d_state_path(),
            store_file: d_store_file(),
            sweep_on_touch: true,
            sweep_interval_sec: d_sweep_interval_sec(),
            cookie_name: d_cookie_name(),
        }
    }
}

impl SessionsConfig {
    /// Full path of the durable session file.
    pub fn store_path(&self) -> PathBuf {
        self.state_path.join(&self.store_file)
    }
}

fn d_timeout_sec() -> u64 {
    1800
}
fn d_state_path() -> PathBuf {
    PathBuf::from("./data")
}
fn d_store_file() -> String {
    "sessions.txt".into()
}
fn d_true() -> bool {
    true
}
fn d_sweep_interval_sec() -> u64 {
    60
}
fn d_cookie_name() -> String {
    "sessionkeeper_sid".into()
}
