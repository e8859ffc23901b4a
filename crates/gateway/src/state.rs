use std::sync::Arc;

use sk_domain::config::Config;
use sk_domain::directory::UserDirectory;
use sk_sessions::SessionLifecycleService;

/// Shared application state passed to all API handlers.
///
/// Built once at process start; handlers reach every collaborator through
/// it rather than through globals.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionLifecycleService>,
    pub users: Arc<dyn UserDirectory>,
    /// SHA-256 of the admin bearer token.  `None` disables admin endpoints.
    pub admin_token_hash: Option<Vec<u8>>,
}
