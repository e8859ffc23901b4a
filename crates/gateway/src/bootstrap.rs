//! AppState construction, background-task spawning and the shutdown
//! sequence, extracted from `main.rs`.

use std::sync::Arc;
use std::time::Duration;

use sha2::{Digest, Sha256};

use sk_domain::config::{Config, ConfigSeverity};
use sk_sessions::{SessionLifecycleService, Sweeper};

use crate::directory::ConfigUserDirectory;
use crate::state::AppState;

/// Validate config, restore persisted sessions and return a fully-wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── User directory ───────────────────────────────────────────────
    let users = Arc::new(ConfigUserDirectory::from_config(&config.users));
    tracing::info!(users = users.len(), "user directory ready");

    // ── Session lifecycle ────────────────────────────────────────────
    let sessions = Arc::new(SessionLifecycleService::from_config(&config.sessions));
    let store_path = config.sessions.store_path();
    let restored = sessions.restore_from_durable_store(&store_path);
    tracing::info!(
        restored,
        path = %store_path.display(),
        timeout_sec = config.sessions.timeout_sec,
        sweep_on_touch = config.sessions.sweep_on_touch,
        "session store loaded"
    );

    // ── Admin token (read once, hash for constant-time comparison) ──
    let admin_token_hash = {
        let env_var = &config.server.admin_token_env;
        match std::env::var(env_var).ok().filter(|t| !t.is_empty()) {
            Some(t) => {
                tracing::info!(source = %format!("env:{env_var}"), "admin bearer-token auth enabled");
                Some(Sha256::digest(t.as_bytes()).to_vec())
            }
            None => {
                tracing::warn!("admin endpoints DISABLED; set the {env_var} env var to enable them");
                None
            }
        }
    };

    Ok(AppState {
        config,
        sessions,
        users,
        admin_token_hash,
    })
}

/// Spawn the background sweeper when `sessions.sweep_interval_sec > 0`.
///
/// Call this **after** [`build_app_state`] when running the HTTP server.
pub fn spawn_background_tasks(state: &AppState) -> Option<Sweeper> {
    let period = state.config.sessions.sweep_interval_sec;
    if period == 0 {
        tracing::info!("background sweeper disabled (sweep_interval_sec = 0)");
        return None;
    }
    Some(Sweeper::spawn(
        state.sessions.clone(),
        Duration::from_secs(period),
    ))
}

/// Stop background work and persist the surviving sessions.  Never fails:
/// a persistence error is logged and shutdown carries on.
pub async fn shutdown(state: &AppState, sweeper: Option<Sweeper>) {
    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }

    let sessions = state.sessions.clone();
    let path = state.config.sessions.store_path();
    let persisted =
        tokio::task::spawn_blocking(move || sessions.persist_to_durable_store(&path)).await;

    match persisted {
        Ok(Some(written)) => tracing::info!(written, "session info saved"),
        Ok(None) => tracing::warn!("sessions were not persisted"),
        Err(e) => tracing::error!(error = %e, "session persistence task failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sk_domain::config::UserEntry;

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.sessions.state_path = dir.to_path_buf();
        config.users.push(UserEntry {
            username: "alice".into(),
            password_sha256: "0".repeat(64),
            admin: false,
            disabled: false,
        });
        config
    }

    #[test]
    fn invalid_config_refuses_to_boot() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.sessions.timeout_sec = 0;
        assert!(build_app_state(Arc::new(config)).is_err());
    }

    #[tokio::test]
    async fn shutdown_persists_and_boot_restores() {
        let dir = tempfile::tempdir().unwrap();
        let config = Arc::new(config_in(dir.path()));

        let state = build_app_state(config.clone()).unwrap();
        state.sessions.store().register(sk_sessions::SessionRecord::new(
            "0123456789abcdef",
            "alice",
            chrono::Utc::now(),
            sk_sessions::ClientInfo::default(),
        ));
        let sweeper = spawn_background_tasks(&state);
        assert!(sweeper.is_some());
        shutdown(&state, sweeper).await;

        let rebooted = build_app_state(config).unwrap();
        assert!(rebooted.sessions.lookup("0123456789abcdef").is_some());
    }
}
