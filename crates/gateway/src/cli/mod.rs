pub mod config;
pub mod inspect;

use clap::{Parser, Subcommand};

/// SessionKeeper: login sessions with idle expiry and durable restarts.
#[derive(Debug, Parser)]
#[command(name = "sessionkeeper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Offline inspection of the durable session file.
    #[command(subcommand)]
    Sessions(SessionsCommand),
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// Decode the session file and print one redacted row per record.
    Inspect {
        /// Session file to read (defaults to the configured store path).
        #[arg(long)]
        path: Option<String>,
    },
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `SK_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.
///
/// A missing file yields the defaults.
///
/// [`Config`]: sk_domain::config::Config
pub fn load_config() -> anyhow::Result<(sk_domain::config::Config, String)> {
    let config_path =
        std::env::var("SK_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        sk_domain::config::Config::default()
    };

    Ok((config, config_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["sessionkeeper"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn parses_sessions_inspect_with_path() {
        let cli =
            Cli::try_parse_from(["sessionkeeper", "sessions", "inspect", "--path", "/tmp/s.txt"])
                .unwrap();
        match cli.command {
            Some(Command::Sessions(SessionsCommand::Inspect { path })) => {
                assert_eq!(path.as_deref(), Some("/tmp/s.txt"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
