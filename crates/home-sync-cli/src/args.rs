//! CLI argument definitions using clap

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use home_sync_core::CONFIG_DIR_ENV;

/// Sync the chrome-home new tab config with GitHub, Gitee or a Gitee snippet
#[derive(Parser, Debug)]
#[command(name = "home-sync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding sync-storage.json / local-storage.json
    #[arg(long, global = true, env = CONFIG_DIR_ENV)]
    pub config_dir: Option<PathBuf>,

    /// GitHub API root
    #[arg(long, global = true, env = "HOME_SYNC_GITHUB_API")]
    pub github_api: Option<String>,

    /// Gitee API root (also used for snippets)
    #[arg(long, global = true, env = "HOME_SYNC_GITEE_API")]
    pub gitee_api: Option<String>,

    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the current config
    Get,

    /// Merge a JSON patch into the config ("-" reads stdin)
    Set {
        patch: String,
    },

    /// Replace the local config with the remote one
    Pull,

    /// Merge local edits over the remote config and upload
    Push,

    /// Check that the configured remote is reachable
    Test,

    /// Show sync settings and the last sync time
    Status,

    /// Write the config to a file (stdout when omitted)
    Export {
        file: Option<PathBuf>,
    },

    /// Import a config exported earlier ("-" reads stdin)
    Import {
        file: String,
    },

    /// Pull then push when auto push is configured
    Startup,

    /// Read JSON patches line by line from stdin and auto-push them
    Watch {
        /// Debounce window in milliseconds
        #[arg(long, default_value_t = 1500)]
        debounce_ms: u64,
    },
}

impl Cli {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "home-sync",
            "push",
            "--config-dir",
            "/tmp/home",
            "-vv",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Push));
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/home")));
        assert_eq!(cli.log_filter(), "debug");
    }

    #[test]
    fn watch_debounce_defaults_to_auto_push_window() {
        let cli = Cli::try_parse_from(["home-sync", "watch"]).unwrap();
        assert!(matches!(cli.command, Command::Watch { debounce_ms: 1500 }));
    }
}
