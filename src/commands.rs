//! CLI definition
//!
//! `botswarm [SERVER] [COUNT] [ACTION]`. Positionals that are left out are
//! asked for interactively (see [`crate::prompt`]) unless `--no-prompt`.

use crate::config::SwarmConfig;
use clap::Parser;
use std::path::PathBuf;

/// botswarm - Spin up a swarm of bot sessions against one server
#[derive(Parser, Debug, Default)]
#[command(name = "botswarm")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Server address (host[:port])
    pub server: Option<String>,

    /// Number of bots to start
    pub count: Option<usize>,

    /// Chat line or /command each bot sends once it is in
    pub action: Option<String>,

    /// Path to config file (default: ~/.config/botswarm/config.yaml)
    #[arg(short, long, env = "BOTSWARM_CONFIG")]
    pub config: Option<PathBuf>,

    // =========================================================================
    // SWARM OVERRIDES
    // =========================================================================
    /// Maximum connect attempts in flight during ramp-up
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Per-attempt connect timeout in milliseconds
    #[arg(long = "timeout-ms")]
    pub timeout_ms: Option<u64>,

    /// Run a random action on every bot at this interval
    #[arg(long = "action-interval-ms")]
    pub action_interval_ms: Option<u64>,

    // =========================================================================
    // OUTPUT CONTROL
    // =========================================================================
    /// Print the ramp-up summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Use the in-memory transport instead of the network
    #[arg(long)]
    pub dry_run: bool,

    /// Never prompt; SERVER and COUNT must be given and ACTION defaults to none
    #[arg(long)]
    pub no_prompt: bool,

    /// Suppress non-essential output (errors only)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable verbose/debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply command-line overrides on top of the file configuration
    pub fn apply_overrides(&self, config: &mut SwarmConfig) {
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.connect_timeout_ms = timeout_ms;
        }
        if let Some(interval) = self.action_interval_ms {
            config.action_interval_ms = Some(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positionals() {
        let cli = Cli::try_parse_from(["botswarm", "play.example.net:25566", "25", "/spawn"]).unwrap();
        assert_eq!(cli.server.as_deref(), Some("play.example.net:25566"));
        assert_eq!(cli.count, Some(25));
        assert_eq!(cli.action.as_deref(), Some("/spawn"));
    }

    #[test]
    fn test_positionals_optional() {
        let cli = Cli::try_parse_from(["botswarm"]).unwrap();
        assert!(cli.server.is_none());
        assert!(cli.count.is_none());
        assert!(cli.action.is_none());
    }

    #[test]
    fn test_rejects_non_numeric_count() {
        assert!(Cli::try_parse_from(["botswarm", "localhost", "many"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "botswarm",
            "localhost",
            "5",
            "--concurrency",
            "10",
            "--timeout-ms",
            "500",
            "--action-interval-ms",
            "750",
        ])
        .unwrap();

        let mut config = SwarmConfig::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.concurrency, 10);
        assert_eq!(config.connect_timeout_ms, 500);
        assert_eq!(config.action_interval_ms, Some(750));
        assert_eq!(config.settle_delay_ms, 100);
    }

    #[test]
    fn test_no_prompt_flag() {
        let cli = Cli::try_parse_from(["botswarm", "--no-prompt", "localhost", "5"]).unwrap();
        assert!(cli.no_prompt);
        assert!(cli.action.is_none());
        assert!(!Cli::try_parse_from(["botswarm", "localhost"]).unwrap().no_prompt);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["botswarm", "-q", "-v"]).is_err());
    }
}
