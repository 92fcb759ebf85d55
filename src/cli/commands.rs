use clap::{Parser, Subcommand, ValueEnum};

use crate::browser::BrowserEngine;
use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "voucher-claim")]
#[command(about = "Automated voucher claimer for Tokopedia accounts")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (extension optional)
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Claim every available voucher for one account
    Claim,

    /// Claim with target voucher rules (config/target_voucher.json required)
    Target,

    /// Claim vouchers for every configured account
    Multi {
        /// Run accounts one after another or concurrently
        #[arg(short, long, value_enum, default_value_t = RunMode::Sequential)]
        mode: RunMode,

        /// Concurrent browser sessions in parallel mode
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Watch the voucher page and claim new vouchers as they appear
    Monitor {
        /// Check interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after this many checks
        #[arg(long)]
        max_checks: Option<u32>,

        /// Only report new vouchers, never claim
        #[arg(long)]
        no_claim: bool,
    },

    /// Show claim statistics and recent history
    Stats {
        /// Output format: table or json
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Show detected platform and available browsers
    Platform,

    /// Start a browser session, open the site and report where it landed
    CheckBrowser {
        /// Browser to use instead of the configured one (chrome, firefox, edge)
        #[arg(short, long)]
        engine: Option<BrowserEngine>,
    },

    /// Initialize data directory, database and sample configuration
    Init,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RunMode {
    Sequential,
    Parallel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_multi_parallel() {
        let cli = Cli::try_parse_from(["voucher-claim", "multi", "--mode", "parallel", "--workers", "2"]).unwrap();
        match cli.command {
            Commands::Multi { mode, workers } => {
                assert_eq!(mode, RunMode::Parallel);
                assert_eq!(workers, Some(2));
            }
            _ => panic!("expected multi"),
        }
        assert_eq!(cli.config, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn test_parse_monitor_flags() {
        let cli = Cli::try_parse_from([
            "voucher-claim",
            "monitor",
            "--interval",
            "60",
            "--max-checks",
            "5",
            "--no-claim",
            "--config",
            "custom.toml",
        ])
        .unwrap();
        match cli.command {
            Commands::Monitor {
                interval,
                max_checks,
                no_claim,
            } => {
                assert_eq!(interval, Some(60));
                assert_eq!(max_checks, Some(5));
                assert!(no_claim);
            }
            _ => panic!("expected monitor"),
        }
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_parse_check_browser_engine() {
        let cli = Cli::try_parse_from(["voucher-claim", "check-browser", "--engine", "Firefox"]).unwrap();
        match cli.command {
            Commands::CheckBrowser { engine } => assert_eq!(engine, Some(BrowserEngine::Firefox)),
            _ => panic!("expected check-browser"),
        }

        let cli = Cli::try_parse_from(["voucher-claim", "check-browser"]).unwrap();
        assert!(matches!(cli.command, Commands::CheckBrowser { engine: None }));
    }

    #[test]
    fn test_check_browser_rejects_unknown_engine() {
        assert!(Cli::try_parse_from(["voucher-claim", "check-browser", "--engine", "safari"]).is_err());
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["voucher-claim", "multi", "--mode", "swarm"]).is_err());
    }
}
