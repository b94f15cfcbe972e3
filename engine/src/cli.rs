//! CLI interface for Subtrack
//!
//! This module provides the command-line interface using clap's derive API.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Subtrack subscription and trial tracker
///
/// Serves the HTTP API, sends trial-ending reminders and looks up
/// cancellation steps for online services.
#[derive(Parser, Debug)]
#[command(name = "subtrack")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API until interrupted
    Serve {
        /// Address to bind (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Send due trial reminders for all users
    Reminders {
        /// Check as of this date (YYYY-MM-DD) instead of today
        #[arg(long, value_name = "DATE")]
        date: Option<NaiveDate>,
    },

    /// Show cancellation steps for a service
    Guide {
        /// Service name, e.g. "Netflix"
        service: String,

        /// Regenerate even if a cached guide exists
        #[arg(long)]
        refresh: bool,
    },

    /// Normalize numbered steps from a file or stdin
    Normalize {
        /// Input file (reads stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Run system diagnostics
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from(["subtrack", "--json", "--log", "debug", "doctor"]);
        assert!(cli.json);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Doctor));
    }

    #[test]
    fn test_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["subtrack", "doctor", "--config", "/tmp/subtrack.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/subtrack.toml")));
    }

    #[test]
    fn test_serve_command() {
        let cli = Cli::parse_from(["subtrack", "serve", "--host", "0.0.0.0", "--port", "9000"]);
        if let Command::Serve { host, port } = cli.command {
            assert_eq!(host.as_deref(), Some("0.0.0.0"));
            assert_eq!(port, Some(9000));
        } else {
            panic!("Expected Serve command");
        }
    }

    #[test]
    fn test_reminders_date() {
        let cli = Cli::parse_from(["subtrack", "reminders", "--date", "2026-03-01"]);
        if let Command::Reminders { date } = cli.command {
            assert_eq!(date, NaiveDate::from_ymd_opt(2026, 3, 1));
        } else {
            panic!("Expected Reminders command");
        }
    }

    #[test]
    fn test_reminders_rejects_bad_date() {
        assert!(Cli::try_parse_from(["subtrack", "reminders", "--date", "March 1"]).is_err());
    }

    #[test]
    fn test_guide_command() {
        let cli = Cli::parse_from(["subtrack", "guide", "Disney Plus", "--refresh"]);
        if let Command::Guide { service, refresh } = cli.command {
            assert_eq!(service, "Disney Plus");
            assert!(refresh);
        } else {
            panic!("Expected Guide command");
        }
    }

    #[test]
    fn test_normalize_stdin() {
        let cli = Cli::parse_from(["subtrack", "normalize"]);
        assert!(matches!(cli.command, Command::Normalize { file: None }));
    }
}
