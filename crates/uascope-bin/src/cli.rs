// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `monitor`: Subscribe to nodes on a simulated server and print value
//!   updates (default)
//! - `version`: Show version information

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// UA Scope - terminal OPC UA client core
#[derive(Parser, Debug)]
#[command(
    name = "uascope",
    author = "Sylvex <contact@sylvex.io>",
    version = uascope_client::VERSION,
    about = "UA Scope - terminal OPC UA monitoring client",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "UASCOPE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "UASCOPE_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Enable quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the UA Scope CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Monitor node values
    ///
    /// This is the default command when no subcommand is specified.
    /// Connects to the simulated session, subscribes to the given node ids,
    /// and prints one line per value update until interrupted.
    Monitor(MonitorArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `monitor` command.
#[derive(Args, Debug, Clone)]
pub struct MonitorArgs {
    /// Node ids to monitor (e.g. "ns=2;i=1001" or "ns=2;s=Line1.Temp")
    #[arg(default_values_t = vec!["ns=2;i=1001".to_string()])]
    pub nodes: Vec<String>,

    /// Server endpoint URL
    #[arg(
        short,
        long,
        default_value = "opc.tcp://localhost:4840",
        env = "UASCOPE_ENDPOINT"
    )]
    pub endpoint: String,

    /// Publishing interval in milliseconds
    #[arg(long, default_value = "1000")]
    pub publishing_interval_ms: u64,

    /// Stop after this many seconds (0 = run until Ctrl-C)
    #[arg(short, long, default_value = "0")]
    pub duration: u64,
}

impl Default for MonitorArgs {
    fn default() -> Self {
        Self {
            nodes: vec!["ns=2;i=1001".to_string()],
            endpoint: "opc.tcp://localhost:4840".to_string(),
            publishing_interval_ms: 1000,
            duration: 0,
        }
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Monitor` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Monitor(MonitorArgs::default()))
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["uascope"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Monitor(_)));
    }

    #[test]
    fn test_monitor_command() {
        let cli = Cli::parse_from(["uascope", "monitor", "ns=2;i=7", "ns=2;s=Pump"]);
        if let Some(Commands::Monitor(args)) = cli.command {
            assert_eq!(args.nodes, vec!["ns=2;i=7", "ns=2;s=Pump"]);
        } else {
            panic!("Expected Monitor command");
        }
    }

    #[test]
    fn test_endpoint_flag() {
        let cli = Cli::parse_from(["uascope", "monitor", "-e", "opc.tcp://plc:4840"]);
        if let Some(Commands::Monitor(args)) = cli.command {
            assert_eq!(args.endpoint, "opc.tcp://plc:4840");
        } else {
            panic!("Expected Monitor command");
        }
    }

    #[test]
    fn test_quiet_mode() {
        let cli = Cli::parse_from(["uascope", "-q"]);
        assert!(cli.quiet);
        assert_eq!(cli.effective_log_level(), "warn");
    }

    #[test]
    fn test_verbose_mode() {
        let cli = Cli::parse_from(["uascope", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.effective_log_level(), "debug");
    }
}
