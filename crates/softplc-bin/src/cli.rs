// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the runtime (default)
//! - `validate`: Load the configuration and resolve every source
//! - `drivers`: List the registered protocol types
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use softplc_config::{LogFormat, LogLevel, LoggingConfig};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// softplc - a soft PLC runtime polling industrial field devices
#[derive(Parser, Debug)]
#[command(
    name = "softplc",
    author = "Sylvex <contact@sylvex.io>",
    version = softplc_core::VERSION,
    about = "Soft PLC runtime for industrial field devices",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "softplc.yaml",
        env = "SOFTPLC_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the file
    #[arg(short, long, env = "SOFTPLC_LOG_LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format (text, json, compact); overrides the file
    #[arg(long, env = "SOFTPLC_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
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

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the runtime
    ///
    /// This is the default command when no subcommand is specified.
    /// Every valid source is started; invalid ones are logged and skipped.
    Run,

    /// Validate the configuration file
    ///
    /// Loads the file and resolves every source entry through its driver
    /// without connecting to any device. Exits non-zero when any source
    /// is rejected.
    Validate(ValidateArgs),

    /// List the registered source drivers
    Drivers,

    /// Show version information
    ///
    /// With the global `--verbose` flag, also prints build details.
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }

    /// Resolves logging settings.
    ///
    /// Precedence: `-q`/`-v`, then `--log-level`/`--log-format` (or their
    /// environment variables), then the configuration file, then defaults.
    pub fn logging(&self, file: Option<&LoggingConfig>) -> LoggingConfig {
        let base = file.copied().unwrap_or_default();

        let level = if self.quiet {
            LogLevel::Warn
        } else if self.verbose {
            LogLevel::Debug
        } else {
            self.log_level.unwrap_or(base.level)
        };

        LoggingConfig {
            level,
            format: self.log_format.unwrap_or(base.format),
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
        let cli = Cli::parse_from(["softplc"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run));
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["softplc", "validate", "--format", "json"]);
        match cli.command {
            Some(Commands::Validate(args)) => assert_eq!(args.format, OutputFormat::Json),
            other => panic!("Expected Validate command, got {other:?}"),
        }
    }

    #[test]
    fn test_version_verbose() {
        let cli = Cli::parse_from(["softplc", "version", "--verbose"]);
        assert!(matches!(cli.command, Some(Commands::Version)));
        assert!(cli.verbose);
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["softplc", "-c", "/etc/softplc/line-3.yaml", "drivers"]);
        assert_eq!(cli.config, PathBuf::from("/etc/softplc/line-3.yaml"));
        assert!(matches!(cli.command, Some(Commands::Drivers)));
    }

    #[test]
    fn test_log_flags_override_file() {
        let file = LoggingConfig {
            level: LogLevel::Error,
            format: LogFormat::Text,
        };

        let cli = Cli::parse_from(["softplc", "-l", "debug", "--log-format", "compact"]);
        let logging = cli.logging(Some(&file));
        assert_eq!(logging.level, LogLevel::Debug);
        assert_eq!(logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_quiet_and_verbose() {
        let cli = Cli::parse_from(["softplc", "-q", "-l", "trace"]);
        assert_eq!(cli.logging(None).level, LogLevel::Warn);

        let cli = Cli::parse_from(["softplc", "-v"]);
        assert_eq!(cli.logging(None).level, LogLevel::Debug);

        assert!(Cli::try_parse_from(["softplc", "-q", "-v"]).is_err());
    }
}
