// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for graphchain

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// graphchain CLI - typed graph operation chains
#[derive(Parser)]
#[command(name = "graphchain")]
#[command(about = "graphchain - run typed operation chains over an in-memory graph")]
#[command(version)]
pub struct Cli {
    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level requested on the command line; `--log-level` wins over `-v`
    pub fn level_filter(&self) -> log::LevelFilter {
        match (self.log_level, self.verbose) {
            (Some(level), _) => level.to_level_filter(),
            (None, true) => log::LevelFilter::Debug,
            (None, false) => log::LevelFilter::Warn,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show detailed version information
    Version,

    /// Load and validate schema files, and optionally an operation chain
    Validate {
        /// Schema JSON files, merged in order
        #[arg(short, long, num_args = 1.., required = true)]
        schema: Vec<PathBuf>,

        /// Operation chain JSON file to type-check
        #[arg(short, long)]
        chain: Option<PathBuf>,
    },

    /// Build an in-memory graph, load elements and execute a chain
    Run {
        /// Schema JSON files, merged in order
        #[arg(short, long, num_args = 1.., required = true)]
        schema: Vec<PathBuf>,

        /// Operation chain JSON file
        #[arg(short, long)]
        chain: PathBuf,

        /// JSON file holding an array of elements to add before running
        #[arg(short, long)]
        elements: Option<PathBuf>,

        /// Store properties JSON file
        #[arg(long)]
        store: Option<PathBuf>,

        /// User id the chain runs as
        #[arg(short, long, default_value = "user01")]
        user: String,

        /// Data auths granted to the user
        #[arg(short, long, num_args = 1..)]
        auth: Vec<String>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_command() {
        let cli = Cli::try_parse_from([
            "graphchain",
            "-v",
            "run",
            "--schema",
            "elements.json",
            "types.json",
            "--chain",
            "chain.json",
            "--auth",
            "public",
            "private",
            "--format",
            "csv",
        ])
        .unwrap();
        assert_eq!(cli.level_filter(), log::LevelFilter::Debug);
        match cli.command {
            Commands::Run {
                schema,
                chain,
                auth,
                format,
                user,
                ..
            } => {
                assert_eq!(schema.len(), 2);
                assert_eq!(chain, PathBuf::from("chain.json"));
                assert_eq!(auth, vec!["public", "private"]);
                assert_eq!(format, OutputFormat::Csv);
                assert_eq!(user, "user01");
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn log_level_overrides_verbose() {
        let cli = Cli::try_parse_from(["graphchain", "-v", "-l", "error", "version"]).unwrap();
        assert_eq!(cli.level_filter(), log::LevelFilter::Error);
    }

    #[test]
    fn validate_requires_schema() {
        assert!(Cli::try_parse_from(["graphchain", "validate"]).is_err());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json));
    }
}
