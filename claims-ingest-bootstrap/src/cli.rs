// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! This engine has one mode of operation: start the poller and run
//! until signaled to stop. The CLI surface is accordingly small — a
//! config path, a verbosity flag, and a `migrate` subcommand for
//! running schema migrations without starting the poll loop (useful in
//! a deploy step ahead of rolling out new application instances).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },
}

#[derive(Debug, Parser)]
#[command(name = "claims-ingest", about = "Healthcare claims ingestion engine", version)]
struct Cli {
    /// Path to a TOML config file. Falls back to ./claims-ingest.toml or
    /// /etc/claims-ingest/config.toml, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug-level logging regardless of `log_level` in config.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the poll loop until signaled to stop (the default if no subcommand is given).
    Run,
    /// Apply pending database migrations and exit.
    Migrate,
}

/// CLI arguments after parsing, with no further validation needed
/// beyond what `clap` already enforces (required files are checked
/// when the config loader actually opens them).
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatedCommand {
    Run,
    Migrate,
}

pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = Cli::parse();
    validate(cli)
}

fn validate(cli: Cli) -> Result<ValidatedCli, ParseError> {
    if let Some(ref path) = cli.config {
        let as_str = path.to_string_lossy();
        if as_str.contains('\0') {
            return Err(ParseError::InvalidValue { arg: "config".to_string(), reason: "path contains a nul byte".to_string() });
        }
    }

    let command = match cli.command.unwrap_or(Command::Run) {
        Command::Run => ValidatedCommand::Run,
        Command::Migrate => ValidatedCommand::Migrate,
    };

    Ok(ValidatedCli { command, config: cli.config, verbose: cli.verbose })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_run_with_no_config() {
        let cli = Cli { config: None, verbose: false, command: None };
        let validated = validate(cli).unwrap();
        assert_eq!(validated.command, ValidatedCommand::Run);
        assert!(validated.config.is_none());
    }

    #[test]
    fn migrate_subcommand_is_honored() {
        let cli = Cli { config: None, verbose: true, command: Some(Command::Migrate) };
        let validated = validate(cli).unwrap();
        assert_eq!(validated.command, ValidatedCommand::Migrate);
        assert!(validated.verbose);
    }

    #[test]
    fn nul_byte_in_config_path_rejected() {
        let cli = Cli { config: Some(PathBuf::from("bad\0path.toml")), verbose: false, command: None };
        assert!(validate(cli).is_err());
    }
}
