// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the enterprise application layers
//! (domain, application, infrastructure) and provides:
//!
//! - **Entry point** - CLI parsing and process lifecycle
//! - **Platform abstraction** - OS-specific operations (POSIX vs Windows)
//! - **Signal handling** - Graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Argument parsing** - CLI validation
//! - **Error handling** - Unix exit code mapping
//! - **Async coordination** - Shutdown coordination and cancellation
//!
//! `claims-ingest`'s `main.rs` is the composition root: it loads config,
//! builds every adapter, and wires the orchestrator. This crate supplies
//! everything that wraps that composition root — the parts that have to
//! run before a config file can even be found, and the parts that run
//! after the orchestrator has already been told to stop.
//!
//! ## Module Structure
//!
//! - `platform` - OS abstraction (Unix/Windows)
//! - `signals` - Signal handling (SIGTERM, SIGINT, SIGHUP)
//! - `cli` - Argument parsing
//! - `config` - Config file path discovery
//! - `exit_code` - Unix exit code enumeration
//! - `shutdown` - Shutdown coordination

pub mod cli;
pub mod config;
pub mod exit_code;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Parses and validates CLI arguments.
///
/// The caller is responsible for running the application logic and
/// mapping its result to an exit code using [`result_to_exit_code`].
///
/// # Errors
///
/// Returns `cli::ParseError` if validation fails. Clap handles
/// `--help`/`--version` and malformed arguments itself, exiting the
/// process before this function returns.
///
/// # Example
///
/// ```no_run
/// use claims_ingest_bootstrap::{bootstrap_cli, result_to_exit_code};
/// use claims_ingest_domain::IngestionError;
///
/// #[tokio::main]
/// async fn main() -> std::process::ExitCode {
///     let validated_cli = match bootstrap_cli() {
///         Ok(cli) => cli,
///         Err(e) => {
///             eprintln!("CLI error: {e}");
///             return std::process::ExitCode::from(64); // EX_USAGE
///         }
///     };
///
///     let result = run_application(validated_cli).await;
///     result_to_exit_code(result)
/// }
///
/// async fn run_application(_cli: claims_ingest_bootstrap::ValidatedCli) -> Result<(), IngestionError> {
///     Ok(())
/// }
/// ```
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
