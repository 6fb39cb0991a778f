// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Unix Exit Codes
//!
//! Maps a failed bootstrap into one of the BSD `sysexits.h` codes so
//! process supervisors (systemd, a container orchestrator) can tell a
//! config problem from a transient dependency outage apart from an
//! internal bug without parsing log text.

use std::process::ExitCode as StdExitCode;

use claims_ingest_domain::IngestionError;

/// A `sysexits.h`-style process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Successful termination.
    Ok,
    /// Command line usage error.
    Usage,
    /// Input data was incorrect in some way (malformed XML, bad config file).
    DataErr,
    /// An input file did not exist or was not readable.
    NoInput,
    /// A remote service (SOAP endpoint, database) is unreachable.
    Unavailable,
    /// Internal software error (a bug, not an environment problem).
    Software,
    /// System error, e.g. cannot allocate a resource the OS controls.
    OsErr,
    /// Something was found in an unusable state (corrupt data, locked file).
    Protocol,
    /// Insufficient permission to perform the operation.
    NoPerm,
    /// Configuration error.
    Config,
}

impl ExitCode {
    pub fn code(self) -> u8 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::Usage => 64,
            ExitCode::DataErr => 65,
            ExitCode::NoInput => 66,
            ExitCode::Unavailable => 69,
            ExitCode::Software => 70,
            ExitCode::OsErr => 71,
            ExitCode::Protocol => 76,
            ExitCode::NoPerm => 77,
            ExitCode::Config => 78,
        }
    }
}

impl From<ExitCode> for StdExitCode {
    fn from(value: ExitCode) -> Self {
        StdExitCode::from(value.code())
    }
}

/// Maps a domain error to the exit code that best describes its cause.
pub fn map_error_to_exit_code(error: &IngestionError) -> ExitCode {
    match error {
        IngestionError::InvalidConfiguration(_) => ExitCode::Config,
        IngestionError::Transport(_) => ExitCode::Unavailable,
        IngestionError::Credential(_) => ExitCode::NoPerm,
        IngestionError::Parse(_) => ExitCode::DataErr,
        IngestionError::Validation(_) => ExitCode::DataErr,
        IngestionError::DuplicateFile(_) | IngestionError::DuplicateClaim(_) => ExitCode::Protocol,
        IngestionError::Persistence(_) => ExitCode::Unavailable,
        IngestionError::Verify(_) => ExitCode::Protocol,
        IngestionError::Ack(_) => ExitCode::Unavailable,
        IngestionError::Queue(_) => ExitCode::Software,
        IngestionError::Cancelled(_) => ExitCode::Ok,
        IngestionError::Internal(_) => ExitCode::Software,
    }
}

/// Converts a top-level `Result` into the process's final `std::process::ExitCode`.
pub fn result_to_exit_code(result: Result<(), IngestionError>) -> StdExitCode {
    match result {
        Ok(()) => ExitCode::Ok.into(),
        Err(e) => {
            tracing::error!(error = %e, "fatal error during shutdown");
            map_error_to_exit_code(&e).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_map_to_config_exit_code() {
        let err = IngestionError::invalid_configuration("bad queue capacity");
        assert_eq!(map_error_to_exit_code(&err), ExitCode::Config);
    }

    #[test]
    fn cancellation_maps_to_clean_exit() {
        let err = IngestionError::Cancelled("shutdown requested".to_string());
        assert_eq!(map_error_to_exit_code(&err), ExitCode::Ok);
    }

    #[test]
    fn ok_result_yields_zero_code() {
        assert_eq!(ExitCode::Ok.code(), 0);
    }
}
