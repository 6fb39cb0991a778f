// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! A single, flat error enum for the ingestion domain. Every stage of the
//! pipeline -- fetch, parse, persist, project, verify, acknowledge -- maps its
//! failures onto one of these variants rather than growing its own error
//! hierarchy. Row-level failures (a single bad claim, a single observation)
//! are not represented here: they are recorded as `IngestionErrorRecord`
//! ledger rows (see [`crate::entities::audit`]) and never abort the file.

use thiserror::Error;

/// Errors raised by the ingestion domain and its infrastructure adapters.
///
/// Each variant names one stage of the ingestion pipeline (transport,
/// credential, parse, validation, persistence, verify, ack). The
/// taxonomy is intentionally shallow: callers branch on
/// `is_retryable` / `category` rather than matching every variant.
#[derive(Error, Debug, Clone)]
pub enum IngestionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("duplicate file: {0}")]
    DuplicateFile(String),

    #[error("duplicate claim: {0}")]
    DuplicateClaim(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("verify error: {0}")]
    Verify(String),

    #[error("acknowledgement error: {0}")]
    Ack(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IngestionError {
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn verify(msg: impl Into<String>) -> Self {
        Self::Verify(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    /// Whether the operation that produced this error is safe to retry
    /// without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IngestionError::Transport(_) | IngestionError::Persistence(_))
    }

    /// Coarse category used for metrics labels and the error ledger.
    pub fn category(&self) -> &'static str {
        match self {
            IngestionError::Transport(_) => "transport",
            IngestionError::Credential(_) => "credential",
            IngestionError::Parse(_) => "parse",
            IngestionError::Validation(_) => "validation",
            IngestionError::DuplicateFile(_) => "duplicate_file",
            IngestionError::DuplicateClaim(_) => "duplicate_claim",
            IngestionError::Persistence(_) => "persistence",
            IngestionError::Verify(_) => "verify",
            IngestionError::Ack(_) => "ack",
            IngestionError::InvalidConfiguration(_) => "configuration",
            IngestionError::Queue(_) => "queue",
            IngestionError::Cancelled(_) => "cancellation",
            IngestionError::Internal(_) => "internal",
        }
    }
}

impl From<std::io::Error> for IngestionError {
    fn from(err: std::io::Error) -> Self {
        IngestionError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for IngestionError {
    fn from(err: serde_json::Error) -> Self {
        IngestionError::Internal(format!("serialization error: {err}"))
    }
}
