// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Configuration Discovery
//!
//! Resolves which config file to hand to `claims_ingest::infrastructure::config::load`
//! when the CLI's `--config` flag is absent. The layered defaults/file/env
//! config model itself lives in the application crate; this module only
//! decides *which path*, if any, to pass in.

use std::path::{Path, PathBuf};

/// Config file locations checked, in order, when `--config` is not given.
const DEFAULT_CANDIDATES: &[&str] = &["./claims-ingest.toml", "/etc/claims-ingest/config.toml"];

/// Picks the config path to load: the explicit CLI value if given,
/// otherwise the first existing default candidate, otherwise `None`
/// (the application falls back to built-in defaults plus environment
/// overrides).
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    DEFAULT_CANDIDATES.iter().map(Path::new).find(|p| p.exists()).map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins_even_if_missing() {
        let explicit = Path::new("/nonexistent/path.toml");
        assert_eq!(resolve_config_path(Some(explicit)), Some(explicit.to_path_buf()));
    }

    #[test]
    fn no_explicit_and_no_candidates_present_returns_none() {
        // None of the default candidates exist in a clean test environment.
        assert_eq!(resolve_config_path(None), None);
    }
}
