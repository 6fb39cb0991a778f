// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structured logging setup. Every span carries the ingestion file's
//! `correlation_id` so a single file's fetch/parse/persist/verify/ack
//! chain can be grepped out of a shared log stream.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Installs the global `tracing` subscriber. `json` selects structured
/// JSON output for production; plain text is easier to read locally.
pub fn init(log_level: &str, json: bool) {
    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = Registry::default().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_level_falls_back_to_info_without_panicking() {
        let filter = EnvFilter::try_new("not-a-real-level").unwrap_or_else(|_| EnvFilter::new("info"));
        assert_eq!(filter.to_string(), "info");
    }
}
