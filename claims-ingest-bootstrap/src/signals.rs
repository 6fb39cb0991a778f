// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling
//!
//! Installs OS signal handlers and wires them to a
//! [`crate::shutdown::ShutdownCoordinator`]. SIGTERM and SIGINT both
//! request a graceful stop; SIGHUP is logged but otherwise ignored —
//! this engine has no config to reload on the fly, config changes
//! require a restart.

use crate::shutdown::ShutdownCoordinator;

/// Spawns a task that waits for a termination signal, then initiates
/// shutdown on `coordinator`. Returns immediately; the task runs for
/// the life of the process.
pub fn install(coordinator: ShutdownCoordinator) {
    tokio::spawn(async move {
        wait_for_signal().await;
        coordinator.initiate_shutdown();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM");
                return;
            }
            _ = sigint.recv() => {
                tracing::info!("received SIGINT");
                return;
            }
            _ = sighup.recv() => {
                tracing::warn!("received SIGHUP; this engine does not reload config, ignoring");
            }
        }
    }
}

#[cfg(windows)]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("received Ctrl+C");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn install_does_not_block_caller() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(1));
        install(coordinator.clone());
        // install() must return immediately; reaching here proves it did.
        assert!(!coordinator.is_shutting_down());
    }
}
