// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C10 (local-fs profile): there is no upstream transaction to mark
//! downloaded, so acking always trivially succeeds.

use async_trait::async_trait;
use tracing::debug;

use claims_ingest_domain::services::Acker;

pub struct NoopAcker;

#[async_trait]
impl Acker for NoopAcker {
    async fn ack(&self, file_id: &str) -> bool {
        debug!(file_id, "no upstream transaction to mark downloaded; ack is trivially successful");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_succeeds() {
        assert!(NoopAcker.ack("F1").await);
    }
}
