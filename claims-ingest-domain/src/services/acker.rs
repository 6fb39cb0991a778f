// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;

/// Port for C10. Best-effort: a failure here is logged, never rolled
/// back against the already-committed data.
#[async_trait]
pub trait Acker: Send + Sync {
    async fn ack(&self, file_id: &str) -> bool;
}
