// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;

use crate::value_objects::IngestionFileId;

#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyExpectations {
    pub expected_claims: Option<i32>,
    pub expected_activities: Option<i32>,
}

/// Port for C9. Read-only, post-commit; never throws — a check that
/// cannot be evaluated counts as failed.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, ingestion_file_id: IngestionFileId, expectations: VerifyExpectations) -> bool;
}
