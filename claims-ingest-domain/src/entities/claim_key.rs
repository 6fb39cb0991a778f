// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ClaimBizId, ClaimKeyId};

/// The business identity of a claim. Created lazily on first encounter
/// (submission or remittance, whichever arrives first) and never
/// deleted; every `IngestionFile` that mentions this claim references
/// the same row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimKey {
    pub id: ClaimKeyId,
    pub claim_id: ClaimBizId,
    pub created_at: DateTime<Utc>,
}

impl ClaimKey {
    pub fn new(claim_id: ClaimBizId, now: DateTime<Utc>) -> Self {
        Self {
            id: ClaimKeyId::new(),
            claim_id,
            created_at: now,
        }
    }
}
