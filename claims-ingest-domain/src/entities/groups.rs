// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The per-file group rows. One `Submission` or `Remittance` row per
//! `IngestionFile`; everything else in the file's graph hangs off it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{IngestionFileId, RemittanceId, SubmissionId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    pub ingestion_file_id: IngestionFileId,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    pub fn new(ingestion_file_id: IngestionFileId, now: DateTime<Utc>) -> Self {
        Self {
            id: SubmissionId::new(),
            ingestion_file_id,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Remittance {
    pub id: RemittanceId,
    pub ingestion_file_id: IngestionFileId,
    pub created_at: DateTime<Utc>,
}

impl Remittance {
    pub fn new(ingestion_file_id: IngestionFileId, now: DateTime<Utc>) -> Self {
        Self {
            id: RemittanceId::new(),
            ingestion_file_id,
            created_at: now,
        }
    }
}
