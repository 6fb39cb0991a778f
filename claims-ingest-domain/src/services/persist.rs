// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IngestionError;
use crate::value_objects::{FileBizId, FileStatus, IngestionFileId, RootKind};

use super::parser::ParsedDocument;

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistCounts {
    pub claims: u32,
    pub activities: u32,
    pub observations: u32,
    pub diagnoses: u32,
    pub remittance_claims: u32,
    pub remittance_activities: u32,
    pub conflicts: u32,
}

#[derive(Debug, Clone)]
pub struct PersistOutcome {
    pub ingestion_file_id: IngestionFileId,
    pub status: FileStatus,
    pub counts: PersistCounts,
}

/// Everything the persist service needs about the file itself, ahead of
/// the parsed document.
#[derive(Debug, Clone)]
pub struct FileEnvelope {
    pub file_id: FileBizId,
    pub root_kind: RootKind,
    pub sender_id: String,
    pub receiver_id: String,
    pub transaction_date: DateTime<Utc>,
    pub declared_record_count: i32,
    pub raw_xml: Vec<u8>,
}

/// Port for C7+C8: installs the normalized graph for one file with
/// exactly-once effect, and projects events/snapshots/timeline in the
/// same transaction.
#[async_trait]
pub trait PersistService: Send + Sync {
    async fn persist(
        &self,
        envelope: FileEnvelope,
        document: ParsedDocument,
        hash_sensitive: bool,
    ) -> Result<PersistOutcome, IngestionError>;
}
