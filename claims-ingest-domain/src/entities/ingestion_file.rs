// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{FileBizId, IngestionFileId, RootKind};

/// The provenance root. Created once per unique `file_id`; immutable
/// thereafter except for `updated_at`. Every downstream row traces back
/// to exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionFile {
    pub id: IngestionFileId,
    pub file_id: FileBizId,
    pub root_kind: RootKind,
    pub sender_id: String,
    pub receiver_id: String,
    pub transaction_date: DateTime<Utc>,
    pub declared_record_count: i32,
    pub disposition_flag: Option<String>,
    pub raw_xml: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IngestionFile {
    pub fn new(
        file_id: FileBizId,
        root_kind: RootKind,
        sender_id: String,
        receiver_id: String,
        transaction_date: DateTime<Utc>,
        declared_record_count: i32,
        raw_xml: Vec<u8>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IngestionFileId::new(),
            file_id,
            root_kind,
            sender_id,
            receiver_id,
            transaction_date,
            declared_record_count,
            disposition_flag: None,
            raw_xml,
            created_at: now,
            updated_at: now,
        }
    }
}
