// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Operational ledgers (C11). These are the only "visible" failure
//! channel the engine has, alongside metrics counters and correlation
//! ids in log lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{FileStatus, IngestionBatchMetricId, IngestionErrorRecordId, IngestionFileAuditId, IngestionFileId, IngestionRunId};

/// Groups all files processed during a single orchestrator drain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionRun {
    pub id: IngestionRunId,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub files_processed: i32,
}

impl IngestionRun {
    pub fn open(now: DateTime<Utc>) -> Self {
        Self { id: IngestionRunId::new(), opened_at: now, closed_at: None, files_processed: 0 }
    }
}

/// One per processed file, under a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionFileAudit {
    pub id: IngestionFileAuditId,
    pub run_id: IngestionRunId,
    pub ingestion_file_id: IngestionFileId,
    pub status: FileStatus,
    pub expected_claims: Option<i32>,
    pub persisted_claims: i32,
    pub expected_activities: Option<i32>,
    pub persisted_activities: i32,
    pub verify_failed: bool,
    pub ack_status: AckStatus,
    pub correlation_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AckStatus {
    NotApplicable,
    Suppressed,
    Sent,
    Failed,
}

/// Attaches to a file + stage + object key. Row-level errors never abort
/// the file; they accumulate here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionErrorRecord {
    pub id: IngestionErrorRecordId,
    pub ingestion_file_id: Option<IngestionFileId>,
    pub stage: String,
    pub object_type: String,
    pub object_key: String,
    pub code: String,
    pub severity: String,
    pub message: String,
    pub retryable: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Per-stage, per-batch counts and timings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionBatchMetric {
    pub id: IngestionBatchMetricId,
    pub ingestion_file_id: IngestionFileId,
    pub stage: String,
    pub batch_no: i32,
    pub attempted: i32,
    pub inserted: i32,
    pub conflicts_ignored: i32,
    pub duration_ms: i64,
}
