// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C11: the operational ledgers. Unlike the domain ports in
//! `claims-ingest-domain::services`, nothing outside this crate needs to
//! swap this adapter out, so it is a concrete struct rather than a
//! trait implementation.

use chrono::{DateTime, Utc};

use claims_ingest_domain::entities::{AckStatus, IngestionErrorRecord, IngestionFileAudit, IngestionRun};
use claims_ingest_domain::value_objects::{FileStatus, IngestionErrorRecordId, IngestionFileAuditId, IngestionFileId, IngestionRunId};
use claims_ingest_domain::IngestionError;

use crate::infrastructure::db::PgPool;

pub struct SqlxAuditSink {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> IngestionError {
    IngestionError::persistence(e.to_string())
}

fn file_status_label(status: FileStatus) -> &'static str {
    match status {
        FileStatus::Ok => "OK",
        FileStatus::Already => "ALREADY",
        FileStatus::Partial => "PARTIAL",
        FileStatus::Fail => "FAIL",
    }
}

fn ack_status_label(status: AckStatus) -> &'static str {
    match status {
        AckStatus::NotApplicable => "NOT_APPLICABLE",
        AckStatus::Suppressed => "SUPPRESSED",
        AckStatus::Sent => "SENT",
        AckStatus::Failed => "FAILED",
    }
}

impl SqlxAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn open_run(&self, now: DateTime<Utc>) -> Result<IngestionRunId, IngestionError> {
        let run = IngestionRun::open(now);
        sqlx::query("insert into claims.ingestion_run (id, opened_at, closed_at, files_processed) values ($1, $2, $3, $4)")
            .bind(run.id.to_string())
            .bind(run.opened_at)
            .bind(run.closed_at)
            .bind(run.files_processed)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(run.id)
    }

    pub async fn close_run(&self, run_id: IngestionRunId, files_processed: i32, now: DateTime<Utc>) -> Result<(), IngestionError> {
        sqlx::query("update claims.ingestion_run set closed_at = $2, files_processed = $3 where id = $1")
            .bind(run_id.to_string())
            .bind(now)
            .bind(files_processed)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_file_audit(
        &self,
        run_id: IngestionRunId,
        ingestion_file_id: IngestionFileId,
        status: FileStatus,
        expected_claims: Option<i32>,
        persisted_claims: i32,
        expected_activities: Option<i32>,
        persisted_activities: i32,
        verify_failed: bool,
        ack_status: AckStatus,
        correlation_id: &str,
    ) -> Result<(), IngestionError> {
        let audit = IngestionFileAudit {
            id: IngestionFileAuditId::new(),
            run_id,
            ingestion_file_id,
            status,
            expected_claims,
            persisted_claims,
            expected_activities,
            persisted_activities,
            verify_failed,
            ack_status,
            correlation_id: correlation_id.to_string(),
        };
        sqlx::query(
            "insert into claims.ingestion_file_audit \
             (id, run_id, ingestion_file_id, status, expected_claims, persisted_claims, expected_activities, persisted_activities, verify_failed, ack_status, correlation_id) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(audit.id.to_string())
        .bind(audit.run_id.to_string())
        .bind(audit.ingestion_file_id.to_string())
        .bind(file_status_label(audit.status))
        .bind(audit.expected_claims)
        .bind(audit.persisted_claims)
        .bind(audit.expected_activities)
        .bind(audit.persisted_activities)
        .bind(audit.verify_failed)
        .bind(ack_status_label(audit.ack_status))
        .bind(&audit.correlation_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn record_error(
        &self,
        ingestion_file_id: Option<IngestionFileId>,
        stage: &str,
        object_type: &str,
        object_key: &str,
        code: &str,
        severity: &str,
        message: &str,
        retryable: bool,
        now: DateTime<Utc>,
    ) -> Result<(), IngestionError> {
        let record = IngestionErrorRecord {
            id: IngestionErrorRecordId::new(),
            ingestion_file_id,
            stage: stage.to_string(),
            object_type: object_type.to_string(),
            object_key: object_key.to_string(),
            code: code.to_string(),
            severity: severity.to_string(),
            message: message.to_string(),
            retryable,
            occurred_at: now,
        };
        sqlx::query(
            "insert into claims.ingestion_error \
             (id, ingestion_file_id, stage, object_type, object_key, code, severity, message, retryable, occurred_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id.to_string())
        .bind(record.ingestion_file_id.map(|id| id.to_string()))
        .bind(&record.stage)
        .bind(&record.object_type)
        .bind(&record.object_key)
        .bind(&record.code)
        .bind(&record.severity)
        .bind(&record.message)
        .bind(record.retryable)
        .bind(record.occurred_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_are_stable_strings() {
        assert_eq!(file_status_label(FileStatus::Ok), "OK");
        assert_eq!(file_status_label(FileStatus::Partial), "PARTIAL");
        assert_eq!(file_status_label(FileStatus::Fail), "FAIL");
        assert_eq!(ack_status_label(AckStatus::Suppressed), "SUPPRESSED");
    }

    #[test]
    fn a_fresh_run_opens_with_no_close_time() {
        let run = IngestionRun::open(Utc::now());
        assert!(run.closed_at.is_none());
        assert_eq!(run.files_processed, 0);
    }
}
