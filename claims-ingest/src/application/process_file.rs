// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The per-file pipeline the orchestrator (C5) drives: parse (C6) →
//! persist (C7/C8) → verify (C9) → ack (C10), with every outcome and
//! row-level problem recorded to the operational ledgers (C11).

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use claims_ingest_domain::entities::AckStatus;
use claims_ingest_domain::services::{Acker, FileEnvelope, ParsedDocument, Parser, PersistService, VerifyExpectations, Verifier, WorkItem};
use claims_ingest_domain::value_objects::{FileBizId, FileStatus, IngestionRunId, RootKind};
use claims_ingest_domain::{DomainResult, IngestionError};

use crate::infrastructure::adapters::SqlxAuditSink;
use crate::infrastructure::metrics::MetricsService;

pub struct PipelineConfig {
    pub fail_on_xsd_error: bool,
    pub max_attachment_bytes: u64,
    pub hash_sensitive: bool,
    pub ack_enabled: bool,
}

/// Everything one drained `WorkItem` needs to run to completion. Held
/// behind an `Arc` and cloned into the orchestrator's per-item closure.
pub struct ProcessFilePipeline {
    parser: Arc<dyn Parser>,
    persist: Arc<dyn PersistService>,
    verifier: Arc<dyn Verifier>,
    acker: Arc<dyn Acker>,
    audit: Arc<SqlxAuditSink>,
    metrics: Arc<MetricsService>,
    config: PipelineConfig,
}

impl ProcessFilePipeline {
    pub fn new(
        parser: Arc<dyn Parser>,
        persist: Arc<dyn PersistService>,
        verifier: Arc<dyn Verifier>,
        acker: Arc<dyn Acker>,
        audit: Arc<SqlxAuditSink>,
        metrics: Arc<MetricsService>,
        config: PipelineConfig,
    ) -> Self {
        Self { parser, persist, verifier, acker, audit, metrics, config }
    }

    /// `run_id` is the `ingestion_run` row the orchestrator opened for the
    /// drain this `item` was pulled from; every file processed in the same
    /// drain shares it.
    pub async fn process(&self, item: WorkItem, run_id: IngestionRunId) -> DomainResult<()> {
        let staged_path = item.source_path.clone();
        let result = self.run_stages(item, run_id).await;

        // A staged payload is consumed exactly once; remove it whatever
        // the outcome, since an unacked file is re-fetched and re-staged.
        if let Some(path) = staged_path {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "failed removing staged payload file");
            }
        }
        result
    }

    async fn run_stages(&self, item: WorkItem, run_id: IngestionRunId) -> DomainResult<()> {
        let bytes = match &item.source_path {
            Some(path) => match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.metrics.record_file_status("FAIL");
                    let message = format!("reading staged payload {}: {e}", path.display());
                    if let Err(ledger_err) = self
                        .audit
                        .record_error(None, "fetch", "File", &item.file_id, "STAGED_READ_FAILED", "ERROR", &message, true, Utc::now())
                        .await
                    {
                        warn!(correlation_id = %item.correlation_id, error = ?ledger_err, "failed recording staged-read failure");
                    }
                    return Err(IngestionError::transport(message));
                }
            },
            None => item.bytes,
        };

        let outcome = self.parser.parse(&bytes, self.config.fail_on_xsd_error, self.config.max_attachment_bytes);

        for problem in &outcome.problems {
            let severity = match problem.severity {
                claims_ingest_domain::value_objects::ParseSeverity::Error => "ERROR",
                claims_ingest_domain::value_objects::ParseSeverity::Warning => "WARNING",
            };
            if severity == "ERROR" {
                self.metrics.increment_parse_errors();
            }
            if let Err(e) = self
                .audit
                .record_error(None, "parse", &problem.object_type, &problem.object_key, problem.code.as_str(), severity, &problem.message, false, Utc::now())
                .await
            {
                warn!(correlation_id = %item.correlation_id, error = ?e, "failed recording parse problem");
            }
        }

        let parse_had_errors = outcome.has_errors();

        let Some(document) = outcome.document else {
            self.metrics.record_file_status("FAIL");
            warn!(correlation_id = %item.correlation_id, file_id = %item.file_id, "file rejected: no parseable document root");
            return Ok(());
        };

        let (header, root_kind) = match &document {
            ParsedDocument::Submission(s) => (&s.header, RootKind::Submission),
            ParsedDocument::Remittance(r) => (&r.header, RootKind::Remittance),
        };

        let file_id = FileBizId::new(item.file_id.clone())?;
        let envelope = FileEnvelope {
            file_id,
            root_kind,
            sender_id: header.sender_id.clone(),
            receiver_id: header.receiver_id.clone(),
            transaction_date: header.transaction_date,
            declared_record_count: header.record_count,
            raw_xml: bytes,
        };
        // Expectations come from what the parser actually yielded, not the
        // declared record count: the verifier measures projection fidelity
        // for the rows that were eligible to persist, while dropped claims
        // are already accounted for in the error ledger.
        let (expected_claims, expected_activities) = match &document {
            ParsedDocument::Submission(s) => {
                (Some(s.claims.len() as i32), Some(s.claims.iter().map(|c| c.activities.len()).sum::<usize>() as i32))
            }
            ParsedDocument::Remittance(r) => {
                (Some(r.claims.len() as i32), Some(r.claims.iter().map(|c| c.activities.len()).sum::<usize>() as i32))
            }
        };

        let persist_started = std::time::Instant::now();
        let persist_outcome = match self.persist.persist(envelope, document, self.config.hash_sensitive).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.metrics.increment_persist_errors();
                self.metrics.record_file_status("FAIL");
                if let Err(ledger_err) = self
                    .audit
                    .record_error(None, "persist", "File", &item.file_id, "PERSISTENCE_ERROR", "ERROR", &e.to_string(), e.is_retryable(), Utc::now())
                    .await
                {
                    warn!(correlation_id = %item.correlation_id, error = ?ledger_err, "failed recording persist failure");
                }
                error!(correlation_id = %item.correlation_id, file_id = %item.file_id, error = ?e, "file persistence failed");
                return Err(e);
            }
        };
        self.metrics.record_batch_duration(persist_started.elapsed());
        let ingestion_file_id = persist_outcome.ingestion_file_id;

        // A claim or activity the parser had to drop leaves the file
        // incomplete even when every surviving row persisted cleanly.
        let status = if persist_outcome.status == FileStatus::Ok && parse_had_errors {
            FileStatus::Partial
        } else {
            persist_outcome.status
        };

        self.metrics.record_persist_counts(
            persist_outcome.counts.claims,
            persist_outcome.counts.activities,
            persist_outcome.counts.observations,
            persist_outcome.counts.conflicts,
        );

        let verified = if status == FileStatus::Already {
            true
        } else {
            self.verifier
                .verify(ingestion_file_id, VerifyExpectations { expected_claims, expected_activities })
                .await
        };

        let ack_status = if !self.config.ack_enabled {
            AckStatus::NotApplicable
        } else if !verified {
            AckStatus::Suppressed
        } else if self.acker.ack(&item.file_id).await {
            AckStatus::Sent
        } else {
            AckStatus::Failed
        };

        self.audit
            .record_file_audit(
                run_id,
                ingestion_file_id,
                status,
                expected_claims,
                persist_outcome.counts.claims as i32,
                expected_activities,
                persist_outcome.counts.activities as i32,
                !verified,
                ack_status,
                &item.correlation_id,
            )
            .await?;

        let status_label = match status {
            FileStatus::Ok => "OK",
            FileStatus::Already => "ALREADY",
            FileStatus::Partial => "PARTIAL",
            FileStatus::Fail => "FAIL",
        };
        self.metrics.record_file_status(status_label);

        if status == FileStatus::Partial {
            warn!(file_id = %item.file_id, conflicts = persist_outcome.counts.conflicts, "file persisted with row-level problems");
        } else {
            info!(file_id = %item.file_id, claims = persist_outcome.counts.claims, "file processed");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_config_is_constructible() {
        let config = PipelineConfig { fail_on_xsd_error: false, max_attachment_bytes: 1_000_000, hash_sensitive: false, ack_enabled: true };
        assert!(!config.fail_on_xsd_error);
    }
}
