// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C7+C8: the Postgres-backed `PersistService`. Maps each parsed DTO
//! onto the domain entities through hand-written, exhaustive mapper
//! functions, installs the normalized graph for one file, and projects
//! the event/snapshot/timeline chronology in the same transactions,
//! chunked per `ingestion.tx.granularity`.
//!
//! Row-level conflicts (a claim resubmitted without a `<Resubmission>`
//! marker, a remittance claim with no matching `claim_key`, an amount
//! the wire format allows but money parsing rejects) never abort the
//! file; they count toward `PersistCounts::conflicts` and the file's
//! final status drops to [`FileStatus::Partial`].

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::{Postgres, Transaction};

use claims_ingest_domain::entities::{
    Activity, Claim, ClaimEvent, ClaimEventActivity, ClaimKey, ClaimResubmission, ClaimStatusTimelineRow, Diagnosis, Encounter,
    EventObservation, EventSource, IngestionBatchMetric, IngestionFile, Observation, Remittance, RemittanceActivity,
    RemittanceClaim, Submission,
};
use claims_ingest_domain::services::{
    ActivityDTO, ClaimDTO, FileEnvelope, ObservationDTO, ParsedDocument, PersistCounts, PersistOutcome, PersistService,
    RemittanceActivityDTO, RemittanceAdviceDTO, RemittanceClaimDTO, SubmissionDTO,
};
use claims_ingest_domain::value_objects::{
    ActivityBizId, ActivityId, ClaimBizId, ClaimEventActivityId, ClaimEventId, ClaimEventType, ClaimId, ClaimKeyId,
    ClaimResubmissionId, ClaimStatus, DiagnosisId, EncounterId, EventObservationId, FileStatus, IngestionBatchMetricId,
    IngestionErrorRecordId, IngestionFileId, Money, ObservationId, RemittanceActivityId, RemittanceClaimId, RemittanceId,
    SubmissionId,
};
use claims_ingest_domain::IngestionError;

use crate::infrastructure::config::TxGranularity;
use crate::infrastructure::db::PgPool;
use crate::infrastructure::services::pii_masking::maybe_hash;

pub struct SqlxPersistService {
    pool: PgPool,
    batch_size: usize,
    granularity: TxGranularity,
    pepper: Vec<u8>,
}

impl SqlxPersistService {
    pub fn new(pool: PgPool, batch_size: usize, granularity: TxGranularity, pepper: Vec<u8>) -> Self {
        Self { pool, batch_size: batch_size.max(1), granularity, pepper }
    }

    fn chunk_size(&self, total: usize) -> usize {
        match self.granularity {
            TxGranularity::PerFile => total.max(1),
            TxGranularity::PerChunk => self.batch_size,
        }
    }
}

fn db_err(e: sqlx::Error) -> IngestionError {
    IngestionError::persistence(e.to_string())
}

fn value_hash(obs_type: &str, obs_code: &str, value_text: Option<&str>, file_bytes: Option<&[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(obs_type.as_bytes());
    hasher.update(obs_code.as_bytes());
    if let Some(text) = value_text {
        hasher.update(text.as_bytes());
    }
    if let Some(bytes) = file_bytes {
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// DTO -> entity mappers. Exhaustive field enumeration on purpose: adding a
// column means touching exactly one of these and its insert.
// ---------------------------------------------------------------------------

fn claim_row(
    claim_key_id: ClaimKeyId,
    submission_id: SubmissionId,
    dto: &ClaimDTO,
    hash_sensitive: bool,
    pepper: &[u8],
) -> Result<Claim, IngestionError> {
    Ok(Claim {
        id: ClaimId::new(),
        claim_key_id,
        submission_id,
        payer_id: dto.payer_id.clone(),
        provider_id: dto.provider_id.clone(),
        member_id: dto.member_id.clone(),
        patient_identifier: maybe_hash(dto.patient_identifier.clone(), hash_sensitive, pepper),
        gross: Money::from_decimal_str(&dto.gross)?,
        patient_share: Money::from_decimal_str(&dto.patient_share)?,
        net: Money::from_decimal_str(&dto.net)?,
        comments: dto.comments.clone(),
        ref_id: dto.ref_id.clone(),
    })
}

fn activity_row(claim_id: ClaimId, dto: &ActivityDTO) -> Result<Activity, IngestionError> {
    Ok(Activity {
        id: ActivityId::new(),
        claim_id,
        activity_id: ActivityBizId::new(dto.activity_id.clone())?,
        start: dto.start,
        activity_type: dto.activity_type.clone(),
        code: dto.code.clone(),
        quantity: dto.quantity,
        net: Money::from_decimal_str(&dto.net)?,
        clinician: dto.clinician.clone(),
        prior_authorization_id: dto.prior_authorization_id.clone(),
    })
}

fn observation_row(activity_id: ActivityId, dto: &ObservationDTO) -> Observation {
    Observation {
        id: ObservationId::new(),
        activity_id,
        obs_type: dto.obs_type.clone(),
        obs_code: dto.obs_code.clone(),
        value_text: dto.value_text.clone(),
        value_hash: value_hash(&dto.obs_type, &dto.obs_code, dto.value_text.as_deref(), dto.file_bytes.as_deref()),
        file_bytes: dto.file_bytes.clone(),
    }
}

fn remittance_claim_row(remittance_id: RemittanceId, claim_key_id: ClaimKeyId, dto: &RemittanceClaimDTO) -> RemittanceClaim {
    RemittanceClaim {
        id: RemittanceClaimId::new(),
        remittance_id,
        claim_key_id,
        payer_id: dto.payer_id.clone(),
        provider_id: dto.provider_id.clone(),
        denial_code: dto.denial_code.clone(),
        payment_reference: dto.payment_reference.clone(),
        date_settlement: dto.date_settlement,
        facility_id: dto.facility_id.clone(),
    }
}

fn remittance_activity_row(remittance_claim_id: RemittanceClaimId, dto: &RemittanceActivityDTO) -> Result<RemittanceActivity, IngestionError> {
    Ok(RemittanceActivity {
        id: RemittanceActivityId::new(),
        remittance_claim_id,
        activity_id: ActivityBizId::new(dto.activity_id.clone())?,
        payment_amount: Money::from_decimal_str(&dto.payment_amount)?,
        list_price: dto.list_price.as_deref().map(Money::from_decimal_str).transpose()?,
        gross: dto.gross.as_deref().map(Money::from_decimal_str).transpose()?,
        patient_share: dto.patient_share.as_deref().map(Money::from_decimal_str).transpose()?,
        denial_code: dto.denial_code.clone(),
    })
}

#[async_trait]
impl PersistService for SqlxPersistService {
    async fn persist(&self, envelope: FileEnvelope, document: ParsedDocument, hash_sensitive: bool) -> Result<PersistOutcome, IngestionError> {
        let now = Utc::now();
        let file = IngestionFile::new(
            envelope.file_id,
            envelope.root_kind,
            envelope.sender_id,
            envelope.receiver_id,
            envelope.transaction_date,
            envelope.declared_record_count,
            envelope.raw_xml,
            now,
        );

        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let (ingestion_file_id, already_existed) = insert_ingestion_file(&mut tx, &file).await?;
        if already_existed {
            tx.commit().await.map_err(db_err)?;
            return Ok(PersistOutcome { ingestion_file_id, status: FileStatus::Already, counts: PersistCounts::default() });
        }

        let mut counts = PersistCounts::default();
        match document {
            ParsedDocument::Submission(submission) => {
                let group = Submission::new(ingestion_file_id, now);
                insert_submission(&mut tx, &group).await?;
                match self.granularity {
                    TxGranularity::PerFile => {
                        let started = Instant::now();
                        let header = submission.header;
                        for claim in &submission.claims {
                            persist_one_claim(&mut tx, ingestion_file_id, group.id, header.transaction_date, claim, hash_sensitive, &self.pepper, &mut counts)
                                .await?;
                        }
                        tx.commit().await.map_err(db_err)?;
                        self.record_batch_metric(ingestion_file_id, "submission", 1, submission.claims.len(), counts.claims, counts.conflicts, started)
                            .await;
                    }
                    TxGranularity::PerChunk => {
                        tx.commit().await.map_err(db_err)?;
                        self.persist_submission(ingestion_file_id, group.id, submission, hash_sensitive, &mut counts).await?;
                    }
                }
            }
            ParsedDocument::Remittance(remittance) => {
                let group = Remittance::new(ingestion_file_id, now);
                insert_remittance(&mut tx, &group).await?;
                match self.granularity {
                    TxGranularity::PerFile => {
                        let started = Instant::now();
                        for claim in &remittance.claims {
                            persist_one_remittance_claim(&mut tx, ingestion_file_id, group.id, claim, &mut counts).await?;
                        }
                        tx.commit().await.map_err(db_err)?;
                        self.record_batch_metric(ingestion_file_id, "remittance", 1, remittance.claims.len(), counts.remittance_claims, counts.conflicts, started)
                            .await;
                    }
                    TxGranularity::PerChunk => {
                        tx.commit().await.map_err(db_err)?;
                        self.persist_remittance(ingestion_file_id, group.id, remittance, &mut counts).await?;
                    }
                }
            }
        }

        let status = if counts.conflicts > 0 { FileStatus::Partial } else { FileStatus::Ok };
        Ok(PersistOutcome { ingestion_file_id, status, counts })
    }
}

impl SqlxPersistService {
    /// `TxGranularity::PerChunk` only: splits a submission's claims into
    /// independently committed chunks of `batch_size`, trading whole-file
    /// atomicity for shorter-lived transactions.
    async fn persist_submission(
        &self,
        ingestion_file_id: IngestionFileId,
        submission_id: SubmissionId,
        submission: SubmissionDTO,
        hash_sensitive: bool,
        counts: &mut PersistCounts,
    ) -> Result<(), IngestionError> {
        let header = submission.header;
        let chunk_size = self.chunk_size(submission.claims.len());

        for (batch_no, chunk) in submission.claims.chunks(chunk_size.max(1)).enumerate() {
            let started = Instant::now();
            let (claims_before, conflicts_before) = (counts.claims, counts.conflicts);
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            for claim in chunk {
                persist_one_claim(&mut tx, ingestion_file_id, submission_id, header.transaction_date, claim, hash_sensitive, &self.pepper, counts)
                    .await?;
            }
            tx.commit().await.map_err(db_err)?;
            self.record_batch_metric(
                ingestion_file_id,
                "submission",
                batch_no as i32 + 1,
                chunk.len(),
                counts.claims - claims_before,
                counts.conflicts - conflicts_before,
                started,
            )
            .await;
        }
        Ok(())
    }

    /// `TxGranularity::PerChunk` only: see [`Self::persist_submission`].
    async fn persist_remittance(
        &self,
        ingestion_file_id: IngestionFileId,
        remittance_id: RemittanceId,
        remittance: RemittanceAdviceDTO,
        counts: &mut PersistCounts,
    ) -> Result<(), IngestionError> {
        let chunk_size = self.chunk_size(remittance.claims.len());

        for (batch_no, chunk) in remittance.claims.chunks(chunk_size.max(1)).enumerate() {
            let started = Instant::now();
            let (claims_before, conflicts_before) = (counts.remittance_claims, counts.conflicts);
            let mut tx = self.pool.begin().await.map_err(db_err)?;
            for claim in chunk {
                persist_one_remittance_claim(&mut tx, ingestion_file_id, remittance_id, claim, counts).await?;
            }
            tx.commit().await.map_err(db_err)?;
            self.record_batch_metric(
                ingestion_file_id,
                "remittance",
                batch_no as i32 + 1,
                chunk.len(),
                counts.remittance_claims - claims_before,
                counts.conflicts - conflicts_before,
                started,
            )
            .await;
        }
        Ok(())
    }

    /// Ledger write outside the data transaction: a lost metric row must
    /// not roll back committed claims, so failures are logged and dropped.
    async fn record_batch_metric(
        &self,
        ingestion_file_id: IngestionFileId,
        stage: &str,
        batch_no: i32,
        attempted: usize,
        inserted: u32,
        conflicts_ignored: u32,
        started: Instant,
    ) {
        let metric = IngestionBatchMetric {
            id: IngestionBatchMetricId::new(),
            ingestion_file_id,
            stage: stage.to_string(),
            batch_no,
            attempted: attempted as i32,
            inserted: inserted as i32,
            conflicts_ignored: conflicts_ignored as i32,
            duration_ms: started.elapsed().as_millis() as i64,
        };
        let result = sqlx::query(
            "insert into claims.ingestion_batch_metric \
             (id, ingestion_file_id, stage, batch_no, attempted, inserted, conflicts_ignored, duration_ms) \
             values ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(metric.id.to_string())
        .bind(metric.ingestion_file_id.to_string())
        .bind(&metric.stage)
        .bind(metric.batch_no)
        .bind(metric.attempted)
        .bind(metric.inserted)
        .bind(metric.conflicts_ignored)
        .bind(metric.duration_ms)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(stage, batch_no, error = %e, "failed recording batch metric");
        }
    }
}

async fn insert_ingestion_file(tx: &mut Transaction<'_, Postgres>, file: &IngestionFile) -> Result<(IngestionFileId, bool), IngestionError> {
    let root_kind = match file.root_kind {
        claims_ingest_domain::value_objects::RootKind::Submission => "submission",
        claims_ingest_domain::value_objects::RootKind::Remittance => "remittance",
    };

    let result = sqlx::query(
        "insert into claims.ingestion_file \
         (id, file_id, root_kind, sender_id, receiver_id, transaction_date, declared_record_count, disposition_flag, raw_xml, created_at, updated_at) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         on conflict (file_id) do nothing",
    )
    .bind(file.id.to_string())
    .bind(file.file_id.as_str())
    .bind(root_kind)
    .bind(&file.sender_id)
    .bind(&file.receiver_id)
    .bind(file.transaction_date)
    .bind(file.declared_record_count)
    .bind(&file.disposition_flag)
    .bind(&file.raw_xml)
    .bind(file.created_at)
    .bind(file.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 1 {
        return Ok((file.id, false));
    }

    let existing: String = sqlx::query_scalar("select id from claims.ingestion_file where file_id = $1")
        .bind(file.file_id.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(db_err)?;
    let existing_id: IngestionFileId = existing.parse()?;
    Ok((existing_id, true))
}

async fn insert_submission(tx: &mut Transaction<'_, Postgres>, group: &Submission) -> Result<(), IngestionError> {
    sqlx::query("insert into claims.submission (id, ingestion_file_id, created_at) values ($1, $2, $3)")
        .bind(group.id.to_string())
        .bind(group.ingestion_file_id.to_string())
        .bind(group.created_at)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn insert_remittance(tx: &mut Transaction<'_, Postgres>, group: &Remittance) -> Result<(), IngestionError> {
    sqlx::query("insert into claims.remittance (id, ingestion_file_id, created_at) values ($1, $2, $3)")
        .bind(group.id.to_string())
        .bind(group.ingestion_file_id.to_string())
        .bind(group.created_at)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Upserts the `claim_key` row for `claim_id`, returning its surrogate id
/// whether it was just created or already existed.
async fn upsert_claim_key(tx: &mut Transaction<'_, Postgres>, claim_id: &ClaimBizId, now: DateTime<Utc>) -> Result<ClaimKeyId, IngestionError> {
    let fresh = ClaimKey::new(claim_id.clone(), now);
    sqlx::query("insert into claims.claim_key (id, claim_id, created_at) values ($1, $2, $3) on conflict (claim_id) do nothing")
        .bind(fresh.id.to_string())
        .bind(fresh.claim_id.as_str())
        .bind(fresh.created_at)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;

    let id: String = sqlx::query_scalar("select id from claims.claim_key where claim_id = $1")
        .bind(claim_id.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(db_err)?;
    id.parse()
}

async fn record_conflict(
    tx: &mut Transaction<'_, Postgres>,
    ingestion_file_id: IngestionFileId,
    object_type: &str,
    object_key: &str,
    code: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Result<(), IngestionError> {
    let id = IngestionErrorRecordId::new();
    sqlx::query(
        "insert into claims.ingestion_error \
         (id, ingestion_file_id, stage, object_type, object_key, code, severity, message, retryable, occurred_at) \
         values ($1, $2, 'persist', $3, $4, $5, 'ERROR', $6, false, $7)",
    )
    .bind(id.to_string())
    .bind(ingestion_file_id.to_string())
    .bind(object_type)
    .bind(object_key)
    .bind(code)
    .bind(message)
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Inserts a `claim_event` under the `(claim_key_id, event_type,
/// event_time)` uniqueness rule. Returns `None` when an identical event
/// already exists; the caller records the conflict and skips snapshots.
async fn insert_claim_event(tx: &mut Transaction<'_, Postgres>, event: &ClaimEvent) -> Result<Option<ClaimEventId>, IngestionError> {
    let (source_submission_id, source_remittance_id) = match event.source {
        EventSource::Submission(id) => (Some(id.to_string()), None),
        EventSource::Remittance(id) => (None, Some(id.to_string())),
    };

    let result = sqlx::query(
        "insert into claims.claim_event (id, claim_key_id, event_type, event_time, ingestion_file_id, source_submission_id, source_remittance_id) \
         values ($1, $2, $3, $4, $5, $6, $7) \
         on conflict (claim_key_id, event_type, event_time) do nothing",
    )
    .bind(event.id.to_string())
    .bind(event.claim_key_id.to_string())
    .bind(event.event_type.code())
    .bind(event.event_time)
    .bind(event.ingestion_file_id.to_string())
    .bind(source_submission_id)
    .bind(source_remittance_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok((result.rows_affected() == 1).then_some(event.id))
}

#[allow(clippy::too_many_arguments)]
async fn persist_one_claim(
    tx: &mut Transaction<'_, Postgres>,
    ingestion_file_id: IngestionFileId,
    submission_id: SubmissionId,
    event_time: DateTime<Utc>,
    claim: &ClaimDTO,
    hash_sensitive: bool,
    pepper: &[u8],
    counts: &mut PersistCounts,
) -> Result<(), IngestionError> {
    let now = Utc::now();
    let claim_biz_id = ClaimBizId::new(claim.claim_id.clone())?;
    let claim_key_id = upsert_claim_key(tx, &claim_biz_id, now).await?;

    let row = match claim_row(claim_key_id, submission_id, claim, hash_sensitive, pepper) {
        Ok(row) => row,
        Err(e) => {
            counts.conflicts += 1;
            record_conflict(tx, ingestion_file_id, "Claim", &claim.claim_id, "CLAIM_INVALID_CORE", &e.to_string(), now).await?;
            return Ok(());
        }
    };

    let result = sqlx::query(
        "insert into claims.claim \
         (id, claim_key_id, submission_id, payer_id, provider_id, member_id, patient_identifier, gross_cents, patient_share_cents, net_cents, comments, ref_id) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         on conflict (claim_key_id) do nothing",
    )
    .bind(row.id.to_string())
    .bind(row.claim_key_id.to_string())
    .bind(row.submission_id.to_string())
    .bind(&row.payer_id)
    .bind(&row.provider_id)
    .bind(&row.member_id)
    .bind(&row.patient_identifier)
    .bind(row.gross.cents())
    .bind(row.patient_share.cents())
    .bind(row.net.cents())
    .bind(&row.comments)
    .bind(&row.ref_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    let (claim_id, is_resubmission) = if result.rows_affected() == 1 {
        (row.id, false)
    } else {
        let existing: String = sqlx::query_scalar("select id from claims.claim where claim_key_id = $1")
            .bind(claim_key_id.to_string())
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?;

        if claim.resubmission.is_none() {
            counts.conflicts += 1;
            record_conflict(
                tx,
                ingestion_file_id,
                "Claim",
                &claim.claim_id,
                "DUP_SUBMISSION_NO_RESUB",
                "claim already submitted and no <Resubmission> marker was present",
                now,
            )
            .await?;
            return Ok(());
        }

        (existing.parse()?, true)
    };

    // The base claim row is written once and never touched again; whatever
    // changed on resubmission lives in the claim_event_activity snapshot
    // below, keyed to this event rather than overwriting history.
    if !is_resubmission {
        if let Some(dto) = &claim.encounter {
            let encounter = Encounter {
                id: EncounterId::new(),
                claim_id,
                facility_id: dto.facility_id.clone(),
                encounter_type: dto.encounter_type.clone(),
                patient_id: dto.patient_id.clone(),
                start: dto.start,
                end: dto.end,
                start_type: dto.start_type.clone(),
                end_type: dto.end_type.clone(),
                transfer_source: dto.transfer_source.clone(),
                transfer_destination: dto.transfer_destination.clone(),
            };
            sqlx::query(
                "insert into claims.encounter \
                 (id, claim_id, facility_id, encounter_type, patient_id, start_time, end_time, start_type, end_type, transfer_source, transfer_destination) \
                 values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(encounter.id.to_string())
            .bind(encounter.claim_id.to_string())
            .bind(&encounter.facility_id)
            .bind(&encounter.encounter_type)
            .bind(&encounter.patient_id)
            .bind(encounter.start)
            .bind(encounter.end)
            .bind(&encounter.start_type)
            .bind(&encounter.end_type)
            .bind(&encounter.transfer_source)
            .bind(&encounter.transfer_destination)
            .execute(&mut **tx)
            .await
            .map_err(db_err)?;
        }

        for (diagnosis_type, code) in &claim.diagnoses {
            let diagnosis = Diagnosis {
                id: DiagnosisId::new(),
                claim_id,
                diagnosis_type: diagnosis_type.clone(),
                code: code.clone(),
            };
            sqlx::query("insert into claims.diagnosis (id, claim_id, diagnosis_type, code) values ($1, $2, $3, $4)")
                .bind(diagnosis.id.to_string())
                .bind(diagnosis.claim_id.to_string())
                .bind(&diagnosis.diagnosis_type)
                .bind(&diagnosis.code)
                .execute(&mut **tx)
                .await
                .map_err(db_err)?;
            counts.diagnoses += 1;
        }
    }

    let event = ClaimEvent {
        id: ClaimEventId::new(),
        claim_key_id,
        event_type: if is_resubmission { ClaimEventType::Resubmission } else { ClaimEventType::Submission },
        event_time,
        ingestion_file_id,
        source: EventSource::Submission(submission_id),
    };
    let Some(claim_event_id) = insert_claim_event(tx, &event).await? else {
        counts.conflicts += 1;
        record_conflict(
            tx,
            ingestion_file_id,
            "ClaimEvent",
            &claim.claim_id,
            "DUP_SUBMISSION_EVENT",
            "an identical event already exists for this claim at this transaction time",
            now,
        )
        .await?;
        return Ok(());
    };

    counts.claims += 1;

    for activity in &claim.activities {
        persist_activity(tx, ingestion_file_id, claim_id, claim_event_id, activity, is_resubmission, counts).await?;
    }

    let status = if is_resubmission { ClaimStatus::Resubmitted } else { ClaimStatus::Submitted };
    append_status_if_changed(tx, claim_key_id, status, event_time).await?;

    if let Some(resubmission) = &claim.resubmission {
        // A first-time submission can carry the marker too; the
        // resubmission row then hangs off its own RESUBMISSION event so
        // the chronology still reads SUBMITTED then RESUBMITTED.
        let resubmission_event_id = if is_resubmission {
            Some(claim_event_id)
        } else {
            let follow_on = ClaimEvent {
                id: ClaimEventId::new(),
                claim_key_id,
                event_type: ClaimEventType::Resubmission,
                event_time,
                ingestion_file_id,
                source: EventSource::Submission(submission_id),
            };
            let inserted = insert_claim_event(tx, &follow_on).await?;
            if inserted.is_some() {
                append_status_if_changed(tx, claim_key_id, ClaimStatus::Resubmitted, event_time).await?;
            }
            inserted
        };

        if let Some(resubmission_event_id) = resubmission_event_id {
            let row = ClaimResubmission {
                id: ClaimResubmissionId::new(),
                claim_event_id: resubmission_event_id,
                resubmission_type: resubmission.resubmission_type.clone(),
                comment: resubmission.comment.clone(),
                attachment: resubmission.attachment.clone(),
            };
            sqlx::query("insert into claims.claim_resubmission (id, claim_event_id, resubmission_type, comment, attachment) values ($1, $2, $3, $4, $5)")
                .bind(row.id.to_string())
                .bind(row.claim_event_id.to_string())
                .bind(&row.resubmission_type)
                .bind(&row.comment)
                .bind(&row.attachment)
                .execute(&mut **tx)
                .await
                .map_err(db_err)?;
        }
    }

    Ok(())
}

async fn persist_activity(
    tx: &mut Transaction<'_, Postgres>,
    ingestion_file_id: IngestionFileId,
    claim_id: ClaimId,
    claim_event_id: ClaimEventId,
    activity: &ActivityDTO,
    is_resubmission: bool,
    counts: &mut PersistCounts,
) -> Result<(), IngestionError> {
    let row = match activity_row(claim_id, activity) {
        Ok(row) => row,
        Err(e) => {
            counts.conflicts += 1;
            record_conflict(tx, ingestion_file_id, "Activity", &activity.activity_id, "ACTIVITY_INVALID_CORE", &e.to_string(), Utc::now())
                .await?;
            return Ok(());
        }
    };

    let result = sqlx::query(
        "insert into claims.activity (id, claim_id, activity_id, start_time, activity_type, code, quantity, net_cents, clinician, prior_authorization_id) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         on conflict (claim_id, activity_id) do nothing",
    )
    .bind(row.id.to_string())
    .bind(row.claim_id.to_string())
    .bind(row.activity_id.as_str())
    .bind(row.start)
    .bind(&row.activity_type)
    .bind(&row.code)
    .bind(row.quantity)
    .bind(row.net.cents())
    .bind(&row.clinician)
    .bind(&row.prior_authorization_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    let activity_row_id = if result.rows_affected() == 1 {
        counts.activities += 1;
        row.id
    } else if is_resubmission {
        // The base activity row is written once; its per-event values
        // (net, prior authorization) live in claim_event_activity instead
        // of overwriting this row.
        let existing: String =
            sqlx::query_scalar("select id from claims.activity where claim_id = $1 and activity_id = $2")
                .bind(row.claim_id.to_string())
                .bind(row.activity_id.as_str())
                .fetch_one(&mut **tx)
                .await
                .map_err(db_err)?;
        counts.activities += 1;
        existing.parse()?
    } else {
        // claim.activity unique by (claim_id, activity_id); a duplicate
        // activity id inside one claim is a row-level conflict, not a
        // reason to drop the claim.
        counts.conflicts += 1;
        return Ok(());
    };

    let snapshot = ClaimEventActivity {
        id: ClaimEventActivityId::new(),
        claim_event_id,
        activity_id_at_event: activity.activity_id.clone(),
        net: row.net,
        list_price: None,
        gross: None,
        patient_share: None,
        payment_amount: None,
        denial_code: None,
        prior_authorization_id: row.prior_authorization_id.clone(),
    };
    insert_event_activity_snapshot(tx, &snapshot).await?;

    for observation in &activity.observations {
        persist_observation(tx, activity_row_id, snapshot.id, observation, counts).await?;
    }

    Ok(())
}

async fn insert_event_activity_snapshot(tx: &mut Transaction<'_, Postgres>, snapshot: &ClaimEventActivity) -> Result<(), IngestionError> {
    sqlx::query(
        "insert into claims.claim_event_activity \
         (id, claim_event_id, activity_id_at_event, net_cents, list_price_cents, gross_cents, patient_share_cents, payment_amount_cents, denial_code, prior_authorization_id) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
    )
    .bind(snapshot.id.to_string())
    .bind(snapshot.claim_event_id.to_string())
    .bind(&snapshot.activity_id_at_event)
    .bind(snapshot.net.cents())
    .bind(snapshot.list_price.map(|m| m.cents()))
    .bind(snapshot.gross.map(|m| m.cents()))
    .bind(snapshot.patient_share.map(|m| m.cents()))
    .bind(snapshot.payment_amount.map(|m| m.cents()))
    .bind(&snapshot.denial_code)
    .bind(&snapshot.prior_authorization_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;
    Ok(())
}

async fn persist_observation(
    tx: &mut Transaction<'_, Postgres>,
    activity_row_id: ActivityId,
    claim_event_activity_id: ClaimEventActivityId,
    observation: &ObservationDTO,
    counts: &mut PersistCounts,
) -> Result<(), IngestionError> {
    let row = observation_row(activity_row_id, observation);

    let result = sqlx::query(
        "insert into claims.observation (id, activity_id, obs_type, obs_code, value_text, value_hash, file_bytes) \
         values ($1, $2, $3, $4, $5, $6, $7) \
         on conflict (activity_id, obs_type, obs_code, value_hash) do nothing",
    )
    .bind(row.id.to_string())
    .bind(row.activity_id.to_string())
    .bind(&row.obs_type)
    .bind(&row.obs_code)
    .bind(&row.value_text)
    .bind(&row.value_hash)
    .bind(&row.file_bytes)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    if result.rows_affected() == 1 {
        counts.observations += 1;
    }

    let snapshot = EventObservation {
        id: EventObservationId::new(),
        claim_event_activity_id,
        obs_type: row.obs_type.clone(),
        obs_code: row.obs_code.clone(),
        value_text: row.value_text.clone(),
        value_hash: row.value_hash.clone(),
    };
    sqlx::query(
        "insert into claims.event_observation (id, claim_event_activity_id, obs_type, obs_code, value_text, value_hash) \
         values ($1, $2, $3, $4, $5, $6) \
         on conflict (claim_event_activity_id, obs_type, obs_code, value_hash) do nothing",
    )
    .bind(snapshot.id.to_string())
    .bind(snapshot.claim_event_activity_id.to_string())
    .bind(&snapshot.obs_type)
    .bind(&snapshot.obs_code)
    .bind(&snapshot.value_text)
    .bind(&snapshot.value_hash)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(())
}

async fn append_status_if_changed(
    tx: &mut Transaction<'_, Postgres>,
    claim_key_id: ClaimKeyId,
    status: ClaimStatus,
    status_time: DateTime<Utc>,
) -> Result<(), IngestionError> {
    let latest: Option<i16> = sqlx::query_scalar(
        "select status from claims.claim_status_timeline where claim_key_id = $1 order by status_time desc limit 1",
    )
    .bind(claim_key_id.to_string())
    .fetch_optional(&mut **tx)
    .await
    .map_err(db_err)?;

    if latest == Some(status.code()) {
        return Ok(());
    }

    let row = ClaimStatusTimelineRow { claim_key_id, status, status_time };
    sqlx::query("insert into claims.claim_status_timeline (claim_key_id, status, status_time) values ($1, $2, $3)")
        .bind(row.claim_key_id.to_string())
        .bind(row.status.code())
        .bind(row.status_time)
        .execute(&mut **tx)
        .await
        .map_err(db_err)?;
    Ok(())
}

async fn persist_one_remittance_claim(
    tx: &mut Transaction<'_, Postgres>,
    ingestion_file_id: IngestionFileId,
    remittance_id: RemittanceId,
    claim: &RemittanceClaimDTO,
    counts: &mut PersistCounts,
) -> Result<(), IngestionError> {
    let now = Utc::now();
    let claim_biz_id = ClaimBizId::new(claim.claim_id.clone())?;

    let claim_key_id: Option<String> = sqlx::query_scalar("select id from claims.claim_key where claim_id = $1")
        .bind(claim_biz_id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;

    let claim_key_id: ClaimKeyId = match claim_key_id {
        Some(id) => id.parse()?,
        None => {
            counts.conflicts += 1;
            record_conflict(
                tx,
                ingestion_file_id,
                "RemittanceClaim",
                &claim.claim_id,
                "REMIT_UNKNOWN_CLAIM",
                "remittance references a claim that was never submitted",
                now,
            )
            .await?;
            return Ok(());
        }
    };

    let claim_row: Option<(String, i64)> = sqlx::query_as("select id, net_cents from claims.claim where claim_key_id = $1")
        .bind(claim_key_id.to_string())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;
    let Some((claim_row_id, claim_net_cents)) = claim_row else {
        counts.conflicts += 1;
        return Ok(());
    };
    let claim_row_id: ClaimId = claim_row_id.parse()?;
    let claim_net = Money::from_cents(claim_net_cents);

    let event_time = claim.date_settlement.unwrap_or(now);
    let event = ClaimEvent {
        id: ClaimEventId::new(),
        claim_key_id,
        event_type: ClaimEventType::Remittance,
        event_time,
        ingestion_file_id,
        source: EventSource::Remittance(remittance_id),
    };
    let Some(claim_event_id) = insert_claim_event(tx, &event).await? else {
        counts.conflicts += 1;
        record_conflict(
            tx,
            ingestion_file_id,
            "ClaimEvent",
            &claim.claim_id,
            "DUP_REMITTANCE_EVENT",
            "an identical remittance event already exists for this claim at this settlement time",
            now,
        )
        .await?;
        return Ok(());
    };

    let row = remittance_claim_row(remittance_id, claim_key_id, claim);
    let inserted = sqlx::query(
        "insert into claims.remittance_claim (id, remittance_id, claim_key_id, payer_id, provider_id, denial_code, payment_reference, date_settlement, facility_id) \
         values ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         on conflict (remittance_id, claim_key_id) do nothing",
    )
    .bind(row.id.to_string())
    .bind(row.remittance_id.to_string())
    .bind(row.claim_key_id.to_string())
    .bind(&row.payer_id)
    .bind(&row.provider_id)
    .bind(&row.denial_code)
    .bind(&row.payment_reference)
    .bind(row.date_settlement)
    .bind(&row.facility_id)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    let remittance_claim_id: RemittanceClaimId = if inserted.rows_affected() == 1 {
        counts.remittance_claims += 1;
        row.id
    } else {
        // Same (remittance, claim) pair twice in one file with distinct
        // settlement times; the activities attach to the first row.
        counts.conflicts += 1;
        let existing: String = sqlx::query_scalar("select id from claims.remittance_claim where remittance_id = $1 and claim_key_id = $2")
            .bind(remittance_id.to_string())
            .bind(claim_key_id.to_string())
            .fetch_one(&mut **tx)
            .await
            .map_err(db_err)?;
        existing.parse()?
    };

    let mut any_denied = claim.denial_code.is_some();
    for activity in &claim.activities {
        if persist_remittance_activity(tx, ingestion_file_id, remittance_claim_id, claim_event_id, claim_row_id, activity, counts).await? {
            any_denied = any_denied || activity.denial_code.is_some();
        }
    }

    let total_paid = recompute_total_paid(tx, claim_key_id).await?;
    let status = ClaimStatus::derive(total_paid, claim_net, any_denied);
    append_status_if_changed(tx, claim_key_id, status, event_time).await?;

    Ok(())
}

async fn persist_remittance_activity(
    tx: &mut Transaction<'_, Postgres>,
    ingestion_file_id: IngestionFileId,
    remittance_claim_id: RemittanceClaimId,
    claim_event_id: ClaimEventId,
    claim_row_id: ClaimId,
    activity: &RemittanceActivityDTO,
    counts: &mut PersistCounts,
) -> Result<bool, IngestionError> {
    let row = match remittance_activity_row(remittance_claim_id, activity) {
        Ok(row) => row,
        Err(e) => {
            counts.conflicts += 1;
            record_conflict(tx, ingestion_file_id, "RemittanceActivity", &activity.activity_id, "ACTIVITY_INVALID_CORE", &e.to_string(), Utc::now())
                .await?;
            return Ok(false);
        }
    };

    let inserted = sqlx::query(
        "insert into claims.remittance_activity (id, remittance_claim_id, activity_id, payment_amount_cents, list_price_cents, gross_cents, patient_share_cents, denial_code) \
         values ($1, $2, $3, $4, $5, $6, $7, $8) \
         on conflict (remittance_claim_id, activity_id) do nothing",
    )
    .bind(row.id.to_string())
    .bind(row.remittance_claim_id.to_string())
    .bind(row.activity_id.as_str())
    .bind(row.payment_amount.cents())
    .bind(row.list_price.map(|m| m.cents()))
    .bind(row.gross.map(|m| m.cents()))
    .bind(row.patient_share.map(|m| m.cents()))
    .bind(&row.denial_code)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    if inserted.rows_affected() == 0 {
        counts.conflicts += 1;
        return Ok(false);
    }
    counts.remittance_activities += 1;

    let original_net: Option<i64> = sqlx::query_scalar("select net_cents from claims.activity where claim_id = $1 and activity_id = $2")
        .bind(claim_row_id.to_string())
        .bind(row.activity_id.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(db_err)?;

    let snapshot = ClaimEventActivity {
        id: ClaimEventActivityId::new(),
        claim_event_id,
        activity_id_at_event: activity.activity_id.clone(),
        net: Money::from_cents(original_net.unwrap_or(0)),
        list_price: row.list_price,
        gross: row.gross,
        patient_share: row.patient_share,
        payment_amount: Some(row.payment_amount),
        denial_code: row.denial_code.clone(),
        prior_authorization_id: None,
    };
    insert_event_activity_snapshot(tx, &snapshot).await?;

    Ok(true)
}

/// Sums each submitted activity's cumulative-paid-to-date, capped at that
/// activity's originally submitted net, across every remittance event
/// seen so far for this claim.
async fn recompute_total_paid(tx: &mut Transaction<'_, Postgres>, claim_key_id: ClaimKeyId) -> Result<Money, IngestionError> {
    let rows: Vec<(i64, Option<i64>)> = sqlx::query_as(
        "select a.net_cents, \
                (select sum(cea.payment_amount_cents)::bigint from claims.claim_event_activity cea \
                 join claims.claim_event ce on ce.id = cea.claim_event_id \
                 where ce.claim_key_id = $1 and cea.activity_id_at_event = a.activity_id) \
         from claims.activity a \
         join claims.claim c on c.id = a.claim_id \
         where c.claim_key_id = $1",
    )
    .bind(claim_key_id.to_string())
    .fetch_all(&mut **tx)
    .await
    .map_err(db_err)?;

    let mut total = Money::ZERO;
    for (net_cents, paid_cents) in rows {
        let net = Money::from_cents(net_cents);
        let paid = Money::from_cents(paid_cents.unwrap_or(0));
        total = total + paid.capped_at(net);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_hash_differs_by_observation_identity() {
        let a = value_hash("LAB", "GLUC", Some("110"), None);
        let b = value_hash("LAB", "GLUC", Some("111"), None);
        assert_ne!(a, b);
    }

    #[test]
    fn value_hash_stable_for_same_inputs() {
        let a = value_hash("LAB", "GLUC", Some("110"), None);
        let b = value_hash("LAB", "GLUC", Some("110"), None);
        assert_eq!(a, b);
    }

    fn claim_dto() -> ClaimDTO {
        ClaimDTO {
            claim_id: "C1".to_string(),
            payer_id: "P1".to_string(),
            provider_id: "V1".to_string(),
            member_id: None,
            patient_identifier: "784-0000".to_string(),
            gross: "100.00".to_string(),
            patient_share: "10.00".to_string(),
            net: "90.00".to_string(),
            comments: None,
            ref_id: None,
            encounter: None,
            diagnoses: vec![],
            activities: vec![],
            resubmission: None,
        }
    }

    #[test]
    fn claim_row_maps_amounts_to_cents() {
        let row = claim_row(ClaimKeyId::new(), SubmissionId::new(), &claim_dto(), false, b"").unwrap();
        assert_eq!(row.gross.cents(), 10_000);
        assert_eq!(row.patient_share.cents(), 1_000);
        assert_eq!(row.net.cents(), 9_000);
        assert_eq!(row.patient_identifier, "784-0000");
    }

    #[test]
    fn claim_row_hashes_patient_identifier_when_asked() {
        let row = claim_row(ClaimKeyId::new(), SubmissionId::new(), &claim_dto(), true, b"pepper").unwrap();
        assert_ne!(row.patient_identifier, "784-0000");
        assert_eq!(row.patient_identifier.len(), 64);
    }

    #[test]
    fn claim_row_rejects_sub_cent_amounts() {
        let mut dto = claim_dto();
        dto.net = "90.005".to_string();
        assert!(claim_row(ClaimKeyId::new(), SubmissionId::new(), &dto, false, b"").is_err());
    }

    #[test]
    fn remittance_activity_row_rejects_blank_activity_id() {
        let dto = RemittanceActivityDTO {
            activity_id: "  ".to_string(),
            payment_amount: "90.00".to_string(),
            list_price: None,
            gross: None,
            patient_share: None,
            denial_code: None,
        };
        assert!(remittance_activity_row(RemittanceClaimId::new(), &dto).is_err());
    }
}
