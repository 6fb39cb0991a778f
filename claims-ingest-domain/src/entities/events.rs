// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The append-only chronology: `ClaimEvent` and its snapshots, plus the
//! derived `ClaimStatusTimeline`. Nothing here is ever updated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{
    ClaimEventActivityId, ClaimEventId, ClaimEventType, ClaimKeyId, ClaimResubmissionId, ClaimStatus, EventObservationId,
    IngestionFileId, Money, RemittanceId, SubmissionId,
};

/// Either the `Submission` or `Remittance` group row that produced an
/// event, kept as a tagged reference rather than two nullable FKs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventSource {
    Submission(SubmissionId),
    Remittance(RemittanceId),
}

/// Unique by `(claim_key_id, type, event_time)`; additionally at most one
/// `Submission` event per `claim_key_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEvent {
    pub id: ClaimEventId,
    pub claim_key_id: ClaimKeyId,
    pub event_type: ClaimEventType,
    pub event_time: DateTime<Utc>,
    pub ingestion_file_id: IngestionFileId,
    pub source: EventSource,
}

/// Per-event activity snapshot, frozen at the moment of the event.
/// Unique by `(claim_event_id, activity_id_at_event)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimEventActivity {
    pub id: ClaimEventActivityId,
    pub claim_event_id: ClaimEventId,
    pub activity_id_at_event: String,
    pub net: Money,
    pub list_price: Option<Money>,
    pub gross: Option<Money>,
    pub patient_share: Option<Money>,
    pub payment_amount: Option<Money>,
    pub denial_code: Option<String>,
    pub prior_authorization_id: Option<String>,
}

/// Per-event observation snapshot, child of a `ClaimEventActivity`.
/// Unique by `(claim_event_activity_id, obs_type, obs_code, hash(value))`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventObservation {
    pub id: EventObservationId,
    pub claim_event_activity_id: ClaimEventActivityId,
    pub obs_type: String,
    pub obs_code: String,
    pub value_text: Option<String>,
    pub value_hash: String,
}

/// One-to-one with a `Resubmission` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimResubmission {
    pub id: ClaimResubmissionId,
    pub claim_event_id: ClaimEventId,
    pub resubmission_type: String,
    pub comment: Option<String>,
    pub attachment: Option<Vec<u8>>,
}

/// Append-only. The latest row by `status_time` (ties broken by
/// insertion order) defines current status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimStatusTimelineRow {
    pub claim_key_id: ClaimKeyId,
    pub status: ClaimStatus,
    pub status_time: DateTime<Utc>,
}
