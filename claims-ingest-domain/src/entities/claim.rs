// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ActivityBizId, ClaimId, ClaimKeyId, Money, SubmissionId};

/// One per `ClaimKey` at first submission. Later submissions for the
/// same business id are rejected by the persist service unless
/// accompanied by a resubmission marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    pub id: ClaimId,
    pub claim_key_id: ClaimKeyId,
    pub submission_id: SubmissionId,
    pub payer_id: String,
    pub provider_id: String,
    pub member_id: Option<String>,
    /// Patient identifier, optionally hashed before persist
    /// (submission-only, per `ingestion.security.hashSensitive`).
    pub patient_identifier: String,
    pub gross: Money,
    pub patient_share: Money,
    pub net: Money,
    pub comments: Option<String>,
    pub ref_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub id: crate::value_objects::EncounterId,
    pub claim_id: ClaimId,
    pub facility_id: String,
    pub encounter_type: String,
    pub patient_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub start_type: Option<String>,
    pub end_type: Option<String>,
    pub transfer_source: Option<String>,
    pub transfer_destination: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnosis {
    pub id: crate::value_objects::DiagnosisId,
    pub claim_id: ClaimId,
    pub diagnosis_type: String,
    pub code: String,
}

/// Unique by `(claim_id, activity_id)` — the wire-level activity id is
/// only unique within its claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: crate::value_objects::ActivityId,
    pub claim_id: ClaimId,
    pub activity_id: ActivityBizId,
    pub start: DateTime<Utc>,
    pub activity_type: String,
    pub code: String,
    pub quantity: f64,
    pub net: Money,
    pub clinician: Option<String>,
    pub prior_authorization_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    pub id: crate::value_objects::ObservationId,
    pub activity_id: crate::value_objects::ActivityId,
    pub obs_type: String,
    pub obs_code: String,
    pub value_text: Option<String>,
    pub value_hash: String,
    pub file_bytes: Option<Vec<u8>>,
}
