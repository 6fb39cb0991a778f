// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for C6. The parser hands back a typed DTO tree plus a flat list
//! of problems; it never fails the whole file for one bad claim.

use chrono::{DateTime, Utc};

use crate::value_objects::ParseSeverity;

/// Standard parse/validation problem codes recorded to the error ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCode {
    UnknownRoot,
    XsdInvalid,
    HdrMissing,
    ClaimInvalidCore,
    ActivityInvalidCore,
    ObsFileTooLarge,
    AttachmentB64Corrupt,
    RecordCountMismatch,
    DateUnparseable,
}

impl ParseCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseCode::UnknownRoot => "UNKNOWN_ROOT",
            ParseCode::XsdInvalid => "XSD_INVALID",
            ParseCode::HdrMissing => "HDR_MISSING",
            ParseCode::ClaimInvalidCore => "CLAIM_INVALID_CORE",
            ParseCode::ActivityInvalidCore => "ACTIVITY_INVALID_CORE",
            ParseCode::ObsFileTooLarge => "OBS_FILE_TOO_LARGE",
            ParseCode::AttachmentB64Corrupt => "ATTACHMENT_B64_CORRUPT",
            ParseCode::RecordCountMismatch => "RECORDCOUNT_MISMATCH",
            ParseCode::DateUnparseable => "DATE_UNPARSEABLE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParseProblem {
    pub severity: ParseSeverity,
    pub code: ParseCode,
    pub object_type: String,
    pub object_key: String,
    pub message: String,
    pub line_number: Option<u64>,
    pub column_number: Option<u64>,
}

impl ParseProblem {
    pub fn error(code: ParseCode, object_type: impl Into<String>, object_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ParseSeverity::Error,
            code,
            object_type: object_type.into(),
            object_key: object_key.into(),
            message: message.into(),
            line_number: None,
            column_number: None,
        }
    }

    pub fn warning(code: ParseCode, object_type: impl Into<String>, object_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ParseSeverity::Warning,
            code,
            object_type: object_type.into(),
            object_key: object_key.into(),
            message: message.into(),
            line_number: None,
            column_number: None,
        }
    }

    pub fn at(mut self, line: u64, column: u64) -> Self {
        self.line_number = Some(line);
        self.column_number = Some(column);
        self
    }
}

#[derive(Debug, Clone)]
pub struct HeaderDTO {
    pub sender_id: String,
    pub receiver_id: String,
    pub transaction_date: DateTime<Utc>,
    pub record_count: i32,
}

#[derive(Debug, Clone)]
pub struct ObservationDTO {
    pub obs_type: String,
    pub obs_code: String,
    pub value_text: Option<String>,
    pub file_bytes: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ActivityDTO {
    pub activity_id: String,
    pub start: DateTime<Utc>,
    pub activity_type: String,
    pub code: String,
    pub quantity: f64,
    pub net: String,
    pub clinician: Option<String>,
    pub prior_authorization_id: Option<String>,
    pub observations: Vec<ObservationDTO>,
}

#[derive(Debug, Clone)]
pub struct EncounterDTO {
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

#[derive(Debug, Clone)]
pub struct ResubmissionDTO {
    pub resubmission_type: String,
    pub comment: Option<String>,
    pub attachment: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct ClaimDTO {
    pub claim_id: String,
    pub payer_id: String,
    pub provider_id: String,
    pub member_id: Option<String>,
    pub patient_identifier: String,
    pub gross: String,
    pub patient_share: String,
    pub net: String,
    pub comments: Option<String>,
    pub ref_id: Option<String>,
    pub encounter: Option<EncounterDTO>,
    pub diagnoses: Vec<(String, String)>,
    pub activities: Vec<ActivityDTO>,
    pub resubmission: Option<ResubmissionDTO>,
}

#[derive(Debug, Clone)]
pub struct SubmissionDTO {
    pub header: HeaderDTO,
    pub claims: Vec<ClaimDTO>,
}

#[derive(Debug, Clone)]
pub struct RemittanceActivityDTO {
    pub activity_id: String,
    pub payment_amount: String,
    pub list_price: Option<String>,
    pub gross: Option<String>,
    pub patient_share: Option<String>,
    pub denial_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RemittanceClaimDTO {
    pub claim_id: String,
    pub payer_id: String,
    pub provider_id: String,
    pub denial_code: Option<String>,
    pub payment_reference: Option<String>,
    pub date_settlement: Option<DateTime<Utc>>,
    pub facility_id: Option<String>,
    pub activities: Vec<RemittanceActivityDTO>,
}

#[derive(Debug, Clone)]
pub struct RemittanceAdviceDTO {
    pub header: HeaderDTO,
    pub claims: Vec<RemittanceClaimDTO>,
}

#[derive(Debug, Clone)]
pub enum ParsedDocument {
    Submission(SubmissionDTO),
    Remittance(RemittanceAdviceDTO),
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub document: Option<ParsedDocument>,
    pub problems: Vec<ParseProblem>,
}

impl ParseOutcome {
    pub fn has_errors(&self) -> bool {
        self.problems.iter().any(|p| p.severity == ParseSeverity::Error)
    }
}

/// Port for C6. Implementations are synchronous (parsing is CPU-bound,
/// non-suspending except for streaming input reads) and take ownership
/// of neither the bytes nor the toggle configuration.
pub trait Parser: Send + Sync {
    fn parse(&self, bytes: &[u8], fail_on_xsd_error: bool, max_attachment_bytes: u64) -> ParseOutcome;
}
