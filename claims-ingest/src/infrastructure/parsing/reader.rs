// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C6: StAX-style pull parser over `quick-xml`. Root dispatch is a cheap
//! byte-level scan for `<Claim.Submission` / `<Remittance.Advice`; the
//! body walk never buffers the whole document into a DOM. A bad claim
//! or activity is dropped from the returned DTO tree and recorded as an
//! error-severity [`ParseProblem`] rather than failing the file.

use base64::Engine;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use claims_ingest_domain::services::{
    ActivityDTO, ClaimDTO, EncounterDTO, HeaderDTO, ObservationDTO, ParseCode, ParseOutcome, ParseProblem, Parser, ParsedDocument,
    RemittanceActivityDTO, RemittanceAdviceDTO, RemittanceClaimDTO, ResubmissionDTO, SubmissionDTO,
};

use super::dates::parse_to_utc;
use super::validate::{require_non_empty, require_parseable_decimal};

#[derive(Debug, Default)]
pub struct XmlStreamingParser;

impl XmlStreamingParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for XmlStreamingParser {
    fn parse(&self, bytes: &[u8], fail_on_xsd_error: bool, max_attachment_bytes: u64) -> ParseOutcome {
        match detect_root(bytes) {
            Some(DocumentRoot::Submission) => parse_submission(bytes, fail_on_xsd_error, max_attachment_bytes),
            Some(DocumentRoot::Remittance) => parse_remittance(bytes, fail_on_xsd_error),
            None => ParseOutcome {
                document: None,
                problems: vec![ParseProblem::error(
                    ParseCode::UnknownRoot,
                    "File",
                    "-",
                    "document root is neither <Claim.Submission> nor <Remittance.Advice>",
                )],
            },
        }
    }
}

enum DocumentRoot {
    Submission,
    Remittance,
}

fn detect_root(bytes: &[u8]) -> Option<DocumentRoot> {
    let window = &bytes[..bytes.len().min(4096)];
    let text = String::from_utf8_lossy(window);
    if text.contains("<Claim.Submission") {
        Some(DocumentRoot::Submission)
    } else if text.contains("<Remittance.Advice") {
        Some(DocumentRoot::Remittance)
    } else {
        None
    }
}

fn xsd_problem(fail_on_xsd_error: bool, message: String) -> ParseProblem {
    if fail_on_xsd_error {
        ParseProblem::error(ParseCode::XsdInvalid, "File", "-", message)
    } else {
        ParseProblem::warning(ParseCode::XsdInvalid, "File", "-", message)
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn decode_base64(raw: &str) -> Option<Vec<u8>> {
    base64::engine::general_purpose::STANDARD.decode(raw.trim()).ok()
}

/// Reads text content up to the matching end tag for a leaf element
/// (e.g. `<ID>123</ID>`). Does not handle nested start tags.
fn read_leaf_text(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> String {
    let mut text = String::new();
    loop {
        match reader.read_event_into(buf) {
            Ok(Event::Text(t)) => text.push_str(&t.unescape().unwrap_or_default()),
            Ok(Event::CData(t)) => text.push_str(&String::from_utf8_lossy(&t.into_inner())),
            Ok(Event::End(_)) | Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    text.trim().to_string()
}

fn parse_submission(bytes: &[u8], fail_on_xsd_error: bool, max_attachment_bytes: u64) -> ParseOutcome {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut problems = Vec::new();
    let mut header: Option<HeaderDTO> = None;
    let mut claims = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Header" => header = parse_header(&mut reader, &mut problems),
                    b"Claim" => {
                        if let Some(claim) = parse_claim(&mut reader, max_attachment_bytes, &mut problems) {
                            claims.push(claim);
                        }
                    }
                    _ => {}
                }
            }
            Err(e) => {
                let fatal = fail_on_xsd_error;
                problems.push(xsd_problem(fail_on_xsd_error, format!("xml syntax error: {e}")));
                if fatal {
                    return ParseOutcome { document: None, problems };
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    let Some(header) = header else {
        problems.push(ParseProblem::error(ParseCode::HdrMissing, "Header", "-", "Header element is required"));
        return ParseOutcome { document: None, problems };
    };

    if header.record_count != claims.len() as i32 {
        problems.push(ParseProblem::error(
            ParseCode::RecordCountMismatch,
            "Header",
            "-",
            format!("declared record count {} does not match {} parsed claims", header.record_count, claims.len()),
        ));
    }

    ParseOutcome {
        document: Some(ParsedDocument::Submission(SubmissionDTO { header, claims })),
        problems,
    }
}

fn parse_remittance(bytes: &[u8], fail_on_xsd_error: bool) -> ParseOutcome {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut problems = Vec::new();
    let mut header: Option<HeaderDTO> = None;
    let mut claims = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Header" => header = parse_header(&mut reader, &mut problems),
                    b"Claim" => {
                        if let Some(claim) = parse_remittance_claim(&mut reader, &mut problems) {
                            claims.push(claim);
                        }
                    }
                    _ => {}
                }
            }
            Err(e) => {
                let fatal = fail_on_xsd_error;
                problems.push(xsd_problem(fail_on_xsd_error, format!("xml syntax error: {e}")));
                if fatal {
                    return ParseOutcome { document: None, problems };
                }
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    let Some(header) = header else {
        problems.push(ParseProblem::error(ParseCode::HdrMissing, "Header", "-", "Header element is required"));
        return ParseOutcome { document: None, problems };
    };

    if header.record_count != claims.len() as i32 {
        problems.push(ParseProblem::error(
            ParseCode::RecordCountMismatch,
            "Header",
            "-",
            format!("declared record count {} does not match {} parsed claims", header.record_count, claims.len()),
        ));
    }

    ParseOutcome {
        document: Some(ParsedDocument::Remittance(RemittanceAdviceDTO { header, claims })),
        problems,
    }
}

fn parse_header(reader: &mut Reader<&[u8]>, problems: &mut Vec<ParseProblem>) -> Option<HeaderDTO> {
    let mut buf = Vec::new();
    let mut sender_id = String::new();
    let mut receiver_id = String::new();
    let mut transaction_date_raw = String::new();
    let mut record_count_raw = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"SenderID" => sender_id = read_leaf_text(reader, &mut buf),
                    b"ReceiverID" => receiver_id = read_leaf_text(reader, &mut buf),
                    b"TransactionDate" => transaction_date_raw = read_leaf_text(reader, &mut buf),
                    b"RecordCount" => record_count_raw = read_leaf_text(reader, &mut buf),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Header" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(problem) = require_non_empty(&sender_id, ParseCode::HdrMissing, "Header", "-", "SenderID") {
        problems.push(problem);
    }
    if let Some(problem) = require_non_empty(&receiver_id, ParseCode::HdrMissing, "Header", "-", "ReceiverID") {
        problems.push(problem);
    }

    let transaction_date = match parse_to_utc(&transaction_date_raw) {
        Some(date) => date,
        None => {
            problems.push(ParseProblem::error(
                ParseCode::DateUnparseable,
                "Header",
                "-",
                format!("TransactionDate is not parseable: {transaction_date_raw:?}"),
            ));
            return None;
        }
    };

    let record_count: i32 = record_count_raw.trim().parse().unwrap_or(0);

    Some(HeaderDTO { sender_id, receiver_id, transaction_date, record_count })
}

fn parse_claim(reader: &mut Reader<&[u8]>, max_attachment_bytes: u64, problems: &mut Vec<ParseProblem>) -> Option<ClaimDTO> {
    let mut buf = Vec::new();
    let mut claim_id = String::new();
    let mut payer_id = String::new();
    let mut provider_id = String::new();
    let mut member_id: Option<String> = None;
    let mut patient_identifier = String::new();
    let mut gross = String::new();
    let mut patient_share = String::new();
    let mut net = String::new();
    let mut comments: Option<String> = None;
    let mut ref_id: Option<String> = None;
    let mut encounter: Option<EncounterDTO> = None;
    let mut diagnoses = Vec::new();
    let mut activities = Vec::new();
    let mut resubmission: Option<ResubmissionDTO> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Encounter" => encounter = Some(parse_encounter(reader)),
                    b"Diagnosis" => diagnoses.push(parse_diagnosis(reader)),
                    b"Activity" => {
                        if let Some(activity) = parse_activity(reader, max_attachment_bytes, &claim_id, problems) {
                            activities.push(activity);
                        }
                    }
                    b"Resubmission" => resubmission = Some(parse_resubmission(reader)),
                    b"ID" => claim_id = read_leaf_text(reader, &mut buf),
                    b"PayerID" => payer_id = read_leaf_text(reader, &mut buf),
                    b"ProviderID" => provider_id = read_leaf_text(reader, &mut buf),
                    b"MemberID" => member_id = non_empty(read_leaf_text(reader, &mut buf)),
                    b"EmiratesIDNumber" => patient_identifier = read_leaf_text(reader, &mut buf),
                    b"Gross" => gross = read_leaf_text(reader, &mut buf),
                    b"PatientShare" => patient_share = read_leaf_text(reader, &mut buf),
                    b"Net" => net = read_leaf_text(reader, &mut buf),
                    b"Comments" => comments = non_empty(read_leaf_text(reader, &mut buf)),
                    b"RefID" => ref_id = non_empty(read_leaf_text(reader, &mut buf)),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Claim" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let object_key = if claim_id.is_empty() { "-".to_string() } else { claim_id.clone() };
    let mut core_valid = true;

    if let Some(p) = require_non_empty(&claim_id, ParseCode::ClaimInvalidCore, "Claim", &object_key, "ID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&payer_id, ParseCode::ClaimInvalidCore, "Claim", &object_key, "PayerID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&provider_id, ParseCode::ClaimInvalidCore, "Claim", &object_key, "ProviderID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&patient_identifier, ParseCode::ClaimInvalidCore, "Claim", &object_key, "EmiratesIDNumber") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_parseable_decimal(&gross, ParseCode::ClaimInvalidCore, "Claim", &object_key, "Gross") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_parseable_decimal(&patient_share, ParseCode::ClaimInvalidCore, "Claim", &object_key, "PatientShare") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_parseable_decimal(&net, ParseCode::ClaimInvalidCore, "Claim", &object_key, "Net") {
        problems.push(p);
        core_valid = false;
    }

    if !core_valid {
        return None;
    }

    Some(ClaimDTO {
        claim_id,
        payer_id,
        provider_id,
        member_id,
        patient_identifier,
        gross,
        patient_share,
        net,
        comments,
        ref_id,
        encounter,
        diagnoses,
        activities,
        resubmission,
    })
}

fn parse_encounter(reader: &mut Reader<&[u8]>) -> EncounterDTO {
    let mut buf = Vec::new();
    let mut facility_id = String::new();
    let mut encounter_type = String::new();
    let mut patient_id: Option<String> = None;
    let mut start: Option<DateTime<Utc>> = None;
    let mut end: Option<DateTime<Utc>> = None;
    let mut start_type: Option<String> = None;
    let mut end_type: Option<String> = None;
    let mut transfer_source: Option<String> = None;
    let mut transfer_destination: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"FacilityID" => facility_id = read_leaf_text(reader, &mut buf),
                    b"Type" => encounter_type = read_leaf_text(reader, &mut buf),
                    b"PatientID" => patient_id = non_empty(read_leaf_text(reader, &mut buf)),
                    b"Start" => start = parse_to_utc(&read_leaf_text(reader, &mut buf)),
                    b"End" => end = parse_to_utc(&read_leaf_text(reader, &mut buf)),
                    b"StartType" => start_type = non_empty(read_leaf_text(reader, &mut buf)),
                    b"EndType" => end_type = non_empty(read_leaf_text(reader, &mut buf)),
                    b"TransferSource" => transfer_source = non_empty(read_leaf_text(reader, &mut buf)),
                    b"TransferDestination" => transfer_destination = non_empty(read_leaf_text(reader, &mut buf)),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Encounter" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    EncounterDTO {
        facility_id,
        encounter_type,
        patient_id,
        start,
        end,
        start_type,
        end_type,
        transfer_source,
        transfer_destination,
    }
}

fn parse_diagnosis(reader: &mut Reader<&[u8]>) -> (String, String) {
    let mut buf = Vec::new();
    let mut diagnosis_type = String::new();
    let mut code = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Type" => diagnosis_type = read_leaf_text(reader, &mut buf),
                    b"Code" => code = read_leaf_text(reader, &mut buf),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Diagnosis" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (diagnosis_type, code)
}

fn parse_resubmission(reader: &mut Reader<&[u8]>) -> ResubmissionDTO {
    let mut buf = Vec::new();
    let mut resubmission_type = String::new();
    let mut comment: Option<String> = None;
    let mut attachment: Option<Vec<u8>> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Type" => resubmission_type = read_leaf_text(reader, &mut buf),
                    b"Comment" => comment = non_empty(read_leaf_text(reader, &mut buf)),
                    b"Attachment" => attachment = decode_base64(&read_leaf_text(reader, &mut buf)),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Resubmission" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    ResubmissionDTO { resubmission_type, comment, attachment }
}

fn parse_activity(reader: &mut Reader<&[u8]>, max_attachment_bytes: u64, claim_id: &str, problems: &mut Vec<ParseProblem>) -> Option<ActivityDTO> {
    let mut buf = Vec::new();
    let mut activity_id = String::new();
    let mut start_raw = String::new();
    let mut activity_type = String::new();
    let mut code = String::new();
    let mut quantity_raw = String::new();
    let mut net = String::new();
    let mut clinician: Option<String> = None;
    let mut prior_authorization_id: Option<String> = None;
    let mut observations = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Observation" => observations.push(parse_observation(reader, max_attachment_bytes, claim_id, &activity_id, problems)),
                    b"ID" => activity_id = read_leaf_text(reader, &mut buf),
                    b"Start" => start_raw = read_leaf_text(reader, &mut buf),
                    b"Type" => activity_type = read_leaf_text(reader, &mut buf),
                    b"Code" => code = read_leaf_text(reader, &mut buf),
                    b"Quantity" => quantity_raw = read_leaf_text(reader, &mut buf),
                    b"Net" => net = read_leaf_text(reader, &mut buf),
                    b"Clinician" => clinician = non_empty(read_leaf_text(reader, &mut buf)),
                    b"PriorAuthorizationID" => prior_authorization_id = non_empty(read_leaf_text(reader, &mut buf)),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Activity" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let object_key = format!("{claim_id}/{}", if activity_id.is_empty() { "-" } else { activity_id.as_str() });
    let mut core_valid = true;

    if let Some(p) = require_non_empty(&activity_id, ParseCode::ActivityInvalidCore, "Activity", &object_key, "ID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&activity_type, ParseCode::ActivityInvalidCore, "Activity", &object_key, "Type") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&code, ParseCode::ActivityInvalidCore, "Activity", &object_key, "Code") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_parseable_decimal(&quantity_raw, ParseCode::ActivityInvalidCore, "Activity", &object_key, "Quantity") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_parseable_decimal(&net, ParseCode::ActivityInvalidCore, "Activity", &object_key, "Net") {
        problems.push(p);
        core_valid = false;
    }

    let start = match parse_to_utc(&start_raw) {
        Some(date) => date,
        None => {
            problems.push(ParseProblem::error(ParseCode::DateUnparseable, "Activity", &object_key, format!("Start is not parseable: {start_raw:?}")));
            core_valid = false;
            Utc::now()
        }
    };

    if !core_valid {
        return None;
    }

    let quantity: f64 = quantity_raw.trim().parse().unwrap_or(0.0);

    Some(ActivityDTO {
        activity_id,
        start,
        activity_type,
        code,
        quantity,
        net,
        clinician,
        prior_authorization_id,
        observations,
    })
}

fn parse_observation(reader: &mut Reader<&[u8]>, max_attachment_bytes: u64, claim_id: &str, activity_id: &str, problems: &mut Vec<ParseProblem>) -> ObservationDTO {
    let mut buf = Vec::new();
    let mut obs_type = String::new();
    let mut obs_code = String::new();
    let mut value_text: Option<String> = None;
    let mut value_type = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Type" => obs_type = read_leaf_text(reader, &mut buf),
                    b"Code" => obs_code = read_leaf_text(reader, &mut buf),
                    b"Value" => value_text = non_empty(read_leaf_text(reader, &mut buf)),
                    b"ValueType" => value_type = read_leaf_text(reader, &mut buf),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Observation" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let object_key = format!("{claim_id}/{activity_id}/{obs_type}:{obs_code}");
    let mut file_bytes = None;

    if value_type.eq_ignore_ascii_case("FILE") {
        if let Some(raw) = &value_text {
            match decode_base64(raw) {
                Some(bytes) => {
                    if bytes.len() as u64 > max_attachment_bytes {
                        problems.push(ParseProblem::warning(
                            ParseCode::ObsFileTooLarge,
                            "Observation",
                            &object_key,
                            format!("attachment is {} bytes, exceeds the {max_attachment_bytes}-byte limit", bytes.len()),
                        ));
                    }
                    file_bytes = Some(bytes);
                }
                None => {
                    problems.push(ParseProblem::error(ParseCode::AttachmentB64Corrupt, "Observation", &object_key, "attachment value is not valid base64"));
                }
            }
        }
    }

    ObservationDTO { obs_type, obs_code, value_text, file_bytes }
}

fn parse_remittance_claim(reader: &mut Reader<&[u8]>, problems: &mut Vec<ParseProblem>) -> Option<RemittanceClaimDTO> {
    let mut buf = Vec::new();
    let mut claim_id = String::new();
    let mut payer_id = String::new();
    let mut provider_id = String::new();
    let mut denial_code: Option<String> = None;
    let mut payment_reference: Option<String> = None;
    let mut date_settlement_raw: Option<String> = None;
    let mut facility_id: Option<String> = None;
    let mut activities = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"Activity" => {
                        if let Some(activity) = parse_remittance_activity(reader, &claim_id, problems) {
                            activities.push(activity);
                        }
                    }
                    b"ID" => claim_id = read_leaf_text(reader, &mut buf),
                    b"PayerID" => payer_id = read_leaf_text(reader, &mut buf),
                    b"ProviderID" => provider_id = read_leaf_text(reader, &mut buf),
                    b"DenialCode" => denial_code = non_empty(read_leaf_text(reader, &mut buf)),
                    b"PaymentReference" => payment_reference = non_empty(read_leaf_text(reader, &mut buf)),
                    b"DateSettlement" => date_settlement_raw = non_empty(read_leaf_text(reader, &mut buf)),
                    b"FacilityID" => facility_id = non_empty(read_leaf_text(reader, &mut buf)),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Claim" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let object_key = if claim_id.is_empty() { "-".to_string() } else { claim_id.clone() };
    let mut core_valid = true;

    if let Some(p) = require_non_empty(&claim_id, ParseCode::ClaimInvalidCore, "RemittanceClaim", &object_key, "ID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&payer_id, ParseCode::ClaimInvalidCore, "RemittanceClaim", &object_key, "PayerID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_non_empty(&provider_id, ParseCode::ClaimInvalidCore, "RemittanceClaim", &object_key, "ProviderID") {
        problems.push(p);
        core_valid = false;
    }

    if !core_valid {
        return None;
    }

    let date_settlement = date_settlement_raw.as_deref().and_then(parse_to_utc);
    if let Some(raw) = &date_settlement_raw {
        if date_settlement.is_none() {
            problems.push(ParseProblem::error(
                ParseCode::DateUnparseable,
                "RemittanceClaim",
                &object_key,
                format!("DateSettlement is not parseable: {raw:?}"),
            ));
        }
    }

    Some(RemittanceClaimDTO { claim_id, payer_id, provider_id, denial_code, payment_reference, date_settlement, facility_id, activities })
}

fn parse_remittance_activity(reader: &mut Reader<&[u8]>, claim_id: &str, problems: &mut Vec<ParseProblem>) -> Option<RemittanceActivityDTO> {
    let mut buf = Vec::new();
    let mut activity_id = String::new();
    let mut payment_amount = String::new();
    let mut list_price: Option<String> = None;
    let mut gross: Option<String> = None;
    let mut patient_share: Option<String> = None;
    let mut denial_code: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"ID" => activity_id = read_leaf_text(reader, &mut buf),
                    b"PaymentAmount" => payment_amount = read_leaf_text(reader, &mut buf),
                    b"ListPrice" => list_price = non_empty(read_leaf_text(reader, &mut buf)),
                    b"Gross" => gross = non_empty(read_leaf_text(reader, &mut buf)),
                    b"PatientShare" => patient_share = non_empty(read_leaf_text(reader, &mut buf)),
                    b"DenialCode" => denial_code = non_empty(read_leaf_text(reader, &mut buf)),
                    _ => {}
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"Activity" => break,
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let object_key = format!("{claim_id}/{}", if activity_id.is_empty() { "-" } else { activity_id.as_str() });
    let mut core_valid = true;

    if let Some(p) = require_non_empty(&activity_id, ParseCode::ActivityInvalidCore, "RemittanceActivity", &object_key, "ID") {
        problems.push(p);
        core_valid = false;
    }
    if let Some(p) = require_parseable_decimal(&payment_amount, ParseCode::ActivityInvalidCore, "RemittanceActivity", &object_key, "PaymentAmount") {
        problems.push(p);
        core_valid = false;
    }

    if !core_valid {
        return None;
    }

    Some(RemittanceActivityDTO { activity_id, payment_amount, list_price, gross, patient_share, denial_code })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUBMISSION_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Claim.Submission>
  <Header>
    <SenderID>S</SenderID>
    <ReceiverID>R</ReceiverID>
    <TransactionDate>10/01/2025 12:00:00</TransactionDate>
    <RecordCount>1</RecordCount>
  </Header>
  <Claim>
    <ID>C1</ID>
    <PayerID>P1</PayerID>
    <ProviderID>V1</ProviderID>
    <EmiratesIDNumber>784-0000</EmiratesIDNumber>
    <Gross>100.00</Gross>
    <PatientShare>10.00</PatientShare>
    <Net>90.00</Net>
    <Activity>
      <ID>A1</ID>
      <Start>10/01/2025 12:00:00</Start>
      <Type>3</Type>
      <Code>99213</Code>
      <Quantity>1</Quantity>
      <Net>90.00</Net>
      <Clinician>DR-1</Clinician>
    </Activity>
  </Claim>
</Claim.Submission>"#;

    #[test]
    fn parses_minimal_submission() {
        let outcome = XmlStreamingParser::new().parse(SUBMISSION_XML.as_bytes(), true, 10 * 1024 * 1024);
        assert!(!outcome.has_errors(), "{:?}", outcome.problems);
        let Some(ParsedDocument::Submission(doc)) = outcome.document else {
            panic!("expected a submission document");
        };
        assert_eq!(doc.header.sender_id, "S");
        assert_eq!(doc.claims.len(), 1);
        assert_eq!(doc.claims[0].activities.len(), 1);
        assert_eq!(doc.claims[0].activities[0].activity_id, "A1");
    }

    #[test]
    fn unknown_root_is_rejected() {
        let outcome = XmlStreamingParser::new().parse(b"<NotAClaim/>", true, 1024);
        assert!(outcome.document.is_none());
        assert!(outcome.problems.iter().any(|p| matches!(p.code, ParseCode::UnknownRoot)));
    }

    #[test]
    fn missing_net_drops_claim_but_keeps_document() {
        let xml = SUBMISSION_XML.replace("<Net>90.00</Net>\n    <Activity>", "<Activity>");
        let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), false, 10 * 1024 * 1024);
        let Some(ParsedDocument::Submission(doc)) = outcome.document else {
            panic!("expected a submission document even with a dropped claim");
        };
        assert!(doc.claims.is_empty());
        assert!(outcome.problems.iter().any(|p| matches!(p.code, ParseCode::ClaimInvalidCore)));
    }

    #[test]
    fn record_count_mismatch_is_flagged() {
        let xml = SUBMISSION_XML.replace("<RecordCount>1</RecordCount>", "<RecordCount>2</RecordCount>");
        let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), false, 10 * 1024 * 1024);
        assert!(outcome.problems.iter().any(|p| matches!(p.code, ParseCode::RecordCountMismatch)));
    }

    const REMITTANCE_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Remittance.Advice>
  <Header>
    <SenderID>PayerX</SenderID>
    <ReceiverID>ProviderX</ReceiverID>
    <TransactionDate>15/01/2025 09:00:00</TransactionDate>
    <RecordCount>1</RecordCount>
  </Header>
  <Claim>
    <ID>C1</ID>
    <PayerID>P1</PayerID>
    <ProviderID>V1</ProviderID>
    <Activity>
      <ID>A1</ID>
      <PaymentAmount>90.00</PaymentAmount>
    </Activity>
  </Claim>
</Remittance.Advice>"#;

    #[test]
    fn parses_matched_remittance() {
        let outcome = XmlStreamingParser::new().parse(REMITTANCE_XML.as_bytes(), true, 1024);
        assert!(!outcome.has_errors(), "{:?}", outcome.problems);
        let Some(ParsedDocument::Remittance(doc)) = outcome.document else {
            panic!("expected a remittance document");
        };
        assert_eq!(doc.claims.len(), 1);
        assert_eq!(doc.claims[0].activities[0].payment_amount, "90.00");
    }
}
