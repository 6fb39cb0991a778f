// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingestion Scenario Tests
//!
//! End-to-end scenario coverage for the stages that run without a live
//! Postgres instance: the streaming parser over realistic submission and
//! remittance documents, and the derived-status arithmetic the persist
//! service applies after each remittance.
//!
//! Database-effecting behavior (idempotent replay returning `ALREADY`,
//! row-level conflict ledgering, post-commit verification) is enforced
//! by the persist adapter's ON CONFLICT discipline and checked by the
//! verifier at runtime; the pure logic those paths share lives in the
//! domain and is exercised here.

use claims_ingest::infrastructure::parsing::XmlStreamingParser;
use claims_ingest_domain::services::{ParseCode, ParsedDocument, Parser};
use claims_ingest_domain::value_objects::{ClaimStatus, Money};

const MAX_ATTACHMENT: u64 = 10 * 1024 * 1024;

fn submission_xml(claims: &str, record_count: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Claim.Submission>
  <Header>
    <SenderID>S</SenderID>
    <ReceiverID>R</ReceiverID>
    <TransactionDate>2025-01-10T12:00:00Z</TransactionDate>
    <RecordCount>{record_count}</RecordCount>
  </Header>
{claims}
</Claim.Submission>"#
    )
}

const CLAIM_C1: &str = r#"  <Claim>
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
  </Claim>"#;

fn remittance_xml(payment: &str, denial: Option<&str>) -> String {
    let denial_el = denial.map(|code| format!("<DenialCode>{code}</DenialCode>")).unwrap_or_default();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Remittance.Advice>
  <Header>
    <SenderID>P1</SenderID>
    <ReceiverID>V1</ReceiverID>
    <TransactionDate>2025-01-15T09:00:00Z</TransactionDate>
    <RecordCount>1</RecordCount>
  </Header>
  <Claim>
    <ID>C1</ID>
    <PayerID>P1</PayerID>
    <ProviderID>V1</ProviderID>
    <DateSettlement>2025-01-15T09:00:00Z</DateSettlement>
    <Activity>
      <ID>A1</ID>
      <PaymentAmount>{payment}</PaymentAmount>
      {denial_el}
    </Activity>
  </Claim>
</Remittance.Advice>"#
    )
}

/// Applies the cumulative-with-cap rule the persist service uses:
/// payments sum per activity but never past the activity's submitted
/// net, and denial is latest-wins per claim.
fn derive_after_payments(net: Money, payments: &[Money], latest_denied: bool) -> ClaimStatus {
    let total: Money = payments.iter().copied().sum();
    ClaimStatus::derive(total.capped_at(net), net, latest_denied)
}

#[test]
fn minimal_submission_parses_one_claim_one_activity() {
    let xml = submission_xml(CLAIM_C1, 1);
    let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), true, MAX_ATTACHMENT);
    assert!(!outcome.has_errors(), "{:?}", outcome.problems);

    let Some(ParsedDocument::Submission(doc)) = outcome.document else {
        panic!("expected a submission document");
    };
    assert_eq!(doc.header.sender_id, "S");
    assert_eq!(doc.header.receiver_id, "R");
    assert_eq!(doc.header.record_count, 1);
    assert_eq!(doc.header.transaction_date.to_rfc3339(), "2025-01-10T12:00:00+00:00");

    assert_eq!(doc.claims.len(), 1);
    let claim = &doc.claims[0];
    assert_eq!(claim.claim_id, "C1");
    assert_eq!(Money::from_decimal_str(&claim.gross).unwrap(), Money::from_cents(10_000));
    assert_eq!(Money::from_decimal_str(&claim.net).unwrap(), Money::from_cents(9_000));
    assert_eq!(claim.activities.len(), 1);
    assert_eq!(claim.activities[0].activity_id, "A1");
    assert_eq!(claim.activities[0].clinician.as_deref(), Some("DR-1"));
}

#[test]
fn parsing_the_same_bytes_twice_is_deterministic() {
    let xml = submission_xml(CLAIM_C1, 1);
    let parser = XmlStreamingParser::new();
    let first = parser.parse(xml.as_bytes(), true, MAX_ATTACHMENT);
    let second = parser.parse(xml.as_bytes(), true, MAX_ATTACHMENT);

    let (Some(ParsedDocument::Submission(a)), Some(ParsedDocument::Submission(b))) = (first.document, second.document) else {
        panic!("expected submission documents");
    };
    assert_eq!(a.claims.len(), b.claims.len());
    assert_eq!(a.claims[0].claim_id, b.claims[0].claim_id);
    assert_eq!(a.claims[0].net, b.claims[0].net);
    assert_eq!(first.problems.len(), second.problems.len());
}

#[test]
fn matched_remittance_parses_and_derives_paid() {
    let xml = remittance_xml("90.00", None);
    let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), true, MAX_ATTACHMENT);
    assert!(!outcome.has_errors(), "{:?}", outcome.problems);

    let Some(ParsedDocument::Remittance(doc)) = outcome.document else {
        panic!("expected a remittance document");
    };
    assert_eq!(doc.claims.len(), 1);
    let payment = Money::from_decimal_str(&doc.claims[0].activities[0].payment_amount).unwrap();

    let status = derive_after_payments(Money::from_cents(9_000), &[payment], false);
    assert_eq!(status, ClaimStatus::Paid);
}

#[test]
fn partial_payment_derives_partially_paid() {
    let status = derive_after_payments(Money::from_cents(9_000), &[Money::from_cents(6_000)], false);
    assert_eq!(status, ClaimStatus::PartiallyPaid);
}

#[test]
fn cumulative_payments_cap_at_net_and_settle_on_paid() {
    // Two 60.00 remittances against a 90.00 net: capped at net, PAID once.
    let net = Money::from_cents(9_000);
    let first = derive_after_payments(net, &[Money::from_cents(6_000)], false);
    let second = derive_after_payments(net, &[Money::from_cents(6_000), Money::from_cents(6_000)], false);
    assert_eq!(first, ClaimStatus::PartiallyPaid);
    assert_eq!(second, ClaimStatus::Paid);
}

#[test]
fn zero_payment_with_denial_derives_rejected() {
    let xml = remittance_xml("0.00", Some("DN001"));
    let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), true, MAX_ATTACHMENT);
    let Some(ParsedDocument::Remittance(doc)) = outcome.document else {
        panic!("expected a remittance document");
    };
    let activity = &doc.claims[0].activities[0];
    assert_eq!(activity.denial_code.as_deref(), Some("DN001"));

    let payment = Money::from_decimal_str(&activity.payment_amount).unwrap();
    let status = derive_after_payments(Money::from_cents(9_000), &[payment], true);
    assert_eq!(status, ClaimStatus::Rejected);
}

#[test]
fn zero_payment_without_denial_derives_unknown() {
    let status = derive_after_payments(Money::from_cents(9_000), &[Money::ZERO], false);
    assert_eq!(status, ClaimStatus::Unknown);
}

#[test]
fn mixed_file_drops_the_bad_claim_and_keeps_its_peer() {
    let bad_claim = r#"  <Claim>
    <ID>C11</ID>
    <PayerID>P1</PayerID>
    <ProviderID>V1</ProviderID>
    <EmiratesIDNumber>784-0001</EmiratesIDNumber>
    <Gross>50.00</Gross>
    <PatientShare>5.00</PatientShare>
  </Claim>"#;
    let xml = submission_xml(&format!("{CLAIM_C1}\n{bad_claim}"), 2);

    let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), false, MAX_ATTACHMENT);
    let Some(ParsedDocument::Submission(doc)) = outcome.document else {
        panic!("expected a submission document even with a dropped claim");
    };

    assert_eq!(doc.claims.len(), 1);
    assert_eq!(doc.claims[0].claim_id, "C1");
    assert!(outcome
        .problems
        .iter()
        .any(|p| matches!(p.code, ParseCode::ClaimInvalidCore) && p.object_key == "C11"));
}

#[test]
fn oversize_file_observation_is_a_warning_not_an_error() {
    use base64::Engine;
    let blob = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 64]);
    let claim = format!(
        r#"  <Claim>
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
      <Observation>
        <Type>File</Type>
        <Code>REPORT</Code>
        <Value>{blob}</Value>
        <ValueType>FILE</ValueType>
      </Observation>
    </Activity>
  </Claim>"#
    );
    let xml = submission_xml(&claim, 1);

    // A 16-byte ceiling forces the oversize path.
    let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), false, 16);
    assert!(!outcome.has_errors(), "{:?}", outcome.problems);
    assert!(outcome.problems.iter().any(|p| matches!(p.code, ParseCode::ObsFileTooLarge)));

    let Some(ParsedDocument::Submission(doc)) = outcome.document else {
        panic!("expected a submission document");
    };
    let observation = &doc.claims[0].activities[0].observations[0];
    assert_eq!(observation.file_bytes.as_ref().map(Vec::len), Some(64));
}

#[test]
fn corrupt_attachment_base64_is_an_error() {
    let claim = r#"  <Claim>
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
      <Observation>
        <Type>File</Type>
        <Code>REPORT</Code>
        <Value>%%%not-base64%%%</Value>
        <ValueType>FILE</ValueType>
      </Observation>
    </Activity>
  </Claim>"#;
    let xml = submission_xml(claim, 1);

    let outcome = XmlStreamingParser::new().parse(xml.as_bytes(), false, MAX_ATTACHMENT);
    assert!(outcome.problems.iter().any(|p| matches!(p.code, ParseCode::AttachmentB64Corrupt)));
}

#[test]
fn file_with_unknown_root_is_rejected() {
    let outcome = XmlStreamingParser::new().parse(b"<Acknowledgement/>", true, MAX_ATTACHMENT);
    assert!(outcome.document.is_none());
    assert!(outcome.problems.iter().any(|p| matches!(p.code, ParseCode::UnknownRoot)));
}

#[test]
fn malformed_bytes_do_not_panic() {
    let garbage: &[u8] = &[0xFF, 0xFE, 0x3C, 0x43, 0x6C, 0x61, 0x69, 0x6D];
    let outcome = XmlStreamingParser::new().parse(garbage, false, MAX_ATTACHMENT);
    assert!(outcome.document.is_none());
}