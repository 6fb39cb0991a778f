// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Date normalization. The wire format is typically `dd/MM/yyyy
//! HH:mm:ss` or RFC3339; both are accepted and normalized to UTC
//! instants, matching the header's `TransactionDate` semantics and
//! sub-element dates that retain their declared offset as text but are
//! stored as instants.

use chrono::{DateTime, NaiveDateTime, Utc};

const DHPO_FORMAT: &str = "%d/%m/%Y %H:%M:%S";
const DHPO_FORMAT_NO_TIME: &str = "%d/%m/%Y";

pub fn parse_to_utc(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, DHPO_FORMAT) {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(raw, DHPO_FORMAT_NO_TIME) {
        return Some(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0)?, Utc));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dhpo_date_time_format() {
        let parsed = parse_to_utc("15/03/2024 08:30:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T08:30:00+00:00");
    }

    #[test]
    fn parses_date_only_format() {
        let parsed = parse_to_utc("15/03/2024").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn parses_rfc3339_with_offset_and_normalizes_to_utc() {
        let parsed = parse_to_utc("2024-03-15T12:30:00+04:00").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T08:30:00+00:00");
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_to_utc("not a date").is_none());
    }

    #[test]
    fn rejects_blank() {
        assert!(parse_to_utc("   ").is_none());
    }
}
