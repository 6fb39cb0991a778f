// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Structural/required-field checks layered under business validation.
//! Deliberately not a standards-complete XSD engine: every check here
//! produces the same `ParseProblem` shape a schema violation would, so
//! `failOnXsdError` treats both as one continuum.

use claims_ingest_domain::services::{ParseCode, ParseProblem};

pub fn require_non_empty(value: &str, code: ParseCode, object_type: &str, object_key: &str, field: &str) -> Option<ParseProblem> {
    if value.trim().is_empty() {
        Some(ParseProblem::error(code, object_type, object_key, format!("{field} is required")))
    } else {
        None
    }
}

pub fn require_parseable_decimal(value: &str, code: ParseCode, object_type: &str, object_key: &str, field: &str) -> Option<ParseProblem> {
    if value.trim().parse::<f64>().is_err() {
        Some(ParseProblem::error(code, object_type, object_key, format!("{field} is not a valid decimal: {value:?}")))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_value_is_flagged() {
        assert!(require_non_empty("  ", ParseCode::ClaimInvalidCore, "Claim", "C1", "payer_id").is_some());
    }

    #[test]
    fn present_value_is_not_flagged() {
        assert!(require_non_empty("X", ParseCode::ClaimInvalidCore, "Claim", "C1", "payer_id").is_none());
    }

    #[test]
    fn non_numeric_decimal_is_flagged() {
        assert!(require_parseable_decimal("abc", ParseCode::ClaimInvalidCore, "Claim", "C1", "net").is_some());
    }

    #[test]
    fn numeric_decimal_is_not_flagged() {
        assert!(require_parseable_decimal("90.00", ParseCode::ClaimInvalidCore, "Claim", "C1", "net").is_none());
    }
}
