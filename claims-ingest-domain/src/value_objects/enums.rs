// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Small numeric-coded enums. Hand-written mappings, no reflection or
//! attribute converters; the numeric values are the storage codes.

use serde::{Deserialize, Serialize};

/// Which XML root a file declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootKind {
    Submission,
    Remittance,
}

/// `ClaimEvent.type`. Numeric values are the wire/storage codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum ClaimEventType {
    Submission = 1,
    Resubmission = 2,
    Remittance = 3,
}

impl ClaimEventType {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Submission),
            2 => Some(Self::Resubmission),
            3 => Some(Self::Remittance),
            _ => None,
        }
    }
}

/// `ClaimStatusTimeline.status`. Latest row defines current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i16)]
pub enum ClaimStatus {
    Submitted = 1,
    Resubmitted = 2,
    Paid = 3,
    PartiallyPaid = 4,
    Rejected = 5,
    Unknown = 6,
}

impl ClaimStatus {
    pub fn code(self) -> i16 {
        self as i16
    }

    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Submitted),
            2 => Some(Self::Resubmitted),
            3 => Some(Self::Paid),
            4 => Some(Self::PartiallyPaid),
            5 => Some(Self::Rejected),
            6 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Derives the claim's current status from the sum of payments
    /// against the claim's net, with denial breaking ties toward
    /// `Rejected` when nothing was paid.
    pub fn derive(total_paid: crate::value_objects::Money, net: crate::value_objects::Money, any_denied: bool) -> Self {
        if total_paid.is_zero() {
            if any_denied {
                ClaimStatus::Rejected
            } else {
                ClaimStatus::Unknown
            }
        } else if total_paid >= net {
            ClaimStatus::Paid
        } else {
            ClaimStatus::PartiallyPaid
        }
    }
}

/// Terminal status of a processed file's audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileStatus {
    Ok,
    Already,
    Partial,
    Fail,
}

/// Severity of a [`crate::services::parser::ParseProblem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseSeverity {
    Warning,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Money;

    #[test]
    fn claim_event_type_round_trips_codes() {
        assert_eq!(ClaimEventType::from_code(ClaimEventType::Submission.code()), Some(ClaimEventType::Submission));
        assert_eq!(ClaimEventType::from_code(99), None);
    }

    #[test]
    fn derive_paid_when_sum_equals_net() {
        let status = ClaimStatus::derive(Money::from_cents(9000), Money::from_cents(9000), false);
        assert_eq!(status, ClaimStatus::Paid);
    }

    #[test]
    fn derive_partially_paid_when_sum_below_net() {
        let status = ClaimStatus::derive(Money::from_cents(6000), Money::from_cents(9000), false);
        assert_eq!(status, ClaimStatus::PartiallyPaid);
    }

    #[test]
    fn derive_rejected_when_zero_and_denied() {
        let status = ClaimStatus::derive(Money::ZERO, Money::from_cents(9000), true);
        assert_eq!(status, ClaimStatus::Rejected);
    }

    #[test]
    fn derive_unknown_when_zero_and_not_denied() {
        let status = ClaimStatus::derive(Money::ZERO, Money::from_cents(9000), false);
        assert_eq!(status, ClaimStatus::Unknown);
    }
}
