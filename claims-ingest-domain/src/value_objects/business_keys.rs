// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Business keys: identifiers that come from the wire rather than from
//! surrogate-key generation. Unlike [`crate::value_objects::ids::EntityId`]
//! these are stable across re-ingestion and carry no time ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::IngestionError;

macro_rules! business_key {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Result<Self, IngestionError> {
                let raw = raw.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(IngestionError::validation(format!("{} must not be empty", $label)));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

business_key!(FileBizId, "file_id");
business_key!(ClaimBizId, "claim_id");
business_key!(ActivityBizId, "activity_id");
business_key!(FacilityCode, "facility_code");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_values() {
        assert!(FileBizId::new("   ").is_err());
        assert!(FileBizId::new("").is_err());
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = ClaimBizId::new("  C1  ").unwrap();
        assert_eq!(id.as_str(), "C1");
    }

    #[test]
    fn keys_with_the_same_value_compare_equal() {
        let a = ActivityBizId::new("A1").unwrap();
        let b = ActivityBizId::new("A1").unwrap();
        assert_eq!(a, b);
    }
}
