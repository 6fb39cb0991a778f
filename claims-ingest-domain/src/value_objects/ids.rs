// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Typed surrogate identifiers.
//!
//! `EntityId<Category>` is a ULID wrapped in a phantom type so that, say,
//! a `ClaimKeyId` and an `ActivityId` cannot be swapped at a call site even
//! though both are backed by the same 128-bit value. One generic
//! implementation covers ordering, string round-tripping and serde for
//! every category; categories opt into extra validation only when they
//! need it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::IngestionError;

/// Per-category behavior for [`EntityId`]. The default validation simply
/// rejects the nil ULID; categories that allow a nil placeholder override
/// `allows_nil`.
pub trait IdCategory {
    fn category_name() -> &'static str;

    fn allows_nil() -> bool {
        false
    }
}

pub struct EntityId<T: IdCategory> {
    value: Ulid,
    _category: PhantomData<T>,
}

impl<T: IdCategory> EntityId<T> {
    pub fn new() -> Self {
        Self {
            value: Ulid::new(),
            _category: PhantomData,
        }
    }

    pub fn from_ulid(value: Ulid) -> Result<Self, IngestionError> {
        if value.is_nil() && !T::allows_nil() {
            return Err(IngestionError::validation(format!(
                "{} id cannot be nil",
                T::category_name()
            )));
        }
        Ok(Self {
            value,
            _category: PhantomData,
        })
    }

    pub fn as_ulid(&self) -> Ulid {
        self.value
    }

    /// Millisecond timestamp embedded in the ULID, useful for ordering
    /// without a round trip to the store.
    pub fn timestamp_ms(&self) -> u64 {
        self.value.timestamp_ms()
    }
}

impl<T: IdCategory> Default for EntityId<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: IdCategory> Clone for EntityId<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: IdCategory> Copy for EntityId<T> {}

impl<T: IdCategory> PartialEq for EntityId<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}
impl<T: IdCategory> Eq for EntityId<T> {}

impl<T: IdCategory> PartialOrd for EntityId<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: IdCategory> Ord for EntityId<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T: IdCategory> std::hash::Hash for EntityId<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdCategory> fmt::Debug for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::category_name(), self.value)
    }
}

impl<T: IdCategory> fmt::Display for EntityId<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T: IdCategory> FromStr for EntityId<T> {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid = Ulid::from_string(s)
            .map_err(|e| IngestionError::validation(format!("invalid {} id: {e}", T::category_name())))?;
        Self::from_ulid(ulid)
    }
}

impl<T: IdCategory> Serialize for EntityId<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.to_string().serialize(serializer)
    }
}

impl<'de, T: IdCategory> Deserialize<'de> for EntityId<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! id_category {
    ($category:ident, $alias:ident, $name:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $category;

        impl IdCategory for $category {
            fn category_name() -> &'static str {
                $name
            }
        }

        pub type $alias = EntityId<$category>;
    };
}

id_category!(IngestionFileCategory, IngestionFileId, "ingestion_file");
id_category!(ClaimKeyCategory, ClaimKeyId, "claim_key");
id_category!(SubmissionCategory, SubmissionId, "submission");
id_category!(RemittanceCategory, RemittanceId, "remittance");
id_category!(ClaimCategory, ClaimId, "claim");
id_category!(EncounterCategory, EncounterId, "encounter");
id_category!(DiagnosisCategory, DiagnosisId, "diagnosis");
id_category!(ActivityCategory, ActivityId, "activity");
id_category!(ObservationCategory, ObservationId, "observation");
id_category!(RemittanceClaimCategory, RemittanceClaimId, "remittance_claim");
id_category!(RemittanceActivityCategory, RemittanceActivityId, "remittance_activity");
id_category!(ClaimEventCategory, ClaimEventId, "claim_event");
id_category!(ClaimEventActivityCategory, ClaimEventActivityId, "claim_event_activity");
id_category!(EventObservationCategory, EventObservationId, "event_observation");
id_category!(ClaimResubmissionCategory, ClaimResubmissionId, "claim_resubmission");
id_category!(IngestionRunCategory, IngestionRunId, "ingestion_run");
id_category!(IngestionFileAuditCategory, IngestionFileAuditId, "ingestion_file_audit");
id_category!(IngestionErrorRecordCategory, IngestionErrorRecordId, "ingestion_error");
id_category!(IngestionBatchMetricCategory, IngestionBatchMetricId, "ingestion_batch_metric");
id_category!(FacilityConfigCategory, FacilityConfigId, "facility_config");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_not_nil() {
        let id = IngestionFileId::new();
        assert!(!id.as_ulid().is_nil());
    }

    #[test]
    fn nil_ulid_rejected_by_default() {
        let err = IngestionFileId::from_ulid(Ulid::nil());
        assert!(err.is_err());
    }

    #[test]
    fn round_trips_through_string() {
        let id = ClaimKeyId::new();
        let s = id.to_string();
        let parsed: ClaimKeyId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_of_different_categories_do_not_compare_equal_types() {
        // Compile-time guarantee: this would not type-check if uncommented:
        // let _ = IngestionFileId::new() == ClaimKeyId::new();
        let file_id = IngestionFileId::new();
        let claim_key_id = ClaimKeyId::new();
        assert_ne!(file_id.to_string(), claim_key_id.to_string());
    }

    #[test]
    fn ordering_follows_creation_time() {
        let first = IngestionFileId::new();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = IngestionFileId::new();
        assert!(first < second);
    }
}
