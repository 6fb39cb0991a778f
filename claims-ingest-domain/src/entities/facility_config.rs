// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

use crate::value_objects::{FacilityCode, FacilityConfigId};

/// Per-facility SOAP configuration. Owned by an administrative
/// collaborator outside the engine; the SOAP fetch coordinator only
/// reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    pub id: FacilityConfigId,
    pub facility_code: FacilityCode,
    pub display_name: String,
    pub endpoint_url: String,
    pub login_ciphertext: Vec<u8>,
    pub login_envelope: CiphertextEnvelope,
    pub password_ciphertext: Vec<u8>,
    pub password_envelope: CiphertextEnvelope,
    pub active: bool,
}

/// The self-describing metadata alongside each ciphertext (C1's wrap
/// format). Login and password carry separate envelopes: every
/// encryption draws a fresh IV, and an IV must never be shared across
/// two plaintexts under the same key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiphertextEnvelope {
    pub kek_version: u32,
    pub algorithm: String,
    pub iv_base64: String,
    pub tag_bits: u16,
}
