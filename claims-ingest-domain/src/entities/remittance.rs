// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{ActivityBizId, ClaimKeyId, Money, RemittanceActivityId, RemittanceClaimId, RemittanceId};

/// Child of a `Remittance` group and a `ClaimKey`. Unique by
/// `(remittance_id, claim_key_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceClaim {
    pub id: RemittanceClaimId,
    pub remittance_id: RemittanceId,
    pub claim_key_id: ClaimKeyId,
    pub payer_id: String,
    pub provider_id: String,
    pub denial_code: Option<String>,
    pub payment_reference: Option<String>,
    pub date_settlement: Option<DateTime<Utc>>,
    pub facility_id: Option<String>,
}

/// Unique by `(remittance_claim_id, activity_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemittanceActivity {
    pub id: RemittanceActivityId,
    pub remittance_claim_id: RemittanceClaimId,
    pub activity_id: ActivityBizId,
    pub payment_amount: Money,
    pub list_price: Option<Money>,
    pub gross: Option<Money>,
    pub patient_share: Option<Money>,
    pub denial_code: Option<String>,
}
