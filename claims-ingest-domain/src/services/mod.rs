// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Domain service ports (traits). `claims-ingest` provides the adapters;
//! nothing in this module touches tokio, sqlx, or reqwest directly.

mod acker;
mod cancellation;
mod credential_vault;
mod fetcher;
mod parser;
mod persist;
mod soap_gateway;
mod verifier;

pub use acker::Acker;
pub use cancellation::CancellationSignal;
pub use credential_vault::{CredentialVault, FacilityConfigRepository, FacilityCredentials};
pub use fetcher::{Fetcher, WorkItem, WorkItemSource, WorkQueue};
pub use parser::{
    ActivityDTO, ClaimDTO, EncounterDTO, HeaderDTO, ObservationDTO, ParseCode, ParseOutcome, ParseProblem, Parser, ParsedDocument,
    RemittanceActivityDTO, RemittanceAdviceDTO, RemittanceClaimDTO, ResubmissionDTO, SubmissionDTO,
};
pub use persist::{FileEnvelope, PersistCounts, PersistOutcome, PersistService};
pub use soap_gateway::{DownloadedFile, ResultCode, SearchFilter, SoapGateway, SoapVersion, TransactionListEntry};
pub use verifier::{VerifyExpectations, Verifier};
