// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

pub mod ack;
pub mod audit;
pub mod credential_vault;
pub mod encryption;
pub mod facility_repo;
pub mod fetch;
pub mod persist;
pub mod soap_gateway;
pub mod verify;

pub use ack::{NoopAcker, SoapAcker};
pub use audit::SqlxAuditSink;
pub use credential_vault::AesGcmCredentialVault;
pub use facility_repo::SqlxFacilityConfigRepository;
pub use fetch::{LocalFsFetcher, SoapCoordinatorConfig, SoapFetchCoordinator};
pub use persist::SqlxPersistService;
pub use soap_gateway::DhpoSoapGateway;
pub use verify::SqlxVerifier;
