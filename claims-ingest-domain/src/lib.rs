// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Claims Ingestion Domain
//!
//! Pure business logic for the claims ingestion engine: entities, value
//! objects, the error taxonomy, and the service ports (traits) that
//! `claims-ingest`'s adapters implement. Nothing in this crate depends on
//! a runtime, a transport, or a driver — those are infrastructure
//! concerns by construction.
//!
//! ## Layout
//!
//! - [`error`] — the flat `IngestionError` taxonomy
//! - [`value_objects`] — typed ids, money, business keys, small enums
//! - [`entities`] — the persisted data model: `IngestionFile`, `ClaimKey`,
//!   `Claim` and its children, the event/snapshot chronology, the
//!   operational ledgers, and `FacilityConfig`
//! - [`services`] — ports for C1–C4, C6, C7/C8, C9, C10

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

pub use error::IngestionError;

pub type DomainResult<T> = Result<T, IngestionError>;
