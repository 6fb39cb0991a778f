// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C11 (metrics half): Prometheus collection plus the HTTP endpoint
//! that exposes it.

pub mod endpoint;
pub mod service;

pub use endpoint::MetricsEndpoint;
pub use service::MetricsService;
