// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Presentation
//!
//! This engine has no interactive end users: it is a headless poller
//! driven entirely by `ingestion.poll.intervalMs` and the queue depth.
//! The only externally observable surface is operational —
//! `/metrics` and `/health` — served by
//! [`crate::infrastructure::metrics::MetricsEndpoint`]. Nothing else
//! lives at this layer.
