// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C6: the streaming parser and validator. A pull-based `quick_xml`
//! reader walks the document once, builds the DTO tree defined in
//! [`claims_ingest_domain::services::parser`], and emits a
//! [`ParseProblem`] for every structural or business-rule violation
//! rather than aborting on the first one.

mod dates;
mod reader;
mod validate;

pub use reader::XmlStreamingParser;
