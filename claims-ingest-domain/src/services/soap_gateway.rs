// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Port for C2: the four DHPO-style SOAP operations. The gateway deals
//! in plain request/response structs; envelope rendering and transport
//! retry are adapter concerns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::IngestionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoapVersion {
    V1_1,
    V1_2,
}

/// A result code of `-4` is DHPO's documented transient error; `0` is
/// OK; `2` is "no new data"; other negatives are non-retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultCode(pub i32);

impl ResultCode {
    pub const OK: ResultCode = ResultCode(0);
    pub const NO_NEW_DATA: ResultCode = ResultCode(2);
    pub const TRANSIENT: ResultCode = ResultCode(-4);

    pub fn is_transient(&self) -> bool {
        *self == Self::TRANSIENT
    }

    pub fn is_ok(&self) -> bool {
        *self == Self::OK
    }
}

#[derive(Debug, Clone)]
pub struct TransactionListEntry {
    pub file_id: String,
    pub file_name: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub transaction_date: DateTime<Utc>,
    pub record_count: i32,
    pub is_downloaded: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub direction: Option<String>,
    pub caller_license: Option<String>,
    pub e_partner: Option<String>,
    pub transaction_id: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub min_record_count: Option<i32>,
    pub max_record_count: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Port for C2.
#[async_trait]
pub trait SoapGateway: Send + Sync {
    async fn get_new_transactions(
        &self,
        login: &str,
        password: &str,
    ) -> Result<(ResultCode, Vec<TransactionListEntry>), IngestionError>;

    async fn search_transactions(
        &self,
        login: &str,
        password: &str,
        filter: &SearchFilter,
    ) -> Result<(ResultCode, Vec<TransactionListEntry>), IngestionError>;

    async fn download_transaction_file(
        &self,
        login: &str,
        password: &str,
        file_id: &str,
    ) -> Result<(ResultCode, Option<DownloadedFile>, Option<String>), IngestionError>;

    async fn set_transaction_downloaded(
        &self,
        login: &str,
        password: &str,
        file_id: &str,
    ) -> Result<(ResultCode, Option<String>), IngestionError>;
}
