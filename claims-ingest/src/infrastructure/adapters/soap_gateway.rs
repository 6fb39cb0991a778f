// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! C2: the SOAP gateway. Renders the four DHPO-style envelopes, applies
//! SOAP 1.1/1.2 content-type discipline, and retries transient failures
//! with fixed backoff before handing a parsed result up to the fetcher.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use claims_ingest_domain::services::{DownloadedFile, ResultCode, SearchFilter, SoapGateway, SoapVersion, TransactionListEntry};
use claims_ingest_domain::IngestionError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: std::time::Duration = std::time::Duration::from_millis(500);

pub struct DhpoSoapGateway {
    client: reqwest::Client,
    endpoint: String,
    version: SoapVersion,
    max_attempts: u32,
    backoff: std::time::Duration,
}

impl DhpoSoapGateway {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, version: SoapVersion) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            version,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_retry_budget(mut self, max_attempts: u32, backoff: std::time::Duration) -> Self {
        self.max_attempts = max_attempts;
        self.backoff = backoff;
        self
    }

    fn content_type_header(&self, action: &str) -> (&'static str, String) {
        match self.version {
            SoapVersion::V1_1 => ("Content-Type", "text/xml; charset=utf-8".to_string()),
            SoapVersion::V1_2 => ("Content-Type", format!("application/soap+xml; charset=utf-8; action=\"{action}\"")),
        }
    }

    /// Posts the envelope with one shared attempt budget across every
    /// transient condition: HTTP 408/429/5xx, transport/IO errors, and
    /// DHPO's `-4` result code. A call never exceeds `max_attempts`
    /// requests no matter which mix of those conditions it hits.
    async fn call(&self, action: &str, envelope_fn: impl Fn() -> String) -> Result<String, IngestionError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let (header_name, header_value) = self.content_type_header(action);
            let mut request = self.client.post(&self.endpoint).header(header_name, header_value).body(envelope_fn());
            if self.version == SoapVersion::V1_1 {
                request = request.header("SOAPAction", format!("\"{action}\""));
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let body = response.text().await.map_err(|e| IngestionError::transport(format!("reading SOAP response body: {e}")))?;
                        let code = extract_int(&body, "Result").or_else(|| extract_int(&body, "RCode")).unwrap_or(0);
                        if ResultCode(code).is_transient() && attempt < self.max_attempts {
                            warn!(code, attempt, "DHPO transient result code, retrying");
                            tokio::time::sleep(self.backoff).await;
                            continue;
                        }
                        return Ok(body);
                    }
                    if is_retryable_status(status.as_u16()) && attempt < self.max_attempts {
                        warn!(status = status.as_u16(), attempt, "transient SOAP status, retrying");
                        tokio::time::sleep(self.backoff).await;
                        continue;
                    }
                    return Err(IngestionError::transport(format!("SOAP call returned HTTP {status}")));
                }
                Err(e) => {
                    if attempt < self.max_attempts {
                        warn!(error = %e, attempt, "transient SOAP transport error, retrying");
                        tokio::time::sleep(self.backoff).await;
                        continue;
                    }
                    return Err(IngestionError::transport(format!("SOAP transport error: {e}")));
                }
            }
        }
    }
}

fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..600).contains(&status)
}

fn soap_envelope(version: SoapVersion, body: &str) -> String {
    let ns = match version {
        SoapVersion::V1_1 => "http://schemas.xmlsoap.org/soap/envelope/",
        SoapVersion::V1_2 => "http://www.w3.org/2003/05/soap-envelope",
    };
    format!(r#"<?xml version="1.0" encoding="utf-8"?><soap:Envelope xmlns:soap="{ns}"><soap:Body>{body}</soap:Body></soap:Envelope>"#)
}

fn escape(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Pulls the first `<tag>...</tag>` text content anywhere in the
/// document. Tolerant of namespace prefixes since DHPO responses are
/// inconsistent about them.
fn extract_text(xml: &str, tag: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut capturing = false;
    let mut value = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if local_name_matches(e.name().as_ref(), tag) => capturing = true,
            Ok(Event::Text(t)) if capturing => {
                value.push_str(&t.unescape().unwrap_or_default());
            }
            Ok(Event::End(e)) if local_name_matches(e.name().as_ref(), tag) => {
                if capturing {
                    return Some(value);
                }
            }
            Ok(Event::Eof) => return None,
            Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

fn local_name_matches(qname: &[u8], tag: &str) -> bool {
    let qname = String::from_utf8_lossy(qname);
    qname == tag || qname.ends_with(&format!(":{tag}"))
}

fn extract_int(xml: &str, tag: &str) -> Option<i32> {
    extract_text(xml, tag).and_then(|v| v.trim().parse().ok())
}

/// Parses the inner `<List><File .../></List>` rows DHPO embeds as
/// escaped text inside the outer envelope.
fn parse_transaction_list(xml: &str) -> Vec<TransactionListEntry> {
    let inner = extract_text(xml, "NewClaims").or_else(|| extract_text(xml, "TransactionList")).unwrap_or_default();
    let mut reader = Reader::from_str(&inner);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut entries = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if local_name_matches(e.name().as_ref(), "File") => {
                let mut file_id = String::new();
                let mut file_name = String::new();
                let mut sender_id = String::new();
                let mut receiver_id = String::new();
                let mut transaction_date = Utc::now();
                let mut record_count = 0;
                let mut is_downloaded = None;
                for attr in e.attributes().flatten() {
                    let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                    let value = attr.decode_and_unescape_value(reader.decoder()).map(|v| v.to_string()).unwrap_or_default();
                    match key.as_str() {
                        "FileID" | "FileId" => file_id = value,
                        "FileName" => file_name = value,
                        "SenderID" => sender_id = value,
                        "ReceiverID" => receiver_id = value,
                        "TransactionDate" => {
                            if let Ok(parsed) = DateTime::parse_from_rfc3339(&value) {
                                transaction_date = parsed.with_timezone(&Utc);
                            }
                        }
                        "RecordCount" => record_count = value.parse().unwrap_or(0),
                        "IsDownloaded" => is_downloaded = value.parse::<bool>().ok(),
                        _ => {}
                    }
                }
                entries.push(TransactionListEntry { file_id, file_name, sender_id, receiver_id, transaction_date, record_count, is_downloaded });
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    entries
}

#[async_trait]
impl SoapGateway for DhpoSoapGateway {
    async fn get_new_transactions(&self, login: &str, password: &str) -> Result<(ResultCode, Vec<TransactionListEntry>), IngestionError> {
        let action = "GetNewTransactions";
        let body = self
            .call(action, || {
                soap_envelope(
                    self.version,
                    &format!("<GetNewTransactions><login>{}</login><pwd>{}</pwd></GetNewTransactions>", escape(login), escape(password)),
                )
            })
            .await?;
        let code = ResultCode(extract_int(&body, "Result").unwrap_or(0));
        debug!(code = code.0, "GetNewTransactions result");
        Ok((code, parse_transaction_list(&body)))
    }

    async fn search_transactions(
        &self,
        login: &str,
        password: &str,
        filter: &SearchFilter,
    ) -> Result<(ResultCode, Vec<TransactionListEntry>), IngestionError> {
        let action = "SearchTransactions";
        let mut params = format!("<login>{}</login><pwd>{}</pwd>", escape(login), escape(password));
        if let Some(direction) = &filter.direction {
            params.push_str(&format!("<Direction>{}</Direction>", escape(direction)));
        }
        if let Some(caller_license) = &filter.caller_license {
            params.push_str(&format!("<CallerLicense>{}</CallerLicense>", escape(caller_license)));
        }
        if let Some(e_partner) = &filter.e_partner {
            params.push_str(&format!("<EPartner>{}</EPartner>", escape(e_partner)));
        }
        if let Some(transaction_id) = &filter.transaction_id {
            params.push_str(&format!("<TransactionID>{}</TransactionID>", escape(transaction_id)));
        }
        if let Some(status) = &filter.status {
            params.push_str(&format!("<Status>{}</Status>", escape(status)));
        }
        if let Some(date_from) = filter.date_from {
            params.push_str(&format!("<FromDate>{}</FromDate>", date_from.to_rfc3339()));
        }
        if let Some(date_to) = filter.date_to {
            params.push_str(&format!("<ToDate>{}</ToDate>", date_to.to_rfc3339()));
        }
        if let Some(min_record_count) = filter.min_record_count {
            params.push_str(&format!("<MinRecordCount>{min_record_count}</MinRecordCount>"));
        }
        if let Some(max_record_count) = filter.max_record_count {
            params.push_str(&format!("<MaxRecordCount>{max_record_count}</MaxRecordCount>"));
        }
        let body = self.call(action, || soap_envelope(self.version, &format!("<SearchTransactions>{params}</SearchTransactions>"))).await?;
        let code = ResultCode(extract_int(&body, "Result").unwrap_or(0));
        Ok((code, parse_transaction_list(&body)))
    }

    async fn download_transaction_file(
        &self,
        login: &str,
        password: &str,
        file_id: &str,
    ) -> Result<(ResultCode, Option<DownloadedFile>, Option<String>), IngestionError> {
        let action = "DownloadTransactionFile";
        let body = self
            .call(action, || {
                soap_envelope(
                    self.version,
                    &format!(
                        "<DownloadTransactionFile><login>{}</login><pwd>{}</pwd><fileId>{}</fileId></DownloadTransactionFile>",
                        escape(login),
                        escape(password),
                        escape(file_id)
                    ),
                )
            })
            .await?;
        let code = ResultCode(extract_int(&body, "Result").unwrap_or(0));
        let error_message = extract_text(&body, "ErrorMessage");
        if !code.is_ok() {
            return Ok((code, None, error_message));
        }
        let file_name = extract_text(&body, "FileName").unwrap_or_default();
        let bytes = extract_text(&body, "FileBytes")
            .map(|b64| base64::engine::general_purpose::STANDARD.decode(b64.trim()))
            .transpose()
            .map_err(|e| IngestionError::parse(format!("DownloadTransactionFile base64 decode failed: {e}")))?
            .unwrap_or_default();
        Ok((code, Some(DownloadedFile { file_name, bytes }), error_message))
    }

    async fn set_transaction_downloaded(&self, login: &str, password: &str, file_id: &str) -> Result<(ResultCode, Option<String>), IngestionError> {
        let action = "SetTransactionDownloaded";
        let body = self
            .call(action, || {
                soap_envelope(
                    self.version,
                    &format!(
                        "<SetTransactionDownloaded><login>{}</login><pwd>{}</pwd><fileId>{}</fileId></SetTransactionDownloaded>",
                        escape(login),
                        escape(password),
                        escape(file_id)
                    ),
                )
            })
            .await?;
        let code = ResultCode(extract_int(&body, "Result").unwrap_or(0));
        Ok((code, extract_text(&body, "ErrorMessage")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soap_11_uses_text_xml_and_soap_action() {
        let gateway = DhpoSoapGateway::new(reqwest::Client::new(), "https://example.test", SoapVersion::V1_1);
        let (name, value) = gateway.content_type_header("GetNewTransactions");
        assert_eq!(name, "Content-Type");
        assert_eq!(value, "text/xml; charset=utf-8");
    }

    #[test]
    fn soap_12_embeds_action_in_content_type() {
        let gateway = DhpoSoapGateway::new(reqwest::Client::new(), "https://example.test", SoapVersion::V1_2);
        let (_, value) = gateway.content_type_header("GetNewTransactions");
        assert!(value.contains("application/soap+xml"));
        assert!(value.contains("action=\"GetNewTransactions\""));
    }

    #[test]
    fn extract_text_is_tolerant_of_namespace_prefixes() {
        let xml = "<ns:Envelope><ns:Body><ns:Result>0</ns:Result></ns:Body></ns:Envelope>";
        assert_eq!(extract_int(xml, "Result"), Some(0));
    }

    #[test]
    fn parse_transaction_list_reads_file_rows() {
        let xml = r#"<Response><NewClaims>&lt;List&gt;&lt;File FileID="1" FileName="a.xml" SenderID="S" ReceiverID="R" RecordCount="3" IsDownloaded="false"/&gt;&lt;/List&gt;</NewClaims></Response>"#;
        let entries = parse_transaction_list(xml);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_id, "1");
        assert_eq!(entries[0].record_count, 3);
        assert_eq!(entries[0].is_downloaded, Some(false));
    }

    #[test]
    fn retryable_http_statuses_include_408_429_and_5xx() {
        assert!(is_retryable_status(408));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(401));
    }
}
