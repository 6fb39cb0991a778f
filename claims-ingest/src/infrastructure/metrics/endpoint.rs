// /////////////////////////////////////////////////////////////////////////////
// Claims Ingestion Engine
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Minimal HTTP server exposing `/metrics` (Prometheus text format) and
//! `/health`. No web framework: the engine's only external HTTP surface
//! is this one read-only endpoint, so a raw `TcpListener` is enough.

use std::sync::Arc;

use claims_ingest_domain::IngestionError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::service::MetricsService;

pub struct MetricsEndpoint {
    metrics_service: Arc<MetricsService>,
    bind_addr: String,
}

impl MetricsEndpoint {
    pub fn new(metrics_service: Arc<MetricsService>, bind_addr: impl Into<String>) -> Self {
        Self { metrics_service, bind_addr: bind_addr.into() }
    }

    /// Runs until the process is killed; callers that want to stop it
    /// on shutdown should spawn it behind a `select!` with a
    /// cancellation signal.
    pub async fn start(&self) -> Result<(), IngestionError> {
        let listener = TcpListener::bind(&self.bind_addr).await.map_err(|e| IngestionError::internal(format!("failed to bind metrics endpoint: {e}")))?;

        info!(addr = %self.bind_addr, "metrics endpoint listening");

        loop {
            match listener.accept().await {
                Ok((mut stream, _)) => {
                    let metrics_service = self.metrics_service.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_request(&mut stream, metrics_service).await {
                            error!(error = %e, "error handling metrics request");
                        }
                    });
                }
                Err(e) => error!(error = %e, "error accepting metrics connection"),
            }
        }
    }
}

async fn handle_request(stream: &mut tokio::net::TcpStream, metrics_service: Arc<MetricsService>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut buffer = [0; 1024];
    let n = stream.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]);

    debug!(line = request.lines().next().unwrap_or(""), "metrics endpoint request");

    if request.starts_with("GET /metrics") {
        match metrics_service.render() {
            Ok(text) => {
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
                    text.len(),
                    text
                );
                stream.write_all(response.as_bytes()).await?;
            }
            Err(e) => {
                let body = format!("error generating metrics: {e}");
                let response = format!("HTTP/1.1 500 Internal Server Error\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}", body.len(), body);
                stream.write_all(response.as_bytes()).await?;
            }
        }
    } else if request.starts_with("GET /health") {
        stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK").await?;
    } else {
        stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 9\r\n\r\nNot Found").await?;
    }

    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn endpoint_construction_succeeds() {
        let metrics_service = Arc::new(MetricsService::new().unwrap());
        let _endpoint = MetricsEndpoint::new(metrics_service, "127.0.0.1:0");
    }

    #[tokio::test]
    async fn serves_metrics_and_health_over_a_real_socket() {
        let metrics_service = Arc::new(MetricsService::new().unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Arc::new(MetricsEndpoint::new(metrics_service, addr.to_string()));
        let server = endpoint.clone();
        tokio::spawn(async move {
            let _ = server.start().await;
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /health HTTP/1.1\r\n\r\n").await.unwrap();
        let mut buf = [0u8; 256];
        let n = stream.read(&mut buf).await.unwrap();
        let response = String::from_utf8_lossy(&buf[..n]);
        assert!(response.starts_with("HTTP/1.1 200 OK"));
    }
}
