//! HTTP transport over reqwest
//!
//! Cooperative abort: `abort()` raises a flag and wakes the in-flight
//! round-trip, which completes with [`TransportFault::Aborted`]. The flag
//! is cleared when the next send begins, so an engine can reuse one
//! transport across sequential requests.
//!
//! On non-2xx responses the server-provided message (a `message` or
//! `error` field in a JSON body) is preferred over the generic status
//! text.

use super::{RawResponse, Transport, TransportFault, TransportRequest};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Production transport backed by a shared reqwest client
pub struct HttpTransport {
    client: reqwest::Client,
    aborted: AtomicBool,
    notify: Notify,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Use a preconfigured client (timeouts, proxies, default headers)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            aborted: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    async fn round_trip(&self, request: &TransportRequest) -> Result<RawResponse, TransportFault> {
        let method = match request.method {
            super::Method::Get => reqwest::Method::GET,
            super::Method::Post => reqwest::Method::POST,
            super::Method::Put => reqwest::Method::PUT,
            super::Method::Patch => reqwest::Method::PATCH,
            super::Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            transport = "http",
            method = %request.method,
            url = %request.url,
            "sending request"
        );

        let response = builder.send().await.map_err(|err| TransportFault::Failed {
            status: None,
            message: err.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|err| TransportFault::Failed {
            status: Some(status.as_u16()),
            message: err.to_string(),
        })?;

        if !status.is_success() {
            let message = extract_server_message(&body)
                .unwrap_or_else(|| format!("server returned {}", status));
            tracing::error!(
                transport = "http",
                status = %status,
                message = %message,
                "request failed"
            );
            return Err(TransportFault::Failed {
                status: Some(status.as_u16()),
                message,
            });
        }

        Ok(RawResponse::new(status.as_u16(), body))
    }

    async fn wait_aborted(&self) {
        loop {
            if self.aborted.load(Ordering::SeqCst) {
                return;
            }
            self.notify.notified().await;
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFault> {
        // A fresh send clears any abort left over from a superseded request
        self.aborted.store(false, Ordering::SeqCst);

        tokio::select! {
            _ = self.wait_aborted() => {
                tracing::debug!(transport = "http", url = %request.url, "round-trip aborted");
                Err(TransportFault::Aborted)
            }
            result = self.round_trip(&request) => result,
        }
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}

/// Error payloads commonly carry the human-readable reason in a
/// `message` or `error` field
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn extract_server_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_message_preferred_fields() {
        assert_eq!(
            extract_server_message(r#"{"message":"user not found"}"#).as_deref(),
            Some("user not found")
        );
        assert_eq!(
            extract_server_message(r#"{"error":"bad token"}"#).as_deref(),
            Some("bad token")
        );
        assert_eq!(
            extract_server_message(r#"{"message":"first","error":"second"}"#).as_deref(),
            Some("first")
        );
    }

    #[test]
    fn non_json_or_empty_bodies_yield_no_message() {
        assert_eq!(extract_server_message("<html>oops</html>"), None);
        assert_eq!(extract_server_message(r#"{"message":""}"#), None);
        assert_eq!(extract_server_message(r#"{"code":500}"#), None);
    }

    #[tokio::test]
    async fn abort_before_send_completes_as_aborted() {
        let transport = HttpTransport::new();
        transport.abort();
        // The flag is cleared at send entry, so a later send is unaffected;
        // an abort raised after entry wins the race instead.
        let send = transport.send(TransportRequest::new(
            super::super::Method::Get,
            "http://127.0.0.1:1/unreachable",
        ));
        tokio::pin!(send);

        transport.abort();
        let result = send.await;
        assert!(matches!(
            result,
            Err(TransportFault::Aborted) | Err(TransportFault::Failed { .. })
        ));
    }
}
