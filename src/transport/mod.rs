//! # Transport Abstraction Layer
//!
//! Trait and implementations for the network capability the engine
//! consumes but does not own.
//!
//! ## Overview
//!
//! - [`Transport`] - capability trait: send one request, cooperatively abort
//! - [`HttpTransport`] - production transport over reqwest
//! - [`MockTransport`] - test transport with scripted outcomes
//! - [`MockResponder`] - config-level mock hooks (value, sync fn, async callback)
//!
//! A transport must keep "aborted" distinguishable from "failed" through
//! its own marker ([`TransportFault::Aborted`]); the engine classifies the
//! two differently and never surfaces aborts as user-visible errors.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockReply, MockResponder, MockTransport, ScriptedOutcome};

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// HTTP method for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outgoing request as handed to the transport
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl TransportRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
        }
    }

    /// Attach a JSON body
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful (2xx) raw response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport completion that did not produce a usable response.
/// `Aborted` is the cooperative-cancellation marker, kept separate from
/// generic failure so the engine can classify it on its own path.
#[derive(Debug, Clone)]
pub enum TransportFault {
    Aborted,
    Failed {
        status: Option<u16>,
        message: String,
    },
}

/// Network capability consumed by the engine
#[async_trait]
pub trait Transport: Send + Sync {
    /// Returns the transport name (e.g., "http", "mock")
    fn name(&self) -> &str;

    /// Perform one round-trip. Non-2xx statuses and connection failures
    /// complete as `Failed`; a cooperative cancellation completes as
    /// `Aborted`.
    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFault>;

    /// Ask the in-flight round-trip, if any, to cancel. No-op otherwise.
    fn abort(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_strings() {
        assert_eq!(Method::Get.as_str(), "GET");
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert_eq!(Method::default(), Method::Get);
    }

    #[test]
    fn request_builder() {
        let req = TransportRequest::new(Method::Post, "/users")
            .with_body(serde_json::json!({"name": "ada"}));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.url, "/users");
        assert!(req.body.is_some());
    }
}
