//! Mock transport and mock responders for testing
//!
//! Two distinct mocking surfaces exist:
//!
//! - [`MockTransport`] stands in for the whole network capability:
//!   scripted outcomes, recorded requests, controllable abort. Useful in
//!   integration tests and CI.
//! - [`MockResponder`] is the config-level hook: when a query carries
//!   one, the engine settles the task from the responder instead of ever
//!   opening the transport. Supports a static value, a synchronous
//!   closure, or an asynchronous callback-style reply handle.

use super::{RawResponse, Transport, TransportFault, TransportRequest};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// One scripted completion for [`MockTransport`]
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    Success(RawResponse),
    Fault(TransportFault),
}

/// Mock transport that returns scripted outcomes (FIFO)
pub struct MockTransport {
    /// Queue of outcomes to return
    outcomes: Mutex<Vec<ScriptedOutcome>>,
    /// Outcome when the queue is empty
    default_outcome: ScriptedOutcome,
    /// Track all requests made (for assertions)
    requests: Mutex<Vec<TransportRequest>>,
    /// Next send completes as aborted when set
    abort_next: Mutex<bool>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(vec![]),
            default_outcome: ScriptedOutcome::Success(RawResponse::new(200, "{}")),
            requests: Mutex::new(vec![]),
            abort_next: Mutex::new(false),
        }
    }

    /// Create with a queue of outcomes
    pub fn with_outcomes(outcomes: Vec<ScriptedOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            ..Self::new()
        }
    }

    /// Queue a 200 response with the given JSON body
    pub fn queue_success(&self, body: &Value) {
        self.outcomes
            .lock()
            .unwrap()
            .push(ScriptedOutcome::Success(RawResponse::new(
                200,
                body.to_string(),
            )));
    }

    /// Queue a failure with a status and message
    pub fn queue_failure(&self, status: u16, message: impl Into<String>) {
        self.outcomes
            .lock()
            .unwrap()
            .push(ScriptedOutcome::Fault(TransportFault::Failed {
                status: Some(status),
                message: message.into(),
            }));
    }

    /// Get all requests made through this transport
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Number of sends performed
    pub fn send_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn send(&self, request: TransportRequest) -> Result<RawResponse, TransportFault> {
        self.requests.lock().unwrap().push(request);

        if std::mem::take(&mut *self.abort_next.lock().unwrap()) {
            return Err(TransportFault::Aborted);
        }

        let outcome = {
            let mut queue = self.outcomes.lock().unwrap();
            if queue.is_empty() {
                self.default_outcome.clone()
            } else {
                queue.remove(0)
            }
        };

        match outcome {
            ScriptedOutcome::Success(response) => Ok(response),
            ScriptedOutcome::Fault(fault) => Err(fault),
        }
    }

    fn abort(&self) {
        *self.abort_next.lock().unwrap() = true;
    }
}

/// Reply handle passed to callback-style asynchronous mocks.
/// First call wins; the handle can be moved into timers or other tasks.
#[derive(Clone)]
pub struct MockReply {
    tx: Arc<Mutex<Option<oneshot::Sender<Result<Value, String>>>>>,
}

impl MockReply {
    fn channel() -> (Self, oneshot::Receiver<Result<Value, String>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Settle the mocked request successfully
    pub fn fulfill(&self, value: Value) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(Ok(value));
        }
    }

    /// Settle the mocked request with a failure message
    pub fn fail(&self, message: impl Into<String>) {
        if let Some(tx) = self.tx.lock().unwrap().take() {
            let _ = tx.send(Err(message.into()));
        }
    }
}

type SyncMockFn = dyn Fn(&TransportRequest) -> Result<Value, String> + Send + Sync;
type AsyncMockFn = dyn Fn(&TransportRequest, MockReply) + Send + Sync;

/// Config-level mock response hook
#[derive(Clone)]
pub enum MockResponder {
    /// Fixed decoded response
    Value(Value),
    /// Synchronous function of the outgoing request
    Sync(Arc<SyncMockFn>),
    /// Callback-style asynchronous responder; settles through [`MockReply`]
    Async(Arc<AsyncMockFn>),
}

impl MockResponder {
    pub fn value(value: Value) -> Self {
        MockResponder::Value(value)
    }

    pub fn sync(f: impl Fn(&TransportRequest) -> Result<Value, String> + Send + Sync + 'static) -> Self {
        MockResponder::Sync(Arc::new(f))
    }

    pub fn callback(f: impl Fn(&TransportRequest, MockReply) + Send + Sync + 'static) -> Self {
        MockResponder::Async(Arc::new(f))
    }

    /// Produce the mocked outcome for one request
    pub async fn respond(&self, request: &TransportRequest) -> Result<Value, String> {
        match self {
            MockResponder::Value(value) => Ok(value.clone()),
            MockResponder::Sync(f) => f(request),
            MockResponder::Async(f) => {
                let (reply, rx) = MockReply::channel();
                f(request, reply);
                match rx.await {
                    Ok(outcome) => outcome,
                    // Responder dropped the handle without settling
                    Err(_) => Err("mock responder never replied".to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Method;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_transport_default_outcome() {
        let transport = MockTransport::new();
        let response = transport
            .send(TransportRequest::new(Method::Get, "/x"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "{}");
    }

    #[tokio::test]
    async fn mock_transport_queued_outcomes_and_recording() {
        let transport = MockTransport::new();
        transport.queue_success(&json!({"n": 1}));
        transport.queue_failure(500, "boom");

        let first = transport
            .send(TransportRequest::new(Method::Get, "/a"))
            .await
            .unwrap();
        assert_eq!(first.body, r#"{"n":1}"#);

        let second = transport
            .send(TransportRequest::new(Method::Post, "/b"))
            .await;
        assert!(matches!(
            second,
            Err(TransportFault::Failed { status: Some(500), .. })
        ));

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "/a");
        assert_eq!(requests[1].method, Method::Post);
    }

    #[tokio::test]
    async fn mock_transport_abort_marker() {
        let transport = MockTransport::new();
        transport.abort();
        let result = transport
            .send(TransportRequest::new(Method::Get, "/x"))
            .await;
        assert!(matches!(result, Err(TransportFault::Aborted)));

        // Marker is consumed; the next send succeeds
        assert!(transport
            .send(TransportRequest::new(Method::Get, "/x"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn responder_value_and_sync() {
        let req = TransportRequest::new(Method::Get, "/u");

        let fixed = MockResponder::value(json!({"ok": true}));
        assert_eq!(fixed.respond(&req).await.unwrap(), json!({"ok": true}));

        let derived = MockResponder::sync(|req| Ok(json!({ "url": req.url })));
        assert_eq!(derived.respond(&req).await.unwrap(), json!({"url": "/u"}));

        let failing = MockResponder::sync(|_| Err("nope".to_string()));
        assert_eq!(failing.respond(&req).await.unwrap_err(), "nope");
    }

    #[tokio::test]
    async fn responder_callback_settles_asynchronously() {
        let responder = MockResponder::callback(|_, reply| {
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                reply.fulfill(json!({"late": true}));
            });
        });
        let req = TransportRequest::new(Method::Get, "/u");
        assert_eq!(responder.respond(&req).await.unwrap(), json!({"late": true}));
    }

    #[tokio::test]
    async fn reply_first_settlement_wins() {
        let responder = MockResponder::callback(|_, reply| {
            reply.fulfill(json!(1));
            reply.fulfill(json!(2));
            reply.fail("late");
        });
        let req = TransportRequest::new(Method::Get, "/u");
        assert_eq!(responder.respond(&req).await.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn dropped_reply_reports_no_reply() {
        let responder = MockResponder::callback(|_, _reply| {});
        let req = TransportRequest::new(Method::Get, "/u");
        assert!(responder.respond(&req).await.is_err());
    }
}
