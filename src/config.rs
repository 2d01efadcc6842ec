//! Query configuration and lifecycle hooks
//!
//! [`QueryConfig`] is the recognized option surface for one engine:
//! target action or literal template, method/payload, throttling,
//! caching, interruption, visible-state timing, response validation and
//! mocking. [`Hooks`] bundles the optional lifecycle callbacks.

use crate::error::VolleyError;
use crate::transport::{Method, MockResponder};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Mutable view of a request handed to the before-send hook.
/// The hook may adjust it or veto the whole dispatch by returning false.
#[derive(Debug, Clone, Default)]
pub struct RequestDraft {
    pub action: Option<String>,
    pub url: Option<String>,
    pub method: Method,
    pub payload: Option<Value>,
    pub url_vars: HashMap<String, String>,
}

pub type BeforeSendHook = Arc<dyn Fn(&mut RequestDraft) -> bool + Send + Sync>;
pub type StartedHook = Arc<dyn Fn() + Send + Sync>;
pub type ValueHook = Arc<dyn Fn(&Value) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&VolleyError) + Send + Sync>;
pub type AbortHook = Arc<dyn Fn() + Send + Sync>;
pub type CompleteHook = Arc<dyn Fn(Result<&Value, &VolleyError>) + Send + Sync>;

/// Optional lifecycle callbacks, all fire-and-forget from the engine's
/// perspective
#[derive(Clone, Default)]
pub struct Hooks {
    /// May mutate the draft or veto the dispatch
    pub before_send: Option<BeforeSendHook>,
    /// A task was created and is about to dispatch
    pub on_started: Option<StartedHook>,
    /// Terminal: resolved (payload = decoded response)
    pub on_success: Option<ValueHook>,
    /// Terminal: response decoded but failed the validity predicate
    /// (payload = the invalid decoded response)
    pub on_failure: Option<ValueHook>,
    /// Terminal: transport or decode failure
    pub on_error: Option<ErrorHook>,
    /// Terminal: cooperative abort
    pub on_abort: Option<AbortHook>,
    /// Always fires once per terminal state, with the relevant payload
    pub on_complete: Option<CompleteHook>,
    /// Side-channel for configuration/caching diagnostics; these never
    /// reach the terminal callbacks
    pub on_diagnostic: Option<ErrorHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_send(
        mut self,
        f: impl Fn(&mut RequestDraft) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.before_send = Some(Arc::new(f));
        self
    }

    pub fn on_started(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_started = Some(Arc::new(f));
        self
    }

    pub fn on_success(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_failure = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&VolleyError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_abort(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_abort = Some(Arc::new(f));
        self
    }

    pub fn on_complete(
        mut self,
        f: impl Fn(Result<&Value, &VolleyError>) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn on_diagnostic(mut self, f: impl Fn(&VolleyError) + Send + Sync + 'static) -> Self {
        self.on_diagnostic = Some(Arc::new(f));
        self
    }
}

/// Response validity predicate run over the decoded value
pub type ValidityPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Recognized options for one engine instance
#[derive(Clone)]
pub struct QueryConfig {
    /// Target action name, looked up in the engine's action table
    pub action: Option<String>,
    /// Literal URL template; wins over the action name when both are set
    pub url: Option<String>,
    /// Base URL prefix joined in front of the resolved path
    pub base_url: Option<String>,
    pub method: Method,
    /// Static payload; a before-send hook may derive a different one
    pub payload: Option<Value>,
    /// Call-supplied URL variables (highest-priority lookup layer)
    pub url_vars: HashMap<String, String>,
    /// Serve and store responses through the persistent cache
    pub cache_responses: bool,
    /// Throttle window; zero disables coalescing
    pub throttle: Duration,
    /// Leading-call mode: first call of a burst fires immediately
    pub throttle_leading: bool,
    /// A new query aborts and supersedes an in-flight task; otherwise the
    /// new query is dropped
    pub interrupt: bool,
    /// Minimum visible-loading duration, so fast responses don't flash
    pub min_loading: Duration,
    /// How long the visible error flag stays raised; None keeps it raised
    pub error_duration: Option<Duration>,
    /// Resubmission cool-down after a transport error
    pub error_cooldown: Duration,
    /// Skip the cool-down entirely
    pub allow_rapid_resubmit: bool,
    /// Decode the response body as JSON (otherwise kept as a string value)
    pub expect_json: bool,
    /// Target disabled: queries short-circuit with a diagnostic
    pub disabled: bool,
    pub validate_response: Option<ValidityPredicate>,
    /// When set, queries settle from the responder instead of the transport
    pub mock: Option<MockResponder>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            action: None,
            url: None,
            base_url: None,
            method: Method::Get,
            payload: None,
            url_vars: HashMap::new(),
            cache_responses: false,
            throttle: Duration::ZERO,
            throttle_leading: false,
            interrupt: false,
            min_loading: Duration::ZERO,
            error_duration: Some(Duration::from_secs(2)),
            error_cooldown: Duration::from_secs(2),
            allow_rapid_resubmit: false,
            expect_json: true,
            disabled: false,
            validate_response: None,
            mock: None,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action(mut self, name: impl Into<String>) -> Self {
        self.action = Some(name.into());
        self
    }

    pub fn url(mut self, template: impl Into<String>) -> Self {
        self.url = Some(template.into());
        self
    }

    pub fn base_url(mut self, prefix: impl Into<String>) -> Self {
        self.base_url = Some(prefix.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn url_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.url_vars.insert(key.into(), value.into());
        self
    }

    pub fn cache_responses(mut self, enabled: bool) -> Self {
        self.cache_responses = enabled;
        self
    }

    pub fn throttle(mut self, window: Duration) -> Self {
        self.throttle = window;
        self
    }

    pub fn throttle_leading(mut self, leading: bool) -> Self {
        self.throttle_leading = leading;
        self
    }

    pub fn interrupt(mut self, enabled: bool) -> Self {
        self.interrupt = enabled;
        self
    }

    pub fn min_loading(mut self, duration: Duration) -> Self {
        self.min_loading = duration;
        self
    }

    pub fn error_duration(mut self, duration: Option<Duration>) -> Self {
        self.error_duration = duration;
        self
    }

    pub fn error_cooldown(mut self, duration: Duration) -> Self {
        self.error_cooldown = duration;
        self
    }

    pub fn allow_rapid_resubmit(mut self, allowed: bool) -> Self {
        self.allow_rapid_resubmit = allowed;
        self
    }

    pub fn expect_json(mut self, expected: bool) -> Self {
        self.expect_json = expected;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn validate_response(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        self.validate_response = Some(Arc::new(f));
        self
    }

    pub fn mock(mut self, responder: MockResponder) -> Self {
        self.mock = Some(responder);
        self
    }

    /// Initial draft handed to the before-send hook
    pub(crate) fn draft(&self) -> RequestDraft {
        RequestDraft {
            action: self.action.clone(),
            url: self.url.clone(),
            method: self.method,
            payload: self.payload.clone(),
            url_vars: self.url_vars.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_round_trip() {
        let config = QueryConfig::new()
            .url("/users/{id}")
            .base_url("https://api.example.com")
            .method(Method::Post)
            .url_var("id", "7")
            .cache_responses(true)
            .throttle(Duration::from_millis(200))
            .interrupt(true)
            .expect_json(false);

        assert_eq!(config.url.as_deref(), Some("/users/{id}"));
        assert_eq!(config.method, Method::Post);
        assert_eq!(config.url_vars.get("id").map(String::as_str), Some("7"));
        assert!(config.cache_responses);
        assert!(config.interrupt);
        assert!(!config.expect_json);
    }

    #[test]
    fn draft_reflects_config() {
        let config = QueryConfig::new().action("search").url_var("q", "rust");
        let draft = config.draft();
        assert_eq!(draft.action.as_deref(), Some("search"));
        assert_eq!(draft.url_vars.get("q").map(String::as_str), Some("rust"));
    }
}
