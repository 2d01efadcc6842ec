//! Request orchestration engine
//!
//! One [`Engine`] instance owns at most one live [`RequestTask`] at a
//! time. `query()` walks the full pipeline: precondition guards,
//! supersede-or-drop of an in-flight task, URL resolution against the
//! layered data sources, send-strategy selection (cached, mocked, or real
//! transport — decided exactly once per query), throttled dispatch,
//! settlement classification and terminal effects (status flags, cache
//! write-through, lifecycle hooks).
//!
//! Configuration-class failures short-circuit before any promise exists
//! and are reported through the diagnostic side-channel only.

use crate::cache::ResponseCache;
use crate::config::{Hooks, QueryConfig, RequestDraft};
use crate::error::VolleyError;
use crate::promise::Promise;
use crate::source::{DataSource, MapSource};
use crate::status::{NoopStatus, StatusSink};
use crate::store::PersistentStore;
use crate::template::TEMPLATE_RESOLVER;
use crate::throttle::ThrottleController;
use crate::transport::{
    HttpTransport, Method, MockResponder, Transport, TransportFault, TransportRequest,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Terminal classification of a settled task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Resolved,
    Aborted,
    Invalid,
    Errored,
}

/// Forward-only task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Pending,
    Resolved,
    Rejected(Disposition),
}

/// How a query settles, decided once per `query()`
enum SendStrategy {
    Cached(Value),
    Mock(MockResponder),
    Transport,
}

/// One orchestrated attempt to satisfy a logical API call
pub struct RequestTask {
    id: u64,
    url: String,
    method: Method,
    payload: Option<Value>,
    started: Instant,
    status: Mutex<TaskStatus>,
    promise: Promise<Value, VolleyError>,
}

impl RequestTask {
    fn new(id: u64, url: String, method: Method, payload: Option<Value>) -> Self {
        Self {
            id,
            url,
            method,
            payload,
            started: Instant::now(),
            status: Mutex::new(TaskStatus::Idle),
            promise: Promise::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    pub fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap()
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.status(), TaskStatus::Idle | TaskStatus::Pending)
    }

    /// The task's settlement promise; additional subscribers may attach
    pub fn promise(&self) -> &Promise<Value, VolleyError> {
        &self.promise
    }

    pub fn elapsed(&self) -> std::time::Duration {
        Instant::now() - self.started
    }

    fn mark_pending(&self) {
        let mut status = self.status.lock().unwrap();
        if *status == TaskStatus::Idle {
            *status = TaskStatus::Pending;
        }
    }

    /// Settle the task; terminal tasks are immutable so later calls are
    /// no-ops.
    fn settle(&self, outcome: Result<Value, VolleyError>) {
        {
            let mut status = self.status.lock().unwrap();
            if !matches!(*status, TaskStatus::Idle | TaskStatus::Pending) {
                return;
            }
            *status = match &outcome {
                Ok(_) => TaskStatus::Resolved,
                Err(err) => TaskStatus::Rejected(classify(err)),
            };
        }
        match outcome {
            Ok(value) => self.promise.resolve(value),
            Err(err) => self.promise.reject(err),
        }
    }

    fn reject_aborted(&self) {
        self.settle(Err(VolleyError::Aborted));
    }
}

fn classify(err: &VolleyError) -> Disposition {
    match err {
        VolleyError::Aborted => Disposition::Aborted,
        VolleyError::ValidationFailed { .. } => Disposition::Invalid,
        _ => Disposition::Errored,
    }
}

/// Request orchestration engine; construct through [`Engine::builder`]
pub struct Engine {
    config: QueryConfig,
    hooks: Hooks,
    actions: HashMap<String, String>,
    transport: Arc<dyn Transport>,
    cache: Option<ResponseCache>,
    sources: Vec<Arc<dyn DataSource>>,
    status: Arc<dyn StatusSink>,
    throttle: ThrottleController,
    /// The single live task slot, replaced atomically on each query decision
    live: Mutex<Option<Arc<RequestTask>>>,
    cooldown_until: Mutex<Option<Instant>>,
    next_id: AtomicU64,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Trigger the full request pipeline. Fire-and-forget: outcomes are
    /// observed through the lifecycle hooks and the task promise.
    pub fn query(self: &Arc<Self>) {
        if self.config.disabled {
            return self.diagnostic(VolleyError::Disabled);
        }
        if self.cooling_down() {
            return self.diagnostic(VolleyError::CoolingDown);
        }

        let mut draft = self.config.draft();
        if let Some(hook) = &self.hooks.before_send {
            if !hook(&mut draft) {
                return self.diagnostic(VolleyError::Vetoed);
            }
        }

        // Supersede-or-drop: decide under the lock, abort after releasing
        // it (the aborted task's completion callback takes the same lock)
        let superseded = {
            let mut live = self.live.lock().unwrap();
            match live.as_ref() {
                Some(task) if task.is_pending() => {
                    if self.config.interrupt {
                        live.take()
                    } else {
                        tracing::debug!(task = task.id(), "query dropped, task still in flight");
                        return;
                    }
                }
                _ => None,
            }
        };
        if let Some(task) = superseded {
            tracing::debug!(task = task.id(), "superseding in-flight task");
            self.abort_task(&task);
        }

        let url = match self.resolve_url(&draft) {
            Ok(url) => url,
            Err(err) => return self.diagnostic(err),
        };

        let strategy = self.select_strategy(&url);

        let task = Arc::new(RequestTask::new(
            self.next_id.fetch_add(1, Ordering::SeqCst),
            url,
            draft.method,
            draft.payload,
        ));
        self.wire_completion(&task);
        *self.live.lock().unwrap() = Some(Arc::clone(&task));

        if let Some(hook) = &self.hooks.on_started {
            hook();
        }
        self.status.set_loading(true);
        task.mark_pending();

        match strategy {
            SendStrategy::Cached(value) => {
                tracing::debug!(task = task.id(), url = %task.url(), "serving from cache");
                task.settle(Ok(value));
            }
            strategy => {
                let engine = Arc::clone(self);
                let task = Arc::clone(&task);
                self.throttle.schedule(move || {
                    tokio::spawn(engine.execute_send(task, strategy));
                });
            }
        }
    }

    /// Cancel the live task, if any. Cooperative: the transport is asked
    /// to cancel and the task's promise rejects with the aborted marker.
    /// No-op once the task has settled.
    pub fn abort(&self) {
        self.throttle.cancel();
        let task = self.live.lock().unwrap().clone();
        if let Some(task) = task {
            if task.is_pending() {
                tracing::debug!(task = task.id(), "aborting live task");
                self.abort_task(&task);
            }
        }
    }

    /// The currently live task, if one exists
    pub fn live_task(&self) -> Option<Arc<RequestTask>> {
        self.live.lock().unwrap().clone()
    }

    fn abort_task(&self, task: &RequestTask) {
        self.transport.abort();
        task.reject_aborted();
    }

    fn cooling_down(&self) -> bool {
        if self.config.allow_rapid_resubmit {
            return false;
        }
        let mut guard = self.cooldown_until.lock().unwrap();
        match *guard {
            Some(until) if Instant::now() < until => true,
            Some(_) => {
                *guard = None;
                false
            }
            None => false,
        }
    }

    fn resolve_url(&self, draft: &RequestDraft) -> Result<String, VolleyError> {
        let template = draft
            .url
            .clone()
            .or_else(|| {
                draft
                    .action
                    .as_ref()
                    .and_then(|name| self.actions.get(name).cloned())
            })
            .filter(|t| !t.is_empty())
            .ok_or(VolleyError::NoUrl)?;

        let call_vars = MapSource::from(draft.url_vars.clone());
        let mut layers: Vec<&dyn DataSource> = Vec::with_capacity(self.sources.len() + 1);
        layers.push(&call_vars);
        for source in &self.sources {
            layers.push(source.as_ref());
        }

        let path = TEMPLATE_RESOLVER.resolve(&template, &layers)?;

        match &self.config.base_url {
            Some(base) => {
                let full = if path.starts_with('/') || base.ends_with('/') {
                    format!("{}{}", base.trim_end_matches('/'), path)
                } else {
                    format!("{}/{}", base, path)
                };
                url::Url::parse(&full).map_err(|err| VolleyError::InvalidUrl {
                    details: err.to_string(),
                })?;
                Ok(full)
            }
            None => Ok(path),
        }
    }

    fn select_strategy(&self, url: &str) -> SendStrategy {
        if self.config.cache_responses {
            match &self.cache {
                Some(cache) => {
                    if let Some(hit) = cache.get(url) {
                        return SendStrategy::Cached(hit);
                    }
                }
                None => self.diagnostic(VolleyError::CachingUnavailable),
            }
        }
        if let Some(mock) = &self.config.mock {
            return SendStrategy::Mock(mock.clone());
        }
        SendStrategy::Transport
    }

    async fn execute_send(self: Arc<Self>, task: Arc<RequestTask>, strategy: SendStrategy) {
        // Aborted while waiting out the throttle window
        if !task.is_pending() {
            return;
        }

        let request = TransportRequest {
            method: task.method(),
            url: task.url().to_string(),
            body: task.payload().cloned(),
        };

        let outcome = match strategy {
            SendStrategy::Cached(value) => Ok(value),
            SendStrategy::Mock(responder) => {
                responder
                    .respond(&request)
                    .await
                    .map_err(|message| VolleyError::Transport {
                        status: None,
                        message,
                    })
            }
            SendStrategy::Transport => match self.transport.send(request).await {
                Ok(raw) => self.decode(raw),
                Err(TransportFault::Aborted) => Err(VolleyError::Aborted),
                Err(TransportFault::Failed { status, message }) => {
                    Err(VolleyError::Transport { status, message })
                }
            },
        };

        let outcome = outcome.and_then(|value| match &self.config.validate_response {
            Some(predicate) if !predicate(&value) => {
                Err(VolleyError::ValidationFailed { response: value })
            }
            _ => Ok(value),
        });

        // Hold fast settlements back to the minimum visible-loading
        // duration; aborts settle immediately
        if !matches!(outcome, Err(VolleyError::Aborted)) {
            let elapsed = task.elapsed();
            if elapsed < self.config.min_loading {
                tokio::time::sleep(self.config.min_loading - elapsed).await;
            }
        }

        task.settle(outcome);
    }

    fn decode(&self, raw: crate::transport::RawResponse) -> Result<Value, VolleyError> {
        if !self.config.expect_json {
            return Ok(Value::String(raw.body));
        }
        if raw.body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&raw.body).map_err(|err| VolleyError::Decode {
            details: err.to_string(),
        })
    }

    fn wire_completion(self: &Arc<Self>, task: &Arc<RequestTask>) {
        let engine = Arc::clone(self);
        let settled = Arc::clone(task);
        task.promise()
            .on_settled(move |outcome| engine.finish(&settled, outcome));
    }

    /// Common completion path for every terminal state, cache hits and
    /// network settlements alike
    fn finish(&self, task: &RequestTask, outcome: Result<&Value, &VolleyError>) {
        {
            let mut live = self.live.lock().unwrap();
            if live.as_ref().map(|t| t.id()) == Some(task.id()) {
                live.take();
            }
        }
        self.status.set_loading(false);

        match outcome {
            Ok(value) => {
                tracing::debug!(
                    task = task.id(),
                    elapsed_ms = task.elapsed().as_millis() as u64,
                    "request resolved"
                );
                if self.config.cache_responses {
                    if let Some(cache) = &self.cache {
                        cache.put(task.url(), value);
                    }
                }
                if let Some(hook) = &self.hooks.on_success {
                    hook(value);
                }
            }
            Err(VolleyError::Aborted) => {
                tracing::debug!(task = task.id(), "request aborted");
                if let Some(hook) = &self.hooks.on_abort {
                    hook();
                }
            }
            Err(err @ VolleyError::ValidationFailed { response }) => {
                tracing::warn!(task = task.id(), error = %err, "response failed validation");
                self.raise_error_flag();
                if let Some(hook) = &self.hooks.on_failure {
                    hook(response);
                }
            }
            Err(err) => {
                tracing::error!(task = task.id(), error = %err, "request errored");
                self.raise_error_flag();
                self.open_cooldown();
                if let Some(hook) = &self.hooks.on_error {
                    hook(err);
                }
            }
        }

        if let Some(hook) = &self.hooks.on_complete {
            hook(outcome);
        }
    }

    fn raise_error_flag(&self) {
        self.status.set_error(true);
        if let Some(duration) = self.config.error_duration {
            let status = Arc::clone(&self.status);
            tokio::spawn(async move {
                tokio::time::sleep(duration).await;
                status.set_error(false);
            });
        }
    }

    fn open_cooldown(&self) {
        if self.config.allow_rapid_resubmit || self.config.error_cooldown.is_zero() {
            return;
        }
        *self.cooldown_until.lock().unwrap() = Some(Instant::now() + self.config.error_cooldown);
    }

    fn diagnostic(&self, err: VolleyError) {
        use crate::error::FixSuggestion;
        match err.fix_suggestion() {
            Some(hint) => tracing::warn!(error = %err, hint = hint, "query not dispatched"),
            None => tracing::warn!(error = %err, "query not dispatched"),
        }
        if let Some(hook) = &self.hooks.on_diagnostic {
            hook(&err);
        }
    }
}

/// Fluent construction of an [`Engine`]
pub struct EngineBuilder {
    config: QueryConfig,
    hooks: Hooks,
    actions: HashMap<String, String>,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn PersistentStore>>,
    sources: Vec<Arc<dyn DataSource>>,
    status: Option<Arc<dyn StatusSink>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            config: QueryConfig::default(),
            hooks: Hooks::default(),
            actions: HashMap::new(),
            transport: None,
            store: None,
            sources: Vec::new(),
            status: None,
        }
    }

    pub fn config(mut self, config: QueryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Register a named action → URL template mapping
    pub fn action(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.actions.insert(name.into(), template.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Backing store for the response cache; absence degrades to
    /// caching-disabled with a diagnostic, never a crash
    pub fn store(mut self, store: Arc<dyn PersistentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Append a lookup layer (element-scoped before context-scoped)
    pub fn data_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status = Some(sink);
        self
    }

    pub fn build(self) -> Arc<Engine> {
        let throttle = ThrottleController::new(self.config.throttle, self.config.throttle_leading);
        Arc::new(Engine {
            throttle,
            cache: self.store.map(ResponseCache::new),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpTransport::new())),
            status: self.status.unwrap_or_else(|| Arc::new(NoopStatus)),
            config: self.config,
            hooks: self.hooks,
            actions: self.actions,
            sources: self.sources,
            live: Mutex::new(None),
            cooldown_until: Mutex::new(None),
            next_id: AtomicU64::new(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapSource;

    fn engine_with(config: QueryConfig) -> Arc<Engine> {
        Engine::builder()
            .config(config)
            .transport(Arc::new(crate::transport::MockTransport::new()))
            .build()
    }

    #[test]
    fn resolve_url_prefers_literal_over_action() {
        let engine = Engine::builder()
            .config(QueryConfig::new().url("/literal"))
            .action("search", "/from-action")
            .build();
        let url = engine.resolve_url(&engine.config.draft()).unwrap();
        assert_eq!(url, "/literal");
    }

    #[test]
    fn resolve_url_falls_back_to_action_table() {
        let engine = Engine::builder()
            .config(QueryConfig::new().action("search").url_var("q", "rust"))
            .action("search", "/search/{q}")
            .build();
        let url = engine.resolve_url(&engine.config.draft()).unwrap();
        assert_eq!(url, "/search/rust");
    }

    #[test]
    fn resolve_url_without_template_is_no_url() {
        let engine = engine_with(QueryConfig::new());
        assert!(matches!(
            engine.resolve_url(&engine.config.draft()),
            Err(VolleyError::NoUrl)
        ));
    }

    #[test]
    fn unknown_action_is_no_url() {
        let engine = engine_with(QueryConfig::new().action("missing"));
        assert!(matches!(
            engine.resolve_url(&engine.config.draft()),
            Err(VolleyError::NoUrl)
        ));
    }

    #[test]
    fn base_url_is_joined_and_validated() {
        let engine = engine_with(
            QueryConfig::new()
                .url("/users/{id}")
                .url_var("id", "7")
                .base_url("https://api.example.com/"),
        );
        let url = engine.resolve_url(&engine.config.draft()).unwrap();
        assert_eq!(url, "https://api.example.com/users/7");
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let engine = engine_with(QueryConfig::new().url("/users").base_url("::not a url::"));
        assert!(matches!(
            engine.resolve_url(&engine.config.draft()),
            Err(VolleyError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn data_source_layers_resolve_in_priority_order() {
        let element = MapSource::new().with("id", "element");
        let context = MapSource::new().with("id", "context").with("page", "3");
        let engine = Engine::builder()
            .config(QueryConfig::new().url("/u/{id}/{page}"))
            .data_source(Arc::new(element))
            .data_source(Arc::new(context))
            .build();
        let url = engine.resolve_url(&engine.config.draft()).unwrap();
        assert_eq!(url, "/u/element/3");
    }

    #[tokio::test]
    async fn task_status_is_forward_only() {
        let task = RequestTask::new(1, "/u".into(), Method::Get, None);
        assert_eq!(task.status(), TaskStatus::Idle);
        task.mark_pending();
        assert_eq!(task.status(), TaskStatus::Pending);

        task.settle(Ok(serde_json::json!({"ok": true})));
        assert_eq!(task.status(), TaskStatus::Resolved);

        // Terminal tasks are immutable
        task.reject_aborted();
        assert_eq!(task.status(), TaskStatus::Resolved);
    }

    #[tokio::test]
    async fn classification_of_rejections() {
        for (err, expected) in [
            (VolleyError::Aborted, Disposition::Aborted),
            (
                VolleyError::ValidationFailed {
                    response: Value::Null,
                },
                Disposition::Invalid,
            ),
            (
                VolleyError::Transport {
                    status: Some(500),
                    message: "x".into(),
                },
                Disposition::Errored,
            ),
            (
                VolleyError::Decode {
                    details: "x".into(),
                },
                Disposition::Errored,
            ),
        ] {
            assert_eq!(classify(&err), expected);
        }
    }
}
