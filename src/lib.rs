//! Volley - request orchestration engine for API invocation

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod promise;
pub mod source;
pub mod status;
pub mod store;
pub mod template;
pub mod throttle;
pub mod transport;

pub use cache::ResponseCache;
pub use config::{Hooks, QueryConfig, RequestDraft};
pub use engine::{Disposition, Engine, EngineBuilder, RequestTask, TaskStatus};
pub use error::{FixSuggestion, VolleyError};
pub use promise::{Promise, PromiseState};
pub use source::{DataSource, MapSource};
pub use status::{FlagStatus, NoopStatus, StatusSink};
pub use store::{MemoryStore, PersistentStore};
pub use template::{resolve_template, TemplateResolver};
pub use throttle::ThrottleController;
pub use transport::{
    HttpTransport, Method, MockReply, MockResponder, MockTransport, RawResponse, Transport,
    TransportFault, TransportRequest,
};
