//! Error taxonomy with fix suggestions
//!
//! Two families of errors flow through the engine:
//!
//! - Configuration-class errors (`NoUrl`, `MissingParameter`, `Disabled`,
//!   `Vetoed`, `CoolingDown`, `InvalidUrl`, `CachingUnavailable`) are
//!   reported synchronously through the diagnostic side-channel and
//!   short-circuit the pipeline before a promise is created.
//! - Settlement errors (`Aborted`, `ValidationFailed`, `Transport`,
//!   `Decode`) reject the task's promise and route to their dedicated
//!   lifecycle hooks.

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug, Clone)]
pub enum VolleyError {
    #[error("no URL configured: set an action name or a literal url template")]
    NoUrl,

    #[error("missing required template parameter '{name}'")]
    MissingParameter { name: String },

    #[error("resolved URL is not valid: {details}")]
    InvalidUrl { details: String },

    #[error("target is disabled, request not sent")]
    Disabled,

    #[error("request vetoed by before-send hook")]
    Vetoed,

    #[error("previous request errored, resubmission is cooling down")]
    CoolingDown,

    #[error("persistent store unavailable, response caching disabled")]
    CachingUnavailable,

    #[error("request aborted")]
    Aborted,

    #[error("response failed the validity predicate")]
    ValidationFailed { response: serde_json::Value },

    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("could not decode response body: {details}")]
    Decode { details: String },
}

impl VolleyError {
    /// Configuration-class errors never reach a promise; they are
    /// reported through the diagnostic side-channel instead.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            VolleyError::NoUrl
                | VolleyError::MissingParameter { .. }
                | VolleyError::InvalidUrl { .. }
                | VolleyError::Disabled
                | VolleyError::Vetoed
                | VolleyError::CoolingDown
                | VolleyError::CachingUnavailable
        )
    }

    /// Only validation and transport-class failures may raise the
    /// user-visible error indicator. Aborts stay silent.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            VolleyError::ValidationFailed { .. }
                | VolleyError::Transport { .. }
                | VolleyError::Decode { .. }
        )
    }
}

impl FixSuggestion for VolleyError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            VolleyError::NoUrl => Some("Configure a url template or register the action name"),
            VolleyError::MissingParameter { .. } => {
                Some("Supply the value in url_vars or through a data source layer")
            }
            VolleyError::InvalidUrl { .. } => {
                Some("Check the base URL prefix and the resolved path")
            }
            VolleyError::Disabled => Some("Enable the target before querying"),
            VolleyError::Vetoed => Some("The before-send hook returned false; adjust the hook"),
            VolleyError::CoolingDown => {
                Some("Wait for the error cool-down or allow rapid resubmission")
            }
            VolleyError::CachingUnavailable => {
                Some("Inject a PersistentStore or disable response caching")
            }
            VolleyError::Aborted => None,
            VolleyError::ValidationFailed { .. } => {
                Some("Check the validity predicate against the server response shape")
            }
            VolleyError::Transport { .. } => Some("Check connectivity and the server status"),
            VolleyError::Decode { .. } => Some("Set expect_json to false for non-JSON endpoints"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_classification() {
        assert!(VolleyError::NoUrl.is_configuration());
        assert!(VolleyError::Disabled.is_configuration());
        assert!(VolleyError::CachingUnavailable.is_configuration());
        assert!(!VolleyError::Aborted.is_configuration());
        assert!(!VolleyError::ValidationFailed {
            response: serde_json::Value::Null
        }
        .is_configuration());
    }

    #[test]
    fn aborted_is_never_user_visible() {
        assert!(!VolleyError::Aborted.is_user_visible());
        assert!(VolleyError::Transport {
            status: Some(500),
            message: "boom".into()
        }
        .is_user_visible());
    }

    #[test]
    fn missing_parameter_names_the_parameter() {
        let err = VolleyError::MissingParameter { name: "id".into() };
        assert!(err.to_string().contains("'id'"));
    }
}
