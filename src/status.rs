//! UI-facing state flags
//!
//! The engine reports loading/error state through an injected sink so
//! terminal-state effects are observable without any DOM coupling. The
//! loading flag is cleared on every terminal state; the error flag is
//! raised only for validation and transport failures, never for aborts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receiver for the engine's visible state transitions
pub trait StatusSink: Send + Sync {
    fn set_loading(&self, active: bool);
    fn set_error(&self, active: bool);
}

/// Sink that ignores all state transitions (the default)
pub struct NoopStatus;

impl StatusSink for NoopStatus {
    fn set_loading(&self, _active: bool) {}
    fn set_error(&self, _active: bool) {}
}

/// Sink that records the current flags (clone-handle, shared state)
#[derive(Clone, Default)]
pub struct FlagStatus {
    loading: Arc<AtomicBool>,
    error: Arc<AtomicBool>,
}

impl FlagStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn has_error(&self) -> bool {
        self.error.load(Ordering::SeqCst)
    }
}

impl StatusSink for FlagStatus {
    fn set_loading(&self, active: bool) {
        self.loading.store(active, Ordering::SeqCst);
    }

    fn set_error(&self, active: bool) {
        self.error.store(active, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_status_tracks_transitions() {
        let flags = FlagStatus::new();
        let handle = flags.clone();

        assert!(!flags.is_loading());
        handle.set_loading(true);
        handle.set_error(true);
        assert!(flags.is_loading());
        assert!(flags.has_error());

        handle.set_loading(false);
        assert!(!flags.is_loading());
        assert!(flags.has_error());
    }
}
