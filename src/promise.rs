//! One-shot settlement container with multi-subscriber fan-out
//!
//! A [`Promise`] is created per request attempt and settled exactly once.
//! Subscribers registered before settlement fire in registration order;
//! subscribers registered after settlement fire immediately with the
//! stored outcome. Exactly one of the success/failure families fires per
//! promise, and `on_settled` subscribers always fire exactly once.
//!
//! Callbacks are invoked outside the internal lock so a subscriber may
//! safely interact with the promise again.

use std::sync::{Arc, Mutex};

type SuccessFn<T> = Box<dyn FnOnce(&T) + Send>;
type FailureFn<E> = Box<dyn FnOnce(&E) + Send>;
type SettledFn<T, E> = Box<dyn FnOnce(Result<&T, &E>) + Send>;

/// Observable settlement state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Resolved,
    Rejected,
}

enum State<T, E> {
    Pending,
    Resolved(T),
    Rejected(E),
}

struct Inner<T, E> {
    state: State<T, E>,
    on_success: Vec<SuccessFn<T>>,
    on_failure: Vec<FailureFn<E>>,
    on_settled: Vec<SettledFn<T, E>>,
}

/// Cloneable handle to a single settlement slot
pub struct Promise<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T, E> Default for Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Create a new pending promise
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: State::Pending,
                on_success: Vec::new(),
                on_failure: Vec::new(),
                on_settled: Vec::new(),
            })),
        }
    }

    /// Settle successfully. First settlement wins; later calls are no-ops.
    pub fn resolve(&self, value: T) {
        let (success, settled) = {
            let mut inner = self.inner.lock().unwrap();
            if !matches!(inner.state, State::Pending) {
                return;
            }
            inner.state = State::Resolved(value.clone());
            inner.on_failure.clear();
            (
                std::mem::take(&mut inner.on_success),
                std::mem::take(&mut inner.on_settled),
            )
        };
        for cb in success {
            cb(&value);
        }
        for cb in settled {
            cb(Ok(&value));
        }
    }

    /// Settle with a failure. First settlement wins; later calls are no-ops.
    pub fn reject(&self, error: E) {
        let (failure, settled) = {
            let mut inner = self.inner.lock().unwrap();
            if !matches!(inner.state, State::Pending) {
                return;
            }
            inner.state = State::Rejected(error.clone());
            inner.on_success.clear();
            (
                std::mem::take(&mut inner.on_failure),
                std::mem::take(&mut inner.on_settled),
            )
        };
        for cb in failure {
            cb(&error);
        }
        for cb in settled {
            cb(Err(&error));
        }
    }

    /// Subscribe to successful settlement
    pub fn on_success(&self, cb: impl FnOnce(&T) + Send + 'static) {
        let stored = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.state {
                State::Pending => {
                    inner.on_success.push(Box::new(cb));
                    return;
                }
                State::Resolved(value) => Some(value.clone()),
                State::Rejected(_) => None,
            }
        };
        if let Some(value) = stored {
            cb(&value);
        }
    }

    /// Subscribe to failed settlement
    pub fn on_failure(&self, cb: impl FnOnce(&E) + Send + 'static) {
        let stored = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.state {
                State::Pending => {
                    inner.on_failure.push(Box::new(cb));
                    return;
                }
                State::Rejected(error) => Some(error.clone()),
                State::Resolved(_) => None,
            }
        };
        if let Some(error) = stored {
            cb(&error);
        }
    }

    /// Subscribe to settlement regardless of outcome
    pub fn on_settled(&self, cb: impl FnOnce(Result<&T, &E>) + Send + 'static) {
        let stored = {
            let mut inner = self.inner.lock().unwrap();
            match &inner.state {
                State::Pending => {
                    inner.on_settled.push(Box::new(cb));
                    return;
                }
                State::Resolved(value) => Ok(value.clone()),
                State::Rejected(error) => Err(error.clone()),
            }
        };
        match &stored {
            Ok(value) => cb(Ok(value)),
            Err(error) => cb(Err(error)),
        }
    }

    /// Current state without blocking on callbacks
    pub fn state(&self) -> PromiseState {
        match self.inner.lock().unwrap().state {
            State::Pending => PromiseState::Pending,
            State::Resolved(_) => PromiseState::Resolved,
            State::Rejected(_) => PromiseState::Rejected,
        }
    }

    /// Whether the promise has left the pending state
    pub fn is_settled(&self) -> bool {
        self.state() != PromiseState::Pending
    }

    /// Copy of the stored outcome, if settled
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &self.inner.lock().unwrap().state {
            State::Pending => None,
            State::Resolved(value) => Some(Ok(value.clone())),
            State::Rejected(error) => Some(Err(error.clone())),
        }
    }
}
