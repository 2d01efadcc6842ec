//! Trailing-edge coalescing of repeated sends
//!
//! At most one timer is pending at any time. A new `schedule` while a
//! timer is pending cancels and replaces it, so a burst of calls collapses
//! into a single send at the trailing edge of the configured window. In
//! leading mode the first call of a burst fires immediately and opens a
//! blocking window; calls inside the window still coalesce to the
//! trailing edge.
//!
//! Each engine instance owns its own controller; the window state is
//! never shared across instances.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Debounce controller driving deferred sends through tokio timers
pub struct ThrottleController {
    delay: Duration,
    leading: bool,
    /// At most one pending timer; replaced on re-schedule
    timer: Arc<Mutex<Option<AbortHandle>>>,
}

impl ThrottleController {
    pub fn new(delay: Duration, leading: bool) -> Self {
        Self {
            delay,
            leading,
            timer: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether a timer window is currently open
    pub fn is_pending(&self) -> bool {
        self.timer.lock().unwrap().is_some()
    }

    /// Run `send` now or at the trailing edge of the window
    pub fn schedule(&self, send: impl FnOnce() + Send + 'static) {
        if self.delay.is_zero() {
            send();
            return;
        }

        let mut slot = self.timer.lock().unwrap();
        if self.leading && slot.is_none() {
            send();
            // Open a blocking window; its only effect is existing until expiry
            let timer = Arc::clone(&self.timer);
            let delay = self.delay;
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                timer.lock().unwrap().take();
            });
            *slot = Some(handle.abort_handle());
        } else {
            if let Some(previous) = slot.take() {
                previous.abort();
            }
            let timer = Arc::clone(&self.timer);
            let delay = self.delay;
            let handle = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                timer.lock().unwrap().take();
                send();
            });
            *slot = Some(handle.abort_handle());
        }
    }

    /// Cancel any pending timer without firing it
    pub fn cancel(&self) {
        if let Some(handle) = self.timer.lock().unwrap().take() {
            handle.abort();
        }
    }
}

impl Drop for ThrottleController {
    fn drop(&mut self) {
        self.cancel();
    }
}
