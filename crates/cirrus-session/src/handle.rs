//! A cloneable handle for observing and cancelling a session from outside.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for observing and cancelling a session from outside.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: Arc<Mutex<CancellationToken>>,
    pub(crate) processing: Arc<AtomicBool>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self {
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
            processing: Arc::new(AtomicBool::new(false)),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
        }
    }

    /// Abort the running request. Already-applied state is kept.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a request is in flight. Input should stay disabled while true.
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Enter the processing state with a fresh cancellation token.
    ///
    /// Returns `None` when a run is already in progress.
    pub(crate) fn try_begin(&self) -> Option<CancellationToken> {
        let mut slot = self.cancel.lock();
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        *slot = CancellationToken::new();
        Some(slot.clone())
    }

    /// Leave the processing state and wake idle waiters.
    pub(crate) fn end(&self) {
        self.processing.store(false, Ordering::Release);
        self.idle_notify.notify_waiters();
    }

    /// Wait until no request is in flight.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_processing() {
            return;
        }
        notified.await;
    }

    /// Wait until no request is in flight, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_processing() {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }
}
