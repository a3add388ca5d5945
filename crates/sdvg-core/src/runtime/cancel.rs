//! Shared cancellation with a first-cause latch.
//!
//! Every blocking wait in the pipeline selects on `cancelled()`; whoever
//! cancels first supplies the meaningful cause (signal, sink failure,
//! partition limit refusal), later cancels are no-ops. The stored cause is
//! taken once by the task teardown for the top-level report; everyone else
//! observes a `Canceled` error carrying the cause label.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::error::SdvgError;

#[derive(Clone)]
pub struct CancelCause {
    inner: Arc<Inner>,
}

struct Inner {
    flag: AtomicBool,
    cause: Mutex<Option<SdvgError>>,
    label: Mutex<String>,
    notify: Notify,
}

impl CancelCause {
    pub fn new() -> CancelCause {
        CancelCause {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                cause: Mutex::new(None),
                label: Mutex::new(String::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Latch the first cause and wake every waiter. Later calls lose.
    pub fn cancel(&self, cause: SdvgError) {
        if !self.inner.flag.swap(true, Ordering::SeqCst) {
            *self.inner.label.lock().expect("label lock") = cause.cause_label();
            *self.inner.cause.lock().expect("cause lock") = Some(cause);
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// The error observers propagate after cancellation.
    pub fn error(&self) -> SdvgError {
        SdvgError::Canceled {
            cause: self.inner.label.lock().expect("label lock").clone(),
        }
    }

    /// Move the original first cause out, for the top-level task result.
    pub fn take_cause(&self) -> Option<SdvgError> {
        self.inner.cause.lock().expect("cause lock").take()
    }
}

impl Default for CancelCause {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_cause_wins() {
        let cancel = CancelCause::new();
        cancel.cancel(SdvgError::Signal);
        cancel.cancel(SdvgError::Internal {
            message: "late".to_string(),
        });
        match cancel.take_cause() {
            Some(SdvgError::Signal) => {}
            other => panic!("expected the first cause, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let cancel = CancelCause::new();
        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                cancel.cancelled().await;
                true
            })
        };
        tokio::task::yield_now().await;
        cancel.cancel(SdvgError::Signal);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let cancel = CancelCause::new();
        cancel.cancel(SdvgError::Signal);
        cancel.cancelled().await;
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn test_error_carries_label() {
        let cancel = CancelCause::new();
        cancel.cancel(SdvgError::Signal);
        let msg = format!("{}", cancel.error());
        assert!(msg.contains("signal"));
    }
}
