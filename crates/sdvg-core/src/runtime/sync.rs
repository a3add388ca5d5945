//! Single-slot handoff chain.
//!
//! Each batch takes a ticket; ticket N+1's `wait_previous` resolves when
//! ticket N reports `done`. Generation runs in parallel, but each model's
//! writer observes batches in submission order, the property that makes
//! file content deterministic and resumable.

use tokio::sync::oneshot;

use crate::error::Result;
use crate::runtime::cancel::CancelCause;

pub struct Syncer {
    prev: Option<oneshot::Receiver<()>>,
}

impl Syncer {
    pub fn new() -> Syncer {
        Syncer { prev: None }
    }

    /// Take the next ticket in the chain. Must be called in submission
    /// order.
    pub fn ticket(&mut self) -> Ticket {
        let (done_tx, done_rx) = oneshot::channel();
        Ticket {
            start: self.prev.replace(done_rx),
            done: Some(done_tx),
        }
    }
}

impl Default for Syncer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Ticket {
    start: Option<oneshot::Receiver<()>>,
    done: Option<oneshot::Sender<()>>,
}

impl Ticket {
    /// Block until the previous ticket is done or was dropped (an errored
    /// predecessor releases the chain so the pool's latched error can
    /// surface), while staying responsive to cancellation.
    pub async fn wait_previous(&mut self, cancel: &CancelCause) -> Result<()> {
        if let Some(start) = self.start.take() {
            tokio::select! {
                _ = start => Ok(()),
                _ = cancel.cancelled() => Err(cancel.error()),
            }
        } else {
            Ok(())
        }
    }

    /// Release the next ticket.
    pub fn done(mut self) {
        if let Some(done) = self.done.take() {
            let _ = done.send(());
        }
    }
}
