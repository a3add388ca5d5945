//! # Runtime Plumbing
//!
//! The task-group primitives behind the pipeline: a bounded worker pool
//! with a first-error latch, the single-slot handoff chain that serializes
//! batch delivery per model, and the shared cancellation cause.

pub mod cancel;
pub mod pool;
pub mod sync;

pub use cancel::CancelCause;
pub use pool::WorkerPool;
pub use sync::{Syncer, Ticket};
