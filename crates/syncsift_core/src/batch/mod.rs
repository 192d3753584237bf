//! Parallel batch processing of planned chunks.
//!
//! The scheduler owns a queue of chunk specs and a small pool of worker
//! threads. Each worker pulls a chunk, runs it through extraction,
//! scoring, classification and placement, and records the outcome.
//! Failures stay scoped to their chunk; cancellation stops the queue.

mod scheduler;
mod worker;

pub use scheduler::{BatchError, BatchScheduler, CancelHandle};
