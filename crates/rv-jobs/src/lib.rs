//! # rv-jobs
//!
//! The background job pipeline: typed payloads ([`payload`]), the persistent
//! FIFO [`queue`], the single-flight [`runner`] and the [`handlers`] that
//! carry out each job type.
//!
//! Handlers may enqueue further jobs with the running job as parent; the
//! runner drains those in the same pass.

pub mod context;
pub mod handlers;
pub mod payload;
pub mod queue;
pub mod runner;

#[cfg(test)]
pub(crate) mod testing;

pub use context::JobContext;
pub use payload::{JobKind, JobPayload};
pub use queue::JobQueue;
pub use runner::{run_processor, HandlerRegistry, JobHandler, JobRunner, RunSummary, SingleFlight};
