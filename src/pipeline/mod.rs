//! Resumable, bounded-concurrency execution shared by every phase.
//!
//! A phase builds its units, filters nothing itself, and hands them to
//! [`Coordinator::run`] together with the phase cache and a [`CheckpointScheduler`].

pub mod checkpoint;
pub mod context;
pub mod coordinator;
pub mod error;

#[cfg(test)]
mod tests;

pub use checkpoint::{CheckpointInterval, CheckpointScheduler};
pub use context::PipelineContext;
pub use coordinator::{
    Coordinator, Dispatchable, RunSummary, TaskOutcome, UnitStatus, WorkUnit,
};
pub use error::{PipelineError, PipelineResult};
