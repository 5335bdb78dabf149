//! Stage pipeline and classification.
//!
//! The pipeline is a pure function of (file metadata, original bytes): it
//! writes storage at deterministic keys and returns a [`PipelineOutcome`]
//! for the finalize transaction, holding no persistent state of its own.
//! Every stage is an idempotent overwrite, so re-running a job after a
//! partial failure converges on the same final state as a clean run.

pub mod classifier;
pub mod pipeline;
pub mod summary;

pub use classifier::classify;
pub use pipeline::{Pipeline, PipelineOutcome};
pub use summary::build_summary;
