//! Stage-scoped pipeline errors
//!
//! A stage failure aborts the remaining stages for the current attempt and
//! is recorded on the job as `last_error` with the failing stage's tag
//! (`extract: ...`, `derive: ...`, ...). The tag is what status queries and
//! retries key off, so it must be stable.

use std::fmt;

use crate::models::Stage;

/// Error raised by one pipeline stage, carrying which stage failed.
#[derive(Debug)]
pub struct StageError {
    stage: Stage,
    inner: anyhow::Error,
}

impl StageError {
    pub fn new(stage: Stage, err: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            inner: err.into(),
        }
    }

    /// The stage that failed.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Stage-tagged message recorded as the job's `last_error`.
    pub fn tagged(&self) -> String {
        format!("{}: {}", self.stage, self.inner)
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn into_inner(self) -> anyhow::Error {
        self.inner
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.inner)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}
