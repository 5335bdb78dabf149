//! Domain models shared across Filecask components.

pub mod derivative;
pub mod file;
pub mod job;
pub mod plan;
pub mod summary;

pub use derivative::{Derivative, DerivativeKind, NewDerivative};
pub use file::IngestedFile;
pub use job::{JobStats, JobStatus, ProcessingJob};
pub use plan::{ProcessingPlan, Stage};
pub use summary::{SummaryDerivative, SummaryDocument, SummaryFrontmatter};
