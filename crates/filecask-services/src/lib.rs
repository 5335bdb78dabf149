//! Service layer: the interfaces the request-handling and UI/CLI
//! collaborators consume. Submission is fire-and-forget; processing happens
//! in the worker.

pub mod ingest;

pub use ingest::{
    FileStatus, IngestError, IngestService, NewSubmission, OverwritePolicy, RetrievalTarget,
    RetrievedContent, SubmissionReceipt,
};
