//! Database repositories for the metadata store.
//!
//! The metadata store exclusively owns identity and state transitions; the
//! storage backend exclusively owns bytes. All cross-worker coordination
//! funnels through the atomic conditional updates in `JobRepository`.

pub mod db;

pub use db::derivative::DerivativeRepository;
pub use db::file::FileRepository;
pub use db::job::JobRepository;
pub use db::transaction::{finalize_ready, FileFinalize};
