//! Repository implementations for database operations.
//!
//! Each repository is responsible for one domain entity and provides CRUD
//! operations and the specialized queries the worker loop depends on.

pub mod derivative;
pub mod file;
pub mod job;
pub mod transaction;
