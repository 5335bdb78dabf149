//! Worker loop: claim, process, finalize.
//!
//! One process runs one single-threaded cooperative loop; multiple worker
//! processes may run against the same metadata store, coordinating only
//! through the atomic claim updates.

pub mod setup;
pub mod worker;

pub use worker::WorkerLoop;
