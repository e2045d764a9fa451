//! Destination trait abstraction.
//!
//! This crate defines the `RowSink` and `Destination` traits that abstract
//! over the destination store. `postgresql-sink` implements them for
//! PostgreSQL; [`MemoryDestination`] implements them in-process.
//!
//! The traits use sync-core types (`Dataset`, `RowBatch`) so the exporter
//! is never coupled to a specific database client.

mod memory;
mod traits;

pub use memory::MemoryDestination;
pub use traits::{Destination, RowSink};
