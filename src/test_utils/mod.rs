//! Test doubles for code built on this crate.
//!
//! Enabled for this crate's own tests and behind the `test-utils` feature.

mod memory;

pub use memory::{MemoryConnector, MemoryStmt, MemoryTx};
