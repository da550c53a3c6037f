// model = "claude-opus-4-5"
// created = 2026-02-01
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Shared primitives for the sync layer.
//!
//! ## Clocks
//! - `LamportClock`: monotonic counter stamped on every operation
//! - `Global`: version vector, the causal frontier of a replica
//!
//! ## IDs
//! - `OpId`: operation identifier (lamport, replica)
//! - `InsertionId`: one inserted run within an operation
//! - `CharId`: a byte within an inserted run

pub mod clock;
pub mod id;

pub use clock::{Global, LamportClock, MAX_TIMESTAMP, ReplicaId};
pub use id::{CharId, InsertionId, OpId};
