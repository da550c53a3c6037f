// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-02-06"
// driver = "Isaac Clayton"

//! Tandem - A collaborative text buffer built on a rope.
//!
//! Text lives in a persistent B+ tree of chunks (`Rope`) summarized by
//! byte, char, UTF-16 and line counts, so every coordinate conversion is
//! logarithmic. A `Buffer` layers transactions, undo history, anchors and
//! change notifications on top, and keeps a replica of the shared document
//! so concurrent edits from other replicas converge.
//!
//! # Quick Start
//!
//! ```
//! use tandem::Buffer;
//!
//! let mut alice = Buffer::with_replica(1, "");
//! let mut bob = Buffer::with_replica(2, "");
//!
//! alice.insert(0, "foo").unwrap();
//! bob.insert(0, "bar").unwrap();
//!
//! for op in alice.take_outgoing() {
//!     bob.apply_remote(&op).unwrap();
//! }
//! for op in bob.take_outgoing() {
//!     alice.apply_remote(&op).unwrap();
//! }
//!
//! assert_eq!(alice.text(), bob.text());
//! assert_eq!(alice.snapshot().fingerprint(), bob.snapshot().fingerprint());
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod ot;
pub mod rope;
pub mod tree;

pub use buffer::{
    Anchor, AnchorBias, AnchorId, Buffer, ChangeEvent, CheckpointId, BranchId, HistoryState, Metadata,
    RemoteOutcome, ReplicaState, Snapshot, Subscription, TransactionId,
};
pub use config::Config;
pub use error::{Error, Result};
pub use ot::{Edit, Global, OpEdit, Operation, Patch, ReplicaId, WireRecord, transform};
pub use rope::{OffsetUtf16, Point, PointUtf16, Rope, ToOffset};
pub use tree::Bias;
