// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Error type shared by every layer of the engine.
//!
//! None of these errors is fatal to the process. Range and encoding errors
//! are raised locally and never cross the network; causality gaps are
//! resolved by a full resync; an exhausted history is a no-op.

use thiserror::Error;

use crate::buffer::anchor::AnchorId;
use crate::buffer::history::{BranchId, CheckpointId};
use crate::ot::primitives::clock::{Global, ReplicaId};

/// Errors produced by the rope, buffer, history and sync engine.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// An offset or range lies outside the current text.
    #[error("range {start}..{end} is outside of 0..{len}")]
    OutOfRange { start: usize, end: usize, len: usize },

    /// A row/column pair that does not address any position in the text.
    #[error("point {row}:{column} is outside of the text")]
    InvalidPoint { row: u32, column: u32 },

    /// A caller-supplied offset falls inside a multi-byte UTF-8 sequence.
    #[error("offset {offset} is not on a UTF-8 character boundary")]
    Encoding { offset: usize },

    /// The text backing an anchor was deleted.
    #[error("anchor {0:?} was invalidated by a deletion")]
    AnchorInvalidated(AnchorId),

    /// An anchor was handed to a buffer other than the one that created it.
    #[error("anchor {0:?} belongs to another buffer")]
    ForeignAnchor(AnchorId),

    /// A remote operation depends on operations this replica has not seen.
    #[error("operation {replica_id}@{timestamp} depends on unseen operations (local {local:?}, required {required:?})")]
    CausalityGap {
        replica_id: ReplicaId,
        timestamp: u32,
        local: Global,
        required: Global,
    },

    /// Undo or redo was requested with nothing on the stack.
    #[error("nothing to {0}")]
    HistoryExhausted(&'static str),

    #[error("unknown checkpoint {0:?}")]
    UnknownCheckpoint(CheckpointId),

    #[error("unknown history branch {0:?}")]
    UnknownBranch(BranchId),

    /// An operation is malformed, or was requested in a state that forbids it.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("wire format error: {0}")]
    Wire(String),

    #[error("record addressed to buffer {got}, expected {expected}")]
    WrongBuffer { expected: u64, got: u64 },

    #[error("record from epoch {got}, buffer is at epoch {current}")]
    StaleEpoch { current: i32, got: i32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error reports an operation that was skipped without
    /// touching the buffer.
    pub fn is_noop(&self) -> bool {
        return matches!(self, Error::HistoryExhausted(_));
    }

    pub(crate) fn out_of_range(range: &std::ops::Range<usize>, len: usize) -> Error {
        return Error::OutOfRange {
            start: range.start,
            end: range.end,
            len,
        };
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        return Error::Wire(err.to_string());
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        return Error::Config(err.to_string());
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
