// model = "claude-opus-4-5"
// created = "2026-01-30"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Operations exchanged between replicas, and the log that retains them.
//!
//! An operation is everything one replica committed in one transaction:
//! a list of `(range, new_text)` edits expressed against the document as
//! it looked at `base_version`. Edits are sorted by position and do not
//! overlap, so every range refers to the same base text, not to the text
//! produced by earlier edits of the same operation.
//!
//! Operations are immutable once created. They are stamped with the
//! author's Lamport time, which together with the replica id makes a
//! globally unique `OpId`.

use std::ops::Range;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::primitives::{Global, MAX_TIMESTAMP, OpId, ReplicaId};
use crate::error::{Error, Result};

/// Replace `range` of the base text with `new_text`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpEdit {
    pub range: Range<usize>,
    pub new_text: String,
}

impl OpEdit {
    pub fn new(range: Range<usize>, new_text: impl Into<String>) -> OpEdit {
        return OpEdit {
            range,
            new_text: new_text.into(),
        };
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.range.is_empty() && self.new_text.is_empty();
    }
}

/// A committed transaction as seen by the sync layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub replica_id: ReplicaId,
    pub timestamp: u32,
    pub edits: Vec<OpEdit>,
    /// The version of the document the edit ranges refer to.
    pub base_version: Global,
}

impl Operation {
    pub fn new(replica_id: ReplicaId, timestamp: u32, edits: Vec<OpEdit>, base_version: Global) -> Operation {
        return Operation {
            replica_id,
            timestamp,
            edits,
            base_version,
        };
    }

    #[inline]
    pub fn id(&self) -> OpId {
        return OpId::new(self.replica_id, self.timestamp);
    }

    /// An operation that changes nothing.
    pub fn is_noop(&self) -> bool {
        return self.edits.iter().all(OpEdit::is_empty);
    }

    /// The version after integrating this operation.
    pub fn version(&self) -> Global {
        let mut version = self.base_version.clone();
        version.observe(self.replica_id, self.timestamp);
        return version;
    }

    /// Check the structural rules every operation must satisfy: a nonzero
    /// timestamp within `MAX_TIMESTAMP` that the base version has not
    /// already covered, and edits that
    /// are non-empty, well-formed, sorted and non-overlapping. Two
    /// insertions at the same position are rejected since their relative
    /// order would be ambiguous.
    pub fn validate(&self) -> Result<()> {
        if self.timestamp == 0 {
            return Err(Error::InvalidOperation("timestamp 0 is reserved".into()));
        }
        if self.timestamp > MAX_TIMESTAMP {
            return Err(Error::InvalidOperation(format!(
                "timestamp {} exceeds the maximum of {MAX_TIMESTAMP}",
                self.timestamp
            )));
        }
        if self.base_version.observed(self.replica_id, self.timestamp) {
            return Err(Error::InvalidOperation(format!(
                "operation {}@{} is covered by its own base version",
                self.replica_id, self.timestamp
            )));
        }
        let mut previous: Option<&OpEdit> = None;
        for edit in &self.edits {
            if edit.range.start > edit.range.end {
                return Err(Error::InvalidOperation(format!(
                    "reversed range {}..{}",
                    edit.range.start, edit.range.end
                )));
            }
            if edit.is_empty() {
                return Err(Error::InvalidOperation("empty edit".into()));
            }
            if let Some(previous) = previous {
                let overlaps = edit.range.start < previous.range.end;
                let same_point = edit.range.start == previous.range.end
                    && edit.range.is_empty()
                    && previous.range.is_empty();
                if overlaps || same_point {
                    return Err(Error::InvalidOperation(format!(
                        "edit {}..{} is out of order after {}..{}",
                        edit.range.start, edit.range.end, previous.range.start, previous.range.end
                    )));
                }
            }
            previous = Some(edit);
        }
        return Ok(());
    }
}

/// Operations integrated by a replica, in integration order.
///
/// Integration order is always a causal order, so any suffix of the log
/// can be replayed by a peer that has everything before it.
#[derive(Clone, Debug, Default)]
pub struct OpLog {
    ops: Vec<Operation>,
    /// Last frontier each peer acknowledged.
    peers: FxHashMap<ReplicaId, Global>,
}

impl OpLog {
    pub fn new() -> OpLog {
        return OpLog {
            ops: Vec::new(),
            peers: FxHashMap::default(),
        };
    }

    pub fn push(&mut self, op: Operation) {
        self.ops.push(op);
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.ops.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.ops.is_empty();
    }

    pub fn ops(&self) -> &[Operation] {
        return &self.ops;
    }

    /// Operations a replica at `version` has not integrated, in causal order.
    pub fn since(&self, version: &Global) -> Vec<Operation> {
        return self
            .ops
            .iter()
            .filter(|op| !op.id().observed_by(version))
            .cloned()
            .collect();
    }

    /// Drop every operation `version` has not integrated. Returns how many
    /// were dropped.
    pub fn discard_unobserved(&mut self, version: &Global) -> usize {
        let before = self.ops.len();
        self.ops.retain(|op| op.id().observed_by(version));
        return before - self.ops.len();
    }

    /// The frontier every known peer has reached, if any peer is known.
    pub fn stable_version(&self) -> Option<Global> {
        let mut common: Option<Global> = None;
        for frontier in self.peers.values() {
            match &mut common {
                Some(common) => common.meet(frontier),
                None => common = Some(frontier.clone()),
            }
        }
        return common;
    }

    /// Record the frontier `replica` has reached and drop every operation
    /// that all known peers have integrated. Returns how many were dropped.
    pub fn acknowledge(&mut self, replica: ReplicaId, version: &Global) -> usize {
        let frontier = self.peers.entry(replica).or_default();
        frontier.join(version);

        let Some(common) = self.stable_version() else {
            return 0;
        };

        let before = self.ops.len();
        self.ops.retain(|op| !op.id().observed_by(&common));
        let dropped = before - self.ops.len();
        if dropped > 0 {
            trace!(dropped, retained = self.ops.len(), "collected acknowledged operations");
        }
        return dropped;
    }

    /// The frontier `replica` last acknowledged, if any.
    pub fn peer_version(&self, replica: ReplicaId) -> Option<&Global> {
        return self.peers.get(&replica);
    }
}
