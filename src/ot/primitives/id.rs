// model = "claude-opus-4-5"
// created = 2026-02-01
// modified = 2026-02-04
// driver = "Isaac Clayton"

//! Identifier types for operations and the text they insert.
//!
//! # Identifier Hierarchy
//!
//! - `OpId`: an operation, (lamport, replica)
//! - `InsertionId`: the `index`th edit of an operation
//! - `CharId`: a byte offset within an insertion's text
//!
//! All three order by their fields in declaration order, so concurrent
//! insertions sort by ascending Lamport timestamp with the replica id as
//! tie-breaker.

use serde::{Deserialize, Serialize};

use super::clock::{Global, ReplicaId};

/// An operation identifier. Unique because a replica never reuses a
/// Lamport timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OpId {
    pub timestamp: u32,
    pub replica_id: ReplicaId,
}

impl OpId {
    pub fn new(replica_id: ReplicaId, timestamp: u32) -> OpId {
        return OpId {
            timestamp,
            replica_id,
        };
    }

    /// Whether a replica at version `version` has integrated this operation.
    #[inline]
    pub fn observed_by(&self, version: &Global) -> bool {
        return version.observed(self.replica_id, self.timestamp);
    }
}

/// Identifies the text inserted by one edit of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InsertionId {
    pub op: OpId,
    pub index: u32,
}

impl InsertionId {
    /// The text a document was created with. Every version has observed it.
    pub const BASE: InsertionId = InsertionId {
        op: OpId {
            timestamp: 0,
            replica_id: 0,
        },
        index: 0,
    };

    pub fn new(op: OpId, index: u32) -> InsertionId {
        return InsertionId { op, index };
    }

    #[inline]
    pub fn is_base(&self) -> bool {
        return *self == InsertionId::BASE;
    }
}

/// Identifies one byte of inserted text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharId {
    pub insertion: InsertionId,
    pub offset: usize,
}

impl CharId {
    pub fn new(insertion: InsertionId, offset: usize) -> CharId {
        return CharId { insertion, offset };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_id_orders_by_lamport_then_replica() {
        let a = OpId::new(9, 1);
        let b = OpId::new(1, 2);
        let c = OpId::new(2, 2);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn insertion_ids_order_within_operation() {
        let op = OpId::new(1, 5);
        assert!(InsertionId::new(op, 0) < InsertionId::new(op, 1));
        assert!(InsertionId::BASE < InsertionId::new(op, 0));
        assert!(InsertionId::BASE.is_base());
    }

    #[test]
    fn base_is_observed_by_every_version() {
        assert!(InsertionId::BASE.op.observed_by(&Global::new()));
        let op = OpId::new(3, 4);
        assert!(!op.observed_by(&Global::new()));
        let version: Global = [(3, 4)].into_iter().collect();
        assert!(op.observed_by(&version));
    }
}
