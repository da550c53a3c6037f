// model = "claude-opus-4-5"
// created = 2026-02-01
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Clock primitives for tracking causality and ordering.
//!
//! # Lamport Clock
//!
//! A monotonic counter stamped on every operation. A replica ticks before
//! stamping a local operation and observes the stamp of every remote one,
//! so a new operation always sorts after everything its author had seen.
//!
//! Timestamps travel as signed 32-bit integers, so a clock stops at
//! `MAX_TIMESTAMP` rather than wrapping.
//!
//! Complexity:
//! - tick: O(1)
//! - observe: O(1)
//!
//! # Version Vector
//!
//! `Global` maps each replica to the highest Lamport timestamp integrated
//! from it. An operation is causally ready once the local vector dominates
//! the operation's base version.
//!
//! Complexity:
//! - observe/observed/get: O(1)
//! - join/meet/dominates: O(n) where n is number of replicas

use std::cmp::Ordering;
use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Identifies one replica of a document.
pub type ReplicaId = u32;

/// The largest Lamport timestamp an operation may carry.
pub const MAX_TIMESTAMP: u32 = i32::MAX as u32;

/// A Lamport clock for ordering operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LamportClock {
    time: u32,
}

impl LamportClock {
    /// Create a new clock starting at 0.
    pub fn new() -> LamportClock {
        return LamportClock { time: 0 };
    }

    /// Create a clock with a specific starting time.
    pub fn with_time(time: u32) -> LamportClock {
        return LamportClock { time };
    }

    #[inline]
    pub fn time(&self) -> u32 {
        return self.time;
    }

    /// The time the next `tick` would return, or `None` once the clock
    /// has reached `MAX_TIMESTAMP`.
    #[inline]
    pub fn next(&self) -> Option<u32> {
        return self.time.checked_add(1).filter(|time| *time <= MAX_TIMESTAMP);
    }

    /// Increment the clock for a local operation and return the new time.
    #[inline]
    pub fn tick(&mut self) -> Option<u32> {
        let time = self.next()?;
        self.time = time;
        return Some(time);
    }

    /// Account for a timestamp seen on a remote operation. The next `tick`
    /// will be strictly greater than it.
    #[inline]
    pub fn observe(&mut self, remote_time: u32) {
        self.time = self.time.max(remote_time);
    }
}

impl PartialOrd for LamportClock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for LamportClock {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.time.cmp(&other.time);
    }
}

/// A version vector: the causal frontier of a replica.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Global {
    entries: FxHashMap<ReplicaId, u32>,
}

impl Global {
    /// Create an empty vector, which has observed nothing.
    pub fn new() -> Global {
        return Global {
            entries: FxHashMap::default(),
        };
    }

    /// Highest timestamp observed from `replica`.
    #[inline]
    pub fn get(&self, replica: ReplicaId) -> u32 {
        return self.entries.get(&replica).copied().unwrap_or(0);
    }

    /// Record that `replica`'s operation at `timestamp` was integrated.
    pub fn observe(&mut self, replica: ReplicaId, timestamp: u32) {
        if timestamp == 0 {
            return;
        }
        let entry = self.entries.entry(replica).or_insert(0);
        *entry = (*entry).max(timestamp);
    }

    /// Whether `replica`'s operation at `timestamp` is covered by this vector.
    #[inline]
    pub fn observed(&self, replica: ReplicaId, timestamp: u32) -> bool {
        return self.get(replica) >= timestamp;
    }

    /// Pointwise maximum.
    pub fn join(&mut self, other: &Global) {
        for (&replica, &timestamp) in &other.entries {
            self.observe(replica, timestamp);
        }
    }

    /// Pointwise minimum. Replicas missing from either side drop out.
    pub fn meet(&mut self, other: &Global) {
        self.entries.retain(|replica, timestamp| {
            *timestamp = (*timestamp).min(other.get(*replica));
            return *timestamp > 0;
        });
    }

    /// Whether every entry of `other` is covered by this vector.
    pub fn dominates(&self, other: &Global) -> bool {
        return other
            .entries
            .iter()
            .all(|(&replica, &timestamp)| self.observed(replica, timestamp));
    }

    /// Whether neither vector dominates the other.
    pub fn concurrent_with(&self, other: &Global) -> bool {
        return !self.dominates(other) && !other.dominates(self);
    }

    /// Entries in ascending replica order.
    pub fn iter(&self) -> impl Iterator<Item = (ReplicaId, u32)> + '_ {
        let mut entries: Vec<(ReplicaId, u32)> = self
            .entries
            .iter()
            .map(|(&replica, &timestamp)| (replica, timestamp))
            .collect();
        entries.sort_unstable();
        return entries.into_iter();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }
}

impl PartialEq for Global {
    fn eq(&self, other: &Self) -> bool {
        return self.dominates(other) && other.dominates(self);
    }
}

impl Eq for Global {}

impl fmt::Debug for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_map().entries(self.iter()).finish();
    }
}

impl FromIterator<(ReplicaId, u32)> for Global {
    fn from_iter<I: IntoIterator<Item = (ReplicaId, u32)>>(iter: I) -> Self {
        let mut global = Global::new();
        for (replica, timestamp) in iter {
            global.observe(replica, timestamp);
        }
        return global;
    }
}
