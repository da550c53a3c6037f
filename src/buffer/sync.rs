// model = "claude-opus-4-5"
// created = "2026-02-05"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Applying remote operations and keeping peers in step.
//!
//! A remote operation is integrated only once everything it depends on has
//! been: its base version must be dominated by ours. The fragment union
//! then resolves it against exactly the local operations its author had not
//! seen, and the resulting change is applied as one transaction that
//! bypasses undo history.
//!
//! Operations already covered by our version are ignored, so delivering
//! the same operation twice is harmless. A replica that falls too far
//! behind, or misses an operation for good, recovers with a full
//! `ReplicaState` transfer instead.
//!
//! Acknowledgments drive garbage collection. Once every known peer has
//! integrated an operation it leaves the log, and deletions it made are
//! settled in the fragment union. This assumes a peer's acknowledgment
//! reaches us after every operation it sent before it.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::Buffer;
use super::events_for;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ot::fragment::{Fragment, FragmentUnion};
use crate::ot::op::{OpEdit, Operation};
use crate::ot::patch::{Edit, Patch};
use crate::ot::primitives::{Global, ReplicaId};
use crate::ot::wire::WireRecord;
use crate::rope::Rope;

/// What happened to a remote operation that was accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// The operation changed the text.
    Applied,
    /// The operation was integrated before.
    AlreadySeen,
    /// The operation had no edits. Its timestamp was still recorded.
    Empty,
}

/// Everything a replica needs to join or rejoin a document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaState {
    pub text: String,
    pub version: Global,
    pub fragments: Vec<Fragment>,
}

impl ReplicaState {
    pub fn encode(&self) -> Result<Vec<u8>> {
        return Ok(bincode::serialize(self)?);
    }

    pub fn decode(bytes: &[u8]) -> Result<ReplicaState> {
        return Ok(bincode::deserialize(bytes)?);
    }

    fn into_parts(self) -> Result<(String, Global, FragmentUnion)> {
        let union = FragmentUnion::from_fragments(self.fragments);
        if union.visible_len() != self.text.len() {
            return Err(Error::InvalidOperation(format!(
                "replica state holds {} bytes of text but its fragments describe {}",
                self.text.len(),
                union.visible_len()
            )));
        }
        return Ok((self.text, self.version, union));
    }
}

fn latest_timestamp(version: &Global) -> u32 {
    return version.iter().map(|(_, timestamp)| timestamp).max().unwrap_or(0);
}

impl Buffer {
    /// Apply edits made by `replica_id` on top of `version`.
    pub fn apply_remote_edit(
        &mut self,
        replica_id: ReplicaId,
        version: Global,
        edits: Vec<OpEdit>,
        timestamp: u32,
    ) -> Result<RemoteOutcome> {
        let op = Operation::new(replica_id, timestamp, edits, version);
        return self.apply_remote(&op);
    }

    /// Integrate an operation from another replica.
    pub fn apply_remote(&mut self, op: &Operation) -> Result<RemoteOutcome> {
        self.ensure_idle("apply a remote operation")?;
        if op.id().observed_by(&self.version) {
            trace!(replica = op.replica_id, timestamp = op.timestamp, "ignored duplicate operation");
            return Ok(RemoteOutcome::AlreadySeen);
        }
        if let Err(err) = op.validate() {
            warn!(replica = op.replica_id, timestamp = op.timestamp, %err, "rejected remote operation");
            return Err(err);
        }
        if !self.version.dominates(&op.base_version) {
            warn!(
                replica = op.replica_id,
                timestamp = op.timestamp,
                local = ?self.version,
                required = ?op.base_version,
                "causality gap"
            );
            return Err(Error::CausalityGap {
                replica_id: op.replica_id,
                timestamp: op.timestamp,
                local: self.version.clone(),
                required: op.base_version.clone(),
            });
        }
        if op.is_noop() {
            self.version.observe(op.replica_id, op.timestamp);
            self.clock.observe(op.timestamp);
            self.op_log.push(op.clone());
            debug!(replica = op.replica_id, timestamp = op.timestamp, "recorded empty remote operation");
            return Ok(RemoteOutcome::Empty);
        }

        let integrated = self.union.integrate(op)?;
        let mut edits = Vec::with_capacity(integrated.edits.len());
        let mut delta = 0isize;
        for edit in &integrated.edits {
            let old_text = self.rope.text_for_range(edit.range.clone())?;
            let new_start = edit.range.start.wrapping_add_signed(delta);
            delta += edit.new_text.len() as isize - old_text.len() as isize;
            edits.push(Edit::new(edit.range.start, new_start, &old_text, &edit.new_text));
        }
        let patch = Patch::new(edits);
        let mut rope = self.rope.clone();
        patch.apply(&mut rope, self.chunking)?;

        self.rope = rope;
        self.union = integrated.union;
        self.version.observe(op.replica_id, op.timestamp);
        self.clock.observe(op.timestamp);
        self.op_log.push(op.clone());
        self.anchors.update(&patch);
        debug!(
            replica = op.replica_id,
            timestamp = op.timestamp,
            edits = patch.len(),
            "integrated remote operation"
        );
        let events = events_for(&patch);
        self.history.record_remote(patch);
        self.finish_commit(events);
        return Ok(RemoteOutcome::Applied);
    }

    // --- outgoing ---

    /// Drain the operations committed locally since the last call.
    pub fn take_outgoing(&mut self) -> Vec<Operation> {
        return std::mem::take(&mut self.outbox);
    }

    #[inline]
    pub fn buffer_id(&self) -> u64 {
        return self.buffer_id;
    }

    #[inline]
    pub fn epoch(&self) -> i32 {
        return self.epoch;
    }

    /// Set the identity stamped on outgoing records and checked on
    /// incoming ones.
    pub fn set_wire_identity(&mut self, buffer_id: u64, epoch: i32) {
        self.buffer_id = buffer_id;
        self.epoch = epoch;
    }

    /// Drain the outgoing operations as wire records.
    pub fn encode_outgoing(&mut self) -> Result<Vec<WireRecord>> {
        let records = self
            .outbox
            .iter()
            .map(|op| WireRecord::from_operation(self.buffer_id, self.epoch, op))
            .collect::<Result<Vec<_>>>()?;
        self.outbox.clear();
        return Ok(records);
    }

    pub fn receive_record(&mut self, record: &WireRecord) -> Result<RemoteOutcome> {
        if record.buffer_id != self.buffer_id {
            return Err(Error::WrongBuffer {
                expected: self.buffer_id,
                got: record.buffer_id,
            });
        }
        if record.epoch != self.epoch {
            warn!(current = self.epoch, got = record.epoch, "dropped record from another epoch");
            return Err(Error::StaleEpoch {
                current: self.epoch,
                got: record.epoch,
            });
        }
        let op = record.operation()?;
        return self.apply_remote(&op);
    }

    // --- catch-up ---

    /// Retained operations a peer at `version` is missing, in an order it
    /// can apply them.
    pub fn operations_since(&self, version: &Global) -> Vec<Operation> {
        return self.op_log.since(version);
    }

    /// Record that `replica` has integrated everything in `version`, drop
    /// operations every known peer has, and compact the fragments they
    /// deleted. Returns how many operations were dropped.
    pub fn acknowledge(&mut self, replica: ReplicaId, version: &Global) -> usize {
        let dropped = self.op_log.acknowledge(replica, version);
        if dropped == 0 {
            return 0;
        }
        if let Some(stable) = self.op_log.stable_version() {
            let merged = self.union.compact(&stable);
            trace!(
                merged,
                fragments = self.union.fragment_count(),
                hidden = self.union.hidden_len(),
                "compacted fragment union"
            );
        }
        return dropped;
    }

    pub fn retained_operations(&self) -> usize {
        return self.op_log.len();
    }

    // --- full state transfer ---

    pub fn replica_state(&self) -> ReplicaState {
        return ReplicaState {
            text: self.rope.to_string(),
            version: self.version.clone(),
            fragments: self.union.to_fragments(),
        };
    }

    /// Join a document from a peer's state.
    pub fn from_replica_state(replica_id: ReplicaId, state: ReplicaState, config: Config) -> Result<Buffer> {
        let (text, version, union) = state.into_parts()?;
        let mut buffer = Buffer::with_config(replica_id, text, config)?;
        buffer.union = union;
        buffer.clock.observe(latest_timestamp(&version));
        buffer.version = version;
        return Ok(buffer);
    }

    /// Replace the replicated state with a peer's, after a causality gap.
    /// Operations the peer had not seen are lost: they leave the log and the
    /// outbox, and undo steps that produced local ones are forgotten.
    pub fn resync(&mut self, state: ReplicaState) -> Result<()> {
        self.ensure_idle("resync")?;
        let (text, version, union) = state.into_parts()?;

        let lost = self.op_log.discard_unobserved(&version);
        self.outbox.retain(|op| op.id().observed_by(&version));
        let forgotten = self.history.discard_unobserved(version.get(self.replica_id));
        if lost > 0 {
            warn!(
                replica = self.replica_id,
                lost,
                forgotten,
                "resync discards operations the peer has not seen"
            );
        }

        let patch = Patch::diff(&self.rope.to_string(), &text);
        let mut rope = Rope::new();
        rope.push_with(&text, self.chunking);
        self.rope = rope;
        self.union = union;
        self.clock.observe(latest_timestamp(&version));
        self.version = version;
        self.anchors.update(&patch);
        debug!(replica = self.replica_id, len = self.rope.len(), "resynced replica");

        let events = events_for(&patch);
        self.history.record_remote(patch);
        self.finish_commit(events);
        return Ok(());
    }
}
