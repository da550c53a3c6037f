// model = "claude-opus-4-5"
// created = "2026-02-04"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Undo and redo by inverse replay.
//!
//! History never rewinds the text to a saved state. Undoing a transaction
//! computes its inverse, re-expresses that inverse against every patch
//! committed since (remote edits included), and commits the result as a
//! new transaction. Other replicas see an undo as an ordinary edit.
//!
//! # Patch log
//!
//! Every commit on the current branch appends its patch to the branch's
//! log. A transaction remembers which log entries it produced, so its
//! inverse can be rebased through everything after them. The log is
//! trimmed up to the oldest transaction still on either stack.
//!
//! An undo or redo applied while nothing else happened after its step is
//! the exact inverse of that step. Its log entry is marked as closing the
//! run it reverses, and rebasing skips closed runs, so undoing several
//! steps in a row brings back exactly the text they replaced.
//!
//! # Branches
//!
//! `branch` forks the undo stack: the new branch shares every entry so far
//! and continues on its own. A branch that is switched away from keeps the
//! text it had. While it is parked it collects every change to the text,
//! and switching back reverses only the local ones, rebased through the
//! remote ones, as one transaction. Remote edits integrated meanwhile
//! survive the switch and enter the branch's patch log, so its positions
//! stay valid.
//!
//! # Lost steps
//!
//! Each step remembers the Lamport time of the last operation it
//! committed. When a resync drops local operations the peer never saw,
//! `discard_unobserved` forgets the steps that produced them.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::anchor::{Displaced, merge_displaced};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ot::patch::{Edit, Patch};
use crate::rope::{Chunking, Rope};
use crate::tree::Bias;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckpointId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchId(u64);

/// What the buffer is doing with its history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HistoryState {
    #[default]
    Idle,
    Transacting,
    Undoing,
    Redoing,
}

/// One undo or redo step: the patch that was applied, which the step
/// reverses.
#[derive(Clone, Debug)]
pub struct Transaction {
    id: TransactionId,
    start: Instant,
    end: Instant,
    patch: Arc<Patch>,
    /// Log entries this step produced.
    log_range: Range<usize>,
    /// Anchors the step moved or invalidated, at their prior offsets.
    displaced: Displaced,
    /// Set once nothing may be grouped into this step.
    finalized: bool,
    /// Lamport time of the newest operation the step committed.
    stamp: u32,
}

impl Transaction {
    #[inline]
    pub fn id(&self) -> TransactionId {
        return self.id;
    }

    #[inline]
    pub fn start(&self) -> Instant {
        return self.start;
    }

    #[inline]
    pub fn end(&self) -> Instant {
        return self.end;
    }

    #[inline]
    pub fn patch(&self) -> &Patch {
        return &self.patch;
    }

    #[inline]
    pub fn stamp(&self) -> u32 {
        return self.stamp;
    }
}

#[derive(Clone, Debug)]
struct LogEntry {
    patch: Arc<Patch>,
    /// Set when this patch exactly undoes every entry from the given index
    /// up to itself.
    closes: Option<usize>,
}

#[derive(Clone, Debug, Default)]
struct PatchLog {
    entries: VecDeque<LogEntry>,
    /// Absolute index of `entries[0]`.
    offset: usize,
}

impl PatchLog {
    fn push(&mut self, patch: Arc<Patch>, closes: Option<usize>) -> usize {
        self.entries.push_back(LogEntry { patch, closes });
        return self.end() - 1;
    }

    #[inline]
    fn end(&self) -> usize {
        return self.offset + self.entries.len();
    }

    /// Patches in `from..to` that still change the text. A run closed by
    /// an exact inverse inside the range cancels out and is skipped.
    fn effective(&self, from: usize, to: usize) -> Vec<&Patch> {
        let from = from.max(self.offset);
        let mut kept: Vec<(usize, &Patch)> = Vec::new();
        for index in from..to.min(self.end()) {
            let entry = &self.entries[index - self.offset];
            match entry.closes {
                Some(start) if start >= from => {
                    while kept.last().is_some_and(|(kept_index, _)| *kept_index >= start) {
                        kept.pop();
                    }
                }
                _ if entry.patch.is_empty() => {}
                _ => kept.push((index, &*entry.patch)),
            }
        }
        return kept.into_iter().map(|(_, patch)| patch).collect();
    }

    #[inline]
    fn is_quiet(&self, from: usize, to: usize) -> bool {
        return self.effective(from, to).is_empty();
    }

    fn trim_before(&mut self, index: usize) {
        while self.offset < index && self.entries.pop_front().is_some() {
            self.offset += 1;
        }
    }
}

/// Consecutive changes of one kind made while a branch was parked.
#[derive(Clone, Debug)]
struct Diverged {
    patch: Arc<Patch>,
    remote: bool,
}

#[derive(Clone, Debug, Default)]
struct Branch {
    undo: Vec<Transaction>,
    redo: Vec<Transaction>,
    log: PatchLog,
    /// The text when this branch was parked.
    head: Option<Rope>,
    /// Every change to the text since it was parked, oldest first.
    since_parked: Vec<Diverged>,
}

impl Branch {
    fn diverge(&mut self, patch: &Arc<Patch>, remote: bool) {
        if patch.is_empty() {
            return;
        }
        if let Some(last) = self.since_parked.last_mut() {
            if last.remote == remote {
                last.patch = Arc::new(last.patch.compose(patch));
                return;
            }
        }
        self.since_parked.push(Diverged {
            patch: patch.clone(),
            remote,
        });
    }

    /// The patch taking `rope` back to this branch's text: every local
    /// change since it was parked is reversed, newest first, and rebased
    /// through what came after it.
    fn unwind(&self, rope: &Rope) -> Result<Patch> {
        let mut scratch = rope.clone();
        let mut combined = Patch::empty();
        for (index, run) in self.since_parked.iter().enumerate().rev() {
            if run.remote {
                continue;
            }
            let mut edits: Vec<(Range<usize>, Arc<str>)> = run
                .patch
                .edits()
                .iter()
                .map(|edit| (edit.new.clone(), edit.old_text.clone()))
                .collect();
            for later in &self.since_parked[index + 1..] {
                edits = later.patch.rebase_edits(edits);
            }
            edits = combined.rebase_edits(edits);
            let realized = realize(edits, &scratch)?;
            realized.apply(&mut scratch, Chunking::default())?;
            combined = combined.compose(&realized);
        }
        return Ok(combined);
    }

    /// Drop steps that committed operations newer than `observed`.
    fn discard_unobserved(&mut self, observed: u32) -> usize {
        let before = self.undo.len() + self.redo.len();
        self.undo.retain(|step| step.stamp <= observed);
        self.redo.retain(|step| step.stamp <= observed);
        self.trim();
        return before - self.undo.len() - self.redo.len();
    }

    fn trim(&mut self) {
        let oldest = [self.undo.first(), self.redo.first()]
            .into_iter()
            .flatten()
            .map(|step| step.log_range.start)
            .min()
            .unwrap_or(self.log.end());
        self.log.trim_before(oldest);
    }

    /// Whether `steps` (oldest first) were committed back to back with
    /// nothing after them that still has an effect.
    fn is_contiguous(&self, steps: &[Transaction]) -> bool {
        let Some(last) = steps.last() else {
            return false;
        };
        return steps
            .windows(2)
            .all(|pair| self.log.is_quiet(pair[0].log_range.end, pair[1].log_range.start))
            && self.log.is_quiet(last.log_range.end, self.log.end());
    }

    /// The patch that reverses `steps` (oldest first), against `rope`.
    fn inverse_of(&self, steps: &[Transaction], rope: &Rope) -> Result<Patch> {
        if steps.is_empty() {
            return Ok(Patch::empty());
        }

        if self.is_contiguous(steps) {
            let mut composed = Patch::empty();
            for step in steps {
                composed = composed.compose(&step.patch);
            }
            return Ok(composed.invert());
        }

        let mut scratch = rope.clone();
        let mut combined = Patch::empty();
        for step in steps.iter().rev() {
            let mut edits: Vec<(Range<usize>, Arc<str>)> = step
                .patch
                .edits()
                .iter()
                .map(|edit| (edit.new.clone(), edit.old_text.clone()))
                .collect();
            for later in self.log.effective(step.log_range.end, self.log.end()) {
                edits = later.rebase_edits(edits);
            }
            edits = combined.rebase_edits(edits);
            let realized = realize(edits, &scratch)?;
            realized.apply(&mut scratch, Chunking::default())?;
            combined = combined.compose(&realized);
        }
        return Ok(combined);
    }
}

/// Turn `(range, text)` replacements against `rope` into a patch, skipping
/// replacements that would not change anything.
fn realize(edits: Vec<(Range<usize>, Arc<str>)>, rope: &Rope) -> Result<Patch> {
    let mut delta = 0isize;
    let mut realized = Vec::with_capacity(edits.len());
    for (range, text) in edits {
        let old_text = rope.text_for_range(range.clone())?;
        if old_text == *text {
            continue;
        }
        let new_start = range.start.wrapping_add_signed(delta);
        delta += text.len() as isize - old_text.len() as isize;
        realized.push(Edit::new(range.start, new_start, &old_text, &text));
    }
    return Ok(Patch::new(realized));
}

#[derive(Clone, Copy, Debug)]
struct Checkpoint {
    branch: BranchId,
    /// The newest step at the checkpoint.
    top: Option<TransactionId>,
}

/// Undo stacks, branches and checkpoints of one buffer.
///
/// History plans patches and records what was applied; the buffer applies
/// them. Each `plan_*` call is paired with the matching `commit_*` once the
/// planned patch has been committed.
#[derive(Debug)]
pub struct History {
    current_id: BranchId,
    current: Branch,
    parked: FxHashMap<BranchId, Branch>,
    checkpoints: FxHashMap<CheckpointId, Checkpoint>,
    next_id: u64,
    state: HistoryState,
    group_interval: Duration,
    limit: usize,
}

impl History {
    pub fn new(config: &Config) -> History {
        return History {
            current_id: BranchId(0),
            current: Branch::default(),
            parked: FxHashMap::default(),
            checkpoints: FxHashMap::default(),
            next_id: 1,
            state: HistoryState::Idle,
            group_interval: config.group_interval(),
            limit: config.history_limit.max(1),
        };
    }

    #[inline]
    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        return id;
    }

    #[inline]
    pub fn state(&self) -> HistoryState {
        return self.state;
    }

    #[inline]
    pub(crate) fn set_state(&mut self, state: HistoryState) {
        self.state = state;
    }

    #[inline]
    pub fn current_branch(&self) -> BranchId {
        return self.current_id;
    }

    #[inline]
    pub fn undo_len(&self) -> usize {
        return self.current.undo.len();
    }

    #[inline]
    pub fn redo_len(&self) -> usize {
        return self.current.redo.len();
    }

    pub fn last_transaction(&self) -> Option<&Transaction> {
        return self.current.undo.last();
    }

    // --- recording ---

    /// Note a change to the text on every parked branch.
    fn diverge_parked(&mut self, patch: &Arc<Patch>, remote: bool) {
        for branch in self.parked.values_mut() {
            branch.diverge(patch, remote);
        }
    }

    /// Record a local transaction whose newest operation was stamped at
    /// `stamp`. It joins the previous step when that step is still open,
    /// ended less than `group_interval` before `start`, and nothing was
    /// committed in between.
    pub(crate) fn record_local(
        &mut self,
        patch: Patch,
        displaced: Displaced,
        start: Instant,
        end: Instant,
        stamp: u32,
    ) -> TransactionId {
        let patch = Arc::new(patch);
        let index = self.current.log.push(patch.clone(), None);
        self.current.redo.clear();
        self.diverge_parked(&patch, false);

        let group_interval = self.group_interval;
        if let Some(top) = self.current.undo.last_mut() {
            let groupable = !top.finalized
                && !group_interval.is_zero()
                && top.log_range.end == index
                && start.saturating_duration_since(top.end) <= group_interval;
            if groupable {
                // Offsets of newly displaced anchors, back in the text before the group.
                let inverse = top.patch.invert();
                let earlier = displaced
                    .into_iter()
                    .filter_map(|(id, offset)| inverse.map_anchor(offset, Bias::Left).map(|offset| (id, offset)));
                merge_displaced(&mut top.displaced, earlier);
                top.patch = Arc::new(top.patch.compose(&patch));
                top.end = end;
                top.log_range.end = index + 1;
                top.stamp = stamp;
                trace!(transaction = top.id.0, "grouped transaction");
                return top.id;
            }
        }

        let id = TransactionId(self.next_id());
        self.current.undo.push(Transaction {
            id,
            start,
            end,
            patch,
            log_range: index..index + 1,
            displaced,
            finalized: false,
            stamp,
        });
        self.prune();
        return id;
    }

    /// Record a patch that did not come from local editing, so later undos
    /// are rebased through it.
    pub(crate) fn record_remote(&mut self, patch: Patch) {
        if patch.is_empty() {
            return;
        }
        let patch = Arc::new(patch);
        self.diverge_parked(&patch, true);
        self.current.log.push(patch, None);
        self.current.trim();
    }

    /// Forget every step, on any branch, that committed an operation this
    /// replica stamped after `observed`. Returns how many were dropped.
    pub(crate) fn discard_unobserved(&mut self, observed: u32) -> usize {
        let mut dropped = self.current.discard_unobserved(observed);
        for branch in self.parked.values_mut() {
            dropped += branch.discard_unobserved(observed);
        }
        if dropped > 0 {
            debug!(dropped, observed, "discarded history of lost operations");
        }
        return dropped;
    }

    /// Stop grouping later transactions into the newest step.
    pub fn finalize_last_transaction(&mut self) -> Option<TransactionId> {
        let top = self.current.undo.last_mut()?;
        top.finalized = true;
        return Some(top.id);
    }

    fn prune(&mut self) {
        let overflow = self.current.undo.len().saturating_sub(self.limit);
        if overflow > 0 {
            self.current.undo.drain(..overflow);
            trace!(pruned = overflow, limit = self.limit, "pruned history");
        }
        self.current.trim();
    }

    // --- undo / redo ---

    pub(crate) fn plan_undo(&self, rope: &Rope) -> Result<Patch> {
        let Some(top) = self.current.undo.last() else {
            return Err(Error::HistoryExhausted("undo"));
        };
        return self.current.inverse_of(std::slice::from_ref(top), rope);
    }

    pub(crate) fn plan_redo(&self, rope: &Rope) -> Result<Patch> {
        let Some(top) = self.current.redo.last() else {
            return Err(Error::HistoryExhausted("redo"));
        };
        return self.current.inverse_of(std::slice::from_ref(top), rope);
    }

    /// Move the newest undo step to the redo stack, now that its inverse
    /// `applied` was committed. Returns the anchors to put back, which is
    /// possible only if nothing was committed after the step.
    pub(crate) fn commit_undo(&mut self, applied: Patch, displaced: Displaced, now: Instant, stamp: u32) -> Displaced {
        let Some(step) = self.current.undo.pop() else {
            return Vec::new();
        };
        let restore = self.push_inverse(step, applied, displaced, now, stamp, false);
        self.current.trim();
        return restore;
    }

    pub(crate) fn commit_redo(&mut self, applied: Patch, displaced: Displaced, now: Instant, stamp: u32) -> Displaced {
        let Some(step) = self.current.redo.pop() else {
            return Vec::new();
        };
        let restore = self.push_inverse(step, applied, displaced, now, stamp, true);
        self.prune();
        return restore;
    }

    fn push_inverse(
        &mut self,
        step: Transaction,
        applied: Patch,
        displaced: Displaced,
        now: Instant,
        stamp: u32,
        onto_undo: bool,
    ) -> Displaced {
        let exact = self.current.is_contiguous(std::slice::from_ref(&step));
        let patch = Arc::new(applied);
        self.diverge_parked(&patch, false);
        let closes = exact.then_some(step.log_range.start);
        let index = self.current.log.push(patch.clone(), closes);
        let inverse = Transaction {
            id: step.id,
            start: now,
            end: now,
            patch,
            log_range: index..index + 1,
            displaced,
            finalized: true,
            stamp,
        };
        if onto_undo {
            self.current.undo.push(inverse);
        } else {
            self.current.redo.push(inverse);
        }
        return if exact { step.displaced } else { Vec::new() };
    }

    // --- checkpoints ---

    /// Mark the current point of the undo stack.
    pub fn checkpoint(&mut self) -> CheckpointId {
        self.finalize_last_transaction();
        let id = CheckpointId(self.next_id());
        let checkpoint = Checkpoint {
            branch: self.current_id,
            top: self.current.undo.last().map(Transaction::id),
        };
        self.checkpoints.insert(id, checkpoint);
        return id;
    }

    /// The patch reverting every step after checkpoint `id`, and how many
    /// steps that is.
    pub(crate) fn plan_revert(&self, id: CheckpointId, rope: &Rope) -> Result<(Patch, usize)> {
        let checkpoint = self.checkpoints.get(&id).ok_or(Error::UnknownCheckpoint(id))?;
        if checkpoint.branch != self.current_id {
            return Err(Error::UnknownCheckpoint(id));
        }
        let position = match checkpoint.top {
            None => 0,
            Some(top) => {
                self.current
                    .undo
                    .iter()
                    .position(|step| step.id == top)
                    .ok_or(Error::UnknownCheckpoint(id))?
                    + 1
            }
        };
        let steps = &self.current.undo[position..];
        return Ok((self.current.inverse_of(steps, rope)?, steps.len()));
    }

    /// Replace the newest `count` undo steps with one redo step holding the
    /// revert. Returns the anchors to put back.
    pub(crate) fn commit_revert(
        &mut self,
        count: usize,
        applied: Patch,
        displaced: Displaced,
        now: Instant,
        stamp: u32,
    ) -> Displaced {
        let count = count.min(self.current.undo.len());
        if count == 0 {
            return Vec::new();
        }
        let keep = self.current.undo.len() - count;
        let reverted: Vec<Transaction> = self.current.undo.drain(keep..).collect();
        let exact = self.current.is_contiguous(&reverted);

        let patch = Arc::new(applied);
        self.diverge_parked(&patch, false);
        let closes = reverted.first().map(|step| step.log_range.start).filter(|_| exact);
        let index = self.current.log.push(patch.clone(), closes);
        let id = TransactionId(self.next_id());
        self.current.redo.push(Transaction {
            id,
            start: now,
            end: now,
            patch,
            log_range: index..index + 1,
            displaced,
            finalized: true,
            stamp,
        });
        self.current.trim();
        debug!(reverted = count, "reverted to checkpoint");

        return match reverted.into_iter().next() {
            Some(oldest) if exact => oldest.displaced,
            _ => Vec::new(),
        };
    }

    // --- branches ---

    /// Fork the current branch and continue on the fork. `head` is the
    /// current text, which the parked branch returns to.
    pub(crate) fn branch(&mut self, head: Rope) -> BranchId {
        self.finalize_last_transaction();
        let id = BranchId(self.next_id());
        let fork = Branch {
            undo: self.current.undo.clone(),
            redo: Vec::new(),
            log: self.current.log.clone(),
            head: None,
            since_parked: Vec::new(),
        };
        let mut parked = std::mem::replace(&mut self.current, fork);
        parked.head = Some(head);
        self.parked.insert(self.current_id, parked);
        debug!(from = self.current_id.0, to = id.0, "forked history branch");
        self.current_id = id;
        return id;
    }

    /// The patch turning `rope` into the text of branch `id`, keeping the
    /// remote edits integrated since it was parked.
    pub(crate) fn plan_switch(&self, id: BranchId, rope: &Rope) -> Result<Patch> {
        if id == self.current_id {
            return Ok(Patch::empty());
        }
        let target = self.parked.get(&id).ok_or(Error::UnknownBranch(id))?;
        let Some(head) = &target.head else {
            return Ok(Patch::empty());
        };
        if target.since_parked.iter().all(|run| !run.remote) {
            return Ok(Patch::diff(&rope.to_string(), &head.to_string()));
        }
        return target.unwind(rope);
    }

    /// Park the current branch at `previous` and make `id` current, now that
    /// `applied` turned `previous` into the target's text.
    pub(crate) fn commit_switch(&mut self, id: BranchId, previous: Rope, applied: Patch) -> Result<()> {
        if id == self.current_id {
            return Ok(());
        }
        let mut target = self.parked.remove(&id).ok_or(Error::UnknownBranch(id))?;
        target.head = None;
        // Remote edits that survived the switch, as one entry the branch's
        // steps rebase through.
        let mut kept = Patch::empty();
        for run in &target.since_parked {
            kept = kept.compose(&run.patch);
        }
        let kept = kept.compose(&applied);
        if !kept.is_empty() {
            target.log.push(Arc::new(kept), None);
            target.trim();
        }
        target.since_parked.clear();

        let applied = Arc::new(applied);
        self.diverge_parked(&applied, false);
        let mut parked = std::mem::replace(&mut self.current, target);
        parked.head = Some(previous);
        parked.since_parked.clear();
        parked.diverge(&applied, false);
        self.parked.insert(self.current_id, parked);
        debug!(from = self.current_id.0, to = id.0, "switched history branch");
        self.current_id = id;
        return Ok(());
    }
}
