// model = "claude-opus-4-5"
// created = "2026-02-04"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! The editable document: a rope with anchors, history, change
//! notifications and a replica of the shared collaborative state.
//!
//! # Transactions
//!
//! Every mutation runs inside a transaction. `transact` runs a closure
//! against the buffer; nested calls join the outermost one. Edits apply to
//! the rope immediately, so the closure reads its own writes. When the
//! outermost closure returns `Ok`, the edits are composed into one patch,
//! stamped as one operation, recorded as one undo step, and announced to
//! subscribers. When it returns `Err`, the text and anchors are put back
//! and nothing is committed.
//!
//! # Notifications
//!
//! Subscribers are called synchronously before the committing call
//! returns, once per edit, in order. Each event's range is expressed in
//! the text produced by the events before it. Callbacks only receive the
//! event, so they cannot re-enter the buffer. A callback must not lock a
//! mutex that guards the buffer either: the committing thread holds it, so
//! the callback deadlocks. See `Buffer::subscribe`.
//!
//! ```
//! use tandem::Buffer;
//!
//! let mut buffer = Buffer::from_text("hello");
//! buffer.insert(5, " world").unwrap();
//! buffer.undo().unwrap();
//! assert_eq!(buffer.text(), "hello");
//! ```

pub mod anchor;
pub mod history;
pub mod snapshot;
pub mod sync;

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::debug;

pub use anchor::{Anchor, AnchorBias, AnchorId, AnchorManager};
pub use history::{BranchId, CheckpointId, History, HistoryState, Transaction, TransactionId};
pub use snapshot::Snapshot;
pub use sync::{RemoteOutcome, ReplicaState};

use anchor::Displaced;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::ot::fragment::FragmentUnion;
use crate::ot::op::{OpEdit, OpLog, Operation};
use crate::ot::patch::{Edit, Patch};
use crate::ot::primitives::{Global, LamportClock, ReplicaId};
use crate::rope::{Chunking, Point, Rope, ToOffset};

/// One edit of a commit, as delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    /// The replaced range, in the text left by the previous events of the
    /// same commit.
    pub range: Range<usize>,
    pub new_text: Arc<str>,
    /// The version after the commit.
    pub version: Global,
}

type Callback = Box<dyn FnMut(&ChangeEvent) + Send>;

struct Subscriber {
    active: Arc<AtomicBool>,
    callback: Callback,
}

/// Keeps a subscription alive. Dropping it unsubscribes, also from inside
/// a callback.
#[derive(Debug)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        return self.active.load(Ordering::Acquire);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Where a buffer came from and whether it changed since it was saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub path: Option<PathBuf>,
    pub modified: bool,
    /// Encoding label of the file on disk. The text itself is always UTF-8.
    pub encoding: String,
}

impl Default for Metadata {
    fn default() -> Self {
        return Metadata {
            path: None,
            modified: false,
            encoding: "utf-8".to_string(),
        };
    }
}

/// State of the transaction in progress.
struct Pending {
    patch: Patch,
    events: Vec<(Range<usize>, Arc<str>)>,
    /// Anchors any edit moved or invalidated.
    touched: Vec<AnchorId>,
    rope_before: Rope,
    anchors_before: AnchorManager,
    start: Instant,
}

pub struct Buffer {
    replica_id: ReplicaId,
    buffer_id: u64,
    epoch: i32,
    config: Config,
    chunking: Chunking,
    rope: Rope,
    anchors: AnchorManager,
    history: History,
    clock: LamportClock,
    version: Global,
    union: FragmentUnion,
    op_log: OpLog,
    outbox: Vec<Operation>,
    subscribers: Vec<Subscriber>,
    pending: Option<Pending>,
    depth: usize,
    commits_since_gc: usize,
    metadata: Metadata,
}

impl Buffer {
    pub fn new() -> Buffer {
        return Buffer::from_text(String::new());
    }

    /// A buffer on replica 0.
    pub fn from_text(text: impl Into<String>) -> Buffer {
        return Buffer::with_replica(0, text);
    }

    /// A buffer on `replica_id`. Replicas of one document must start from
    /// the same text.
    pub fn with_replica(replica_id: ReplicaId, text: impl Into<String>) -> Buffer {
        return Buffer::build(replica_id, text.into(), Config::default());
    }

    pub fn with_config(replica_id: ReplicaId, text: impl Into<String>, config: Config) -> Result<Buffer> {
        config.validate()?;
        return Ok(Buffer::build(replica_id, text.into(), config));
    }

    fn build(replica_id: ReplicaId, text: String, config: Config) -> Buffer {
        let chunking = Chunking::from(&config);
        let mut rope = Rope::new();
        rope.push_with(&text, chunking);
        return Buffer {
            replica_id,
            buffer_id: 0,
            epoch: 0,
            chunking,
            union: FragmentUnion::new(rope.len()),
            rope,
            anchors: AnchorManager::new(),
            history: History::new(&config),
            config,
            clock: LamportClock::new(),
            version: Global::new(),
            op_log: OpLog::new(),
            outbox: Vec::new(),
            subscribers: Vec::new(),
            pending: None,
            depth: 0,
            commits_since_gc: 0,
            metadata: Metadata::default(),
        };
    }

    // --- reading ---

    #[inline]
    pub fn replica_id(&self) -> ReplicaId {
        return self.replica_id;
    }

    /// Every operation this replica has integrated.
    #[inline]
    pub fn version(&self) -> &Global {
        return &self.version;
    }

    #[inline]
    pub fn config(&self) -> &Config {
        return &self.config;
    }

    #[inline]
    pub fn rope(&self) -> &Rope {
        return &self.rope;
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.rope.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.rope.is_empty();
    }

    pub fn text(&self) -> String {
        return self.rope.to_string();
    }

    pub fn text_for_range(&self, range: Range<usize>) -> Result<String> {
        return self.rope.text_for_range(range);
    }

    /// An immutable view of the text as of the last commit.
    pub fn snapshot(&self) -> Snapshot {
        let rope = match &self.pending {
            Some(pending) => pending.rope_before.clone(),
            None => self.rope.clone(),
        };
        return Snapshot::new(rope, self.version.clone());
    }

    // --- editing ---

    pub fn insert<T: ToOffset>(&mut self, position: T, text: &str) -> Result<()> {
        return self.transact(|buffer| {
            let offset = position.to_offset(&buffer.rope)?;
            return buffer.edit_in_transaction(offset..offset, text);
        });
    }

    pub fn delete(&mut self, range: Range<usize>) -> Result<()> {
        return self.transact(|buffer| buffer.edit_in_transaction(range, ""));
    }

    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        return self.transact(|buffer| buffer.edit_in_transaction(range, text));
    }

    /// Run `f` as one transaction. See the module docs.
    pub fn transact<R>(&mut self, f: impl FnOnce(&mut Buffer) -> Result<R>) -> Result<R> {
        if self.depth == 0 {
            self.pending = Some(Pending {
                patch: Patch::empty(),
                events: Vec::new(),
                touched: Vec::new(),
                rope_before: self.rope.clone(),
                anchors_before: self.anchors.clone(),
                start: Instant::now(),
            });
            self.history.set_state(HistoryState::Transacting);
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        if self.depth > 0 {
            return result;
        }

        self.history.set_state(HistoryState::Idle);
        let Some(pending) = self.pending.take() else {
            return result;
        };
        let value = match result {
            Ok(value) => value,
            Err(err) => {
                debug!(replica = self.replica_id, %err, "rolled back transaction");
                self.rollback(pending);
                return Err(err);
            }
        };
        self.commit_pending(pending)?;
        return Ok(value);
    }

    fn edit_in_transaction(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        self.rope.check_range(&range)?;
        if range.is_empty() && text.is_empty() {
            return Ok(());
        }
        let old_text = self.rope.text_for_range(range.clone())?;
        let patch = Patch::single(Edit::new(range.start, range.start, &old_text, text));
        self.rope.replace_with(range.clone(), text, self.chunking)?;
        let displaced = self.anchors.update(&patch);
        if let Some(pending) = &mut self.pending {
            for (id, _) in displaced {
                if !pending.touched.contains(&id) {
                    pending.touched.push(id);
                }
            }
            pending.events.push((range, Arc::from(text)));
            pending.patch = pending.patch.compose(&patch);
        }
        return Ok(());
    }

    fn rollback(&mut self, pending: Pending) {
        self.rope = pending.rope_before;
        self.anchors = pending.anchors_before;
    }

    fn commit_pending(&mut self, pending: Pending) -> Result<()> {
        if pending.patch.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.stamp(&pending.patch) {
            self.rollback(pending);
            return Err(err);
        }
        let displaced: Displaced = pending
            .touched
            .iter()
            .filter_map(|id| pending.anchors_before.valid_offset(*id).map(|offset| (*id, offset)))
            .collect();
        let edits = pending.patch.len();
        let id = self
            .history
            .record_local(pending.patch, displaced, pending.start, Instant::now(), self.clock.time());
        debug!(
            replica = self.replica_id,
            timestamp = self.clock.time(),
            transaction = ?id,
            edits,
            "committed transaction"
        );
        self.finish_commit(pending.events);
        return Ok(());
    }

    /// Turn a committed patch into a local operation and integrate it.
    fn stamp(&mut self, patch: &Patch) -> Result<()> {
        let edits = patch
            .edits()
            .iter()
            .map(|edit| OpEdit::new(edit.old.clone(), &*edit.new_text))
            .collect();
        let timestamp = self
            .clock
            .next()
            .ok_or_else(|| Error::InvalidOperation("lamport clock is exhausted".into()))?;
        let op = Operation::new(self.replica_id, timestamp, edits, self.version.clone());
        let integrated = self.union.integrate(&op)?;
        debug_assert_eq!(integrated.edits, op.edits);
        self.clock.tick();
        self.union = integrated.union;
        self.version.observe(op.replica_id, op.timestamp);
        self.op_log.push(op.clone());
        self.outbox.push(op);
        return Ok(());
    }

    /// Commit a patch computed outside a transaction, such as an undo.
    fn apply_patch(&mut self, patch: &Patch) -> Result<Displaced> {
        if patch.is_empty() {
            return Ok(Vec::new());
        }
        let mut rope = self.rope.clone();
        patch.apply(&mut rope, self.chunking)?;
        self.stamp(patch)?;
        self.rope = rope;
        let displaced = self.anchors.update(patch);
        self.finish_commit(events_for(patch));
        return Ok(displaced);
    }

    fn finish_commit(&mut self, events: Vec<(Range<usize>, Arc<str>)>) {
        self.metadata.modified = true;
        self.commits_since_gc += 1;
        if self.commits_since_gc >= self.config.anchor_gc_interval.max(1) {
            self.commits_since_gc = 0;
            self.anchors.gc();
        }
        self.notify(events);
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.depth > 0 {
            return Err(Error::InvalidOperation(format!("cannot {action} inside a transaction")));
        }
        return Ok(());
    }

    // --- notifications ---

    /// Call `callback` with every change committed from now on, until the
    /// returned `Subscription` is dropped.
    ///
    /// Callbacks run while the committing call still holds `&mut self`. A
    /// callback that locks the mutex guarding a shared
    /// `Arc<Mutex<Buffer>>` deadlocks, because the committing thread
    /// already holds that lock. Send the event to a channel instead and
    /// act on it after the edit returns.
    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeEvent) + Send + 'static) -> Subscription {
        let active = Arc::new(AtomicBool::new(true));
        self.subscribers.push(Subscriber {
            active: active.clone(),
            callback: Box::new(callback),
        });
        return Subscription { active };
    }

    fn notify(&mut self, events: Vec<(Range<usize>, Arc<str>)>) {
        self.subscribers
            .retain(|subscriber| subscriber.active.load(Ordering::Acquire));
        if self.subscribers.is_empty() {
            return;
        }
        for (range, new_text) in events {
            let event = ChangeEvent {
                range,
                new_text,
                version: self.version.clone(),
            };
            for subscriber in &mut self.subscribers {
                if subscriber.active.load(Ordering::Acquire) {
                    (subscriber.callback)(&event);
                }
            }
        }
    }

    // --- anchors ---

    pub fn create_anchor<T: ToOffset>(&mut self, position: T, bias: AnchorBias) -> Result<Anchor> {
        let offset = position.to_offset(&self.rope)?;
        return Ok(self.anchors.create(offset, bias));
    }

    pub fn anchor_offset(&self, anchor: &Anchor) -> Result<usize> {
        return self.anchors.offset(anchor);
    }

    pub fn anchor_point(&self, anchor: &Anchor) -> Result<Point> {
        let offset = self.anchors.offset(anchor)?;
        return self.rope.offset_to_point(offset);
    }

    /// Drop anchors whose handles are gone. Also runs every
    /// `anchor_gc_interval` commits.
    pub fn gc_anchors(&mut self) -> usize {
        return self.anchors.gc();
    }

    pub fn anchor_count(&self) -> usize {
        return self.anchors.len();
    }

    // --- history ---

    #[inline]
    pub fn history(&self) -> &History {
        return &self.history;
    }

    pub fn history_state(&self) -> HistoryState {
        return self.history.state();
    }

    /// Reverse the newest undo step as a new transaction.
    pub fn undo(&mut self) -> Result<()> {
        self.ensure_idle("undo")?;
        let patch = self.history.plan_undo(&self.rope)?;
        self.history.set_state(HistoryState::Undoing);
        let result = self.apply_patch(&patch);
        self.history.set_state(HistoryState::Idle);
        let displaced = result?;
        let restore = self
            .history
            .commit_undo(patch, displaced, Instant::now(), self.clock.time());
        self.anchors.restore(&restore, self.rope.len());
        debug!(replica = self.replica_id, "undo");
        return Ok(());
    }

    pub fn redo(&mut self) -> Result<()> {
        self.ensure_idle("redo")?;
        let patch = self.history.plan_redo(&self.rope)?;
        self.history.set_state(HistoryState::Redoing);
        let result = self.apply_patch(&patch);
        self.history.set_state(HistoryState::Idle);
        let displaced = result?;
        let restore = self
            .history
            .commit_redo(patch, displaced, Instant::now(), self.clock.time());
        self.anchors.restore(&restore, self.rope.len());
        debug!(replica = self.replica_id, "redo");
        return Ok(());
    }

    /// Keep the next transaction out of the newest undo step.
    pub fn finalize_last_transaction(&mut self) -> Option<TransactionId> {
        return self.history.finalize_last_transaction();
    }

    pub fn checkpoint(&mut self) -> CheckpointId {
        return self.history.checkpoint();
    }

    /// Undo everything after checkpoint `id` as one transaction.
    pub fn revert_to_checkpoint(&mut self, id: CheckpointId) -> Result<()> {
        self.ensure_idle("revert")?;
        let (patch, count) = self.history.plan_revert(id, &self.rope)?;
        if count == 0 {
            return Ok(());
        }
        self.history.set_state(HistoryState::Undoing);
        let result = self.apply_patch(&patch);
        self.history.set_state(HistoryState::Idle);
        let displaced = result?;
        let restore = self
            .history
            .commit_revert(count, patch, displaced, Instant::now(), self.clock.time());
        self.anchors.restore(&restore, self.rope.len());
        return Ok(());
    }

    /// Fork the history here and continue on the new branch.
    pub fn branch(&mut self) -> Result<BranchId> {
        self.ensure_idle("branch")?;
        return Ok(self.history.branch(self.rope.clone()));
    }

    /// Return to the text and undo stack of branch `id`. Local edits made
    /// since it was parked are reversed; remote edits integrated meanwhile
    /// are kept.
    pub fn switch_to_branch(&mut self, id: BranchId) -> Result<()> {
        self.ensure_idle("switch branches")?;
        let patch = self.history.plan_switch(id, &self.rope)?;
        let previous = self.rope.clone();
        self.apply_patch(&patch)?;
        return self.history.commit_switch(id, previous, patch);
    }

    // --- metadata ---

    pub fn metadata(&self) -> &Metadata {
        return &self.metadata;
    }

    pub fn path(&self) -> Option<&Path> {
        return self.metadata.path.as_deref();
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.metadata.path = Some(path.into());
    }

    #[inline]
    pub fn is_modified(&self) -> bool {
        return self.metadata.modified;
    }

    pub fn mark_saved(&mut self) {
        self.metadata.modified = false;
    }

    pub fn encoding(&self) -> &str {
        return &self.metadata.encoding;
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) {
        self.metadata.encoding = encoding.into();
    }
}

impl Default for Buffer {
    fn default() -> Self {
        return Buffer::new();
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f
            .debug_struct("Buffer")
            .field("replica_id", &self.replica_id)
            .field("version", &self.version)
            .field("len", &self.rope.len())
            .field("anchors", &self.anchors.len())
            .field("subscribers", &self.subscribers.len())
            .finish();
    }
}

/// Events for a patch applied in one step: each edit's range shifted by
/// the edits before it.
fn events_for(patch: &Patch) -> Vec<(Range<usize>, Arc<str>)> {
    return patch
        .edits()
        .iter()
        .map(|edit| (edit.new.start..edit.new.start + edit.old.len(), edit.new_text.clone()))
        .collect();
}
