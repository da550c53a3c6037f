// model = "claude-opus-4-5"
// created = "2026-02-04"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Anchors: positions that follow the text they were created next to.
//!
//! The manager stores every anchor's current offset. Each commit maps the
//! stored offsets through the committed patch:
//!
//! - before an edit: unchanged
//! - after an edit: shifted by the edit's length change
//! - on an edit boundary: `Before` goes to the start of the replacement,
//!   `After` to its end
//! - strictly inside a replaced range: invalidated
//!
//! Callers hold an `Anchor` handle. The manager keeps only a weak reference
//! to it, so an anchor whose handles were all dropped is removed by the
//! next `gc`. A handle records which manager created it, and every other
//! manager rejects it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Error, Result};
use crate::ot::patch::Patch;
use crate::tree::Bias;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId(u64);

/// Source of process-unique manager ids.
static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);

/// Which neighbor an anchor sticks to when text is inserted at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorBias {
    /// Stay before text inserted at the anchor.
    #[default]
    Before,
    /// Move past text inserted at the anchor.
    After,
}

impl AnchorBias {
    #[inline]
    fn to_bias(self) -> Bias {
        return match self {
            AnchorBias::Before => Bias::Left,
            AnchorBias::After => Bias::Right,
        };
    }
}

/// A caller's handle on an anchor.
#[derive(Clone, Debug)]
pub struct Anchor {
    id: AnchorId,
    bias: AnchorBias,
    /// The manager that created this anchor.
    owner: u64,
    _token: Arc<()>,
}

impl Anchor {
    #[inline]
    pub fn id(&self) -> AnchorId {
        return self.id;
    }

    #[inline]
    pub fn bias(&self) -> AnchorBias {
        return self.bias;
    }
}

#[derive(Clone, Debug)]
struct AnchorEntry {
    offset: usize,
    bias: AnchorBias,
    valid: bool,
    token: Weak<()>,
}

/// Offsets of anchors an edit moved or invalidated, as they were before it.
pub type Displaced = Vec<(AnchorId, usize)>;

/// Anchors of one buffer. Clones share the owner id, so a snapshot taken
/// for rollback accepts the same handles.
#[derive(Clone, Debug)]
pub struct AnchorManager {
    entries: FxHashMap<AnchorId, AnchorEntry>,
    next_id: u64,
    owner: u64,
}

impl Default for AnchorManager {
    fn default() -> Self {
        return AnchorManager::new();
    }
}

impl AnchorManager {
    pub fn new() -> AnchorManager {
        return AnchorManager {
            entries: FxHashMap::default(),
            next_id: 0,
            owner: NEXT_OWNER.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Track a new anchor at `offset`, which the caller has validated.
    pub fn create(&mut self, offset: usize, bias: AnchorBias) -> Anchor {
        let id = AnchorId(self.next_id);
        self.next_id += 1;
        let token = Arc::new(());
        self.entries.insert(
            id,
            AnchorEntry {
                offset,
                bias,
                valid: true,
                token: Arc::downgrade(&token),
            },
        );
        return Anchor {
            id,
            bias,
            owner: self.owner,
            _token: token,
        };
    }

    /// The anchor's current offset.
    pub fn offset(&self, anchor: &Anchor) -> Result<usize> {
        if anchor.owner != self.owner {
            return Err(Error::ForeignAnchor(anchor.id));
        }
        return self.valid_offset(anchor.id).ok_or(Error::AnchorInvalidated(anchor.id));
    }

    pub(crate) fn valid_offset(&self, id: AnchorId) -> Option<usize> {
        return self.entries.get(&id).filter(|entry| entry.valid).map(|entry| entry.offset);
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Map every valid anchor through `patch`. Returns the prior offsets of
    /// the anchors that touched an edit.
    pub fn update(&mut self, patch: &Patch) -> Displaced {
        let mut displaced = Vec::new();
        if patch.is_empty() {
            return displaced;
        }
        for (id, entry) in self.entries.iter_mut() {
            if !entry.valid {
                continue;
            }
            let touched = patch
                .edits()
                .iter()
                .any(|edit| edit.old.start <= entry.offset && entry.offset <= edit.old.end);
            match patch.map_anchor(entry.offset, entry.bias.to_bias()) {
                Some(offset) => {
                    if touched {
                        displaced.push((*id, entry.offset));
                    }
                    entry.offset = offset;
                }
                None => {
                    displaced.push((*id, entry.offset));
                    entry.valid = false;
                }
            }
        }
        displaced.sort_unstable();
        return displaced;
    }

    /// Put anchors back where they were before an edit that was undone.
    pub fn restore(&mut self, displaced: &[(AnchorId, usize)], len: usize) {
        for (id, offset) in displaced {
            if let Some(entry) = self.entries.get_mut(id) {
                if *offset <= len {
                    entry.offset = *offset;
                    entry.valid = true;
                }
            }
        }
    }

    /// Drop anchors no caller holds anymore. Returns how many were dropped.
    pub fn gc(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.token.strong_count() > 0);
        let collected = before - self.entries.len();
        if collected > 0 {
            trace!(collected, live = self.entries.len(), "collected anchors");
        }
        return collected;
    }
}

/// Append the entries of `more` whose anchors `into` does not mention yet.
pub(crate) fn merge_displaced(into: &mut Displaced, more: impl IntoIterator<Item = (AnchorId, usize)>) {
    for (id, offset) in more {
        if !into.iter().any(|(seen, _)| *seen == id) {
            into.push((id, offset));
        }
    }
}
