// model = "claude-opus-4-5"
// created = "2026-02-04"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! The fragment union: every piece of text any integrated operation has
//! inserted, in document order, with tombstones for deleted pieces.
//!
//! Positions in an operation are offsets into the text its author saw, the
//! text visible at `base_version`. The union can reconstruct that view for
//! any version: a fragment is visible at version `S` if `S` observed the
//! operation that inserted it and observed none of the operations that
//! deleted it. Integrating an operation means resolving its offsets in
//! that view and then placing new text among concurrent insertions.
//!
//! # Placement
//!
//! New text is placed with the YATA rules used by Yjs. Each insertion
//! records its origin (the visible character before it) and its right
//! origin (the next character its author knew about). Between the two,
//! concurrent insertions with the same origin are ordered by ascending
//! `InsertionId`, which is ascending `(lamport, replica)`.
//!
//! # Deletion
//!
//! A deletion tombstones every fragment between the first and last
//! character of its range, including text it did not know about. Text
//! integrated after a concurrent deletion inherits that deletion when both
//! of its neighbors carry it. Either way, concurrent text strictly inside a
//! deleted range is deleted, and text at either end of it survives.
//!
//! Fragments carry no text. The visible text lives in the rope; an
//! integration reports the change to it as edits against the text visible
//! before the operation.
//!
//! # Storage
//!
//! Fragments live in a `SummarizedTree`. Each subtree summary counts its
//! visible and hidden bytes and joins the ids of every operation that
//! touched it. A version that dominates a subtree's operations sees that
//! subtree exactly as the local view does, so offset lookups skip it whole
//! and only descend where concurrent operations live.
//!
//! Tombstones are never removed, since later insertions may name them as
//! origins. Once every peer has integrated a deletion, `compact` replaces
//! it with a settled marker and merges split halves back together.

use std::fmt;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::op::{OpEdit, Operation};
use super::primitives::{CharId, Global, InsertionId, OpId};
use crate::error::{Error, Result};
use crate::tree::{Item, SummarizedTree, Summary};

/// Stands in for deletions every peer has integrated. Every version has
/// observed it, so it hides text in every view.
const SETTLED: OpId = OpId {
    timestamp: 0,
    replica_id: 0,
};

/// A run of inserted text that is split only where some operation needed
/// an offset inside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub insertion: InsertionId,
    /// Byte range within the insertion's text.
    pub start: usize,
    pub end: usize,
    /// The character this run was inserted after (`None` = document start).
    pub origin: Option<CharId>,
    /// The first character its author knew to the right of it
    /// (`None` = document end).
    pub right_origin: Option<CharId>,
    /// Operations that deleted this run.
    pub deletions: SmallVec<[OpId; 2]>,
}

impl Fragment {
    #[inline]
    pub fn len(&self) -> usize {
        return self.end - self.start;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.start == self.end;
    }

    #[inline]
    fn first_char(&self) -> CharId {
        return CharId::new(self.insertion, self.start);
    }

    #[inline]
    fn last_char(&self) -> CharId {
        return CharId::new(self.insertion, self.end - 1);
    }

    #[inline]
    fn contains(&self, id: CharId) -> bool {
        return self.insertion == id.insertion && self.start <= id.offset && id.offset < self.end;
    }

    /// Whether the text is visible in the current local view, which has
    /// integrated every operation in the union.
    #[inline]
    pub fn is_visible(&self) -> bool {
        return self.deletions.is_empty();
    }

    /// Whether a replica at `version` knew about this run.
    #[inline]
    pub fn is_known_in(&self, version: &Global) -> bool {
        return self.insertion.op.observed_by(version);
    }

    /// Whether a replica at `version` saw this run as live text.
    #[inline]
    pub fn is_visible_in(&self, version: &Global) -> bool {
        return self.is_known_in(version) && self.deletions.iter().all(|op| !op.observed_by(version));
    }

    /// Split off `[at, len)` and return it. The right half's origin is the
    /// last character of the left half, so it keeps following it.
    fn split(&mut self, at: usize) -> Fragment {
        debug_assert!(at > 0 && at < self.len());
        let split = self.start + at;
        let right = Fragment {
            insertion: self.insertion,
            start: split,
            end: self.end,
            origin: Some(CharId::new(self.insertion, split - 1)),
            right_origin: self.right_origin,
            deletions: self.deletions.clone(),
        };
        self.end = split;
        return right;
    }

    /// Whether `next` is the right half of a split of this run that can
    /// be joined back without changing any view.
    fn continues_into(&self, next: &Fragment) -> bool {
        return self.insertion == next.insertion
            && self.end == next.start
            && next.origin == Some(self.last_char())
            && self.right_origin == next.right_origin
            && self.deletions.len() == next.deletions.len()
            && self.deletions.iter().all(|op| next.deletions.contains(op));
    }

    /// Collapse deletions observed by `stable` into the settled marker.
    fn settle(&mut self, stable: &Global) -> bool {
        if !self.deletions.iter().any(|op| *op != SETTLED && op.observed_by(stable)) {
            return false;
        }
        self.deletions.retain(|op| !op.observed_by(stable));
        self.deletions.insert(0, SETTLED);
        return true;
    }
}

/// Visible and hidden bytes of a run of fragments, and every operation
/// that inserted or deleted any of them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FragmentSummary {
    pub visible: usize,
    pub hidden: usize,
    pub max_version: Global,
}

impl Summary for FragmentSummary {
    fn add_summary(&mut self, other: &Self) {
        self.visible += other.visible;
        self.hidden += other.hidden;
        self.max_version.join(&other.max_version);
    }
}

impl Item for Fragment {
    type Summary = FragmentSummary;

    fn summary(&self) -> FragmentSummary {
        let mut max_version = Global::new();
        for op in std::iter::once(&self.insertion.op).chain(&self.deletions) {
            max_version.observe(op.replica_id, op.timestamp);
        }
        let (visible, hidden) = if self.is_visible() {
            (self.len(), 0)
        } else {
            (0, self.len())
        };
        return FragmentSummary {
            visible,
            hidden,
            max_version,
        };
    }
}

/// Sizes a whole subtree from its summary when `version` has seen every
/// operation in it.
fn measure_in(version: &Global) -> impl Fn(&FragmentSummary) -> Option<usize> + '_ {
    return move |summary: &FragmentSummary| version.dominates(&summary.max_version).then_some(summary.visible);
}

fn len_in_version(version: &Global) -> impl Fn(&Fragment) -> usize + '_ {
    return move |fragment: &Fragment| {
        if fragment.is_visible_in(version) {
            fragment.len()
        } else {
            0
        }
    };
}

/// The result of integrating an operation, not yet committed.
#[derive(Clone, Debug)]
pub struct Integrated {
    pub union: FragmentUnion,
    /// The change to the locally visible text, as sorted, non-adjacent
    /// edits against the text before the operation.
    pub edits: Vec<OpEdit>,
}

/// All text ever inserted into a document, in document order.
///
/// Cloning is O(1); integration copies only the paths it edits.
#[derive(Clone, Default)]
pub struct FragmentUnion {
    fragments: SummarizedTree<Fragment>,
}

impl FragmentUnion {
    /// A union holding `base_len` bytes of initial text.
    pub fn new(base_len: usize) -> FragmentUnion {
        if base_len == 0 {
            return FragmentUnion::default();
        }
        return FragmentUnion {
            fragments: SummarizedTree::from_item(Fragment {
                insertion: InsertionId::BASE,
                start: 0,
                end: base_len,
                origin: None,
                right_origin: None,
                deletions: SmallVec::new(),
            }),
        };
    }

    pub fn from_fragments(fragments: Vec<Fragment>) -> FragmentUnion {
        return FragmentUnion {
            fragments: SummarizedTree::from_items(fragments),
        };
    }

    /// Every fragment in document order.
    pub fn to_fragments(&self) -> Vec<Fragment> {
        return self.fragments.iter().cloned().collect();
    }

    /// Number of fragments, tombstones included.
    #[inline]
    pub fn fragment_count(&self) -> usize {
        return self.fragments.len();
    }

    /// Length of the locally visible text.
    #[inline]
    pub fn visible_len(&self) -> usize {
        return self.fragments.summary().visible;
    }

    /// Bytes held only as tombstones.
    #[inline]
    pub fn hidden_len(&self) -> usize {
        return self.fragments.summary().hidden;
    }

    /// Length of the text visible at `version`.
    pub fn len_in(&self, version: &Global) -> usize {
        return self
            .fragments
            .measured_len(&measure_in(version), &len_in_version(version));
    }

    /// Integrate `op` into a copy of this union.
    ///
    /// Every operation the union already holds must be observed by the
    /// caller's version, and `op` must not already be integrated.
    pub fn integrate(&self, op: &Operation) -> Result<Integrated> {
        let base = &op.base_version;
        let own = op.id();
        let edits = coalesce(&op.edits);

        let base_len = self.len_in(base);
        if let Some(edit) = edits.iter().find(|edit| edit.range.end > base_len) {
            return Err(Error::InvalidOperation(format!(
                "edit {}..{} exceeds base text of {} bytes",
                edit.range.start, edit.range.end, base_len
            )));
        }

        let mut offsets: Vec<usize> = edits
            .iter()
            .flat_map(|edit| [edit.range.start, edit.range.end])
            .collect();
        offsets.sort_unstable();
        offsets.dedup();
        let mut union = self.clone();
        union.split_at_offsets(base, &offsets)?;

        let mut touched = Touched::default();
        for edit in edits.iter().filter(|edit| !edit.range.is_empty()) {
            let first = union.starting_at(base, edit.range.start)?;
            let last = union.ending_at(base, edit.range.end)?;
            if last < first {
                return Err(missing(edit.range.end));
            }
            let deleted: Vec<Fragment> = union
                .fragments
                .slice(first..last + 1)?
                .iter()
                .map(|fragment| {
                    let mut fragment = fragment.clone();
                    if !fragment.deletions.contains(&own) {
                        fragment.deletions.push(own);
                    }
                    fragment
                })
                .collect();
            union.fragments.splice(first..last + 1, deleted)?;
            touched.cover(first, last);
        }

        for (index, edit) in edits.iter().enumerate() {
            if edit.new_text.is_empty() {
                continue;
            }
            let (origin, right_origin, scan) = union.origins_at(base, edit.range.end)?;
            let mut fragment = Fragment {
                insertion: InsertionId::new(own, index as u32),
                start: 0,
                end: edit.new_text.len(),
                origin,
                right_origin,
                deletions: SmallVec::new(),
            };
            let at = union.placement(&fragment, scan)?;
            fragment.deletions = union.inherited_deletions(at, base, own);
            union.fragments.splice(at..at, [fragment])?;
            touched.insert(at);
        }

        let visible = union.visible_changes(touched.ranges(), &edits, own)?;
        return Ok(Integrated { union, edits: visible });
    }

    /// Replace deletions every peer has integrated with the settled marker
    /// and rejoin adjacent halves of split runs. `stable` must be observed
    /// by the base version of every operation still to be integrated.
    /// Returns the number of fragments merged away.
    pub fn compact(&mut self, stable: &Global) -> usize {
        let before = self.fragments.len();
        let mut changed = false;
        let mut compacted: Vec<Fragment> = Vec::with_capacity(before);
        for fragment in self.fragments.iter() {
            let mut fragment = fragment.clone();
            changed |= fragment.settle(stable);
            if let Some(last) = compacted.last_mut() {
                if last.continues_into(&fragment) {
                    last.end = fragment.end;
                    changed = true;
                    continue;
                }
            }
            compacted.push(fragment);
        }
        if changed {
            self.fragments = SummarizedTree::from_items(compacted);
        }
        return before - self.fragments.len();
    }

    fn fragment(&self, index: usize) -> Result<&Fragment> {
        return self
            .fragments
            .get(index)
            .ok_or_else(|| Error::InvalidOperation(format!("no fragment at index {index}")));
    }

    /// Index of the fragment visible at `version` that spans `offset`, and
    /// the offset it starts at.
    fn locate(&self, version: &Global, offset: usize) -> Option<(usize, usize)> {
        return self
            .fragments
            .seek_measured(offset, &measure_in(version), &len_in_version(version));
    }

    /// Index of the fragment visible at `version` that starts at `offset`.
    fn starting_at(&self, version: &Global, offset: usize) -> Result<usize> {
        return match self.locate(version, offset) {
            Some((index, start)) if start == offset => Ok(index),
            _ => Err(missing(offset)),
        };
    }

    /// Index of the fragment visible at `version` that ends at `offset`.
    fn ending_at(&self, version: &Global, offset: usize) -> Result<usize> {
        if offset == 0 {
            return Err(missing(offset));
        }
        let (index, start) = self.locate(version, offset - 1).ok_or_else(|| missing(offset))?;
        if start + self.fragment(index)?.len() != offset {
            return Err(missing(offset));
        }
        return Ok(index);
    }

    /// Split fragments visible at `version` so that every offset in
    /// `offsets` falls on a fragment boundary.
    fn split_at_offsets(&mut self, version: &Global, offsets: &[usize]) -> Result<()> {
        for &offset in offsets {
            let Some((index, start)) = self.locate(version, offset) else {
                continue;
            };
            if start == offset {
                continue;
            }
            let mut left = self.fragment(index)?.clone();
            let right = left.split(offset - start);
            self.fragments.splice(index..index + 1, [left, right])?;
        }
        return Ok(());
    }

    /// The origin and right origin of text inserted at `offset` in the view
    /// of `version`, and the index range between them.
    fn origins_at(&self, version: &Global, offset: usize) -> Result<(Option<CharId>, Option<CharId>, Range<usize>)> {
        let (origin, scan_start) = if offset == 0 {
            (None, 0)
        } else {
            let index = self.ending_at(version, offset)?;
            (Some(self.fragment(index)?.last_char()), index + 1)
        };
        let (_, rest) = self.fragments.split_at_index(scan_start);
        let known = rest.iter().position(|f| f.is_known_in(version));
        let right_origin = known.and_then(|i| rest.get(i)).map(Fragment::first_char);
        let scan_end = known.map_or(self.fragments.len(), |i| scan_start + i);
        return Ok((origin, right_origin, scan_start..scan_end));
    }

    /// Where `new` goes: the YATA scan over the fragments between its
    /// origin and right origin.
    fn placement(&self, new: &Fragment, scan: Range<usize>) -> Result<usize> {
        let region = self.fragments.slice(scan.clone())?;
        let region: Vec<&Fragment> = region.iter().collect();

        let mut left = 0;
        // Fragments from here up to the current one conflict with `new`.
        let mut conflict_start = 0;
        for (o, other) in region.iter().enumerate() {
            if other.origin == new.origin {
                if other.insertion < new.insertion {
                    left = o + 1;
                    conflict_start = o + 1;
                } else if other.right_origin == new.right_origin {
                    break;
                }
                continue;
            }
            // An origin outside the region ends the scan.
            let other_origin = other
                .origin
                .and_then(|origin| region[..o].iter().position(|f| f.contains(origin)));
            match other_origin {
                Some(index) => {
                    if index < conflict_start {
                        left = o + 1;
                        conflict_start = o + 1;
                    }
                }
                None => break,
            }
        }
        return Ok(scan.start + left);
    }

    /// Every concurrent deletion carried by both fragments around index
    /// `at`, which new text placed there inherits.
    fn inherited_deletions(&self, at: usize, base: &Global, own: OpId) -> SmallVec<[OpId; 2]> {
        let neighbors = at.checked_sub(1).and_then(|i| self.fragments.get(i)).zip(self.fragments.get(at));
        let Some((before, after)) = neighbors else {
            return SmallVec::new();
        };
        return before
            .deletions
            .iter()
            .filter(|op| **op != own && !op.observed_by(base) && after.deletions.contains(op))
            .copied()
            .collect();
    }

    /// Compare visibility before and after the operation over the touched
    /// index ranges, and report the difference as edits against the old
    /// visible text.
    fn visible_changes(&self, touched: Vec<Range<usize>>, edits: &[OpEdit], own: OpId) -> Result<Vec<OpEdit>> {
        let mut changes: Vec<OpEdit> = Vec::new();
        // Visible bytes of the ranges already scanned, before and after.
        let mut scanned_old = 0;
        let mut scanned_new = 0;
        for range in touched {
            let (prefix, _) = self.fragments.split_at_index(range.start);
            let mut position = prefix.summary().visible - scanned_new + scanned_old;
            let mut pending: Option<OpEdit> = None;
            for fragment in self.fragments.slice(range)?.iter() {
                let is_new = fragment.insertion.op == own;
                let was_visible = !is_new && fragment.deletions.iter().all(|op| *op == own);
                let is_visible = fragment.is_visible();
                if was_visible {
                    scanned_old += fragment.len();
                }
                if is_visible {
                    scanned_new += fragment.len();
                }
                match (was_visible, is_visible) {
                    (true, true) => {
                        push_change(&mut changes, pending.take());
                        position += fragment.len();
                    }
                    (true, false) => {
                        let change = pending.get_or_insert_with(|| OpEdit::new(position..position, ""));
                        change.range.end += fragment.len();
                        position += fragment.len();
                    }
                    (false, true) if is_new => {
                        let text = edits
                            .get(fragment.insertion.index as usize)
                            .and_then(|edit| edit.new_text.get(fragment.start..fragment.end))
                            .ok_or_else(|| Error::InvalidOperation("inserted text out of range".into()))?;
                        let change = pending.get_or_insert_with(|| OpEdit::new(position..position, ""));
                        change.new_text.push_str(text);
                    }
                    _ => {}
                }
            }
            push_change(&mut changes, pending);
        }
        return Ok(changes);
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.fragments.check_invariants();
        let fragments = self.to_fragments();
        for fragment in &fragments {
            assert!(!fragment.is_empty());
            if let Some(origin) = fragment.origin {
                assert!(fragments.iter().any(|f| f.contains(origin)), "dangling origin");
            }
        }
    }
}

impl PartialEq for FragmentUnion {
    fn eq(&self, other: &Self) -> bool {
        return self.fragments.len() == other.fragments.len() && self.fragments.iter().eq(other.fragments.iter());
    }
}

impl Eq for FragmentUnion {}

impl fmt::Debug for FragmentUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_list().entries(self.fragments.iter()).finish();
    }
}

/// Fragment index ranges an integration touched, kept in the coordinates
/// of the current tree as insertions shift them.
#[derive(Default)]
struct Touched(Vec<(usize, usize)>);

impl Touched {
    fn cover(&mut self, first: usize, last: usize) {
        self.0.push((first, last));
    }

    fn insert(&mut self, at: usize) {
        for (first, last) in &mut self.0 {
            if at <= *first {
                *first += 1;
                *last += 1;
            } else if at <= *last {
                *last += 1;
            }
        }
        self.0.push((at, at));
    }

    /// Sorted, disjoint half-open ranges.
    fn ranges(mut self) -> Vec<Range<usize>> {
        self.0.sort_unstable();
        let mut ranges: Vec<Range<usize>> = Vec::with_capacity(self.0.len());
        for (first, last) in self.0 {
            if let Some(previous) = ranges.last_mut() {
                if first <= previous.end {
                    previous.end = previous.end.max(last + 1);
                    continue;
                }
            }
            ranges.push(first..last + 1);
        }
        return ranges;
    }
}

/// Append `change`, joining it to the previous one when they touch.
fn push_change(changes: &mut Vec<OpEdit>, change: Option<OpEdit>) {
    let Some(change) = change else {
        return;
    };
    if let Some(last) = changes.last_mut() {
        if last.range.end == change.range.start {
            last.range.end = change.range.end;
            last.new_text.push_str(&change.new_text);
            return;
        }
    }
    changes.push(change);
}

/// Merge edits that touch, so that no inserted text lands inside the
/// operation's own deletion run.
fn coalesce(edits: &[OpEdit]) -> Vec<OpEdit> {
    let mut merged: Vec<OpEdit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if let Some(last) = merged.last_mut() {
            if last.range.end == edit.range.start {
                last.range.end = edit.range.end;
                last.new_text.push_str(&edit.new_text);
                continue;
            }
        }
        merged.push(edit.clone());
    }
    return merged;
}

fn missing(offset: usize) -> Error {
    return Error::InvalidOperation(format!("no fragment boundary at offset {offset}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::primitives::ReplicaId;

    /// A text replica driven only by the union, for checking integration.
    struct Model {
        text: String,
        union: FragmentUnion,
    }

    impl Model {
        fn new(text: &str) -> Model {
            return Model {
                text: text.to_string(),
                union: FragmentUnion::new(text.len()),
            };
        }

        fn apply(&mut self, op: &Operation) {
            let integrated = self.union.integrate(op).unwrap();
            for edit in integrated.edits.iter().rev() {
                self.text.replace_range(edit.range.clone(), &edit.new_text);
            }
            self.union = integrated.union;
            self.union.check_invariants();
            assert_eq!(self.union.visible_len(), self.text.len());
        }
    }

    fn op(replica_id: ReplicaId, timestamp: u32, edits: Vec<OpEdit>) -> Operation {
        return Operation::new(replica_id, timestamp, edits, Global::new());
    }

    fn converge(base: &str, ops: &[Operation]) -> String {
        let mut forward = Model::new(base);
        for op in ops {
            forward.apply(op);
        }
        let mut backward = Model::new(base);
        for op in ops.iter().rev() {
            backward.apply(op);
        }
        assert_eq!(forward.text, backward.text);
        return forward.text;
    }

    #[test]
    fn concurrent_inserts_order_by_lamport() {
        let foo = op(1, 1, vec![OpEdit::new(0..0, "foo")]);
        let bar = op(2, 2, vec![OpEdit::new(0..0, "bar")]);
        assert_eq!(converge("", &[foo, bar]), "foobar");
    }

    #[test]
    fn concurrent_inserts_tie_break_on_replica() {
        let a = op(7, 3, vec![OpEdit::new(2..2, "a")]);
        let b = op(4, 3, vec![OpEdit::new(2..2, "b")]);
        assert_eq!(converge("xyz", &[a, b]), "xybaz");
    }

    #[test]
    fn delete_wins_over_inner_insert() {
        let delete = op(1, 1, vec![OpEdit::new(2..5, "")]);
        let insert = op(2, 1, vec![OpEdit::new(3..3, "X")]);
        assert_eq!(converge("abcdefg", &[delete, insert]), "abfg");
    }

    #[test]
    fn insert_at_deletion_boundary_survives() {
        let delete = op(1, 1, vec![OpEdit::new(2..5, "")]);
        let at_start = op(2, 1, vec![OpEdit::new(2..2, "X")]);
        let at_end = op(3, 1, vec![OpEdit::new(5..5, "Y")]);
        assert_eq!(converge("abcdefg", &[delete.clone(), at_start.clone()]), "abXfg");
        assert_eq!(converge("abcdefg", &[delete.clone(), at_end.clone()]), "abYfg");

        let mut model = Model::new("abcdefg");
        model.apply(&at_end);
        model.apply(&delete);
        model.apply(&at_start);
        assert_eq!(model.text, "abXYfg");
    }

    #[test]
    fn replacement_concurrent_with_replacement() {
        let a = op(1, 1, vec![OpEdit::new(0..5, "HELLO")]);
        let b = op(2, 1, vec![OpEdit::new(6..11, "there")]);
        assert_eq!(converge("hello world", &[a, b]), "HELLO there");
    }

    #[test]
    fn sequential_operations_on_one_replica() {
        let mut model = Model::new("");
        let first = op(1, 1, vec![OpEdit::new(0..0, "hello")]);
        model.apply(&first);
        let second = Operation::new(1, 2, vec![OpEdit::new(5..5, " world")], first.version());
        model.apply(&second);
        let third = Operation::new(1, 3, vec![OpEdit::new(0..1, "H"), OpEdit::new(6..11, "World")], second.version());
        model.apply(&third);
        assert_eq!(model.text, "Hello World");
    }

    #[test]
    fn operation_refers_to_its_base_view() {
        // Replica 2 saw "abc" and inserted at 3, while replica 1 prepended.
        let prepend = op(1, 1, vec![OpEdit::new(0..0, ">>")]);
        let append = op(2, 1, vec![OpEdit::new(3..3, "!")]);
        assert_eq!(converge("abc", &[prepend, append]), ">>abc!");
    }

    #[test]
    fn adjacent_edits_are_coalesced() {
        // Replace "bc" and "de" separately; a concurrent insert between them
        // is strictly inside the combined deletion.
        let split = op(1, 1, vec![OpEdit::new(1..3, "X"), OpEdit::new(3..5, "Y")]);
        let inner = op(2, 1, vec![OpEdit::new(3..3, "!")]);
        assert_eq!(converge("abcdef", &[split, inner]), "aXYf");
    }

    #[test]
    fn rejects_out_of_range_edit() {
        let union = FragmentUnion::new(3);
        let err = union.integrate(&op(1, 1, vec![OpEdit::new(2..4, "")])).unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
    }

    #[test]
    fn len_in_agrees_with_fragment_scan() {
        let mut model = Model::new("0123456789");
        let ops = [
            op(1, 1, vec![OpEdit::new(2..4, "ab")]),
            op(2, 1, vec![OpEdit::new(5..5, "XYZ"), OpEdit::new(8..10, "")]),
            op(3, 2, vec![OpEdit::new(0..1, "")]),
        ];
        for op in &ops {
            model.apply(op);
        }
        let versions: Vec<Global> = vec![
            Global::new(),
            [(1, 1)].into_iter().collect(),
            [(2, 1), (3, 2)].into_iter().collect(),
            [(1, 1), (2, 1), (3, 2)].into_iter().collect(),
        ];
        for version in &versions {
            let scanned: usize = model
                .union
                .to_fragments()
                .iter()
                .filter(|f| f.is_visible_in(version))
                .map(Fragment::len)
                .sum();
            assert_eq!(model.union.len_in(version), scanned, "at {version:?}");
        }
        assert_eq!(model.union.len_in(&versions[3]), model.text.len());
    }

    #[test]
    fn integration_over_a_large_union() {
        // Enough fragments for a multi-level tree.
        let mut model = Model::new("");
        let mut version = Global::new();
        for timestamp in 1..=200u32 {
            let len = model.text.len();
            let at = (timestamp as usize * 7) % (len + 1);
            let edit = if timestamp % 3 == 0 && at < len {
                OpEdit::new(at..at + 1, "")
            } else {
                OpEdit::new(at..at, "ab")
            };
            let next = Operation::new(1, timestamp, vec![edit], version.clone());
            version = next.version();
            model.apply(&next);
        }
        assert!(model.union.fragment_count() > 100);

        // A concurrent edit against the empty view scans past every run.
        let early = Operation::new(2, 3, vec![OpEdit::new(0..0, "!")], Global::new());
        let mut late = Model::new("");
        late.union = model.union.clone();
        late.text = model.text.clone();
        late.apply(&early);
        assert!(late.text.contains('!'));
        assert_eq!(late.text.len(), model.text.len() + 1);
    }

    #[test]
    fn compaction_settles_deletions_and_merges_halves() {
        let delete_left = op(1, 1, vec![OpEdit::new(1..3, "")]);
        let delete_right = op(2, 1, vec![OpEdit::new(3..5, "")]);
        let mut compacted = Model::new("abcdef");
        compacted.apply(&delete_left);
        compacted.apply(&delete_right);
        let mut plain = Model::new("abcdef");
        plain.apply(&delete_left);
        plain.apply(&delete_right);
        assert_eq!(compacted.text, "af");
        assert_eq!(compacted.union.fragment_count(), 4);

        let stable: Global = [(1, 1), (2, 1)].into_iter().collect();
        assert_eq!(compacted.union.compact(&stable), 1);
        compacted.union.check_invariants();
        assert_eq!(compacted.union.fragment_count(), 3);
        assert_eq!(compacted.union.visible_len(), 2);
        assert_eq!(compacted.union.hidden_len(), 4);
        assert_eq!(compacted.union.compact(&stable), 0);

        // Later operations see the same text with or without compaction.
        let later = [
            Operation::new(3, 2, vec![OpEdit::new(1..1, "X")], stable.clone()),
            Operation::new(4, 2, vec![OpEdit::new(0..2, "yz")], stable.clone()),
        ];
        for op in &later {
            compacted.apply(op);
            plain.apply(op);
        }
        assert_eq!(compacted.text, plain.text);
    }

    #[test]
    fn compaction_keeps_unsettled_deletions() {
        let delete = op(1, 1, vec![OpEdit::new(1..3, "")]);
        let mut model = Model::new("abcd");
        model.apply(&delete);
        let before = model.union.clone();
        assert_eq!(model.union.compact(&Global::new()), 0);
        assert_eq!(model.union, before);

        // Text concurrent with the deletion still inherits it.
        let inner = op(2, 1, vec![OpEdit::new(2..2, "X")]);
        model.apply(&inner);
        assert_eq!(model.text, "ad");
    }
}
