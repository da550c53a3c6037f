// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Persistent B-tree with cached subtree summaries.
//!
//! Every node caches the aggregate `Summary` of its subtree, so the tree
//! can be searched by any `Dimension` that is derivable from the summary:
//! byte offsets, line/column points, UTF-16 offsets and so on.
//!
//! Structure:
//! - Leaf nodes store up to `2 * TREE_BASE` items with their summaries
//! - Internal nodes store up to `2 * TREE_BASE` children of equal height
//! - Nodes live behind `Arc` and are never mutated once shared; edits
//!   clone the root-to-edit path and share everything else
//!
//! Operations:
//! - push/append: O(log n) amortized
//! - split_at/split_at_index: O(log^2 n)
//! - seek (via `Cursor`): O(log n)
//! - iteration: O(n)

mod cursor;

use std::fmt;
use std::mem;
use std::ops::Range;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::{Error, Result};

pub use cursor::{Cursor, Iter};

/// Minimum fan-out of a node; the maximum is twice this.
pub const TREE_BASE: usize = 6;

type Children<T> = SmallVec<[SummarizedTree<T>; 2 * TREE_BASE]>;
type Items<T> = SmallVec<[T; 2 * TREE_BASE]>;
type ItemSummaries<T> = SmallVec<[<T as Item>::Summary; 2 * TREE_BASE]>;

/// An aggregatable metric. `add_summary` must be associative, with
/// `Default::default()` as its identity.
pub trait Summary: Clone + Default + fmt::Debug {
    fn add_summary(&mut self, other: &Self);
}

/// Something that can be stored in a `SummarizedTree`.
pub trait Item: Clone {
    type Summary: Summary;

    fn summary(&self) -> Self::Summary;
}

/// A coordinate that can be accumulated from summaries and compared.
///
/// Dimensions are plain types known at compile time, so every seek is
/// monomorphized for the dimension it searches by.
pub trait Dimension<S: Summary>: Clone + Default + Ord + fmt::Debug {
    fn add_summary(&mut self, summary: &S);

    fn from_summary(summary: &S) -> Self {
        let mut dimension = Self::default();
        dimension.add_summary(summary);
        return dimension;
    }
}

impl<S: Summary> Dimension<S> for () {
    #[inline]
    fn add_summary(&mut self, _summary: &S) {}
}

/// Which side of a boundary a seek prefers.
///
/// When a target falls exactly between two items, `Left` stops at the item
/// ending there and `Right` stops at the item starting there.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Bias {
    #[default]
    Left,
    Right,
}

impl Bias {
    /// Whether an item ending at `end` is where a seek for `target` stops.
    #[inline]
    pub(crate) fn stops_at<D: Ord>(self, target: &D, end: &D) -> bool {
        return match self {
            Bias::Left => target <= end,
            Bias::Right => target < end,
        };
    }
}

/// A persistent, summarized B-tree of items.
pub struct SummarizedTree<T: Item>(Arc<Node<T>>);

#[derive(Clone)]
enum Node<T: Item> {
    Internal {
        height: u8,
        summary: T::Summary,
        count: usize,
        children: Children<T>,
    },
    Leaf {
        summary: T::Summary,
        items: Items<T>,
        summaries: ItemSummaries<T>,
    },
}

impl<T: Item> Clone for SummarizedTree<T> {
    fn clone(&self) -> Self {
        return SummarizedTree(Arc::clone(&self.0));
    }
}

impl<T: Item> Default for SummarizedTree<T> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<T: Item> SummarizedTree<T> {
    /// Create an empty tree.
    pub fn new() -> SummarizedTree<T> {
        return SummarizedTree(Arc::new(Node::Leaf {
            summary: T::Summary::default(),
            items: SmallVec::new(),
            summaries: SmallVec::new(),
        }));
    }

    /// Create a tree holding a single item.
    pub fn from_item(item: T) -> SummarizedTree<T> {
        let mut items = Items::<T>::new();
        items.push(item);
        return Self::leaf(items);
    }

    /// Build a balanced tree bottom-up from an iterator of items.
    pub fn from_items(items: impl IntoIterator<Item = T>) -> SummarizedTree<T> {
        let mut level = Vec::new();
        let mut pending = Items::<T>::new();
        for item in items {
            pending.push(item);
            if pending.len() == 2 * TREE_BASE {
                level.push(Self::leaf(mem::take(&mut pending)));
            }
        }
        if !pending.is_empty() {
            level.push(Self::leaf(pending));
        }

        while level.len() > 1 {
            let mut next = Vec::with_capacity(level.len() / (2 * TREE_BASE) + 1);
            let mut children = Children::<T>::new();
            for tree in level {
                children.push(tree);
                if children.len() == 2 * TREE_BASE {
                    next.push(Self::internal(mem::take(&mut children)));
                }
            }
            if !children.is_empty() {
                next.push(Self::internal(children));
            }
            level = next;
        }

        return level.pop().unwrap_or_default();
    }

    fn leaf(items: Items<T>) -> SummarizedTree<T> {
        let summaries: ItemSummaries<T> = items.iter().map(Item::summary).collect();
        let summary = sum_summaries(summaries.iter());
        return SummarizedTree(Arc::new(Node::Leaf {
            summary,
            items,
            summaries,
        }));
    }

    fn internal(children: Children<T>) -> SummarizedTree<T> {
        let height = children.first().map_or(0, |child| child.height()) + 1;
        let summary = sum_summaries(children.iter().map(|child| child.summary()));
        let count = children.iter().map(|child| child.len()).sum();
        return SummarizedTree(Arc::new(Node::Internal {
            height,
            summary,
            count,
            children,
        }));
    }

    /// Aggregate summary of every item in the tree.
    #[inline]
    pub fn summary(&self) -> &T::Summary {
        return match self.0.as_ref() {
            Node::Internal { summary, .. } => summary,
            Node::Leaf { summary, .. } => summary,
        };
    }

    /// Number of items in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        return match self.0.as_ref() {
            Node::Internal { count, .. } => *count,
            Node::Leaf { items, .. } => items.len(),
        };
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    /// Height of the tree; a single leaf has height 0.
    #[inline]
    pub fn height(&self) -> u8 {
        return match self.0.as_ref() {
            Node::Internal { height, .. } => *height,
            Node::Leaf { .. } => 0,
        };
    }

    fn child_count(&self) -> usize {
        return match self.0.as_ref() {
            Node::Internal { children, .. } => children.len(),
            Node::Leaf { items, .. } => items.len(),
        };
    }

    fn is_underflowing(&self) -> bool {
        return self.child_count() < TREE_BASE;
    }

    fn child_trees(&self) -> &[SummarizedTree<T>] {
        return match self.0.as_ref() {
            Node::Internal { children, .. } => children,
            Node::Leaf { .. } => &[],
        };
    }

    fn leaf_parts(&self) -> (&[T], &[T::Summary]) {
        return match self.0.as_ref() {
            Node::Internal { .. } => (&[], &[]),
            Node::Leaf {
                items, summaries, ..
            } => (items, summaries),
        };
    }

    /// Append an item to the end of the tree.
    pub fn push(&mut self, item: T) {
        self.append(Self::from_item(item));
    }

    /// Append every item from an iterator.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        self.append(Self::from_items(items));
    }

    /// Concatenate another tree onto the end of this one.
    pub fn append(&mut self, other: SummarizedTree<T>) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = other;
            return;
        }
        if self.height() < other.height() {
            for child in other.child_trees() {
                self.append(child.clone());
            }
            return;
        }
        if let Some(split) = self.push_tree_recursive(other) {
            let left = mem::take(self);
            let mut children = Children::<T>::new();
            children.push(left);
            children.push(split);
            *self = Self::internal(children);
        }
    }

    /// Attach `other` (no taller than `self`) to the right edge of this
    /// tree. Returns the right half when the root had to split.
    fn push_tree_recursive(&mut self, other: SummarizedTree<T>) -> Option<SummarizedTree<T>> {
        let other_height = other.height();
        match Arc::make_mut(&mut self.0) {
            Node::Internal {
                height,
                summary,
                count,
                children,
            } => {
                let height_delta = *height - other_height;
                let mut to_append = Children::<T>::new();
                if height_delta == 0 {
                    to_append.extend(other.child_trees().iter().cloned());
                } else if height_delta == 1 && !other.is_underflowing() {
                    to_append.push(other);
                } else if let Some(last) = children.last_mut() {
                    if let Some(split) = last.push_tree_recursive(other) {
                        to_append.push(split);
                    }
                }

                let child_count = children.len() + to_append.len();
                if child_count > 2 * TREE_BASE {
                    let midpoint = (child_count + child_count % 2) / 2;
                    let mut all: SmallVec<[SummarizedTree<T>; 4 * TREE_BASE]> =
                        children.drain(..).collect();
                    all.extend(to_append);
                    let right: Children<T> = all.drain(midpoint..).collect();
                    children.extend(all);
                    *summary = sum_summaries(children.iter().map(|child| child.summary()));
                    *count = children.iter().map(|child| child.len()).sum();
                    return Some(Self::internal(right));
                }

                children.extend(to_append);
                *summary = sum_summaries(children.iter().map(|child| child.summary()));
                *count = children.iter().map(|child| child.len()).sum();
                return None;
            }
            Node::Leaf {
                summary,
                items,
                summaries,
            } => {
                let (other_items, other_summaries) = other.leaf_parts();
                let child_count = items.len() + other_items.len();
                if child_count > 2 * TREE_BASE {
                    let midpoint = (child_count + child_count % 2) / 2;
                    let mut all_items: SmallVec<[T; 4 * TREE_BASE]> = items.drain(..).collect();
                    all_items.extend(other_items.iter().cloned());
                    let right: Items<T> = all_items.drain(midpoint..).collect();
                    items.extend(all_items);
                    summaries.clear();
                    summaries.extend(items.iter().map(Item::summary));
                    *summary = sum_summaries(summaries.iter());
                    return Some(Self::leaf(right));
                }

                items.extend(other_items.iter().cloned());
                summaries.extend(other_summaries.iter().cloned());
                summary.add_summary(other.summary());
                return None;
            }
        }
    }

    /// The first item, if any.
    pub fn first(&self) -> Option<&T> {
        return match self.0.as_ref() {
            Node::Internal { children, .. } => children.first().and_then(|child| child.first()),
            Node::Leaf { items, .. } => items.first(),
        };
    }

    /// The last item, if any.
    pub fn last(&self) -> Option<&T> {
        return match self.0.as_ref() {
            Node::Internal { children, .. } => children.last().and_then(|child| child.last()),
            Node::Leaf { items, .. } => items.last(),
        };
    }

    /// The item at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        let mut tree = self;
        let mut remaining = index;
        loop {
            match tree.0.as_ref() {
                Node::Internal { children, .. } => {
                    let mut next = None;
                    for child in children {
                        if remaining < child.len() {
                            next = Some(child);
                            break;
                        }
                        remaining -= child.len();
                    }
                    tree = next?;
                }
                Node::Leaf { items, .. } => return items.get(remaining),
            }
        }
    }

    /// Modify the last item in place, refreshing every summary on the
    /// rightmost path. Returns false if the tree is empty.
    pub fn update_last(&mut self, f: impl FnOnce(&mut T)) -> bool {
        if self.is_empty() {
            return false;
        }
        return self.update_last_recursive(f);
    }

    fn update_last_recursive(&mut self, f: impl FnOnce(&mut T)) -> bool {
        match Arc::make_mut(&mut self.0) {
            Node::Internal {
                summary, children, ..
            } => {
                let updated = match children.last_mut() {
                    Some(last) => last.update_last_recursive(f),
                    None => false,
                };
                *summary = sum_summaries(children.iter().map(|child| child.summary()));
                return updated;
            }
            Node::Leaf {
                summary,
                items,
                summaries,
            } => {
                let (Some(item), Some(item_summary)) = (items.last_mut(), summaries.last_mut())
                else {
                    return false;
                };
                f(item);
                *item_summary = item.summary();
                *summary = sum_summaries(summaries.iter());
                return true;
            }
        }
    }

    /// Split into the first `index` items and the rest.
    pub fn split_at_index(&self, index: usize) -> (SummarizedTree<T>, SummarizedTree<T>) {
        if index == 0 {
            return (Self::new(), self.clone());
        }
        if index >= self.len() {
            return (self.clone(), Self::new());
        }
        match self.0.as_ref() {
            Node::Leaf { items, .. } => {
                let left = Self::leaf(items[..index].iter().cloned().collect());
                let right = Self::leaf(items[index..].iter().cloned().collect());
                return (left, right);
            }
            Node::Internal { children, .. } => {
                let mut left = Self::new();
                let mut right = Self::new();
                let mut remaining = index;
                let mut split_done = false;
                for child in children {
                    if split_done {
                        right.append(child.clone());
                    } else if remaining >= child.len() {
                        remaining -= child.len();
                        left.append(child.clone());
                    } else {
                        let (child_left, child_right) = child.split_at_index(remaining);
                        left.append(child_left);
                        right.append(child_right);
                        split_done = true;
                    }
                }
                return (left, right);
            }
        }
    }

    /// Split where a seek for `target` would stop. The item the seek stops
    /// at becomes the first item of the right half.
    pub fn split_at<D: Dimension<T::Summary>>(
        &self,
        target: &D,
        bias: Bias,
    ) -> (SummarizedTree<T>, SummarizedTree<T>) {
        let mut cursor = self.cursor::<D>();
        cursor.seek(target, bias);
        return self.split_at_index(cursor.index());
    }

    /// Replace the items in `range` (item indices) with `items`.
    pub fn splice(&mut self, range: Range<usize>, items: impl IntoIterator<Item = T>) -> Result<()> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::out_of_range(&range, self.len()));
        }
        let (mut left, rest) = self.split_at_index(range.start);
        let (_, right) = rest.split_at_index(range.end - range.start);
        left.extend(items);
        left.append(right);
        *self = left;
        return Ok(());
    }

    /// A new tree holding the items in `range` (item indices).
    pub fn slice(&self, range: Range<usize>) -> Result<SummarizedTree<T>> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::out_of_range(&range, self.len()));
        }
        let (_, rest) = self.split_at_index(range.start);
        let (middle, _) = rest.split_at_index(range.end - range.start);
        return Ok(middle);
    }

    /// Total length under a measure that is not a `Dimension`, because it
    /// depends on more than the summary. `measure` sizes a whole subtree
    /// from its summary when it can; otherwise `item_len` is applied to
    /// each item below it.
    pub fn measured_len<M, L>(&self, measure: &M, item_len: &L) -> usize
    where
        M: Fn(&T::Summary) -> Option<usize>,
        L: Fn(&T) -> usize,
    {
        if let Some(len) = measure(self.summary()) {
            return len;
        }
        return match self.0.as_ref() {
            Node::Internal { children, .. } => children
                .iter()
                .map(|child| child.measured_len(measure, item_len))
                .sum(),
            Node::Leaf { items, .. } => items.iter().map(item_len).sum(),
        };
    }

    /// Find the item spanning `target` under the same kind of measure as
    /// `measured_len`, resolving boundaries like `Bias::Right`. Items of
    /// length zero are never returned. Returns the item's index and the
    /// measured length before it.
    pub fn seek_measured<M, L>(&self, target: usize, measure: &M, item_len: &L) -> Option<(usize, usize)>
    where
        M: Fn(&T::Summary) -> Option<usize>,
        L: Fn(&T) -> usize,
    {
        let mut start = 0;
        let mut index = 0;
        if self.seek_measured_recursive(target, &mut start, &mut index, measure, item_len) {
            return Some((index, start));
        }
        return None;
    }

    fn seek_measured_recursive<M, L>(
        &self,
        target: usize,
        start: &mut usize,
        index: &mut usize,
        measure: &M,
        item_len: &L,
    ) -> bool
    where
        M: Fn(&T::Summary) -> Option<usize>,
        L: Fn(&T) -> usize,
    {
        if let Some(len) = measure(self.summary()) {
            if target >= *start + len {
                *start += len;
                *index += self.len();
                return false;
            }
        }
        match self.0.as_ref() {
            Node::Internal { children, .. } => {
                for child in children {
                    if child.seek_measured_recursive(target, start, index, measure, item_len) {
                        return true;
                    }
                }
                return false;
            }
            Node::Leaf { items, .. } => {
                for item in items {
                    let len = item_len(item);
                    if target < *start + len {
                        return true;
                    }
                    *start += len;
                    *index += 1;
                }
                return false;
            }
        }
    }

    /// A cursor positioned on the first item, seeking by dimension `D`.
    pub fn cursor<D: Dimension<T::Summary>>(&self) -> Cursor<'_, T, D> {
        return Cursor::new(self);
    }

    /// Iterate over every item in order.
    pub fn iter(&self) -> Iter<'_, T> {
        return Iter::new(self);
    }

    /// Verify structural invariants: uniform height, node fan-out and
    /// cached summaries.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self)
    where
        T::Summary: PartialEq,
    {
        match self.0.as_ref() {
            Node::Internal {
                height,
                summary,
                count,
                children,
            } => {
                assert!(!children.is_empty() && children.len() <= 2 * TREE_BASE);
                for child in children {
                    assert_eq!(child.height() + 1, *height);
                    child.check_invariants();
                }
                let expected = sum_summaries(children.iter().map(|child| child.summary()));
                assert_eq!(&expected, summary);
                assert_eq!(children.iter().map(|child| child.len()).sum::<usize>(), *count);
            }
            Node::Leaf {
                summary,
                items,
                summaries,
            } => {
                assert!(items.len() <= 2 * TREE_BASE);
                assert_eq!(items.len(), summaries.len());
                for (item, cached) in items.iter().zip(summaries) {
                    assert_eq!(&item.summary(), cached);
                }
                assert_eq!(&sum_summaries(summaries.iter()), summary);
            }
        }
    }
}

impl<T: Item> FromIterator<T> for SummarizedTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        return Self::from_items(iter);
    }
}

impl<T: Item + fmt::Debug> fmt::Debug for SummarizedTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.debug_list().entries(self.iter()).finish();
    }
}

fn sum_summaries<'a, S: Summary + 'a>(summaries: impl Iterator<Item = &'a S>) -> S {
    let mut total = S::default();
    for summary in summaries {
        total.add_summary(summary);
    }
    return total;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Num(u64);

    #[derive(Clone, Debug, Default, PartialEq, Eq)]
    struct NumSummary {
        count: usize,
        sum: u64,
        max: u64,
    }

    impl Summary for NumSummary {
        fn add_summary(&mut self, other: &Self) {
            self.count += other.count;
            self.sum += other.sum;
            self.max = self.max.max(other.max);
        }
    }

    impl Item for Num {
        type Summary = NumSummary;

        fn summary(&self) -> NumSummary {
            return NumSummary {
                count: 1,
                sum: self.0,
                max: self.0,
            };
        }
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
    struct Sum(u64);

    impl Dimension<NumSummary> for Sum {
        fn add_summary(&mut self, summary: &NumSummary) {
            self.0 += summary.sum;
        }
    }

    fn tree_of(range: Range<u64>) -> SummarizedTree<Num> {
        return range.map(Num).collect();
    }

    fn values(tree: &SummarizedTree<Num>) -> Vec<u64> {
        return tree.iter().map(|n| n.0).collect();
    }

    #[test]
    fn empty_tree() {
        let tree = SummarizedTree::<Num>::new();
        assert!(tree.is_empty());
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.first(), None);
        assert_eq!(tree.iter().count(), 0);
    }

    #[test]
    fn push_keeps_order_and_summary() {
        let mut tree = SummarizedTree::new();
        for i in 0..500 {
            tree.push(Num(i));
        }
        tree.check_invariants();
        assert_eq!(tree.len(), 500);
        assert_eq!(tree.summary().sum, (0..500).sum::<u64>());
        assert_eq!(values(&tree), (0..500).collect::<Vec<_>>());
        assert!(tree.height() >= 2);
    }

    #[test]
    fn append_trees_of_different_heights() {
        let mut small = tree_of(0..3);
        small.append(tree_of(3..400));
        small.check_invariants();
        assert_eq!(values(&small), (0..400).collect::<Vec<_>>());

        let mut big = tree_of(0..400);
        big.append(tree_of(400..403));
        big.check_invariants();
        assert_eq!(values(&big), (0..403).collect::<Vec<_>>());
    }

    #[test]
    fn get_by_index() {
        let tree = tree_of(0..300);
        assert_eq!(tree.get(0), Some(&Num(0)));
        assert_eq!(tree.get(177), Some(&Num(177)));
        assert_eq!(tree.get(300), None);
    }

    #[test]
    fn split_at_index_partitions() {
        let tree = tree_of(0..257);
        for index in [0, 1, 12, 100, 256, 257] {
            let (left, right) = tree.split_at_index(index);
            left.check_invariants();
            right.check_invariants();
            assert_eq!(left.len(), index);
            assert_eq!(values(&left), (0..index as u64).collect::<Vec<_>>());
            assert_eq!(values(&right), (index as u64..257).collect::<Vec<_>>());
        }
    }

    #[test]
    fn split_at_dimension_respects_bias() {
        // Items 1, 2, 3, 4 end at sums 1, 3, 6, 10.
        let tree = tree_of(1..5);
        let (left, right) = tree.split_at(&Sum(3), Bias::Left);
        assert_eq!(values(&left), vec![1]);
        assert_eq!(values(&right), vec![2, 3, 4]);

        let (left, right) = tree.split_at(&Sum(3), Bias::Right);
        assert_eq!(values(&left), vec![1, 2]);
        assert_eq!(values(&right), vec![3, 4]);
    }

    #[test]
    fn splice_replaces_range() {
        let mut tree = tree_of(0..100);
        tree.splice(10..20, vec![Num(1000), Num(1001)]).unwrap();
        tree.check_invariants();
        assert_eq!(tree.len(), 92);
        assert_eq!(tree.get(10), Some(&Num(1000)));
        assert_eq!(tree.get(12), Some(&Num(20)));
    }

    #[test]
    fn splice_out_of_range_fails() {
        let mut tree = tree_of(0..10);
        let err = tree.splice(5..11, Vec::new()).unwrap_err();
        assert_eq!(err, Error::OutOfRange { start: 5, end: 11, len: 10 });
        assert_eq!(tree.len(), 10);
    }

    #[test]
    fn slice_returns_copy() {
        let tree = tree_of(0..50);
        let slice = tree.slice(5..9).unwrap();
        assert_eq!(values(&slice), vec![5, 6, 7, 8]);
        assert!(tree.slice(9..5).is_err());
    }

    #[test]
    fn old_versions_are_unchanged() {
        let original = tree_of(0..200);
        let mut edited = original.clone();
        edited.splice(0..100, Vec::new()).unwrap();
        edited.update_last(|n| n.0 = 9999);
        assert_eq!(values(&original), (0..200).collect::<Vec<_>>());
        assert_eq!(edited.last(), Some(&Num(9999)));
        assert_eq!(original.last(), Some(&Num(199)));
        edited.check_invariants();
    }

    #[test]
    fn measured_seek_matches_linear_scan() {
        // Odd numbers count as zero, so every subtree is sized item by item.
        let tree = tree_of(0..300);
        let item_len = |n: &Num| if n.0 % 2 == 0 { n.0 as usize } else { 0 };
        let exact = |_: &NumSummary| -> Option<usize> { None };
        let lengths: Vec<usize> = (0..300).map(|n| item_len(&Num(n))).collect();
        let total: usize = lengths.iter().sum();
        assert_eq!(tree.measured_len(&exact, &item_len), total);

        for target in [0, 1, 2, 3, 57, 1000, total - 1] {
            let mut start = 0;
            let mut expected = None;
            for (index, len) in lengths.iter().enumerate() {
                if target < start + len {
                    expected = Some((index, start));
                    break;
                }
                start += len;
            }
            assert_eq!(tree.seek_measured(target, &exact, &item_len), expected);
        }
        assert_eq!(tree.seek_measured(total, &exact, &item_len), None);

        // When every item counts, summaries size whole subtrees.
        let evens = tree_of(0..300);
        let doubled: SummarizedTree<Num> = evens.iter().map(|n| Num(n.0 * 2)).collect();
        let by_summary = |summary: &NumSummary| Some(summary.sum as usize);
        let by_item = |n: &Num| n.0 as usize;
        assert_eq!(doubled.measured_len(&by_summary, &by_item), doubled.measured_len(&exact, &by_item));
        for target in [0, 1, 2, 999, 50_000] {
            assert_eq!(
                doubled.seek_measured(target, &by_summary, &by_item),
                doubled.seek_measured(target, &exact, &by_item)
            );
        }
    }

    #[test]
    fn update_last_refreshes_summaries() {
        let mut tree = tree_of(0..100);
        assert!(tree.update_last(|n| n.0 = 1_000));
        tree.check_invariants();
        assert_eq!(tree.summary().max, 1_000);
        let mut empty = SummarizedTree::<Num>::new();
        assert!(!empty.update_last(|n| n.0 = 1));
    }
}
