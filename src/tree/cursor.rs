// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Cursors over a `SummarizedTree`.
//!
//! A cursor borrows the tree it walks, so a tree cannot be edited while a
//! cursor over it is alive. To search an edited tree, create a new cursor.

use std::marker::PhantomData;

use smallvec::SmallVec;

use super::{Bias, Dimension, Item, Node, SummarizedTree, Summary};

struct StackEntry<'a, T: Item> {
    tree: &'a SummarizedTree<T>,
    index: usize,
}

impl<'a, T: Item> Clone for StackEntry<'a, T> {
    fn clone(&self) -> Self {
        return *self;
    }
}

impl<'a, T: Item> Copy for StackEntry<'a, T> {}

/// A position within a tree, searchable by dimension `D`.
///
/// The cursor always tracks the full summary of everything before the
/// current item, so any dimension can be read from `summary_start`.
pub struct Cursor<'a, T: Item, D> {
    tree: &'a SummarizedTree<T>,
    stack: SmallVec<[StackEntry<'a, T>; 16]>,
    position: T::Summary,
    index: usize,
    _dimension: PhantomData<D>,
}

impl<'a, T: Item, D: Dimension<T::Summary>> Cursor<'a, T, D> {
    pub(super) fn new(tree: &'a SummarizedTree<T>) -> Cursor<'a, T, D> {
        let mut cursor = Cursor {
            tree,
            stack: SmallVec::new(),
            position: T::Summary::default(),
            index: 0,
            _dimension: PhantomData,
        };
        cursor.descend_to_first();
        return cursor;
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.position = T::Summary::default();
        self.index = 0;
    }

    fn descend_to_first(&mut self) {
        self.reset();
        if self.tree.is_empty() {
            return;
        }
        let mut tree = self.tree;
        loop {
            self.stack.push(StackEntry { tree, index: 0 });
            let node: &'a Node<T> = &tree.0;
            match node {
                Node::Internal { children, .. } => tree = &children[0],
                Node::Leaf { .. } => return,
            }
        }
    }

    /// Move to the item containing `target`, searching from the root.
    ///
    /// Returns false and parks the cursor past the last item if no item
    /// matches. See `Bias` for how exact boundaries are resolved.
    pub fn seek(&mut self, target: &D, bias: Bias) -> bool {
        self.reset();
        let mut tree = self.tree;
        let mut start = D::default();
        loop {
            let node: &'a Node<T> = &tree.0;
            match node {
                Node::Internal { children, .. } => {
                    let mut descend = None;
                    for (i, child) in children.iter().enumerate() {
                        let mut end = start.clone();
                        end.add_summary(child.summary());
                        if bias.stops_at(target, &end) {
                            descend = Some(i);
                            break;
                        }
                        start = end;
                        self.position.add_summary(child.summary());
                        self.index += child.len();
                    }
                    let Some(i) = descend else {
                        self.stack.clear();
                        return false;
                    };
                    self.stack.push(StackEntry { tree, index: i });
                    tree = &children[i];
                }
                Node::Leaf { summaries, .. } => {
                    for (i, summary) in summaries.iter().enumerate() {
                        let mut end = start.clone();
                        end.add_summary(summary);
                        if bias.stops_at(target, &end) {
                            self.stack.push(StackEntry { tree, index: i });
                            return true;
                        }
                        start = end;
                        self.position.add_summary(summary);
                        self.index += 1;
                    }
                    self.stack.clear();
                    return false;
                }
            }
        }
    }

    /// The current item, or `None` past the end.
    pub fn item(&self) -> Option<&'a T> {
        let entry = self.stack.last()?;
        let node: &'a Node<T> = &entry.tree.0;
        return match node {
            Node::Leaf { items, .. } => items.get(entry.index),
            Node::Internal { .. } => None,
        };
    }

    fn item_summary(&self) -> Option<&'a T::Summary> {
        let entry = self.stack.last()?;
        let node: &'a Node<T> = &entry.tree.0;
        return match node {
            Node::Leaf { summaries, .. } => summaries.get(entry.index),
            Node::Internal { .. } => None,
        };
    }

    /// Summary of every item before the current one.
    #[inline]
    pub fn summary_start(&self) -> &T::Summary {
        return &self.position;
    }

    /// Position of the start of the current item.
    pub fn start(&self) -> D {
        return D::from_summary(&self.position);
    }

    /// Position of the end of the current item (the start, past the end).
    pub fn end(&self) -> D {
        let mut end = self.start();
        if let Some(summary) = self.item_summary() {
            end.add_summary(summary);
        }
        return end;
    }

    /// Index of the current item; equals the tree length past the end.
    #[inline]
    pub fn index(&self) -> usize {
        return self.index;
    }

    /// Advance to the next item.
    pub fn next(&mut self) {
        let Some(summary) = self.item_summary() else {
            return;
        };
        self.position.add_summary(summary);
        self.index += 1;

        loop {
            let Some(entry) = self.stack.last_mut() else {
                return;
            };
            entry.index += 1;
            if entry.index < entry.tree.child_count() {
                break;
            }
            self.stack.pop();
        }

        loop {
            let Some(&entry) = self.stack.last() else {
                return;
            };
            let node: &'a Node<T> = &entry.tree.0;
            match node {
                Node::Internal { children, .. } => {
                    self.stack.push(StackEntry {
                        tree: &children[entry.index],
                        index: 0,
                    });
                }
                Node::Leaf { .. } => return,
            }
        }
    }
}

/// Iterator over the items of a tree.
pub struct Iter<'a, T: Item> {
    cursor: Cursor<'a, T, ()>,
}

impl<'a, T: Item> Iter<'a, T> {
    pub(super) fn new(tree: &'a SummarizedTree<T>) -> Iter<'a, T> {
        return Iter {
            cursor: Cursor::new(tree),
        };
    }
}

impl<'a, T: Item> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let item = self.cursor.item()?;
        self.cursor.next();
        return Some(item);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    struct Word(&'static str);

    #[derive(Clone, Debug, Default)]
    struct Len(usize);

    impl Summary for Len {
        fn add_summary(&mut self, other: &Self) {
            self.0 += other.0;
        }
    }

    impl Item for Word {
        type Summary = Len;

        fn summary(&self) -> Len {
            return Len(self.0.len());
        }
    }

    impl Dimension<Len> for usize {
        fn add_summary(&mut self, summary: &Len) {
            *self += summary.0;
        }
    }

    fn words() -> SummarizedTree<Word> {
        let text = "the quick brown fox jumps over the lazy dog and keeps running far away";
        return text.split(' ').map(Word).collect();
    }

    #[test]
    fn seek_finds_containing_item() {
        let tree = words();
        let mut cursor = tree.cursor::<usize>();
        // "the" "quick" "brown": "brown" spans 8..13.
        assert!(cursor.seek(&9, Bias::Left));
        assert_eq!(cursor.item().map(|w| w.0), Some("brown"));
        assert_eq!(cursor.start(), 8);
        assert_eq!(cursor.end(), 13);
        assert_eq!(cursor.index(), 2);
    }

    #[test]
    fn seek_boundary_bias() {
        let tree = words();
        let mut cursor = tree.cursor::<usize>();
        assert!(cursor.seek(&3, Bias::Left));
        assert_eq!(cursor.item().map(|w| w.0), Some("the"));
        assert!(cursor.seek(&3, Bias::Right));
        assert_eq!(cursor.item().map(|w| w.0), Some("quick"));
    }

    #[test]
    fn seek_past_end() {
        let tree = words();
        let total = tree.summary().0;
        let mut cursor = tree.cursor::<usize>();
        assert!(!cursor.seek(&(total + 1), Bias::Left));
        assert!(cursor.item().is_none());
        assert_eq!(cursor.index(), tree.len());
        assert_eq!(cursor.start(), total);
        assert!(!cursor.seek(&total, Bias::Right));
    }

    #[test]
    fn next_walks_all_items_across_leaves() {
        let tree: SummarizedTree<Word> = (0..100).map(|_| Word("ab")).collect();
        let mut cursor = tree.cursor::<usize>();
        cursor.seek(&51, Bias::Left);
        assert_eq!(cursor.index(), 25);
        let mut seen = 0;
        while cursor.item().is_some() {
            assert_eq!(cursor.start(), (25 + seen) * 2);
            cursor.next();
            seen += 1;
        }
        assert_eq!(seen, 75);
        assert_eq!(cursor.index(), 100);
    }
}
