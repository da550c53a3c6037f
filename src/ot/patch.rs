// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-09"
// driver = "Isaac Clayton"

//! Text-carrying patches: what a commit did to the text.
//!
//! A patch is a normalized list of edits. Each edit records the replaced
//! range in the old text, the range it occupies in the new text, and both
//! texts, so a patch can be inverted without access to the document.
//!
//! Normalized means sorted, non-overlapping and non-adjacent: between any
//! two edits there is at least one unchanged byte.
//!
//! # Composition
//!
//! `a.compose(&b)` where `a: T0 -> T1` and `b: T1 -> T2` yields the net
//! patch `T0 -> T2`. Edits of `a` (by their new range) and `b` (by their
//! old range) are clustered in `T1` coordinates; each cluster becomes one
//! edit. Clusters whose net effect is the identity are dropped.

use std::ops::Range;
use std::sync::Arc;

use crate::error::Result;
use crate::rope::{Chunking, Rope};
use crate::tree::Bias;

/// One replaced region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub old: Range<usize>,
    pub new: Range<usize>,
    pub old_text: Arc<str>,
    pub new_text: Arc<str>,
}

impl Edit {
    /// Replace `old_text`, which starts at `old_start` in the old text and
    /// at `new_start` in the new text, with `new_text`.
    pub fn new(old_start: usize, new_start: usize, old_text: &str, new_text: &str) -> Edit {
        return Edit {
            old: old_start..old_start + old_text.len(),
            new: new_start..new_start + new_text.len(),
            old_text: old_text.into(),
            new_text: new_text.into(),
        };
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.old.is_empty() && self.new.is_empty();
    }

    /// Signed length change.
    #[inline]
    pub fn delta(&self) -> isize {
        return self.new.len() as isize - self.old.len() as isize;
    }

    pub fn invert(&self) -> Edit {
        return Edit {
            old: self.new.clone(),
            new: self.old.clone(),
            old_text: self.new_text.clone(),
            new_text: self.old_text.clone(),
        };
    }
}

#[inline]
fn shift(offset: usize, delta: isize) -> usize {
    return offset.wrapping_add_signed(delta);
}

/// A normalized list of edits.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patch(Vec<Edit>);

impl Patch {
    pub fn empty() -> Patch {
        return Patch(Vec::new());
    }

    /// Build a patch from edits sorted by old range. Empty edits are dropped
    /// and adjacent edits are merged.
    pub fn new(edits: Vec<Edit>) -> Patch {
        let mut normalized: Vec<Edit> = Vec::with_capacity(edits.len());
        for edit in edits {
            if edit.is_empty() {
                continue;
            }
            if let Some(last) = normalized.last_mut() {
                debug_assert!(last.old.end <= edit.old.start);
                if last.old.end == edit.old.start {
                    last.old.end = edit.old.end;
                    last.new.end = edit.new.end;
                    last.old_text = format!("{}{}", last.old_text, edit.old_text).into();
                    last.new_text = format!("{}{}", last.new_text, edit.new_text).into();
                    continue;
                }
            }
            normalized.push(edit);
        }
        return Patch(normalized);
    }

    /// A patch holding one edit.
    pub fn single(edit: Edit) -> Patch {
        return Patch::new(vec![edit]);
    }

    /// The single edit turning `old` into `new`, trimmed to the region
    /// between their common prefix and common suffix.
    pub fn diff(old: &str, new: &str) -> Patch {
        let mut prefix = old
            .bytes()
            .zip(new.bytes())
            .take_while(|(a, b)| a == b)
            .count();
        while !old.is_char_boundary(prefix) {
            prefix -= 1;
        }
        let max_suffix = old.len().min(new.len()) - prefix;
        let mut suffix = old
            .bytes()
            .rev()
            .zip(new.bytes().rev())
            .take(max_suffix)
            .take_while(|(a, b)| a == b)
            .count();
        while !old.is_char_boundary(old.len() - suffix) {
            suffix -= 1;
        }
        return Patch::single(Edit::new(
            prefix,
            prefix,
            &old[prefix..old.len() - suffix],
            &new[prefix..new.len() - suffix],
        ));
    }

    #[inline]
    pub fn edits(&self) -> &[Edit] {
        return &self.0;
    }

    #[inline]
    pub fn into_edits(self) -> Vec<Edit> {
        return self.0;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.0.is_empty();
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.0.len();
    }

    /// Net length change.
    pub fn delta(&self) -> isize {
        return self.0.iter().map(Edit::delta).sum();
    }

    /// The patch that undoes this one.
    pub fn invert(&self) -> Patch {
        return Patch(self.0.iter().map(Edit::invert).collect());
    }

    /// The net patch of applying `self` and then `other`.
    pub fn compose(&self, other: &Patch) -> Patch {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let mut composed = Vec::new();
        let mut first = self.0.iter().peekable();
        let mut second = other.0.iter().peekable();
        // Length changes of edits before the current cluster.
        let mut first_delta = 0isize;
        let mut second_delta = 0isize;

        loop {
            let mut from_first: Vec<&Edit> = Vec::new();
            let mut from_second: Vec<&Edit> = Vec::new();
            let (start, mut end) = match (first.peek(), second.peek()) {
                (None, None) => break,
                (Some(a), Some(b)) if a.new.start <= b.old.start => (a.new.start, a.new.end),
                (Some(a), None) => (a.new.start, a.new.end),
                (_, Some(b)) => (b.old.start, b.old.end),
            };

            // Grow the cluster while either side has an edit touching it.
            loop {
                if let Some(a) = first.next_if(|a| a.new.start <= end) {
                    end = end.max(a.new.end);
                    from_first.push(a);
                    continue;
                }
                if let Some(b) = second.next_if(|b| b.old.start <= end) {
                    end = end.max(b.old.end);
                    from_second.push(b);
                    continue;
                }
                break;
            }

            // The intermediate text covered by the cluster.
            let mut pieces: Vec<(usize, usize, &str)> = from_first
                .iter()
                .map(|a| (a.new.start, a.new.end, &*a.new_text))
                .chain(from_second.iter().map(|b| (b.old.start, b.old.end, &*b.old_text)))
                .collect();
            pieces.sort_by_key(|piece| piece.0);
            let mut middle = String::with_capacity(end - start);
            let mut filled = start;
            for (piece_start, piece_end, text) in pieces {
                if piece_end > filled {
                    middle.push_str(&text[filled - piece_start..]);
                    filled = piece_end;
                }
            }

            let old_text = splice_texts(&middle, start, from_first.iter().map(|a| (&a.new, &*a.old_text)));
            let new_text = splice_texts(&middle, start, from_second.iter().map(|b| (&b.old, &*b.new_text)));

            if old_text != new_text {
                composed.push(Edit::new(
                    shift(start, -first_delta),
                    shift(start, second_delta),
                    &old_text,
                    &new_text,
                ));
            }
            first_delta += from_first.iter().map(|a| a.delta()).sum::<isize>();
            second_delta += from_second.iter().map(|b| b.delta()).sum::<isize>();
        }

        return Patch(composed);
    }

    /// Map an old offset to the new text. Offsets on an edit boundary or
    /// inside a replaced region go to the start of the replacement with
    /// `Bias::Left` and to its end with `Bias::Right`.
    pub fn map_offset(&self, offset: usize, bias: Bias) -> usize {
        let index = self.0.partition_point(|edit| edit.old.end < offset);
        let Some(edit) = self.0.get(index) else {
            return match self.0.last() {
                Some(last) => last.new.end + (offset - last.old.end),
                None => offset,
            };
        };
        if offset < edit.old.start {
            return edit.new.start - (edit.old.start - offset);
        }
        return match bias {
            Bias::Left => edit.new.start,
            Bias::Right => edit.new.end,
        };
    }

    /// Map an anchored offset to the new text, or `None` if the text it was
    /// attached to was replaced.
    pub fn map_anchor(&self, offset: usize, bias: Bias) -> Option<usize> {
        let index = self.0.partition_point(|edit| edit.old.end < offset);
        if let Some(edit) = self.0.get(index) {
            if edit.old.start < offset && offset < edit.old.end {
                return None;
            }
        }
        return Some(self.map_offset(offset, bias));
    }

    /// Re-express edits made before this patch in the text after it.
    ///
    /// Range starts move right and ends move left across changed text, so
    /// a rebased edit never swallows text this patch inserted. Text inserted
    /// strictly inside a range splits it: the replacement goes into the
    /// first piece and the later pieces only delete.
    pub fn rebase_edits(&self, edits: Vec<(Range<usize>, Arc<str>)>) -> Vec<(Range<usize>, Arc<str>)> {
        if self.is_empty() {
            return edits;
        }
        let mut rebased = Vec::with_capacity(edits.len());
        for (range, text) in edits {
            let mut start = self.map_offset(range.start, Bias::Right);
            let end = self.map_offset(range.end, Bias::Left).max(start);
            let mut text = Some(text);
            let inside = self.0.iter().filter(|edit| {
                range.start < edit.old.start && edit.old.end < range.end && !edit.new_text.is_empty()
            });
            for edit in inside {
                let piece = text.take().unwrap_or_else(|| Arc::from(""));
                rebased.push((start..edit.new.start.max(start), piece));
                start = edit.new.end;
            }
            let piece = text.unwrap_or_else(|| Arc::from(""));
            rebased.push((start..end.max(start), piece));
        }
        return rebased;
    }

    /// Apply to a rope whose text is this patch's old text.
    pub fn apply(&self, rope: &mut Rope, chunking: Chunking) -> Result<()> {
        for edit in self.0.iter().rev() {
            rope.replace_with(edit.old.clone(), &edit.new_text, chunking)?;
        }
        return Ok(());
    }
}

/// Replace each `range` (absolute, inside `middle` which starts at `start`)
/// with its text.
fn splice_texts<'a>(
    middle: &str,
    start: usize,
    replacements: impl Iterator<Item = (&'a Range<usize>, &'a str)>,
) -> String {
    let mut spliced = String::with_capacity(middle.len());
    let mut cursor = start;
    for (range, text) in replacements {
        spliced.push_str(&middle[cursor - start..range.start - start]);
        spliced.push_str(text);
        cursor = range.end;
    }
    spliced.push_str(&middle[cursor - start..]);
    return spliced;
}
