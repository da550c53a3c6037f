// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-06"
// driver = "Isaac Clayton"

//! Persistent rope over bounded text chunks.
//!
//! The rope is a `SummarizedTree<Chunk>`. Each chunk summary counts bytes,
//! chars, UTF-16 units, lines and tabs, so any coordinate conversion is a
//! seek to the containing chunk plus a popcount inside it.
//!
//! Edits rebuild only the root-to-edit path: `replace` slices off the
//! prefix, pushes the new text and appends the suffix. Cloning a rope is an
//! `Arc` increment, and clones never observe later edits.

mod chunk;
mod point;

use std::fmt;
use std::ops::Range;

use tracing::trace;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tree::{Bias, Dimension, SummarizedTree, Summary};

pub use chunk::{Chunk, MAX_BASE, MIN_BASE};
pub use point::{OffsetUtf16, Point, PointUtf16};

/// Aggregate metrics for a run of text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextSummary {
    /// Length in bytes.
    pub len: usize,
    pub chars: usize,
    pub len_utf16: OffsetUtf16,
    /// Extent of the text: `row` counts newlines.
    pub lines: Point,
    pub lines_utf16: PointUtf16,
    pub tabs: usize,
}

impl TextSummary {
    pub fn from_text(text: &str) -> TextSummary {
        let mut summary = TextSummary::default();
        for ch in text.chars() {
            summary.len += ch.len_utf8();
            summary.chars += 1;
            summary.len_utf16.0 += ch.len_utf16();
            if ch == '\n' {
                summary.lines = Point::new(summary.lines.row + 1, 0);
                summary.lines_utf16 = PointUtf16::new(summary.lines_utf16.row + 1, 0);
            } else {
                summary.lines.column += ch.len_utf8() as u32;
                summary.lines_utf16.column += ch.len_utf16() as u32;
                if ch == '\t' {
                    summary.tabs += 1;
                }
            }
        }
        return summary;
    }
}

impl Summary for TextSummary {
    fn add_summary(&mut self, other: &Self) {
        self.len += other.len;
        self.chars += other.chars;
        self.len_utf16 += other.len_utf16;
        self.lines += other.lines;
        self.lines_utf16 += other.lines_utf16;
        self.tabs += other.tabs;
    }
}

impl Dimension<TextSummary> for usize {
    #[inline]
    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.len;
    }
}

impl Dimension<TextSummary> for OffsetUtf16 {
    #[inline]
    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.len_utf16;
    }
}

impl Dimension<TextSummary> for Point {
    #[inline]
    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.lines;
    }
}

impl Dimension<TextSummary> for PointUtf16 {
    #[inline]
    fn add_summary(&mut self, summary: &TextSummary) {
        *self += summary.lines_utf16;
    }
}

/// How large insertions are cut into chunks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Chunking {
    /// Insertions of at least this many bytes build chunks in parallel.
    pub parallel_threshold: usize,
    pub workers: usize,
}

impl Default for Chunking {
    fn default() -> Self {
        return Chunking::from(&Config::default());
    }
}

impl From<&Config> for Chunking {
    fn from(config: &Config) -> Self {
        return Chunking {
            parallel_threshold: config.parallel_threshold,
            workers: config.parallel_workers.max(1),
        };
    }
}

/// Anything that can be resolved to a byte offset in a rope.
pub trait ToOffset {
    fn to_offset(&self, rope: &Rope) -> Result<usize>;
}

impl ToOffset for usize {
    fn to_offset(&self, rope: &Rope) -> Result<usize> {
        rope.check_offset(*self)?;
        return Ok(*self);
    }
}

impl ToOffset for Point {
    fn to_offset(&self, rope: &Rope) -> Result<usize> {
        return rope.point_to_offset(*self);
    }
}

impl ToOffset for OffsetUtf16 {
    fn to_offset(&self, rope: &Rope) -> Result<usize> {
        return rope.utf16_to_offset(*self);
    }
}

impl ToOffset for PointUtf16 {
    fn to_offset(&self, rope: &Rope) -> Result<usize> {
        return rope.point_utf16_to_offset(*self);
    }
}

/// Split text into chunk-sized pieces on character boundaries, keeping the
/// final piece at least `MIN_BASE` bytes when the text allows it.
fn chunk_pieces(text: &str) -> Vec<&str> {
    let mut pieces = Vec::with_capacity(text.len() / MAX_BASE + 1);
    let mut rest = text;
    while !rest.is_empty() {
        let mut split = rest.len().min(MAX_BASE);
        if rest.len() > MAX_BASE && rest.len() - split < MIN_BASE {
            split = rest.len() / 2;
        }
        while !rest.is_char_boundary(split) {
            split -= 1;
        }
        let (piece, tail) = rest.split_at(split);
        pieces.push(piece);
        rest = tail;
    }
    return pieces;
}

/// Build a chunk tree from pieces on scoped worker threads, one subtree per
/// worker, then concatenate the subtrees in order.
fn build_parallel(pieces: &[&str], workers: usize) -> SummarizedTree<Chunk> {
    let per_worker = pieces.len().div_ceil(workers).max(1);
    trace!(pieces = pieces.len(), workers, "building chunks in parallel");
    let subtrees: Vec<SummarizedTree<Chunk>> = std::thread::scope(|scope| {
        let handles: Vec<_> = pieces
            .chunks(per_worker)
            .map(|group| {
                scope.spawn(move || SummarizedTree::from_items(group.iter().map(|piece| Chunk::new(piece))))
            })
            .collect();
        return handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect();
    });
    let mut tree = SummarizedTree::new();
    for subtree in subtrees {
        tree.append(subtree);
    }
    return tree;
}

/// An immutable-by-default, cheaply cloneable text buffer.
#[derive(Clone, Default)]
pub struct Rope {
    chunks: SummarizedTree<Chunk>,
}

impl Rope {
    pub fn new() -> Rope {
        return Rope {
            chunks: SummarizedTree::new(),
        };
    }

    fn from_chunk(chunk: Chunk) -> Rope {
        if chunk.is_empty() {
            return Rope::new();
        }
        return Rope {
            chunks: SummarizedTree::from_item(chunk),
        };
    }

    #[inline]
    pub fn summary(&self) -> TextSummary {
        return *self.chunks.summary();
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        return self.chunks.summary().len;
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.len() == 0;
    }

    #[inline]
    pub fn len_utf16(&self) -> OffsetUtf16 {
        return self.chunks.summary().len_utf16;
    }

    /// The point at the end of the text.
    #[inline]
    pub fn max_point(&self) -> Point {
        return self.chunks.summary().lines;
    }

    #[inline]
    pub fn line_count(&self) -> u32 {
        return self.max_point().row + 1;
    }

    // --- validation ---

    pub fn is_char_boundary(&self, offset: usize) -> bool {
        if offset == 0 || offset >= self.len() {
            return offset <= self.len();
        }
        let mut cursor = self.chunks.cursor::<usize>();
        cursor.seek(&offset, Bias::Right);
        return match cursor.item() {
            Some(chunk) => chunk.is_char_boundary(offset - cursor.start()),
            None => false,
        };
    }

    /// Fail unless `offset` is within the text and on a char boundary.
    pub fn check_offset(&self, offset: usize) -> Result<()> {
        if offset > self.len() {
            return Err(Error::out_of_range(&(offset..offset), self.len()));
        }
        if !self.is_char_boundary(offset) {
            return Err(Error::Encoding { offset });
        }
        return Ok(());
    }

    pub fn check_range(&self, range: &Range<usize>) -> Result<()> {
        if range.start > range.end || range.end > self.len() {
            return Err(Error::out_of_range(range, self.len()));
        }
        self.check_offset(range.start)?;
        self.check_offset(range.end)?;
        return Ok(());
    }

    /// Snap an offset to the nearest char boundary in the direction of
    /// `bias`, clamping to the text.
    pub fn clip_offset(&self, offset: usize, bias: Bias) -> usize {
        if offset >= self.len() {
            return self.len();
        }
        let mut cursor = self.chunks.cursor::<usize>();
        cursor.seek(&offset, Bias::Right);
        return match cursor.item() {
            Some(chunk) => cursor.start() + chunk.clip_offset(offset - cursor.start(), bias),
            None => self.len(),
        };
    }

    /// Snap a point into the text: rows past the end clamp to the last row,
    /// columns past the line end clamp to it, and columns inside a char
    /// move by `bias`.
    pub fn clip_point(&self, point: Point, bias: Bias) -> Point {
        let max = self.max_point();
        if point.row > max.row {
            return max;
        }
        let line_len = self.line_len(point.row).unwrap_or(0);
        let column = point.column.min(line_len);
        let Ok(line_start) = self.point_to_offset(Point::new(point.row, 0)) else {
            return max;
        };
        let offset = self.clip_offset(line_start + column as usize, bias);
        return self.offset_to_point(offset).unwrap_or(max);
    }

    // --- editing ---

    /// Append text at the end.
    pub fn push(&mut self, text: &str) {
        self.push_with(text, Chunking::default());
    }

    pub fn push_with(&mut self, mut text: &str, chunking: Chunking) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.chunks.last() {
            let fits = last.len() + text.len() <= MAX_BASE;
            if last.len() < MIN_BASE || fits {
                let mut take = text.len().min(MAX_BASE - last.len());
                while !text.is_char_boundary(take) {
                    take -= 1;
                }
                if take > 0 {
                    let (head, tail) = text.split_at(take);
                    self.chunks.update_last(|chunk| chunk.push_str(head));
                    text = tail;
                }
            }
        }
        if text.is_empty() {
            return;
        }

        let pieces = chunk_pieces(text);
        if text.len() >= chunking.parallel_threshold && chunking.workers > 1 {
            self.chunks.append(build_parallel(&pieces, chunking.workers));
        } else {
            self.chunks.extend(pieces.into_iter().map(Chunk::new));
        }
    }

    /// Concatenate another rope onto the end, merging the chunks at the
    /// seam when either is undersized.
    pub fn append(&mut self, other: Rope) {
        let Some(first) = other.chunks.first() else {
            return;
        };
        if let Some(last) = self.chunks.last() {
            let undersized = last.len() < MIN_BASE || first.len() < MIN_BASE;
            if undersized && last.len() + first.len() <= MAX_BASE {
                let head = first.as_str().to_owned();
                self.chunks.update_last(|chunk| chunk.push_str(&head));
                let (_, rest) = other.chunks.split_at_index(1);
                self.chunks.append(rest);
                return;
            }
        }
        self.chunks.append(other.chunks);
    }

    /// Concatenate another rope onto the front.
    pub fn prepend(&mut self, mut other: Rope) {
        other.append(std::mem::take(self));
        *self = other;
    }

    /// Split at a validated offset.
    fn split(&self, offset: usize) -> (Rope, Rope) {
        let (left, right) = self.chunks.split_at(&offset, Bias::Right);
        let overshoot = offset - left.summary().len;
        let mut left = Rope { chunks: left };
        if overshoot == 0 {
            return (left, Rope { chunks: right });
        }
        let Some(first) = right.first() else {
            return (left, Rope::new());
        };
        let (head, tail) = first.split_at(overshoot);
        let (_, rest) = right.split_at_index(1);
        left.append(Rope::from_chunk(head));
        let mut right = Rope::from_chunk(tail);
        right.append(Rope { chunks: rest });
        return (left, right);
    }

    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Result<()> {
        return self.replace_with(range, text, Chunking::default());
    }

    pub fn replace_with(&mut self, range: Range<usize>, text: &str, chunking: Chunking) -> Result<()> {
        self.check_range(&range)?;
        let (mut prefix, rest) = self.split(range.start);
        let (_, suffix) = rest.split(range.end - range.start);
        prefix.push_with(text, chunking);
        prefix.append(suffix);
        *self = prefix;
        return Ok(());
    }

    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        return self.replace(offset..offset, text);
    }

    pub fn delete(&mut self, range: Range<usize>) -> Result<()> {
        return self.replace(range, "");
    }

    /// A new rope holding the text in `range`.
    pub fn slice(&self, range: Range<usize>) -> Result<Rope> {
        self.check_range(&range)?;
        let (_, rest) = self.split(range.start);
        let (middle, _) = rest.split(range.end - range.start);
        return Ok(middle);
    }

    // --- reading ---

    pub fn text_for_range(&self, range: Range<usize>) -> Result<String> {
        return Ok(self.slice(range)?.to_string());
    }

    /// The text of row `row`, without its newline.
    pub fn line(&self, row: u32) -> Result<String> {
        let start = self.point_to_offset(Point::new(row, 0))?;
        let len = self.line_len(row)?;
        return self.text_for_range(start..start + len as usize);
    }

    /// Length in bytes of row `row`, without its newline.
    pub fn line_len(&self, row: u32) -> Result<u32> {
        let max = self.max_point();
        if row > max.row {
            return Err(Error::InvalidPoint { row, column: 0 });
        }
        if row == max.row {
            return Ok(max.column);
        }
        let start = self.point_to_offset(Point::new(row, 0))?;
        let next = self.point_to_offset(Point::new(row + 1, 0))?;
        return Ok((next - start - 1) as u32);
    }

    /// The text chunks, in order.
    pub fn chunks(&self) -> impl Iterator<Item = &str> + '_ {
        return self.chunks.iter().map(Chunk::as_str);
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        return self.chunks().flat_map(str::chars);
    }

    pub fn bytes(&self) -> impl Iterator<Item = u8> + '_ {
        return self.chunks().flat_map(str::bytes);
    }

    // --- coordinate conversion ---

    pub fn offset_to_point(&self, offset: usize) -> Result<Point> {
        self.check_offset(offset)?;
        let mut cursor = self.chunks.cursor::<usize>();
        cursor.seek(&offset, Bias::Left);
        let Some(chunk) = cursor.item() else {
            return Ok(Point::zero());
        };
        let start = cursor.summary_start();
        return Ok(start.lines + chunk.offset_to_point(offset - start.len));
    }

    pub fn offset_to_point_utf16(&self, offset: usize) -> Result<PointUtf16> {
        self.check_offset(offset)?;
        let mut cursor = self.chunks.cursor::<usize>();
        cursor.seek(&offset, Bias::Left);
        let Some(chunk) = cursor.item() else {
            return Ok(PointUtf16::default());
        };
        let start = cursor.summary_start();
        return Ok(start.lines_utf16 + chunk.offset_to_point_utf16(offset - start.len));
    }

    pub fn offset_to_utf16(&self, offset: usize) -> Result<OffsetUtf16> {
        self.check_offset(offset)?;
        let mut cursor = self.chunks.cursor::<usize>();
        cursor.seek(&offset, Bias::Left);
        let Some(chunk) = cursor.item() else {
            return Ok(OffsetUtf16::default());
        };
        let start = cursor.summary_start();
        return Ok(start.len_utf16 + chunk.offset_to_utf16(offset - start.len));
    }

    pub fn point_to_offset(&self, point: Point) -> Result<usize> {
        let invalid = Error::InvalidPoint {
            row: point.row,
            column: point.column,
        };
        if point > self.max_point() {
            return Err(invalid);
        }
        let mut cursor = self.chunks.cursor::<Point>();
        cursor.seek(&point, Bias::Left);
        let Some(chunk) = cursor.item() else {
            return Ok(0);
        };
        let start = cursor.summary_start();
        let overshoot = chunk.point_to_offset(point - start.lines).ok_or(invalid)?;
        if !chunk.is_char_boundary(overshoot) {
            return Err(Error::Encoding {
                offset: start.len + overshoot,
            });
        }
        return Ok(start.len + overshoot);
    }

    pub fn point_utf16_to_offset(&self, point: PointUtf16) -> Result<usize> {
        let invalid = Error::InvalidPoint {
            row: point.row,
            column: point.column,
        };
        if point > self.chunks.summary().lines_utf16 {
            return Err(invalid);
        }
        let mut cursor = self.chunks.cursor::<PointUtf16>();
        cursor.seek(&point, Bias::Left);
        let Some(chunk) = cursor.item() else {
            return Ok(0);
        };
        let start = cursor.summary_start();
        let overshoot = chunk
            .point_utf16_to_offset(point - start.lines_utf16)
            .ok_or(invalid)?;
        if !chunk.is_char_boundary(overshoot) {
            return Err(Error::Encoding {
                offset: start.len + overshoot,
            });
        }
        return Ok(start.len + overshoot);
    }

    pub fn utf16_to_offset(&self, target: OffsetUtf16) -> Result<usize> {
        if target > self.len_utf16() {
            return Err(Error::out_of_range(&(target.0..target.0), self.len_utf16().0));
        }
        let mut cursor = self.chunks.cursor::<OffsetUtf16>();
        cursor.seek(&target, Bias::Left);
        let Some(chunk) = cursor.item() else {
            return Ok(0);
        };
        let start = cursor.summary_start();
        let overshoot = chunk
            .utf16_to_offset(target - start.len_utf16)
            .ok_or(Error::out_of_range(&(target.0..target.0), self.len_utf16().0))?;
        if !chunk.is_char_boundary(overshoot) {
            return Err(Error::Encoding {
                offset: start.len + overshoot,
            });
        }
        return Ok(start.len + overshoot);
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        self.chunks.check_invariants();
        let count = self.chunks.len();
        for (i, chunk) in self.chunks.iter().enumerate() {
            assert!(chunk.len() <= MAX_BASE);
            assert!(!chunk.is_empty() || count == 1, "empty chunk at {i}");
        }
    }
}

impl From<&str> for Rope {
    fn from(text: &str) -> Self {
        let mut rope = Rope::new();
        rope.push(text);
        return rope;
    }
}

impl From<String> for Rope {
    fn from(text: String) -> Self {
        return Rope::from(text.as_str());
    }
}

impl PartialEq for Rope {
    fn eq(&self, other: &Self) -> bool {
        return self.len() == other.len() && self.bytes().eq(other.bytes());
    }
}

impl Eq for Rope {}

impl fmt::Display for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.chunks() {
            f.write_str(chunk)?;
        }
        return Ok(());
    }
}

impl fmt::Debug for Rope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return fmt::Debug::fmt(&self.to_string(), f);
    }
}
