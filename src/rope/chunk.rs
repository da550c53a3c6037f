// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-06"
// driver = "Isaac Clayton"

//! Fixed-capacity text chunks with bit-packed boundary maps.
//!
//! A chunk holds at most `MAX_BASE` (128) bytes, so every per-byte property
//! fits in one `u128`. Bit `i` of each map describes byte `i`:
//!
//! - `chars`: a UTF-8 character starts here
//! - `chars_utf16`: a UTF-16 code unit starts here (a 4-byte character
//!   also sets the bit after its first byte, for its low surrogate)
//! - `newlines`: the byte is `\n`
//! - `tabs`: the byte is `\t`
//!
//! Counting anything before an offset is then a mask and a popcount.

use crate::tree::{Bias, Item};

use super::point::{OffsetUtf16, Point, PointUtf16};
use super::TextSummary;

/// Chunks below this size are merged with their neighbors when possible.
pub const MIN_BASE: usize = 64;
/// Maximum size of a chunk in bytes.
pub const MAX_BASE: usize = 128;

/// Bits for the bytes before `offset`.
#[inline(always)]
fn mask_below(offset: usize) -> u128 {
    if offset >= 128 {
        return u128::MAX;
    }
    return (1u128 << offset) - 1;
}

/// Position of the `n`th (zero-based) set bit.
#[inline]
fn nth_set_bit(mut bits: u128, n: usize) -> Option<usize> {
    for _ in 0..n {
        if bits == 0 {
            return None;
        }
        bits &= bits - 1;
    }
    if bits == 0 {
        return None;
    }
    return Some(bits.trailing_zeros() as usize);
}

/// A bounded run of text that never splits a character.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chunk {
    text: String,
    chars: u128,
    chars_utf16: u128,
    newlines: u128,
    tabs: u128,
}

impl Chunk {
    /// Build a chunk. `text` must be at most `MAX_BASE` bytes.
    pub fn new(text: &str) -> Chunk {
        let mut chunk = Chunk {
            text: String::with_capacity(MAX_BASE),
            chars: 0,
            chars_utf16: 0,
            newlines: 0,
            tabs: 0,
        };
        chunk.push_str(text);
        return chunk;
    }

    /// Append text, extending the boundary maps.
    pub fn push_str(&mut self, text: &str) {
        debug_assert!(self.text.len() + text.len() <= MAX_BASE);
        let base = self.text.len();
        for (i, ch) in text.char_indices() {
            let at = base + i;
            self.chars |= 1 << at;
            self.chars_utf16 |= 1 << at;
            if ch.len_utf16() == 2 {
                self.chars_utf16 |= 1 << (at + 1);
            }
            if ch == '\n' {
                self.newlines |= 1 << at;
            } else if ch == '\t' {
                self.tabs |= 1 << at;
            }
        }
        self.text.push_str(text);
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        return &self.text;
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.text.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.text.is_empty();
    }

    /// Split into `[0, offset)` and `[offset, len)`. `offset` must be a
    /// character boundary.
    pub fn split_at(&self, offset: usize) -> (Chunk, Chunk) {
        let (left, right) = self.text.split_at(offset);
        return (Chunk::new(left), Chunk::new(right));
    }

    #[inline]
    pub fn is_char_boundary(&self, offset: usize) -> bool {
        if offset >= self.len() {
            return offset == self.len();
        }
        return self.chars & (1 << offset) != 0;
    }

    /// Start of the line containing `offset`, within this chunk.
    #[inline]
    fn line_start(&self, offset: usize) -> usize {
        let newlines = self.newlines & mask_below(offset);
        if newlines == 0 {
            return 0;
        }
        return 128 - newlines.leading_zeros() as usize;
    }

    /// Start of row `row` within this chunk, if the chunk has that many rows.
    fn row_start(&self, row: u32) -> Option<usize> {
        if row == 0 {
            return Some(0);
        }
        return nth_set_bit(self.newlines, row as usize - 1).map(|newline| newline + 1);
    }

    /// End of the line starting at `line_start`: the next newline, or the
    /// end of the chunk.
    fn line_end(&self, line_start: usize) -> usize {
        let newlines = self.newlines & !mask_below(line_start);
        if newlines == 0 {
            return self.len();
        }
        return newlines.trailing_zeros() as usize;
    }

    pub fn offset_to_point(&self, offset: usize) -> Point {
        let row = (self.newlines & mask_below(offset)).count_ones();
        let column = offset - self.line_start(offset);
        return Point::new(row, column as u32);
    }

    pub fn offset_to_point_utf16(&self, offset: usize) -> PointUtf16 {
        let row = (self.newlines & mask_below(offset)).count_ones();
        let line_start = self.line_start(offset);
        let units = self.chars_utf16 & mask_below(offset) & !mask_below(line_start);
        return PointUtf16::new(row, units.count_ones());
    }

    pub fn offset_to_utf16(&self, offset: usize) -> OffsetUtf16 {
        return OffsetUtf16((self.chars_utf16 & mask_below(offset)).count_ones() as usize);
    }

    /// Byte offset of a point relative to this chunk, or `None` if the
    /// column runs past the end of its line.
    pub fn point_to_offset(&self, point: Point) -> Option<usize> {
        let line_start = self.row_start(point.row)?;
        let offset = line_start + point.column as usize;
        if offset > self.line_end(line_start) {
            return None;
        }
        return Some(offset);
    }

    /// Byte offset of a UTF-16 point relative to this chunk. The result may
    /// fall inside a character when the column splits a surrogate pair.
    pub fn point_utf16_to_offset(&self, point: PointUtf16) -> Option<usize> {
        let line_start = self.row_start(point.row)?;
        let line_end = self.line_end(line_start);
        let units = self.chars_utf16 & !mask_below(line_start) & mask_below(line_end);
        return match nth_set_bit(units, point.column as usize) {
            Some(offset) => Some(offset),
            None if units.count_ones() == point.column => Some(line_end),
            None => None,
        };
    }

    /// Byte offset of a UTF-16 offset relative to this chunk, under the
    /// same caveat as `point_utf16_to_offset`.
    pub fn utf16_to_offset(&self, target: OffsetUtf16) -> Option<usize> {
        return match nth_set_bit(self.chars_utf16, target.0) {
            Some(offset) => Some(offset),
            None if self.chars_utf16.count_ones() as usize == target.0 => Some(self.len()),
            None => None,
        };
    }

    /// Snap `offset` to a character boundary.
    pub fn clip_offset(&self, offset: usize, bias: Bias) -> usize {
        if self.is_char_boundary(offset) || offset > self.len() {
            return offset.min(self.len());
        }
        return match bias {
            Bias::Left => {
                let starts = self.chars & mask_below(offset);
                127 - starts.leading_zeros() as usize
            }
            Bias::Right => {
                let starts = self.chars & !mask_below(offset + 1);
                if starts == 0 {
                    self.len()
                } else {
                    starts.trailing_zeros() as usize
                }
            }
        };
    }

    pub fn text_summary(&self) -> TextSummary {
        return TextSummary {
            len: self.len(),
            chars: self.chars.count_ones() as usize,
            len_utf16: OffsetUtf16(self.chars_utf16.count_ones() as usize),
            lines: self.offset_to_point(self.len()),
            lines_utf16: self.offset_to_point_utf16(self.len()),
            tabs: self.tabs.count_ones() as usize,
        };
    }
}

impl Item for Chunk {
    type Summary = TextSummary;

    fn summary(&self) -> TextSummary {
        return self.text_summary();
    }
}
