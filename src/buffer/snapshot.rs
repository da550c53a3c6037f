// model = "claude-opus-4-5"
// created = "2026-02-04"
// modified = "2026-02-05"
// driver = "Isaac Clayton"

//! Immutable views of a buffer for background readers.
//!
//! A snapshot is the rope at a commit boundary plus the version vector
//! of that commit. Ropes share their nodes, so taking a snapshot is O(1)
//! and reading one never blocks the writer.

use std::ops::Range;

use crate::error::Result;
use crate::ot::primitives::Global;
use crate::rope::{OffsetUtf16, Point, PointUtf16, Rope};

#[derive(Clone, Debug)]
pub struct Snapshot {
    rope: Rope,
    version: Global,
}

impl Snapshot {
    pub(crate) fn new(rope: Rope, version: Global) -> Snapshot {
        return Snapshot { rope, version };
    }

    #[inline]
    pub fn rope(&self) -> &Rope {
        return &self.rope;
    }

    #[inline]
    pub fn version(&self) -> &Global {
        return &self.version;
    }

    pub fn text(&self) -> String {
        return self.rope.to_string();
    }

    pub fn text_for_range(&self, range: Range<usize>) -> Result<String> {
        return self.rope.text_for_range(range);
    }

    pub fn line(&self, row: u32) -> Result<String> {
        return self.rope.line(row);
    }

    pub fn line_len(&self, row: u32) -> Result<u32> {
        return self.rope.line_len(row);
    }

    #[inline]
    pub fn len(&self) -> usize {
        return self.rope.len();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        return self.rope.is_empty();
    }

    pub fn line_count(&self) -> u32 {
        return self.rope.line_count();
    }

    pub fn max_point(&self) -> Point {
        return self.rope.max_point();
    }

    pub fn chunks(&self) -> impl Iterator<Item = &str> + '_ {
        return self.rope.chunks();
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        return self.rope.chars();
    }

    // --- coordinates ---

    pub fn offset_to_point(&self, offset: usize) -> Result<Point> {
        return self.rope.offset_to_point(offset);
    }

    pub fn point_to_offset(&self, point: Point) -> Result<usize> {
        return self.rope.point_to_offset(point);
    }

    pub fn offset_to_utf16(&self, offset: usize) -> Result<OffsetUtf16> {
        return self.rope.offset_to_utf16(offset);
    }

    pub fn utf16_to_offset(&self, offset: OffsetUtf16) -> Result<usize> {
        return self.rope.utf16_to_offset(offset);
    }

    pub fn offset_to_point_utf16(&self, offset: usize) -> Result<PointUtf16> {
        return self.rope.offset_to_point_utf16(offset);
    }

    pub fn point_utf16_to_offset(&self, point: PointUtf16) -> Result<usize> {
        return self.rope.point_utf16_to_offset(point);
    }

    /// A BLAKE3 hash of the text. Replicas holding the same text have the
    /// same fingerprint regardless of how their ropes are chunked.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        for chunk in self.rope.chunks() {
            hasher.update(chunk.as_bytes());
        }
        return *hasher.finalize().as_bytes();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Snapshot>();
    }

    #[test]
    fn fingerprint_ignores_chunking() {
        let text = "line one\nline two\n".repeat(40);
        let whole = Snapshot::new(Rope::from(text.as_str()), Global::new());

        let mut pieces = Rope::new();
        for piece in text.as_bytes().chunks(7) {
            pieces.push(std::str::from_utf8(piece).unwrap());
        }
        let pieced = Snapshot::new(pieces, Global::new());

        assert_eq!(whole.fingerprint(), pieced.fingerprint());
        assert_eq!(whole.fingerprint(), *blake3::hash(text.as_bytes()).as_bytes());
        assert_ne!(whole.fingerprint(), Snapshot::new(Rope::from("other"), Global::new()).fingerprint());
    }

    #[test]
    fn reads_through_rope() {
        let snapshot = Snapshot::new(Rope::from("ab\ncd"), Global::new());
        assert_eq!(snapshot.line(1).unwrap(), "cd");
        assert_eq!(snapshot.offset_to_point(4).unwrap(), Point::new(1, 1));
        assert_eq!(snapshot.text_for_range(1..4).unwrap(), "b\nc");
        assert_eq!(snapshot.line_count(), 2);
    }
}
