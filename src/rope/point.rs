// model = "claude-opus-4-5"
// created = "2026-02-03"
// modified = "2026-02-04"
// driver = "Isaac Clayton"

//! Coordinate types for addressing text in a rope.
//!
//! Byte offsets are plain `usize`. The other coordinates are newtypes so a
//! UTF-16 offset can never be passed where a byte offset is expected.

use std::cmp::Ordering;
use std::ops::{Add, AddAssign, Sub};

/// A zero-based row and byte column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub row: u32,
    pub column: u32,
}

impl Point {
    pub const fn new(row: u32, column: u32) -> Point {
        return Point { row, column };
    }

    pub const fn zero() -> Point {
        return Point { row: 0, column: 0 };
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        return self.row == 0 && self.column == 0;
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        return (self.row, self.column).cmp(&(other.row, other.column));
    }
}

/// Extending a point by the extent of following text: a multi-row extent
/// replaces the column, a single-row extent adds to it.
impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        if rhs.row == 0 {
            return Point::new(self.row, self.column + rhs.column);
        }
        return Point::new(self.row + rhs.row, rhs.column);
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        *self = *self + rhs;
    }
}

/// The extent from `rhs` to `self`. `self` must not be before `rhs`.
impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        debug_assert!(rhs <= self);
        if self.row == rhs.row {
            return Point::new(0, self.column - rhs.column);
        }
        return Point::new(self.row - rhs.row, self.column);
    }
}

/// A zero-based row and a column counted in UTF-16 code units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PointUtf16 {
    pub row: u32,
    pub column: u32,
}

impl PointUtf16 {
    pub const fn new(row: u32, column: u32) -> PointUtf16 {
        return PointUtf16 { row, column };
    }
}

impl PartialOrd for PointUtf16 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for PointUtf16 {
    fn cmp(&self, other: &Self) -> Ordering {
        return (self.row, self.column).cmp(&(other.row, other.column));
    }
}

impl Add for PointUtf16 {
    type Output = PointUtf16;

    fn add(self, rhs: PointUtf16) -> PointUtf16 {
        if rhs.row == 0 {
            return PointUtf16::new(self.row, self.column + rhs.column);
        }
        return PointUtf16::new(self.row + rhs.row, rhs.column);
    }
}

impl AddAssign for PointUtf16 {
    fn add_assign(&mut self, rhs: PointUtf16) {
        *self = *self + rhs;
    }
}

impl Sub for PointUtf16 {
    type Output = PointUtf16;

    fn sub(self, rhs: PointUtf16) -> PointUtf16 {
        debug_assert!(rhs <= self);
        if self.row == rhs.row {
            return PointUtf16::new(0, self.column - rhs.column);
        }
        return PointUtf16::new(self.row - rhs.row, self.column);
    }
}

/// An offset counted in UTF-16 code units, as used by language servers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OffsetUtf16(pub usize);

impl Add for OffsetUtf16 {
    type Output = OffsetUtf16;

    fn add(self, rhs: OffsetUtf16) -> OffsetUtf16 {
        return OffsetUtf16(self.0 + rhs.0);
    }
}

impl AddAssign for OffsetUtf16 {
    fn add_assign(&mut self, rhs: OffsetUtf16) {
        self.0 += rhs.0;
    }
}

impl Sub for OffsetUtf16 {
    type Output = OffsetUtf16;

    fn sub(self, rhs: OffsetUtf16) -> OffsetUtf16 {
        return OffsetUtf16(self.0 - rhs.0);
    }
}
