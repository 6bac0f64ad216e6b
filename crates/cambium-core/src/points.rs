//! Positions, extents, and edit descriptions.
//!
//! All tree layout is stored relative: a subtree knows the extent of the
//! whitespace before it (`padding`) and the extent of its own text (`size`),
//! never its absolute location. Absolute positions fall out of summing
//! extents on the way down, which is what lets an edit shift the tail of a
//! file without touching any node data.

use std::ops::{Add, AddAssign, Sub};

/// A row/column position in source text.
///
/// `row` counts line terminators. `column` counts code units from the start
/// of the row, in the byte width of the input encoding (so a 3-byte UTF-8
/// character advances the column by 3 when parsing UTF-8, and a surrogate
/// pair advances it by 4 when parsing UTF-16).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };

    #[inline]
    pub fn new(row: usize, column: usize) -> Self {
        Point { row, column }
    }
}

impl Add for Point {
    type Output = Point;

    /// Concatenates two extents: the position reached by traversing `self`
    /// and then `rhs`.
    fn add(self, rhs: Point) -> Point {
        if rhs.row == 0 {
            Point::new(self.row, self.column + rhs.column)
        } else {
            Point::new(self.row + rhs.row, rhs.column)
        }
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Point;

    /// The extent from `rhs` to `self`. Requires `rhs <= self`.
    fn sub(self, rhs: Point) -> Point {
        if self.row == rhs.row {
            Point::new(0, self.column - rhs.column)
        } else {
            Point::new(self.row - rhs.row, self.column)
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// A text extent measured both in bytes and in rows/columns.
///
/// Byte counts and point extents always travel together so that any
/// position in the tree can be reported in either unit without rescanning
/// the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Length {
    pub bytes: usize,
    pub extent: Point,
}

impl Length {
    pub const ZERO: Length = Length {
        bytes: 0,
        extent: Point::ZERO,
    };

    #[inline]
    pub fn new(bytes: usize, extent: Point) -> Self {
        Length { bytes, extent }
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.bytes == 0
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, rhs: Length) -> Length {
        Length::new(self.bytes + rhs.bytes, self.extent + rhs.extent)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Length) {
        *self = *self + rhs;
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, rhs: Length) -> Length {
        Length::new(self.bytes - rhs.bytes, self.extent - rhs.extent)
    }
}

/// A half-open span of source text, in both byte and point coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Range {
    pub fn new(start_byte: usize, end_byte: usize, start_point: Point, end_point: Point) -> Self {
        Range {
            start_byte,
            end_byte,
            start_point,
            end_point,
        }
    }

    pub(crate) fn between(start: Length, end: Length) -> Self {
        Range {
            start_byte: start.bytes,
            end_byte: end.bytes,
            start_point: start.extent,
            end_point: end.extent,
        }
    }
}

/// A single text replacement, described in pre-edit and post-edit
/// coordinates.
///
/// `start_byte..old_end_byte` is the replaced span of the old text;
/// `start_byte..new_end_byte` is the span the replacement occupies in the
/// new text. The point fields carry the same three positions in
/// row/column form. A pure insertion has `old_end == start`; a pure
/// deletion has `new_end == start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    #[inline]
    pub(crate) fn start(&self) -> Length {
        Length::new(self.start_byte, self.start_point)
    }

    #[inline]
    pub(crate) fn old_end(&self) -> Length {
        Length::new(self.old_end_byte, self.old_end_point)
    }

    #[inline]
    pub(crate) fn new_end(&self) -> Length {
        Length::new(self.new_end_byte, self.new_end_point)
    }

    /// Maps a pre-edit position at or past the replaced span into post-edit
    /// coordinates.
    pub(crate) fn shift_past(&self, pos: Length) -> Length {
        debug_assert!(pos.bytes >= self.old_end_byte);
        self.new_end() + (pos - self.old_end())
    }
}
