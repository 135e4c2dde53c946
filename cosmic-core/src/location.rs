use std::ops::Range;

use serde::Serialize;

/// A half-open `[start_byte, end_byte)` span into the analyzed source text.
#[derive(Debug, Default, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Location {
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start_byte: start,
            end_byte: end,
        }
    }

    /// An empty location sitting at `offset`.
    pub fn at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn to_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }

    /// Spans from the start of `self` up to the end of `other`.
    pub fn merge(&self, other: Location) -> Location {
        (self.start_byte..other.end_byte.max(self.end_byte)).into()
    }

    /// Inclusive on both ends, so a cursor sitting right after a token still touches it.
    pub fn contains(&self, byte_offset: usize) -> bool {
        byte_offset >= self.start_byte && byte_offset <= self.end_byte
    }

    /// Half-open containment, used to attribute offsets to scopes.
    pub fn covers(&self, byte_offset: usize) -> bool {
        byte_offset >= self.start_byte && byte_offset < self.end_byte
    }

    pub fn is_within(&self, other: &Location) -> bool {
        self.start_byte >= other.start_byte && self.end_byte <= other.end_byte
    }

    pub fn overlaps(&self, other: &Location) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }
}

impl From<(usize, usize)> for Location {
    fn from((start_byte, end_byte): (usize, usize)) -> Self {
        Self {
            start_byte,
            end_byte,
        }
    }
}

impl From<Range<usize>> for Location {
    fn from(range: Range<usize>) -> Self {
        Self {
            start_byte: range.start,
            end_byte: range.end,
        }
    }
}
