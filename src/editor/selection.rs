//! Selections and the overlap predicate shared by fields and queries.

use crate::document::{Assoc, ChangeSet};

/// One caret or range. `anchor` stays put while `head` moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRange {
    pub anchor: usize,
    pub head: usize,
}

impl SelectionRange {
    /// A collapsed caret at `pos`.
    pub const fn cursor(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    /// A range from `anchor` to `head`.
    pub const fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// Lower bound.
    pub const fn from(&self) -> usize {
        if self.anchor <= self.head {
            self.anchor
        } else {
            self.head
        }
    }

    /// Upper bound.
    pub const fn to(&self) -> usize {
        if self.anchor <= self.head {
            self.head
        } else {
            self.anchor
        }
    }

    /// Whether the range is a bare caret.
    pub const fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    fn map(self, changes: &ChangeSet) -> Self {
        Self {
            anchor: changes.map_pos(self.anchor, Assoc::After),
            head: changes.map_pos(self.head, Assoc::After),
        }
    }
}

/// An ordered set of selection ranges with one main range.
///
/// Read-only to the preview; the host owns and replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    ranges: Vec<SelectionRange>,
    main: usize,
}

impl Selection {
    /// A single caret.
    pub fn cursor(pos: usize) -> Self {
        Self::single(SelectionRange::cursor(pos))
    }

    /// A single range.
    pub fn single(range: SelectionRange) -> Self {
        Self {
            ranges: vec![range],
            main: 0,
        }
    }

    /// Several ranges; they are sorted by position, the first becomes main.
    pub fn from_ranges(mut ranges: Vec<SelectionRange>) -> Self {
        if ranges.is_empty() {
            return Self::cursor(0);
        }
        ranges.sort_by_key(|r| (r.from(), r.to()));
        Self { ranges, main: 0 }
    }

    /// All ranges in document order.
    pub fn ranges(&self) -> &[SelectionRange] {
        &self.ranges
    }

    /// The main range.
    pub fn main(&self) -> SelectionRange {
        self.ranges[self.main.min(self.ranges.len() - 1)]
    }

    /// Whether any range touches `from..=to`.
    pub fn overlaps(&self, from: usize, to: usize) -> bool {
        overlaps(self, from, to)
    }

    /// Map every range through a change set.
    #[must_use]
    pub fn map(&self, changes: &ChangeSet) -> Self {
        Self {
            ranges: self.ranges.iter().map(|r| r.map(changes)).collect(),
            main: self.main,
        }
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::cursor(0)
    }
}

/// True iff some range `r` satisfies `r.from <= to && r.to >= from`.
///
/// Both ends are inclusive, so a caret resting on a delimiter counts as
/// overlapping and reveals the raw text.
pub fn overlaps(selection: &Selection, from: usize, to: usize) -> bool {
    selection
        .ranges()
        .iter()
        .any(|r| r.from() <= to && r.to() >= from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_on_boundary_overlaps() {
        let sel = Selection::cursor(10);
        assert!(overlaps(&sel, 10, 20));
        assert!(overlaps(&sel, 0, 10));
        assert!(!overlaps(&sel, 11, 20));
        assert!(!overlaps(&sel, 0, 9));
    }

    #[test]
    fn test_reversed_range_normalizes() {
        let range = SelectionRange::new(8, 3);
        assert_eq!(range.from(), 3);
        assert_eq!(range.to(), 8);
        assert!(Selection::single(range).overlaps(8, 12));
    }

    #[test]
    fn test_any_range_can_overlap() {
        let sel = Selection::from_ranges(vec![
            SelectionRange::cursor(50),
            SelectionRange::new(1, 2),
        ]);
        assert_eq!(sel.ranges()[0].from(), 1);
        assert!(sel.overlaps(45, 55));
        assert!(sel.overlaps(2, 4));
        assert!(!sel.overlaps(10, 20));
    }

    #[test]
    fn test_map_moves_caret_past_insert() {
        let sel = Selection::cursor(4);
        let mapped = sel.map(&ChangeSet::insert(2, "abc"));
        assert_eq!(mapped.main(), SelectionRange::cursor(7));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn overlap_matches_interval_intersection(
                anchor in 0..200usize,
                head in 0..200usize,
                from in 0..200usize,
                len in 0..50usize,
            ) {
                let sel = Selection::single(SelectionRange::new(anchor, head));
                let to = from + len;
                let lo = anchor.min(head);
                let hi = anchor.max(head);
                let expected = (lo..=hi).any(|p| p >= from && p <= to)
                    || (lo <= from && hi >= to);
                prop_assert_eq!(sel.overlaps(from, to), expected);
            }
        }
    }
}
