//! The visible window of a document.
//!
//! The preview only scans what is on screen. A [`Viewport`] is a window of
//! lines starting at a scroll offset, minus any folded line ranges, so the
//! visible region can be several disjoint byte ranges.

use std::ops::Range;

use crate::document::Document;

/// Scroll window over a document's lines.
///
/// # Example
///
/// ```
/// use live_preview::ui::viewport::Viewport;
///
/// let mut vp = Viewport::new(24, 100);
/// assert_eq!(vp.line_window(), 0..24);
///
/// vp.fold(5..10);
/// assert_eq!(vp.visible_lines(), vec![0..5, 10..24]);
///
/// vp.scroll_by(10);
/// assert_eq!(vp.visible_lines(), vec![10..34]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewport {
    height: usize,
    offset: usize,
    total_lines: usize,
    /// Sorted, disjoint, end-exclusive line ranges hidden by folding
    folds: Vec<Range<usize>>,
}

impl Viewport {
    pub const fn new(height: usize, total_lines: usize) -> Self {
        Self {
            height,
            offset: 0,
            total_lines,
            folds: Vec::new(),
        }
    }

    /// First line in the window.
    pub const fn offset(&self) -> usize {
        self.offset
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn total_lines(&self) -> usize {
        self.total_lines
    }

    pub fn folds(&self) -> &[Range<usize>] {
        &self.folds
    }

    /// Lines in the window, folded or not.
    pub fn line_window(&self) -> Range<usize> {
        let start = self.offset.min(self.total_lines);
        let end = (self.offset + self.height).min(self.total_lines);
        start..end
    }

    /// Lines in the window that are not folded away.
    pub fn visible_lines(&self) -> Vec<Range<usize>> {
        let window = self.line_window();
        let mut out = Vec::new();
        let mut start = window.start;
        for fold in &self.folds {
            if fold.end <= start {
                continue;
            }
            if fold.start >= window.end {
                break;
            }
            if fold.start > start {
                out.push(start..fold.start);
            }
            start = fold.end;
        }
        if start < window.end {
            out.push(start..window.end);
        }
        out
    }

    /// Visible byte ranges in `doc`, each made of whole lines.
    pub fn byte_ranges(&self, doc: &Document) -> Vec<Range<usize>> {
        let lines = self.visible_lines();
        if lines.is_empty() {
            // An empty document still has one empty, visible line.
            return vec![doc.line_range_to_bytes(0..1)];
        }
        lines
            .into_iter()
            .map(|range| doc.line_range_to_bytes(range))
            .collect()
    }

    /// Scroll by `delta` lines. Returns whether the offset moved.
    pub fn scroll_by(&mut self, delta: isize) -> bool {
        let before = self.offset;
        self.offset = self
            .offset
            .saturating_add_signed(delta)
            .min(self.max_offset());
        self.offset != before
    }

    /// Scroll just enough to bring `line` into the window.
    pub fn reveal_line(&mut self, line: usize) -> bool {
        let before = self.offset;
        if line < self.offset {
            self.offset = line;
        } else if self.height > 0 && line >= self.offset + self.height {
            self.offset = (line + 1 - self.height).min(self.max_offset());
        }
        self.offset != before
    }

    /// Hide `lines`, merging with overlapping or adjacent folds.
    pub fn fold(&mut self, lines: Range<usize>) {
        if lines.is_empty() {
            return;
        }
        let mut merged = lines;
        self.folds.retain(|fold| {
            let touches = fold.start <= merged.end && merged.start <= fold.end;
            if touches {
                merged = merged.start.min(fold.start)..merged.end.max(fold.end);
            }
            !touches
        });
        let at = self.folds.partition_point(|fold| fold.start < merged.start);
        self.folds.insert(at, merged);
    }

    /// Remove every fold. Returns whether any existed.
    pub fn unfold_all(&mut self) -> bool {
        let had = !self.folds.is_empty();
        self.folds.clear();
        had
    }

    pub fn resize(&mut self, height: usize) {
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
    }

    /// Track a new line count after an edit. Folds past the end are dropped.
    pub fn set_total_lines(&mut self, total: usize) {
        self.total_lines = total;
        self.offset = self.offset.min(self.max_offset());
        self.folds.retain(|fold| fold.start < total);
        for fold in &mut self.folds {
            fold.end = fold.end.min(total);
        }
    }

    const fn max_offset(&self) -> usize {
        self.total_lines.saturating_sub(self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_document_is_fully_visible() {
        let vp = Viewport::new(24, 5);
        assert_eq!(vp.visible_lines(), vec![0..5]);
    }

    #[test]
    fn test_scroll_by_clamps_both_ways() {
        let mut vp = Viewport::new(10, 30);
        assert!(!vp.scroll_by(-3));
        assert!(vp.scroll_by(50));
        assert_eq!(vp.offset(), 20);
        assert!(vp.scroll_by(-5));
        assert_eq!(vp.offset(), 15);
    }

    #[test]
    fn test_reveal_line() {
        let mut vp = Viewport::new(10, 100);
        assert!(!vp.reveal_line(9));
        assert!(vp.reveal_line(10));
        assert_eq!(vp.line_window(), 1..11);
        assert!(vp.reveal_line(0));
        assert_eq!(vp.offset(), 0);
    }

    #[test]
    fn test_folds_merge_and_split_window() {
        let mut vp = Viewport::new(20, 100);
        vp.fold(3..5);
        vp.fold(5..8);
        vp.fold(12..14);
        assert_eq!(vp.folds(), &[3..8, 12..14]);
        assert_eq!(vp.visible_lines(), vec![0..3, 8..12, 14..20]);
        assert!(vp.unfold_all());
        assert_eq!(vp.visible_lines(), vec![0..20]);
    }

    #[test]
    fn test_fold_covering_window_hides_everything() {
        let mut vp = Viewport::new(5, 100);
        vp.fold(0..50);
        assert!(vp.visible_lines().is_empty());
    }

    #[test]
    fn test_set_total_lines_trims_folds() {
        let mut vp = Viewport::new(24, 100);
        vp.scroll_by(80);
        vp.fold(90..95);
        vp.set_total_lines(50);
        assert_eq!(vp.offset(), 26);
        assert!(vp.folds().is_empty());
    }

    #[test]
    fn test_byte_ranges_follow_lines() {
        let doc = Document::new("a\nbb\nccc\ndddd");
        let mut vp = Viewport::new(10, doc.line_count());
        vp.fold(1..2);
        assert_eq!(vp.byte_ranges(&doc), vec![0..1, 5..13]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn scroll_never_exceeds_bounds(
                total_lines in 1..10000usize,
                height in 1..100usize,
                scroll_amount in -10000..10000isize,
            ) {
                let mut vp = Viewport::new(height, total_lines);
                vp.scroll_by(scroll_amount);
                prop_assert!(vp.offset() <= total_lines.saturating_sub(height));
            }

            #[test]
            fn visible_lines_are_sorted_and_inside_window(
                total_lines in 0..500usize,
                height in 1..100usize,
                offset in 0..500isize,
                folds in proptest::collection::vec((0..500usize, 0..20usize), 0..5),
            ) {
                let mut vp = Viewport::new(height, total_lines);
                vp.scroll_by(offset);
                for (start, len) in folds {
                    vp.fold(start..start + len);
                }
                let window = vp.line_window();
                let mut last_end = window.start;
                for range in vp.visible_lines() {
                    prop_assert!(range.start >= last_end);
                    prop_assert!(range.start < range.end);
                    prop_assert!(range.end <= window.end);
                    last_end = range.end;
                }
            }
        }
    }
}
