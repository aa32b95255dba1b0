//! Immutable document snapshots.

use std::ops::Range;

use ropey::Rope;

use super::DocumentError;

/// A single line of a [`Document`].
///
/// `from..to` excludes the line terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Zero-based line index
    pub number: usize,
    /// Byte offset of the first character
    pub from: usize,
    /// Byte offset just past the last character (before the newline)
    pub to: usize,
    /// Line text without its terminator
    pub text: String,
}

impl Line {
    /// Byte range covered by the line text.
    pub const fn range(&self) -> Range<usize> {
        self.from..self.to
    }
}

/// One snapshot of the editor text.
///
/// All positions are byte offsets. A snapshot never changes; applying a
/// [`ChangeSet`](super::ChangeSet) produces a new one.
#[derive(Debug, Clone)]
pub struct Document {
    rope: Rope,
}

impl Document {
    /// Create a snapshot from text.
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    /// Number of lines (an empty document has one empty line).
    pub fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    /// The full text.
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Get a line by zero-based index.
    pub fn line(&self, number: usize) -> Option<Line> {
        if number >= self.rope.len_lines() {
            return None;
        }
        let from = self.rope.line_to_byte(number);
        let raw = self.rope.line(number).to_string();
        let text = raw.trim_end_matches('\n').trim_end_matches('\r').to_string();
        Some(Line {
            number,
            from,
            to: from + text.len(),
            text,
        })
    }

    /// The line containing byte offset `pos` (clamped to the document).
    pub fn line_at(&self, pos: usize) -> Line {
        let pos = pos.min(self.len());
        let number = self.rope.byte_to_line(pos);
        self.line(number).unwrap_or(Line {
            number,
            from: pos,
            to: pos,
            text: String::new(),
        })
    }

    /// Lines that intersect the byte range `from..=to`.
    pub fn lines_between(&self, from: usize, to: usize) -> impl Iterator<Item = Line> + '_ {
        let first = self.rope.byte_to_line(from.min(self.len()));
        let last = self.rope.byte_to_line(to.min(self.len()));
        (first..=last).filter_map(|n| self.line(n))
    }

    /// Text between two byte offsets.
    ///
    /// # Errors
    /// Returns an error if the range is out of bounds or splits a character.
    pub fn slice(&self, from: usize, to: usize) -> Result<String, DocumentError> {
        self.check_offset(from)?;
        self.check_offset(to)?;
        if from > to {
            return Err(DocumentError::InvertedRange { from, to });
        }
        Ok(self.rope.byte_slice(from..to).to_string())
    }

    /// The character starting at byte offset `pos`, if any.
    pub fn char_at(&self, pos: usize) -> Option<char> {
        if pos >= self.len() || self.check_offset(pos).is_err() {
            return None;
        }
        let idx = self.rope.byte_to_char(pos);
        Some(self.rope.char(idx))
    }

    /// Convert a line range (zero-based, end-exclusive) into a byte range.
    pub fn line_range_to_bytes(&self, lines: Range<usize>) -> Range<usize> {
        let total = self.rope.len_lines();
        let start = lines.start.min(total);
        let end = lines.end.min(total);
        if start >= end {
            let at = self.rope.line_to_byte(start);
            return at..at;
        }
        let from = self.rope.line_to_byte(start);
        let to = self.line(end - 1).map_or(from, |line| line.to);
        from..to
    }

    /// Ensure `pos` is inside the document and on a character boundary.
    ///
    /// # Errors
    /// Returns [`DocumentError::OutOfBounds`] or
    /// [`DocumentError::NotCharBoundary`].
    pub fn check_offset(&self, pos: usize) -> Result<(), DocumentError> {
        let len = self.len();
        if pos > len {
            return Err(DocumentError::OutOfBounds { pos, len });
        }
        let char_idx = self.rope.byte_to_char(pos);
        if self.rope.char_to_byte(char_idx) != pos {
            return Err(DocumentError::NotCharBoundary(pos));
        }
        Ok(())
    }

    pub(super) const fn rope(&self) -> &Rope {
        &self.rope
    }

    pub(super) const fn from_rope(rope: Rope) -> Self {
        Self { rope }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.rope == other.rope
    }
}

impl Eq for Document {}
