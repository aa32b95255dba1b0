//! Document changes and position mapping.

use super::{Document, DocumentError};

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    /// Stay before text inserted exactly at the position
    Before,
    /// Move past text inserted exactly at the position
    After,
}

/// A single replacement of `from..to` (old coordinates) by `insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub from: usize,
    pub to: usize,
    pub insert: String,
}

impl Change {
    const fn deleted(&self) -> usize {
        self.to - self.from
    }
}

/// An ordered set of non-overlapping changes against one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Build a change set, validating ordering.
    ///
    /// # Errors
    /// Returns [`DocumentError::UnorderedChanges`] when changes overlap or are
    /// not sorted, and [`DocumentError::InvertedRange`] for `from > to`.
    pub fn new(changes: Vec<Change>) -> Result<Self, DocumentError> {
        let mut last_end = 0;
        for (i, change) in changes.iter().enumerate() {
            if change.from > change.to {
                return Err(DocumentError::InvertedRange {
                    from: change.from,
                    to: change.to,
                });
            }
            if i > 0 && change.from < last_end {
                return Err(DocumentError::UnorderedChanges);
            }
            last_end = change.to;
        }
        Ok(Self { changes })
    }

    /// Insert `text` at `pos`.
    pub fn insert(pos: usize, text: impl Into<String>) -> Self {
        Self::replace(pos, pos, text)
    }

    /// Delete `from..to`.
    pub fn delete(from: usize, to: usize) -> Self {
        Self::replace(from, to, String::new())
    }

    /// Replace `from..to` with `text`.
    pub fn replace(from: usize, to: usize, text: impl Into<String>) -> Self {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        Self {
            changes: vec![Change {
                from,
                to,
                insert: text.into(),
            }],
        }
    }

    /// Whether the set contains no effective change.
    pub fn is_empty(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.from == c.to && c.insert.is_empty())
    }

    /// The individual changes, in document order.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Map a position in the old document to the new document.
    pub fn map_pos(&self, pos: usize, assoc: Assoc) -> usize {
        let mut inserted = 0;
        let mut removed = 0;
        for change in &self.changes {
            if change.from > pos {
                break;
            }
            if change.from == pos && change.to == pos {
                if assoc == Assoc::Before {
                    break;
                }
                inserted += change.insert.len();
                continue;
            }
            if change.to <= pos {
                inserted += change.insert.len();
                removed += change.deleted();
                continue;
            }
            // Inside a replaced region: collapse onto one of its edges.
            let base = change.from + inserted - removed;
            return match assoc {
                Assoc::Before => base,
                Assoc::After => base + change.insert.len(),
            };
        }
        pos + inserted - removed
    }

    /// Whether any change touches `from..=to` (inclusive on both ends).
    pub fn touches(&self, from: usize, to: usize) -> bool {
        self.changes
            .iter()
            .any(|c| c.from <= to && c.to >= from)
    }

    /// Apply to `doc`, producing the next snapshot.
    ///
    /// # Errors
    /// Returns an error if a change is out of bounds or splits a character.
    pub fn apply(&self, doc: &Document) -> Result<Document, DocumentError> {
        let mut rope = doc.rope().clone();
        for change in self.changes.iter().rev() {
            doc.check_offset(change.from)?;
            doc.check_offset(change.to)?;
            let start = rope.byte_to_char(change.from);
            let end = rope.byte_to_char(change.to);
            if end > start {
                rope.remove(start..end);
            }
            if !change.insert.is_empty() {
                rope.insert(start, &change.insert);
            }
        }
        Ok(Document::from_rope(rope))
    }
}
