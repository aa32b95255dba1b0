use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::document::{ChangeSet, Document, DocumentError, SyntaxTree};
use crate::ui::viewport::Viewport;

use super::{Selection, SelectionRange};

/// Direction for cursor movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// What changed in one host update.
///
/// Mirrors the three change channels the preview reacts to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    /// Document edits, in the coordinates of the previous snapshot
    pub changes: Option<ChangeSet>,
    /// Whether the selection was replaced
    pub selection_set: bool,
    /// Whether the visible ranges moved
    pub viewport_changed: bool,
}

impl ViewUpdate {
    /// Whether the document changed.
    pub const fn doc_changed(&self) -> bool {
        self.changes.is_some()
    }

    /// A viewport change reported without scrolling (the host re-measured
    /// the visible region).
    pub const fn remeasured() -> Self {
        Self {
            changes: None,
            selection_set: false,
            viewport_changed: true,
        }
    }

    /// Whether nothing changed at all.
    pub const fn is_empty(&self) -> bool {
        self.changes.is_none() && !self.selection_set && !self.viewport_changed
    }
}

/// Host editor state for one open file.
///
/// Owns the current document snapshot, its syntax tree, the selection and
/// the viewport. Every mutating call returns the [`ViewUpdate`] the host
/// would dispatch to view plugins.
#[derive(Debug, Clone)]
pub struct EditorBuffer {
    doc: Document,
    syntax: SyntaxTree,
    selection: Selection,
    viewport: Viewport,
    file_path: Option<PathBuf>,
    live_preview: bool,
    /// Remembered column for vertical movement (sticky column).
    col_memory: Option<usize>,
}

impl EditorBuffer {
    /// Create a buffer from text with the caret at the start.
    pub fn from_text(text: &str) -> Self {
        let doc = Document::new(text);
        let syntax = SyntaxTree::parse(&doc);
        let viewport = Viewport::new(40, doc.line_count());
        Self {
            doc,
            syntax,
            selection: Selection::cursor(0),
            viewport,
            file_path: None,
            live_preview: true,
            col_memory: None,
        }
    }

    /// Attach the path of the file being edited.
    #[must_use]
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the number of visible lines.
    #[must_use]
    pub fn with_viewport_height(mut self, height: usize) -> Self {
        self.viewport.resize(height);
        self
    }

    /// Start in live preview (`true`) or source mode (`false`).
    #[must_use]
    pub const fn with_live_preview(mut self, enabled: bool) -> Self {
        self.live_preview = enabled;
        self
    }

    /// The current document snapshot.
    pub const fn document(&self) -> &Document {
        &self.doc
    }

    /// Syntax tree for the current snapshot.
    pub const fn syntax(&self) -> &SyntaxTree {
        &self.syntax
    }

    /// The current selection.
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// The viewport.
    pub const fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Path of the active file, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Whether the editor is in live preview mode.
    pub const fn is_live_preview(&self) -> bool {
        self.live_preview
    }

    /// Byte ranges currently visible.
    pub fn visible_ranges(&self) -> Vec<Range<usize>> {
        self.viewport.byte_ranges(&self.doc)
    }

    /// Apply a change set and map the selection through it.
    ///
    /// # Errors
    /// Returns an error if the change set does not fit the current snapshot.
    pub fn apply_changes(&mut self, changes: ChangeSet) -> Result<ViewUpdate, DocumentError> {
        let next = changes.apply(&self.doc)?;
        self.selection = self.selection.map(&changes);
        self.replace_document(next);
        Ok(ViewUpdate {
            changes: Some(changes),
            selection_set: true,
            viewport_changed: false,
        })
    }

    /// Insert text over the main selection.
    pub fn insert_str(&mut self, text: &str) -> ViewUpdate {
        let main = self.selection.main();
        let changes = ChangeSet::replace(main.from(), main.to(), text);
        let caret = main.from() + text.len();
        match changes.apply(&self.doc) {
            Ok(next) => {
                self.replace_document(next);
                self.selection = Selection::cursor(caret);
                self.col_memory = None;
                ViewUpdate {
                    changes: Some(changes),
                    selection_set: true,
                    viewport_changed: false,
                }
            }
            Err(_) => ViewUpdate::default(),
        }
    }

    /// Delete the selection, or the character before the caret (Backspace).
    pub fn delete_back(&mut self) -> ViewUpdate {
        let main = self.selection.main();
        let (from, to) = if main.is_empty() {
            let Some(prev) = self.prev_boundary(main.head) else {
                return ViewUpdate::default();
            };
            (prev, main.head)
        } else {
            (main.from(), main.to())
        };
        self.delete_range(from, to)
    }

    /// Delete the selection, or the character at the caret (Delete).
    pub fn delete_forward(&mut self) -> ViewUpdate {
        let main = self.selection.main();
        let (from, to) = if main.is_empty() {
            let Some(next) = self.next_boundary(main.head) else {
                return ViewUpdate::default();
            };
            (main.head, next)
        } else {
            (main.from(), main.to())
        };
        self.delete_range(from, to)
    }

    /// Place a caret at `pos` (clamped to the document).
    pub fn move_to(&mut self, pos: usize) -> ViewUpdate {
        let pos = self.clamp_to_boundary(pos);
        self.col_memory = None;
        self.set_selection(Selection::cursor(pos))
    }

    /// Select from `anchor` to `head`.
    pub fn select(&mut self, anchor: usize, head: usize) -> ViewUpdate {
        let anchor = self.clamp_to_boundary(anchor);
        let head = self.clamp_to_boundary(head);
        self.col_memory = None;
        self.set_selection(Selection::single(SelectionRange::new(anchor, head)))
    }

    /// Replace the whole selection.
    pub fn set_selection(&mut self, selection: Selection) -> ViewUpdate {
        let changed = selection != self.selection;
        self.selection = selection;
        ViewUpdate {
            changes: None,
            selection_set: changed,
            viewport_changed: false,
        }
    }

    /// Move the caret in the given direction.
    pub fn move_cursor(&mut self, direction: Direction) -> ViewUpdate {
        let head = self.selection.main().head;
        let target = match direction {
            Direction::Left => self.prev_boundary(head).unwrap_or(head),
            Direction::Right => self.next_boundary(head).unwrap_or(head),
            Direction::Up | Direction::Down => return self.move_vertical(direction),
        };
        self.col_memory = None;
        self.set_selection(Selection::cursor(target))
    }

    /// Move the caret to the beginning of its line (Home).
    pub fn move_home(&mut self) -> ViewUpdate {
        let line = self.doc.line_at(self.selection.main().head);
        self.move_to(line.from)
    }

    /// Move the caret to the end of its line (End).
    pub fn move_end(&mut self) -> ViewUpdate {
        let line = self.doc.line_at(self.selection.main().head);
        self.move_to(line.to)
    }

    /// Scroll the viewport down by `n` lines.
    pub fn scroll_down(&mut self, n: usize) -> ViewUpdate {
        let moved = self.viewport.scroll_by(isize::try_from(n).unwrap_or(isize::MAX));
        Self::viewport_update(moved)
    }

    /// Scroll the viewport up by `n` lines.
    pub fn scroll_up(&mut self, n: usize) -> ViewUpdate {
        let moved = self.viewport.scroll_by(-isize::try_from(n).unwrap_or(isize::MAX));
        Self::viewport_update(moved)
    }

    /// Scroll so the caret's line is on screen.
    pub fn reveal_cursor(&mut self) -> ViewUpdate {
        let line = self.doc.line_at(self.selection.main().head).number;
        let moved = self.viewport.reveal_line(line);
        Self::viewport_update(moved)
    }

    /// Fold a zero-based, end-exclusive range of lines out of view.
    pub fn fold_lines(&mut self, lines: Range<usize>) -> ViewUpdate {
        let before = self.viewport.visible_lines();
        self.viewport.fold(lines);
        Self::viewport_update(self.viewport.visible_lines() != before)
    }

    /// Remove every fold.
    pub fn unfold_all(&mut self) -> ViewUpdate {
        let changed = self.viewport.unfold_all();
        Self::viewport_update(changed)
    }

    /// Toggle between live preview and source mode.
    pub const fn set_live_preview(&mut self, enabled: bool) {
        self.live_preview = enabled;
    }

    fn move_vertical(&mut self, direction: Direction) -> ViewUpdate {
        let head = self.selection.main().head;
        let line = self.doc.line_at(head);
        let col = self.col_memory.unwrap_or(head - line.from);
        let target_line = match direction {
            Direction::Up if line.number > 0 => line.number - 1,
            Direction::Down if line.number + 1 < self.doc.line_count() => line.number + 1,
            _ => return ViewUpdate::default(),
        };
        let Some(target) = self.doc.line(target_line) else {
            return ViewUpdate::default();
        };
        let pos = self.clamp_to_boundary(target.from + col.min(target.text.len()));
        let update = self.set_selection(Selection::cursor(pos));
        self.col_memory = Some(col);
        update
    }

    fn delete_range(&mut self, from: usize, to: usize) -> ViewUpdate {
        let changes = ChangeSet::delete(from, to);
        match changes.apply(&self.doc) {
            Ok(next) => {
                self.replace_document(next);
                self.selection = Selection::cursor(from);
                self.col_memory = None;
                ViewUpdate {
                    changes: Some(changes),
                    selection_set: true,
                    viewport_changed: false,
                }
            }
            Err(_) => ViewUpdate::default(),
        }
    }

    fn replace_document(&mut self, next: Document) {
        self.syntax = SyntaxTree::parse(&next);
        self.viewport.set_total_lines(next.line_count());
        self.doc = next;
    }

    const fn viewport_update(moved: bool) -> ViewUpdate {
        ViewUpdate {
            changes: None,
            selection_set: false,
            viewport_changed: moved,
        }
    }

    fn prev_boundary(&self, pos: usize) -> Option<usize> {
        (0..pos)
            .rev()
            .find(|p| self.doc.check_offset(*p).is_ok())
    }

    fn next_boundary(&self, pos: usize) -> Option<usize> {
        (pos + 1..=self.doc.len()).find(|p| self.doc.check_offset(*p).is_ok())
    }

    fn clamp_to_boundary(&self, pos: usize) -> usize {
        let pos = pos.min(self.doc.len());
        if self.doc.check_offset(pos).is_ok() {
            pos
        } else {
            self.prev_boundary(pos).unwrap_or(0)
        }
    }
}
