//! Host editor state: selection, editing and viewport.
//!
//! Provides the read-only inputs the preview consumes (document snapshot,
//! syntax tree, selection, visible ranges) and turns edits, cursor moves and
//! scrolling into [`ViewUpdate`]s.

mod buffer;
mod selection;

pub use buffer::{Direction, EditorBuffer, ViewUpdate};
pub use selection::{Selection, SelectionRange, overlaps};
