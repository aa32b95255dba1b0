// Only allow lints that are either transitive-dependency noise or
// genuinely opinionated style choices that don't indicate real issues.
#![allow(
    // Transitive dependency version mismatches we can't control
    clippy::multiple_crate_versions,
    // module_name_repetitions is pure style preference (e.g. query::QueryEngine)
    clippy::module_name_repetitions
)]

//! # Live Preview
//!
//! Selection-aware rendering of inline metadata fields and inline queries
//! in Markdown notes.
//!
//! While the cursor is away, a field such as `[rating:: 5]` or an inline
//! query such as `` `= this.rating * 2` `` is concealed behind a rendered
//! widget. Moving the cursor or a selection onto it reveals the raw text
//! again.
//!
//! ## Architecture
//!
//! The preview is a state machine in the Elm style:
//! - **Model**: one decoration set per channel (fields, queries)
//! - **Message**: document, selection, viewport, mode, settings and index
//!   changes
//! - **Update**: one reconciliation pass per message
//! - **View**: the host paints the decorations
//!
//! ## Modules
//!
//! - [`document`]: Text snapshots, change sets and inline syntax
//! - [`editor`]: Selection and the host editor stand-in
//! - [`fields`]: Inline field scanning
//! - [`query`]: Values, expressions, the page index and script host
//! - [`widget`]: Replacement widgets and their lifecycle
//! - [`decoration`]: Sorted decoration sets
//! - [`preview`]: The reconciler
//! - [`ui`]: Viewport, class names and painting

pub mod config;
pub mod decoration;
pub mod document;
pub mod editor;
pub mod fields;
pub mod perf;
pub mod preview;
pub mod query;
pub mod ui;
pub mod widget;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::document::{ChangeSet, Document};
    pub use crate::editor::{EditorBuffer, Selection};
    pub use crate::preview::{Delta, LivePreview, Message, ViewState};
    pub use crate::query::{MemoryIndex, Page, PageIndex};
    pub use crate::ui::viewport::Viewport;
}
