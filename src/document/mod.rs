//! Document snapshots, change sets and the inline syntax tree.
//!
//! This module handles:
//! - Byte-offset access to an immutable text snapshot
//! - Mapping positions through edits
//! - Locating inline code (and the blocks that must never be scanned)

mod change;
mod syntax;
mod text;

pub use change::{Assoc, Change, ChangeSet};
pub use syntax::{FORMATTING, INLINE_CODE, SyntaxNode, SyntaxTree};
pub use text::{Document, Line};

/// Errors raised when addressing or editing a document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("offset {pos} is past the end of the document (length {len})")]
    OutOfBounds { pos: usize, len: usize },
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
    #[error("range {from}..{to} is inverted")]
    InvertedRange { from: usize, to: usize },
    #[error("changes must be sorted and non-overlapping")]
    UnorderedChanges,
}
