//! Presentation helpers.
//!
//! This module contains:
//! - [`viewport`]: Scroll position and visible range management
//! - [`style`]: Class names for widgets and marks
//! - [`paint`]: Decorated lines as the reader sees them

pub mod paint;
pub mod style;
pub mod viewport;

pub use paint::{PaintedLine, PaintedSpan, paint};
