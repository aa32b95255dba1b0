//! Query collaborators: values, expressions, evaluation, the page index and
//! the script host.
//!
//! The preview only talks to these through [`QueryEngine`], [`PageIndex`]
//! and [`ScriptHost`], so tests can substitute any of them.

mod eval;
mod expr;
mod index;
mod script;
mod value;

use std::path::Path;

use crate::config::Settings;

pub use eval::{EvalError, execute_inline};
pub use expr::{BinaryOp, Expr, ParseError, UnaryOp, parse_field, parse_inline_value};
pub use index::{MemoryIndex, Page, PageIndex};
pub use script::{API_ALIASES, ScriptApi, ScriptError, ScriptHost, UnavailableScriptHost, is_deferred};
pub use value::Value;

/// Parses and executes expression queries.
pub trait QueryEngine {
    /// Parse query code.
    ///
    /// # Errors
    /// Returns a [`ParseError`] for malformed code.
    fn parse(&self, code: &str) -> Result<Expr, ParseError>;

    /// Evaluate a parsed query for the page at `file_path`.
    ///
    /// # Errors
    /// Returns an [`EvalError`] when evaluation fails.
    fn execute(
        &self,
        expr: &Expr,
        file_path: &Path,
        index: &dyn PageIndex,
        settings: &Settings,
    ) -> Result<Value, EvalError>;
}

/// The built-in expression language.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEngine;

impl QueryEngine for ExprEngine {
    fn parse(&self, code: &str) -> Result<Expr, ParseError> {
        parse_field(code)
    }

    fn execute(
        &self,
        expr: &Expr,
        file_path: &Path,
        index: &dyn PageIndex,
        settings: &Settings,
    ) -> Result<Value, EvalError> {
        execute_inline(expr, file_path, index, settings)
    }
}
