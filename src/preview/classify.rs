use std::ops::Range;

use crate::config::Settings;
use crate::document::{Document, FORMATTING, INLINE_CODE, SyntaxNode};
use crate::widget::QueryKind;

/// An inline code node recognised as a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineQuery {
    pub kind: QueryKind,
    /// The node widened over its delimiters
    pub span: Range<usize>,
    /// Inline code text, prefix included
    pub source: String,
    /// Text after the prefix, trimmed
    pub code: String,
}

/// Which query form `text` is, if any. The script prefix is checked first
/// so that it wins when one prefix starts with the other.
pub fn query_kind(node: &SyntaxNode, text: &str, settings: &Settings) -> Option<QueryKind> {
    if !node.is(INLINE_CODE) || node.is(FORMATTING) {
        return None;
    }
    let js = settings.inline_js_query_prefix.as_str();
    let expr = settings.inline_query_prefix.as_str();
    if !js.is_empty() && text.starts_with(js) {
        Some(QueryKind::Script)
    } else if !expr.is_empty() && text.starts_with(expr) {
        Some(QueryKind::Expression)
    } else {
        None
    }
}

/// Classify a node.
///
/// Returns `None` for anything that is not a query, and for code spans
/// left open at the end of a line: with no closing delimiter the widened
/// span would run into the next line.
pub fn classify(node: &SyntaxNode, doc: &Document, settings: &Settings) -> Option<InlineQuery> {
    let source = doc.slice(node.from, node.to).ok()?;
    let kind = query_kind(node, &source, settings)?;
    if matches!(doc.char_at(node.to), None | Some('\n' | '\r')) {
        return None;
    }

    let prefix = match kind {
        QueryKind::Expression => &settings.inline_query_prefix,
        QueryKind::Script => &settings.inline_js_query_prefix,
    };
    let code = source[prefix.len()..].trim().to_string();
    let delimiter = node.delimiter.max(1);
    Some(InlineQuery {
        kind,
        span: node.from.saturating_sub(delimiter)..node.to + delimiter,
        source,
        code,
    })
}
