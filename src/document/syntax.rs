//! Inline syntax tree used to locate inline code.
//!
//! Block structure comes from comrak so that fenced and indented code
//! blocks are never scanned. Inline code is tokenized per line the way the
//! editor's highlighter does it: a backtick run opens a span that closes at
//! the next run of the same length on that line, or runs to the end of the
//! line when no closing run exists.

use std::ops::Range;

use comrak::nodes::NodeValue;
use comrak::{Arena, Options, parse_document};

use super::Document;

/// Tag carried by inline-code content and delimiter nodes.
pub const INLINE_CODE: &str = "inline-code";
/// Tag carried by delimiter (formatting) nodes.
pub const FORMATTING: &str = "formatting";

/// A node of the inline syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    /// Byte offset where the node starts
    pub from: usize,
    /// Byte offset where the node ends
    pub to: usize,
    /// Type tags, e.g. `["formatting", "formatting-code", "inline-code"]`
    pub tags: Vec<String>,
    /// Length of the delimiter run around inline-code content (0 for delimiters)
    pub delimiter: usize,
}

impl SyntaxNode {
    /// Whether the node carries `tag`.
    pub fn is(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Node type name in the host's `a_b_c` form.
    pub fn name(&self) -> String {
        self.tags.join("_")
    }

    /// Tags describing the surrounding context (heading, quote, list).
    pub fn context_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .map(String::as_str)
            .filter(|t| *t != INLINE_CODE && *t != FORMATTING && *t != "formatting-code")
    }
}

/// Syntax information for one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    excluded: Vec<Range<usize>>,
}

impl SyntaxTree {
    /// Parse a document snapshot.
    pub fn parse(doc: &Document) -> Self {
        let _scope = crate::perf::scope("syntax.parse");
        let text = doc.text();
        let excluded = excluded_line_ranges(&text);

        let mut nodes = Vec::new();
        for number in 0..doc.line_count() {
            if excluded.iter().any(|r| r.contains(&number)) {
                continue;
            }
            let Some(line) = doc.line(number) else {
                continue;
            };
            tokenize_line(&line.text, line.from, &context_tags(&line.text), &mut nodes);
        }

        Self { nodes, excluded }
    }

    /// All nodes in document order.
    pub fn nodes(&self) -> &[SyntaxNode] {
        &self.nodes
    }

    /// Nodes intersecting `from..=to`.
    pub fn nodes_in(&self, from: usize, to: usize) -> impl Iterator<Item = &SyntaxNode> {
        let start = self.nodes.partition_point(|n| n.to < from);
        self.nodes[start..].iter().take_while(move |n| n.from <= to)
    }

    /// Whether a line lies inside a code block or front matter.
    pub fn is_excluded_line(&self, line: usize) -> bool {
        self.excluded.iter().any(|r| r.contains(&line))
    }

    /// Zero-based, end-exclusive line ranges never scanned for syntax.
    pub fn excluded_lines(&self) -> &[Range<usize>] {
        &self.excluded
    }
}

fn excluded_line_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    if let Some(end) = front_matter_end(text) {
        ranges.push(0..end);
    }

    let arena = Arena::new();
    let mut options = Options::default();
    options.extension.front_matter_delimiter = Some("---".to_string());
    options.extension.table = true;
    options.extension.tasklist = true;
    let root = parse_document(&arena, text, &options);

    for node in root.descendants() {
        let data = node.data.borrow();
        if matches!(data.value, NodeValue::CodeBlock(_)) {
            let start = data.sourcepos.start.line.saturating_sub(1);
            let end = data.sourcepos.end.line.max(start + 1);
            ranges.push(start..end);
        }
    }
    ranges
}

// Front matter is a `---` line at the very top closed by `---` or `...`.
fn front_matter_end(text: &str) -> Option<usize> {
    let mut lines = text.lines();
    if lines.next()?.trim_end() != "---" {
        return None;
    }
    lines
        .position(|l| matches!(l.trim_end(), "---" | "..."))
        .map(|idx| idx + 2)
}

fn context_tags(line: &str) -> Vec<String> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
        return vec!["header".to_string(), format!("header-{hashes}")];
    }
    if trimmed.starts_with('>') {
        return vec!["quote".to_string()];
    }
    let is_bullet = trimmed.len() > 1
        && matches!(trimmed.as_bytes()[0], b'-' | b'*' | b'+')
        && trimmed.as_bytes()[1] == b' ';
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    let is_ordered = digits > 0
        && matches!(trimmed.as_bytes().get(digits), Some(b'.' | b')'))
        && trimmed.as_bytes().get(digits + 1) == Some(&b' ');
    if is_bullet || is_ordered {
        return vec!["list".to_string()];
    }
    Vec::new()
}

fn tokenize_line(line: &str, base: usize, context: &[String], nodes: &mut Vec<SyntaxNode>) {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut i = 0;
    while i < len {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let open = i;
        while i < len && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - open;
        let close = find_closing_run(bytes, i, run);

        nodes.push(delimiter_node(base + open, base + i, context));
        let content_end = close.unwrap_or(len);
        if content_end > i {
            let mut tags = vec![INLINE_CODE.to_string()];
            tags.extend(context.iter().cloned());
            nodes.push(SyntaxNode {
                from: base + i,
                to: base + content_end,
                tags,
                delimiter: run,
            });
        }
        match close {
            Some(c) => {
                nodes.push(delimiter_node(base + c, base + c + run, context));
                i = c + run;
            }
            None => i = len,
        }
    }
}

fn find_closing_run(bytes: &[u8], start: usize, run: usize) -> Option<usize> {
    let mut j = start;
    while j < bytes.len() {
        if bytes[j] != b'`' {
            j += 1;
            continue;
        }
        let s = j;
        while j < bytes.len() && bytes[j] == b'`' {
            j += 1;
        }
        if j - s == run {
            return Some(s);
        }
    }
    None
}

fn delimiter_node(from: usize, to: usize, context: &[String]) -> SyntaxNode {
    let mut tags = vec![
        FORMATTING.to_string(),
        "formatting-code".to_string(),
        INLINE_CODE.to_string(),
    ];
    tags.extend(context.iter().cloned());
    SyntaxNode {
        from,
        to,
        tags,
        delimiter: 0,
    }
}
