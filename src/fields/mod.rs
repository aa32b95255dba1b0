//! Inline field scanning.
//!
//! Finds key/value annotations inside one line of text:
//! - `[key:: value]` and `(key:: value)` anywhere in the line
//! - task emoji shorthands such as `📅 2024-05-01`
//! - `key:: value` spanning the whole line, tried only when nothing else
//!   matched
//!
//! All offsets are byte offsets relative to the start of the line.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// How a field is delimited in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Wrapping {
    /// `[key:: value]`, rendered with key and value visible
    Bracket,
    /// `(key:: value)`, rendered as the value alone
    Paren,
    /// `key:: value` occupying the whole line
    FullLine,
    /// Task shorthand such as `✅ 2024-01-01`
    Emoji,
}

impl Wrapping {
    /// Whether the field has delimiter characters at `start` and `end - 1`.
    pub const fn is_bracketed(self) -> bool {
        matches!(self, Self::Bracket | Self::Paren)
    }
}

/// A field found in a line.
///
/// Invariant: `start <= start_key <= start_value <= end_value <= end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpan {
    /// Trimmed key (the emoji itself for [`Wrapping::Emoji`])
    pub key: String,
    /// Trimmed raw value
    pub value: String,
    /// Start of the whole field (the opening delimiter when bracketed)
    pub start: usize,
    /// Start of the key text
    pub start_key: usize,
    /// Start of the value text
    pub start_value: usize,
    /// End of the value text
    pub end_value: usize,
    /// End of the whole field (past the closing delimiter when bracketed)
    pub end: usize,
    pub wrapping: Wrapping,
}

impl FieldSpan {
    /// Range of the key text.
    pub fn key_range(&self) -> Range<usize> {
        self.start_key..self.start_key + self.key.len()
    }

    /// Range of the value text.
    pub const fn value_range(&self) -> Range<usize> {
        self.start_value..self.end_value
    }

    /// Range of the whole field.
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Canonical name for shorthand keys, otherwise the key.
    pub fn display_key(&self) -> &str {
        if self.wrapping == Wrapping::Emoji {
            emoji_field_name(&self.key).unwrap_or(&self.key)
        } else {
            &self.key
        }
    }
}

/// Scan a line the way the preview does: inline fields first, and the
/// full-line form only when no inline field was found.
///
/// The result is sorted and never overlaps. An emoji shorthand inside a
/// bracketed field belongs to that field.
pub fn scan_line(line: &str) -> Vec<FieldSpan> {
    let mut fields: Vec<FieldSpan> = extract_inline_fields(line).collect();
    if is_task_line(line) {
        fields.extend(extract_emoji_fields(line));
        // Stable: an inline field wins a tie with a shorthand.
        fields.sort_by_key(|f| f.start);
        let mut end = 0;
        fields.retain(|f| {
            let keep = f.start >= end;
            if keep {
                end = f.end;
            }
            keep
        });
    }
    if fields.is_empty()
        && let Some(field) = extract_full_line_field(line)
    {
        fields.push(field);
    }
    fields
}

/// Lazily find `[key:: value]` / `(key:: value)` fields.
pub fn extract_inline_fields(line: &str) -> InlineFields<'_> {
    InlineFields { line, pos: 0 }
}

/// Iterator returned by [`extract_inline_fields`].
///
/// Finite and forward-only: once a field is yielded the scan resumes after
/// its closing delimiter.
#[derive(Debug, Clone)]
pub struct InlineFields<'a> {
    line: &'a str,
    pos: usize,
}

impl Iterator for InlineFields<'_> {
    type Item = FieldSpan;

    fn next(&mut self) -> Option<FieldSpan> {
        let bytes = self.line.as_bytes();
        while self.pos < bytes.len() {
            let open = self.pos;
            let (close_byte, wrapping) = match bytes[open] {
                b'\\' => {
                    self.pos += 2;
                    continue;
                }
                b'[' => (b']', Wrapping::Bracket),
                b'(' => (b')', Wrapping::Paren),
                _ => {
                    self.pos += 1;
                    continue;
                }
            };
            let Some(close) = find_closing(bytes, open, bytes[open], close_byte) else {
                self.pos += 1;
                continue;
            };
            if let Some(field) = parse_bracketed(self.line, open, close, wrapping) {
                self.pos = close + 1;
                return Some(field);
            }
            self.pos += 1;
        }
        None
    }
}

// Index of the delimiter closing the one at `open`, honouring nesting and
// backslash escapes.
fn find_closing(bytes: &[u8], open: usize, open_byte: u8, close_byte: u8) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            i += 2;
            continue;
        }
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

fn parse_bracketed(line: &str, open: usize, close: usize, wrapping: Wrapping) -> Option<FieldSpan> {
    let inner = &line[open + 1..close];
    let sep = inner.find("::")?;
    let raw_key = &inner[..sep];
    let key = raw_key.trim();
    if key.is_empty() || key.contains(['[', ']', '(', ')']) {
        return None;
    }
    let start_key = open + 1 + (raw_key.len() - raw_key.trim_start().len());

    let raw_value = &inner[sep + 2..];
    let value = raw_value.trim();
    let leading = raw_value.len() - raw_value.trim_start().len();
    let start_value = open + 1 + sep + 2 + if value.is_empty() { 0 } else { leading };

    Some(FieldSpan {
        key: key.to_string(),
        value: value.to_string(),
        start: open,
        start_key,
        start_value,
        end_value: start_value + value.len(),
        end: close + 1,
        wrapping,
    })
}

static FULL_LINE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:\s*(?:[-*+]|\d+[.)])\s+|\s*>\s*)*(?P<key>[*_~]{0,2}[\w][\w \-/]*?[*_~]{0,2})\s*::(?P<value>.*)$",
    )
    .expect("valid full-line field regex")
});

/// Try to read the whole line as `key:: value`.
pub fn extract_full_line_field(line: &str) -> Option<FieldSpan> {
    let caps = FULL_LINE_FIELD.captures(line)?;
    let key_match = caps.name("key")?;
    let value_match = caps.name("value")?;

    let key = key_match.as_str().trim_matches(['*', '_', '~']).trim();
    if key.is_empty() {
        return None;
    }
    let key_offset = key_match.as_str().find(key).unwrap_or(0);
    let start_key = key_match.start() + key_offset;

    let raw_value = value_match.as_str();
    let value = raw_value.trim();
    let leading = raw_value.len() - raw_value.trim_start().len();
    let start_value = value_match.start() + if value.is_empty() { 0 } else { leading };
    let end_value = start_value + value.len();

    Some(FieldSpan {
        key: key.to_string(),
        value: value.to_string(),
        start: key_match.start(),
        start_key,
        start_value,
        end_value,
        end: end_value.max(value_match.start()),
        wrapping: Wrapping::FullLine,
    })
}

static TASK_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:>\s*)*(?:[-*+]|\d+[.)])\s+\[.\]\s").expect("valid task regex")
});

static EMOJI_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<emoji>🗓️|🗓|📅|📆|✅|➕|⏳|🛫)\s*(?P<date>\d{4}-\d{2}-\d{2})")
        .expect("valid emoji field regex")
});

/// Whether the line is a Markdown task (`- [ ] ...`).
pub fn is_task_line(line: &str) -> bool {
    TASK_LINE.is_match(line)
}

/// Find task emoji shorthand fields.
pub fn extract_emoji_fields(line: &str) -> impl Iterator<Item = FieldSpan> + '_ {
    EMOJI_FIELD.captures_iter(line).filter_map(|caps| {
        let emoji = caps.name("emoji")?;
        let date = caps.name("date")?;
        Some(FieldSpan {
            key: emoji.as_str().to_string(),
            value: date.as_str().to_string(),
            start: emoji.start(),
            start_key: emoji.start(),
            start_value: date.start(),
            end_value: date.end(),
            end: date.end(),
            wrapping: Wrapping::Emoji,
        })
    })
}

/// Canonical field name for a task shorthand emoji.
pub fn emoji_field_name(emoji: &str) -> Option<&'static str> {
    match emoji {
        "🗓️" | "🗓" | "📅" | "📆" => Some("due"),
        "✅" => Some("completion"),
        "➕" => Some("created"),
        "⏳" => Some("scheduled"),
        "🛫" => Some("start"),
        _ => None,
    }
}

/// Normalise a key: lower-case, punctuation dropped, whitespace to `-`.
pub fn canonicalize_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut pending_dash = false;
    for ch in key.trim().chars() {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = !out.is_empty();
        } else if ch.is_alphanumeric() || ch == '_' {
            if pending_dash {
                out.push('-');
                pending_dash = false;
            }
            out.extend(ch.to_lowercase());
        }
    }
    out
}
