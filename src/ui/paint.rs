//! Paint decorated lines.
//!
//! Stands in for the host paint step: replacements show their widget text
//! in place of the hidden source, marks add classes to the text they cover.

use std::fmt;
use std::ops::Range;

use crate::decoration::{DecorationKind, DecorationSet};
use crate::document::{Document, Line};

/// A run of text with uniform styling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintedSpan {
    pub text: String,
    pub classes: Vec<&'static str>,
    /// Whether the text comes from a widget rather than the document
    pub replaced: bool,
}

impl PaintedSpan {
    fn source(text: &str, classes: Vec<&'static str>) -> Self {
        Self {
            text: text.to_string(),
            classes,
            replaced: false,
        }
    }
}

/// One painted document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintedLine {
    pub number: usize,
    pub spans: Vec<PaintedSpan>,
}

impl PaintedLine {
    /// The line as the reader sees it.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// The line with widgets wrapped in `⟦…⟧` and marked text in `{class:…}`.
    pub fn annotated(&self) -> String {
        let mut out = String::new();
        for span in &self.spans {
            if span.replaced {
                out.push('⟦');
                out.push_str(&span.text);
                out.push('⟧');
            } else if span.classes.is_empty() {
                out.push_str(&span.text);
            } else {
                out.push('{');
                out.push_str(&span.classes.join(" "));
                out.push(':');
                out.push_str(&span.text);
                out.push('}');
            }
        }
        out
    }
}

impl fmt::Display for PaintedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Paint every line in `visible` using the decorations of all `sets`.
///
/// Replacements that start inside an earlier replacement on the same line
/// are skipped.
pub fn paint(doc: &Document, visible: &[Range<usize>], sets: &[&DecorationSet]) -> Vec<PaintedLine> {
    let _scope = crate::perf::scope("ui.paint");
    visible
        .iter()
        .flat_map(|range| doc.lines_between(range.start, range.end))
        .map(|line| paint_line(&line, sets))
        .collect()
}

fn paint_line(line: &Line, sets: &[&DecorationSet]) -> PaintedLine {
    let mut replaces: Vec<(Range<usize>, String)> = Vec::new();
    let mut marks: Vec<(Range<usize>, &'static str)> = Vec::new();
    for set in sets {
        for decoration in set.between(line.from, line.to) {
            let range = decoration.range.clone();
            if range.start < line.from || range.end > line.to {
                continue;
            }
            match &decoration.kind {
                DecorationKind::Replace(widget) => replaces.push((range, widget.text())),
                DecorationKind::Mark(class) => marks.push((range, *class)),
            }
        }
    }
    replaces.sort_by_key(|(range, _)| range.start);

    let mut spans = Vec::new();
    let mut pos = line.from;
    for (range, text) in replaces {
        if range.start < pos {
            continue;
        }
        marked_spans(line, pos..range.start, &marks, &mut spans);
        spans.push(PaintedSpan {
            text,
            classes: Vec::new(),
            replaced: true,
        });
        pos = range.end;
    }
    marked_spans(line, pos..line.to, &marks, &mut spans);

    PaintedLine {
        number: line.number,
        spans,
    }
}

fn marked_spans(
    line: &Line,
    range: Range<usize>,
    marks: &[(Range<usize>, &'static str)],
    out: &mut Vec<PaintedSpan>,
) {
    if range.is_empty() {
        return;
    }
    let mut cuts = vec![range.start, range.end];
    for (mark, _) in marks {
        cuts.extend([mark.start, mark.end].into_iter().filter(|c| range.contains(c)));
    }
    cuts.sort_unstable();
    cuts.dedup();

    for pair in cuts.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let Some(text) = line.text.get(from - line.from..to - line.from) else {
            continue;
        };
        let classes = marks
            .iter()
            .filter(|(mark, _)| mark.start <= from && to <= mark.end)
            .map(|(_, class)| *class)
            .collect();
        out.push(PaintedSpan::source(text, classes));
    }
}
