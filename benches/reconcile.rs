//! Benchmarks for reconciliation.

use std::rc::Rc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use live_preview::editor::EditorBuffer;
use live_preview::fields::scan_line;
use live_preview::preview::{LivePreview, Message, ViewState};
use live_preview::query::MemoryIndex;

fn sample(lines: usize) -> String {
    (0..lines)
        .map(|i| match i % 4 {
            0 => format!("[rating:: {i}] and (status:: open)"),
            1 => format!("total `= {i} * 2` for this line"),
            2 => format!("- [ ] task {i} 📅 2024-05-01"),
            _ => format!("key{i}:: value {i}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn bench_scan_line(c: &mut Criterion) {
    let line = "[rating:: 5] text (status:: open) more [tags:: a, b, c]";
    c.bench_function("scan_line", |b| b.iter(|| scan_line(black_box(line))));
}

fn bench_build(c: &mut Criterion) {
    let text = sample(200);
    let buffer = EditorBuffer::from_text(&text).with_viewport_height(200);
    c.bench_function("build_200_lines", |b| {
        b.iter(|| {
            let mut preview = LivePreview::new(Rc::new(MemoryIndex::ready([])));
            preview.build(&ViewState::of(black_box(&buffer)))
        });
    });
}

fn bench_cursor_move(c: &mut Criterion) {
    let text = sample(200);
    let mut buffer = EditorBuffer::from_text(&text).with_viewport_height(200);
    let mut preview = LivePreview::new(Rc::new(MemoryIndex::ready([])));
    preview.build(&ViewState::of(&buffer));
    let mut pos = 0;
    c.bench_function("cursor_move_200_lines", |b| {
        b.iter(|| {
            pos = (pos + 37) % text.len();
            buffer.move_to(pos);
            preview.update(Message::SelectionChanged, &ViewState::of(&buffer))
        });
    });
}

criterion_group!(benches, bench_scan_line, bench_build, bench_cursor_move);
criterion_main!(benches);
