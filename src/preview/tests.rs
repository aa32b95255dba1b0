use std::ops::Range;
use std::rc::Rc;

use proptest::prelude::*;

use super::*;
use crate::config::FieldDisplayMode;
use crate::decoration::DecorationKind;
use crate::query::MemoryIndex;
use crate::widget::Widget;

fn ready_preview() -> LivePreview {
    LivePreview::new(Rc::new(MemoryIndex::ready([])))
}

fn drive(preview: &mut LivePreview, buffer: &EditorBuffer, update: &ViewUpdate) -> Delta {
    Message::from_update(update).map_or_else(Delta::default, |message| {
        preview.update(message, &ViewState::of(buffer))
    })
}

fn widgets(set: &DecorationSet) -> Vec<&Widget> {
    set.iter().filter_map(Decoration::widget).collect()
}

fn only_widget(set: &DecorationSet) -> &Widget {
    let all = widgets(set);
    assert_eq!(all.len(), 1, "expected exactly one widget");
    all[0]
}

#[test]
fn test_full_line_field_conceals_and_reveals() {
    let mut buffer = EditorBuffer::from_text("intro\nRating:: [ 5 ]\n");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));

    let widget = only_widget(preview.fields());
    let key = widget.element().find_by_class(style::INLINE_FIELD_KEY).unwrap();
    let value = widget.element().find_by_class(style::INLINE_FIELD_VALUE).unwrap();
    assert_eq!(key.text_content(), "Rating");
    assert_eq!(value.text_content(), "5");
    let id = widget.id();

    // Caret inside the brackets shows the raw line.
    let update = buffer.move_to(17);
    let delta = drive(&mut preview, &buffer, &update);
    assert_eq!(delta.removed, 1);
    assert!(preview.fields().is_empty());
    assert_eq!(preview.parked().len(), 1);

    // Moving away brings back the same widget.
    let update = buffer.move_to(0);
    let delta = drive(&mut preview, &buffer, &update);
    assert_eq!(delta.added, 1);
    assert_eq!(only_widget(preview.fields()).id(), id);
    assert!(preview.parked().is_empty());
}

#[test]
fn test_expression_query_renders_value() {
    let buffer = EditorBuffer::from_text("x `= 2 + 2` y");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));

    let decoration = preview.queries().iter().next().unwrap();
    assert_eq!(decoration.owner, 2..11);
    assert_eq!(decoration.widget().unwrap().text(), "4");
}

#[test]
fn test_disabled_queries_show_notice() {
    let buffer = EditorBuffer::from_text("x `= 2 + 2` y");
    let settings = Settings {
        enable_inline_dataview: false,
        ..Settings::default()
    };
    let mut preview = ready_preview().with_settings(settings);
    preview.build(&ViewState::of(&buffer));
    assert_eq!(
        only_widget(preview.queries()).text(),
        "(disabled; enable in settings)"
    );
}

#[test]
fn test_parse_error_is_shown_in_widget() {
    let buffer = EditorBuffer::from_text("a `= bad+++syntax` b");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));

    let widget = only_widget(preview.queries());
    let text = widget.text();
    assert!(text.starts_with("Dataview (inline field"), "{text}");
    assert!(text.contains("expected an expression"), "{text}");
    assert!(widget.element().has_class(style::INLINE_ERROR));
}

#[test]
fn test_unterminated_code_creates_nothing() {
    let buffer = EditorBuffer::from_text("open `= 1 + 1\nnext line");
    let mut preview = ready_preview();
    let delta = preview.build(&ViewState::of(&buffer));
    assert!(preview.queries().is_empty());
    assert_eq!(delta.added, 0);
}

#[test]
fn test_repeated_viewport_changes_are_stable() {
    let buffer = EditorBuffer::from_text("a `= 1` b\n[k:: v] and (w:: 2)\n");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));

    preview.update(Message::ViewportChanged, &ViewState::of(&buffer));
    let fields: Vec<Decoration> = preview.fields().iter().cloned().collect();
    let queries: Vec<Decoration> = preview.queries().iter().cloned().collect();
    let ids: Vec<_> = widgets(preview.fields()).iter().map(|w| w.id()).collect();

    let delta = preview.update(Message::ViewportChanged, &ViewState::of(&buffer));
    assert!(delta.from_scratch);
    assert_eq!(preview.fields().iter().cloned().collect::<Vec<_>>(), fields);
    assert_eq!(preview.queries().iter().cloned().collect::<Vec<_>>(), queries);
    let again: Vec<_> = widgets(preview.fields()).iter().map(|w| w.id()).collect();
    assert_eq!(again, ids);
    assert!(preview.parked().is_empty());
}

#[test]
fn test_edit_before_query_shifts_widget() {
    let mut buffer = EditorBuffer::from_text("a `= 1 + 1` b\n");
    let update = buffer.move_to(13);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    drive(&mut preview, &buffer, &update);
    let id = only_widget(preview.queries()).id();

    let update = buffer.move_to(0);
    drive(&mut preview, &buffer, &update);
    let update = buffer.insert_str("zz");
    let delta = drive(&mut preview, &buffer, &update);

    assert!(delta.is_empty(), "{delta}");
    let decoration = preview.queries().iter().next().unwrap();
    assert_eq!(decoration.owner, 4..13);
    assert_eq!(decoration.widget().unwrap().id(), id);
}

#[test]
fn test_edit_inside_query_rebuilds_widget() {
    let mut buffer = EditorBuffer::from_text("a `= 1 + 1` b\n");
    let mut preview = ready_preview();
    let update = buffer.move_to(13);
    preview.build(&ViewState::of(&buffer));
    drive(&mut preview, &buffer, &update);
    let old = only_widget(preview.queries()).clone();

    // Typing inside reveals the query; leaving it renders the new value.
    let update = buffer.move_to(10);
    drive(&mut preview, &buffer, &update);
    let update = buffer.insert_str("0");
    drive(&mut preview, &buffer, &update);
    assert!(old.is_disposed());
    assert!(preview.queries().is_empty());

    let update = buffer.move_to(0);
    drive(&mut preview, &buffer, &update);
    assert_eq!(only_widget(preview.queries()).text(), "11");
}

#[test]
fn test_source_mode_uses_marks_only() {
    let buffer = EditorBuffer::from_text("[k:: v] `= 1`\n").with_live_preview(false);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));

    assert!(preview.queries().is_empty());
    assert_eq!(preview.fields().replace_count(), 0);
    let classes: Vec<_> = preview
        .fields()
        .iter()
        .map(|d| match d.kind {
            DecorationKind::Mark(class) => class,
            DecorationKind::Replace(_) => "replace",
        })
        .collect();
    assert_eq!(
        classes,
        vec![
            style::INLINE_FIELD_BRACKET,
            style::INLINE_FIELD_KEY,
            style::INLINE_FIELD_VALUE,
            style::INLINE_FIELD_BRACKET,
        ]
    );
}

#[test]
fn test_marks_survive_caret_on_field() {
    let mut buffer = EditorBuffer::from_text("[k:: v]\n").with_live_preview(false);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    let update = buffer.move_to(3);
    let delta = drive(&mut preview, &buffer, &update);
    assert!(delta.is_empty());
    assert_eq!(preview.fields().len(), 4);
}

#[test]
fn test_mode_switch_rebuilds() {
    let mut buffer = EditorBuffer::from_text("[k:: v]\n\nend").with_live_preview(false);
    let update = buffer.move_to(10);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    drive(&mut preview, &buffer, &update);
    assert_eq!(preview.fields().replace_count(), 0);

    buffer.set_live_preview(true);
    let delta = preview.update(Message::ModeChanged, &ViewState::of(&buffer));
    assert!(delta.from_scratch);
    assert_eq!(delta.removed, 4);
    assert_eq!(preview.fields().replace_count(), 1);
}

#[test]
fn test_nothing_renders_before_index_is_ready() {
    let index = Rc::new(MemoryIndex::new());
    let buffer = EditorBuffer::from_text("x `= 2 + 2` y\n[k:: v]");
    let mut preview = LivePreview::new(index.clone());
    preview.build(&ViewState::of(&buffer));
    assert!(preview.queries().is_empty());
    assert!(preview.fields().is_empty());

    index.mark_initialized();
    let delta = preview.update(Message::IndexReady, &ViewState::of(&buffer));
    assert_eq!(delta.added, 2);
    assert_eq!(preview.queries().len(), 1);
}

#[test]
fn test_settings_change_applies_new_classes() {
    let buffer = EditorBuffer::from_text("x\n[k:: v]");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    let old = only_widget(preview.fields()).clone();
    assert!(old.classes().contains("inline-field-mode-inline"));

    let settings = Settings {
        inline_field_display_mode: FieldDisplayMode::Compact,
        ..Settings::default()
    };
    preview.update(Message::SettingsChanged(settings), &ViewState::of(&buffer));
    assert!(old.is_disposed());
    let widget = only_widget(preview.fields());
    assert!(widget.classes().contains("inline-field-mode-compact"));
}

#[test]
fn test_code_blocks_are_skipped() {
    let text = "x\n```\n[k:: v] `= 1`\n```\n[a:: b]";
    let buffer = EditorBuffer::from_text(text);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    assert_eq!(preview.fields().len(), 1);
    assert!(preview.queries().is_empty());
}

#[test]
fn test_scrolled_out_widgets_are_dropped() {
    let text = "x\n[a:: 1]\nfiller\n[b:: 2]\n";
    let mut buffer = EditorBuffer::from_text(text).with_viewport_height(2);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    let first = only_widget(preview.fields()).clone();

    let update = buffer.scroll_down(2);
    let delta = drive(&mut preview, &buffer, &update);
    assert!(delta.from_scratch);
    assert!(first.is_disposed());
    assert_eq!(only_widget(preview.fields()).source(), "[b:: 2]");
}

#[test]
fn test_folded_lines_drop_widgets() {
    let mut buffer = EditorBuffer::from_text("x\n[a:: 1]\n[b:: 2]\n`= 3`");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    assert_eq!(preview.fields().len(), 2);
    let folded = widgets(preview.fields())[0].clone();

    let update = buffer.fold_lines(1..2);
    drive(&mut preview, &buffer, &update);
    assert!(folded.is_disposed());
    assert_eq!(only_widget(preview.fields()).source(), "[b:: 2]");
    assert_eq!(only_widget(preview.queries()).text(), "3");

    let update = buffer.unfold_all();
    drive(&mut preview, &buffer, &update);
    assert_eq!(preview.fields().len(), 2);
}

#[test]
fn test_fields_and_queries_are_independent() {
    let mut buffer = EditorBuffer::from_text("[k:: v] `= 1`");
    let update = buffer.move_to(3);
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    drive(&mut preview, &buffer, &update);
    assert!(preview.fields().is_empty());
    assert_eq!(preview.queries().len(), 1);
    assert_eq!(preview.fields().channel(), Channel::Field);
    assert_eq!(preview.queries().channel(), Channel::Query);
}

#[test]
fn test_message_priority() {
    let update = ViewUpdate {
        changes: Some(ChangeSet::insert(0, "a")),
        selection_set: true,
        viewport_changed: true,
    };
    assert_eq!(Message::from_update(&update).map(|m| m.kind()), Some("doc"));
    let update = ViewUpdate {
        changes: None,
        selection_set: true,
        viewport_changed: true,
    };
    assert_eq!(Message::from_update(&update), Some(Message::SelectionChanged));
    assert_eq!(
        Message::from_update(&ViewUpdate::remeasured()),
        Some(Message::ViewportChanged)
    );
    assert_eq!(Message::from_update(&ViewUpdate::default()), None);
}

#[test]
fn test_delta_display() {
    let delta = Delta {
        added: 2,
        removed: 1,
        patched: 0,
        from_scratch: true,
    };
    assert_eq!(delta.to_string(), "added=2 removed=1 patched=0 from-scratch");
    assert_eq!(Delta::default().to_string(), "added=0 removed=0 patched=0");
}

const SAMPLE: &str = "# Title `= 1`\n\
[a:: 1] text (b:: two)\n\
- [ ] task 📅 2024-01-01\n\
- [ ] pay [due:: 📅 2024-05-01] ✅ 2024-04-30\n\
Status:: done\n\
x `= 2 * 3` and `$= dv.current()`\n";

const FRAGMENTS: &[&str] = &[
    "", "`", "``", "[", "]", "(", ")", "::", "\n", "= ", " 📅 2024-05-01", "- [ ] ", "x",
];

/// Spans the field channel should hold a decoration for.
fn field_candidates(buffer: &EditorBuffer) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    for range in buffer.visible_ranges() {
        for line in buffer.document().lines_between(range.start, range.end) {
            if buffer.syntax().is_excluded_line(line.number) {
                continue;
            }
            out.extend(
                scan_line(&line.text)
                    .iter()
                    .map(|f| line.from + f.start..line.from + f.end),
            );
        }
    }
    out
}

/// Spans the query channel should hold a decoration for.
fn query_candidates(buffer: &EditorBuffer) -> Vec<Range<usize>> {
    let settings = Settings::default();
    let mut out = Vec::new();
    for range in buffer.visible_ranges() {
        out.extend(
            buffer
                .syntax()
                .nodes_in(range.start, range.end)
                .filter(|n| range.start <= n.from && n.to <= range.end)
                .filter_map(|n| classify(n, buffer.document(), &settings))
                .map(|q| q.span),
        );
    }
    out
}

fn replace_owners(set: &DecorationSet) -> Vec<Range<usize>> {
    set.iter()
        .filter(|d| d.is_replace())
        .map(|d| d.owner.clone())
        .collect()
}

fn snapshot(preview: &LivePreview) -> Vec<(Range<usize>, String)> {
    preview
        .fields()
        .iter()
        .chain(preview.queries().iter())
        .filter_map(|d| d.widget().map(|w| (d.owner.clone(), w.source().to_string())))
        .collect()
}

#[test]
fn test_emoji_inside_bracket_field_is_concealed_once() {
    let buffer = EditorBuffer::from_text("x\n- [ ] pay [due:: 📅 2024-05-01]");
    let mut preview = ready_preview();
    preview.build(&ViewState::of(&buffer));
    assert_eq!(replace_owners(preview.fields()), vec![12..35]);
    assert_eq!(
        only_widget(preview.fields()).source(),
        "[due:: 📅 2024-05-01]"
    );
}

mod property_tests {
    use super::*;

    proptest! {
        #[test]
        fn test_no_widget_overlaps_selection(anchor in 0usize..=SAMPLE.len(), head in 0usize..=SAMPLE.len()) {
            let mut buffer = EditorBuffer::from_text(SAMPLE);
            let mut preview = ready_preview();
            preview.build(&ViewState::of(&buffer));
            let update = buffer.select(anchor, head);
            drive(&mut preview, &buffer, &update);

            for set in [preview.fields(), preview.queries()] {
                for decoration in set.iter().filter(|d| d.is_replace()) {
                    prop_assert!(!buffer.selection().overlaps(decoration.owner.start, decoration.owner.end));
                }
            }
        }

        #[test]
        fn test_unselected_candidates_are_concealed_once(anchor in 0usize..=SAMPLE.len(), head in 0usize..=SAMPLE.len()) {
            let mut buffer = EditorBuffer::from_text(SAMPLE);
            let mut preview = ready_preview();
            preview.build(&ViewState::of(&buffer));
            let update = buffer.select(anchor, head);
            drive(&mut preview, &buffer, &update);

            let channels = [
                (field_candidates(&buffer), preview.fields()),
                (query_candidates(&buffer), preview.queries()),
            ];
            for (candidates, set) in channels {
                let owners = replace_owners(set);
                for span in candidates {
                    if buffer.selection().overlaps(span.start, span.end) {
                        continue;
                    }
                    let covering: Vec<_> = owners
                        .iter()
                        .filter(|o| o.start < span.end && span.start < o.end)
                        .collect();
                    prop_assert_eq!(covering, vec![&span]);
                }
            }
        }

        #[test]
        fn test_replaces_never_overlap(pos in 0usize..=SAMPLE.len(), at in 0usize..=SAMPLE.len(), fragment in proptest::sample::select(FRAGMENTS)) {
            let mut buffer = EditorBuffer::from_text(SAMPLE);
            let mut preview = ready_preview();
            preview.build(&ViewState::of(&buffer));
            let update = buffer.move_to(at);
            drive(&mut preview, &buffer, &update);
            let update = buffer.insert_str(fragment);
            drive(&mut preview, &buffer, &update);
            let update = buffer.move_to(pos);
            drive(&mut preview, &buffer, &update);

            for set in [preview.fields(), preview.queries()] {
                let mut end = 0;
                for owner in replace_owners(set) {
                    prop_assert!(owner.start >= end, "{owner:?} overlaps an earlier replace");
                    end = owner.end;
                }
            }
        }

        #[test]
        fn test_edit_matches_fresh_build(
            at in 0usize..=SAMPLE.len(),
            len in 0usize..6,
            fragment in proptest::sample::select(FRAGMENTS),
            caret in 0usize..=SAMPLE.len() + 16,
        ) {
            let mut buffer = EditorBuffer::from_text(SAMPLE);
            let mut preview = ready_preview();
            preview.build(&ViewState::of(&buffer));
            let update = buffer.select(at, at + len);
            drive(&mut preview, &buffer, &update);
            let update = buffer.insert_str(fragment);
            drive(&mut preview, &buffer, &update);
            let update = buffer.move_to(caret);
            drive(&mut preview, &buffer, &update);

            let mut fresh = ready_preview();
            fresh.build(&ViewState::of(&buffer));
            prop_assert_eq!(snapshot(&preview), snapshot(&fresh), "text: {:?}", buffer.document().text());
        }

        #[test]
        fn test_reconcile_is_idempotent(pos in 0usize..=SAMPLE.len()) {
            let mut buffer = EditorBuffer::from_text(SAMPLE);
            let mut preview = ready_preview();
            preview.build(&ViewState::of(&buffer));
            let update = buffer.move_to(pos);
            drive(&mut preview, &buffer, &update);

            let before: Vec<Decoration> = preview.fields().iter().chain(preview.queries().iter()).cloned().collect();
            let delta = preview.update(Message::SelectionChanged, &ViewState::of(&buffer));
            prop_assert!(delta.is_empty());
            let after: Vec<Decoration> = preview.fields().iter().chain(preview.queries().iter()).cloned().collect();
            prop_assert_eq!(before, after);
        }
    }
}
