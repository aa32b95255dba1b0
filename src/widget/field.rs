use std::ops::Range;

use crate::fields::{FieldSpan, Wrapping, canonicalize_key};
use crate::query::parse_inline_value;
use crate::ui::style;

use super::{Element, Widget, WidgetEnv, WidgetKind};

/// Build the replacement widget for a field.
///
/// `source` is the raw text of the field's full span.
pub fn build_field_widget(field: &FieldSpan, source: &str, env: &WidgetEnv<'_>) -> Widget {
    let root = Element::new("span");
    let widget = Widget::new(
        WidgetKind::Field(field.wrapping),
        source,
        style::field_widget_classes(env.settings),
        root.clone(),
    );
    match field.wrapping {
        Wrapping::Bracket | Wrapping::FullLine => render_key_value(&root, field, &widget, env),
        Wrapping::Paren => render_standalone(&root, field, &widget, env),
        Wrapping::Emoji => render_emoji(&root, field, &widget, env),
    }
    widget
}

fn key_attrs(element: Element, key: &str) -> Element {
    element
        .with_attr("data-dv-key", key)
        .with_attr("data-dv-norm-key", &canonicalize_key(key))
}

fn value_element(field: &FieldSpan, class: &str, widget: &Widget, env: &WidgetEnv<'_>) -> Element {
    let element = key_attrs(Element::new("span").with_class(class), field.display_key());
    env.renderer.render_value(
        &parse_inline_value(&field.value),
        &element,
        env.file_path,
        widget.lifecycle(),
        env.settings,
    );
    element
}

fn render_key_value(root: &Element, field: &FieldSpan, widget: &Widget, env: &WidgetEnv<'_>) {
    root.append(key_attrs(
        Element::new("span")
            .with_class(style::INLINE_FIELD_KEY)
            .with_text(&field.key),
        &field.key,
    ));
    root.append(
        Element::new("span")
            .with_class(style::INLINE_FIELD_SEPARATOR)
            .with_text(":"),
    );
    if !field.value.is_empty() {
        root.append(value_element(field, style::INLINE_FIELD_VALUE, widget, env));
    }
}

// `(key:: value)` shows the value alone.
fn render_standalone(root: &Element, field: &FieldSpan, widget: &Widget, env: &WidgetEnv<'_>) {
    root.append(value_element(
        field,
        style::INLINE_FIELD_STANDALONE_VALUE,
        widget,
        env,
    ));
}

fn render_emoji(root: &Element, field: &FieldSpan, widget: &Widget, env: &WidgetEnv<'_>) {
    let name = field.display_key();
    root.append(key_attrs(
        Element::new("span")
            .with_class(style::INLINE_FIELD_KEY)
            .with_class(style::INLINE_FIELD_EMOJI)
            .with_text(&field.key)
            .with_attr("title", name),
        name,
    ));
    root.append(value_element(field, style::INLINE_FIELD_VALUE, widget, env));
}

/// A styling-only mark over part of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMark {
    pub range: Range<usize>,
    pub class: &'static str,
}

/// Marks styling a field in place, in document coordinates.
///
/// Empty keys or values get no mark, and only bracketed fields get bracket
/// marks.
pub fn field_marks(field: &FieldSpan, line_from: usize) -> Vec<FieldMark> {
    let shift = |r: Range<usize>| line_from + r.start..line_from + r.end;
    let mut marks = Vec::new();
    if field.wrapping.is_bracketed() {
        marks.push(FieldMark {
            range: shift(field.start..field.start + 1),
            class: style::INLINE_FIELD_BRACKET,
        });
    }
    if !field.key.is_empty() {
        marks.push(FieldMark {
            range: shift(field.key_range()),
            class: style::INLINE_FIELD_KEY,
        });
    }
    if !field.value.is_empty() {
        marks.push(FieldMark {
            range: shift(field.value_range()),
            class: style::INLINE_FIELD_VALUE,
        });
    }
    if field.wrapping.is_bracketed() {
        marks.push(FieldMark {
            range: shift(field.end - 1..field.end),
            class: style::INLINE_FIELD_BRACKET,
        });
    }
    marks
}
