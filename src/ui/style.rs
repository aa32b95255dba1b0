//! Class names attached to widgets and marks.
//!
//! Hosts style rendered fields and queries by these names, so they are kept
//! in one place.

use std::collections::BTreeSet;

use crate::config::Settings;
use crate::document::SyntaxNode;

pub const DATAVIEW: &str = "dataview";
pub const INLINE_FIELD: &str = "inline-field";
pub const INLINE_FIELD_KEY: &str = "inline-field-key";
pub const INLINE_FIELD_SEPARATOR: &str = "inline-field-separator";
pub const INLINE_FIELD_VALUE: &str = "inline-field-value";
pub const INLINE_FIELD_STANDALONE_VALUE: &str = "inline-field-standalone-value";
pub const INLINE_FIELD_BRACKET: &str = "inline-field-bracket";
pub const INLINE_FIELD_EMOJI: &str = "inline-field-emoji";
pub const INLINE_QUERY: &str = "dataview-inline-query";
pub const INLINE_JS_QUERY: &str = "dataview-inline-js-query";
pub const INLINE_ERROR: &str = "dataview-error";

/// Mode class for field widgets, e.g. `inline-field-mode-compact`.
pub fn field_mode_class(settings: &Settings) -> String {
    format!(
        "inline-field-mode-{}",
        settings.inline_field_display_mode.class_suffix()
    )
}

/// Classes for a rendered field widget.
pub fn field_widget_classes(settings: &Settings) -> BTreeSet<String> {
    [DATAVIEW.to_string(), INLINE_FIELD.to_string(), field_mode_class(settings)]
        .into_iter()
        .collect()
}

/// Classes for a rendered query widget. The node's context (heading level,
/// quote, list) is carried over as `cm-<tag>` so the widget matches the
/// surrounding text.
pub fn query_widget_classes(node: &SyntaxNode, script: bool) -> BTreeSet<String> {
    let mut classes: BTreeSet<String> = [DATAVIEW, INLINE_QUERY]
        .into_iter()
        .map(str::to_string)
        .collect();
    if script {
        classes.insert(INLINE_JS_QUERY.to_string());
    }
    classes.extend(node.context_tags().map(|tag| format!("cm-{tag}")));
    classes
}
