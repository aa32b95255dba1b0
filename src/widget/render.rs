use std::path::Path;

use crate::config::Settings;
use crate::query::Value;

use super::{Element, Lifecycle};

/// Fills an element with a rendered value.
///
/// Implementations may keep `element` and fill it later; anything they
/// schedule should be registered on `lifecycle`.
pub trait ValueRenderer {
    fn render_value(
        &self,
        value: &Value,
        element: &Element,
        file_path: &Path,
        lifecycle: &Lifecycle,
        settings: &Settings,
    );
}

/// Renders values as plain text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl ValueRenderer for TextRenderer {
    fn render_value(
        &self,
        value: &Value,
        element: &Element,
        _file_path: &Path,
        _lifecycle: &Lifecycle,
        settings: &Settings,
    ) {
        element.set_text(&render_text(value, settings));
    }
}

/// Plain-text form of a value; nulls use `render_null_as`.
pub fn render_text(value: &Value, settings: &Settings) -> String {
    match value {
        Value::Null => settings.render_null_as.clone(),
        Value::List(items) => items
            .iter()
            .map(|item| render_text(item, settings))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
