//! Replacement widgets for concealed fields and queries.
//!
//! A [`Widget`] owns a shared [`Element`] and a [`Lifecycle`]. Builders are
//! plain functions from a field or query to a detached widget; the preview
//! decides where it goes.
//!
//! Widgets compare equal when their source text matches. Two widgets with
//! the same source but different classes are the same widget as far as the
//! host is concerned: the classes are patched onto the existing element.

mod element;
mod field;
mod lifecycle;
mod query;
mod render;

use std::collections::BTreeSet;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::LocalBoxFuture;

use crate::config::Settings;
use crate::fields::Wrapping;
use crate::query::{EvalError, PageIndex, ParseError, QueryEngine, ScriptError, ScriptHost};

pub use element::Element;
pub use field::{FieldMark, build_field_widget, field_marks};
pub use lifecycle::Lifecycle;
pub use query::{QueryKind, build_query_widget};
pub use render::{TextRenderer, ValueRenderer, render_text};

/// Failures recovered at the widget boundary.
///
/// The `Display` form is exactly what the widget shows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error("Dataview (inline field '{code}'): {source}")]
    Parse { code: String, source: ParseError },
    #[error("Dataview (for inline query '{code}'): {source}")]
    Evaluation { code: String, source: EvalError },
    #[error("Dataview (for inline JS query '{code}'): {source}")]
    Script { code: String, source: ScriptError },
    #[error("(disabled; enable in settings)")]
    Disabled,
}

/// Process-unique widget identity, used to key deferred work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WidgetId(u64);

impl WidgetId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which render function produced a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Field(Wrapping),
    Query(QueryKind),
}

/// Runs deferred widget work on the host's task queue.
pub trait Spawner {
    /// Queue `task`, tied to `owner` so disposing the owner cancels it.
    fn spawn(&self, owner: &Lifecycle, task: LocalBoxFuture<'static, ()>);
}

/// Collaborators available while building widgets.
#[derive(Clone, Copy)]
pub struct WidgetEnv<'a> {
    pub engine: &'a dyn QueryEngine,
    pub index: &'a Rc<dyn PageIndex>,
    pub scripts: &'a dyn ScriptHost,
    pub renderer: &'a Rc<dyn ValueRenderer>,
    pub settings: &'a Settings,
    pub file_path: &'a Path,
    pub spawner: &'a dyn Spawner,
}

/// A rendered replacement for a span of source text.
#[derive(Debug, Clone)]
pub struct Widget {
    id: WidgetId,
    kind: WidgetKind,
    source: String,
    classes: BTreeSet<String>,
    element: Element,
    lifecycle: Lifecycle,
}

impl Widget {
    /// Wrap an element. `classes` are added to it and tracked for patching.
    pub fn new(kind: WidgetKind, source: &str, classes: BTreeSet<String>, element: Element) -> Self {
        for class in &classes {
            element.add_class(class);
        }
        Self {
            id: WidgetId::next(),
            kind,
            source: source.to_string(),
            classes,
            element,
            lifecycle: Lifecycle::new(),
        }
    }

    pub const fn id(&self) -> WidgetId {
        self.id
    }

    pub const fn kind(&self) -> WidgetKind {
        self.kind
    }

    /// Raw source text the widget replaces.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub const fn classes(&self) -> &BTreeSet<String> {
        &self.classes
    }

    pub const fn element(&self) -> &Element {
        &self.element
    }

    pub const fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Text currently displayed.
    pub fn text(&self) -> String {
        self.element.text_content()
    }

    /// Bring the element's classes in line with `classes` without
    /// rebuilding it. Returns whether anything changed.
    pub fn patch_classes(&mut self, classes: &BTreeSet<String>) -> bool {
        if &self.classes == classes {
            return false;
        }
        for stale in self.classes.difference(classes) {
            self.element.remove_class(stale);
        }
        for added in classes.difference(&self.classes) {
            self.element.add_class(added);
        }
        self.classes.clone_from(classes);
        true
    }

    /// Tear the widget down; pending deferred results are discarded.
    pub fn dispose(&self) {
        self.lifecycle.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        !self.lifecycle.is_alive()
    }
}

impl PartialEq for Widget {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(source: &str, classes: &[&str]) -> Widget {
        Widget::new(
            WidgetKind::Query(QueryKind::Expression),
            source,
            classes.iter().map(|c| (*c).to_string()).collect(),
            Element::new("span"),
        )
    }

    #[test]
    fn test_equality_ignores_classes() {
        let a = widget("= 1", &["dataview"]);
        let b = widget("= 1", &["dataview", "cm-header"]);
        let c = widget("= 2", &["dataview"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_patch_classes_updates_element_in_place() {
        let mut w = widget("= 1", &["dataview", "cm-list"]);
        let element = w.element().clone();
        let wanted: BTreeSet<String> = ["dataview", "cm-header"].iter().map(|c| (*c).to_string()).collect();

        assert!(w.patch_classes(&wanted));
        assert!(element.has_class("cm-header"));
        assert!(!element.has_class("cm-list"));
        assert!(w.element().same_node(&element));
        assert!(!w.patch_classes(&wanted));
    }

    #[test]
    fn test_dispose_marks_widget() {
        let w = widget("= 1", &[]);
        assert!(!w.is_disposed());
        w.dispose();
        assert!(w.is_disposed());
    }

    #[test]
    fn test_error_strings() {
        assert_eq!(WidgetError::Disabled.to_string(), "(disabled; enable in settings)");
        let err = WidgetError::Script {
            code: "boom()".into(),
            source: ScriptError::new("boom"),
        };
        assert_eq!(err.to_string(), "Dataview (for inline JS query 'boom()'): boom");
    }
}
