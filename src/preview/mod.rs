//! Selection-aware conceal/reveal reconciliation.
//!
//! This module implements the preview as a state machine:
//! - [`Message`]: one variant per host update kind
//! - [`LivePreview::update`]: one transition per message, each returning the
//!   [`Delta`] it applied
//! - Two independent channels: fields and queries each have their own
//!   [`DecorationSet`]
//!
//! Every transition ends by walking the visible lines and comparing the
//! desired state of each candidate span with what its channel holds:
//! spans under the selection are revealed, the rest are concealed, and
//! anything no longer wanted is dropped.

mod classify;
mod parked;
mod tasks;

pub use classify::{InlineQuery, classify, query_kind};
pub use parked::ParkedWidgets;
pub use tasks::TaskQueue;

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::path::Path;
use std::rc::Rc;

use crate::config::Settings;
use crate::decoration::{Channel, Decoration, DecorationSet};
use crate::document::{ChangeSet, Document, SyntaxTree};
use crate::editor::{EditorBuffer, Selection, ViewUpdate, overlaps};
use crate::fields::scan_line;
use crate::perf;
use crate::query::{ExprEngine, PageIndex, QueryEngine, ScriptHost, UnavailableScriptHost};
use crate::ui::style;
use crate::widget::{
    QueryKind, TextRenderer, ValueRenderer, WidgetEnv, build_field_widget, build_query_widget,
    field_marks,
};

/// Host events the preview reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// The document was edited; the change set is in old coordinates
    DocChanged(ChangeSet),
    /// The selection moved
    SelectionChanged,
    /// The visible ranges moved
    ViewportChanged,
    /// Switched between live preview and source mode
    ModeChanged,
    /// Settings were replaced
    SettingsChanged(Settings),
    /// The page index finished loading
    IndexReady,
}

impl Message {
    /// Pick the message for a host update. An edit wins over a selection
    /// change, which wins over a viewport change.
    pub fn from_update(update: &ViewUpdate) -> Option<Self> {
        if let Some(changes) = &update.changes {
            Some(Self::DocChanged(changes.clone()))
        } else if update.selection_set {
            Some(Self::SelectionChanged)
        } else if update.viewport_changed {
            Some(Self::ViewportChanged)
        } else {
            None
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::DocChanged(_) => "doc",
            Self::SelectionChanged => "selection",
            Self::ViewportChanged => "viewport",
            Self::ModeChanged => "mode",
            Self::SettingsChanged(_) => "settings",
            Self::IndexReady => "index",
        }
    }
}

/// What one transition did to the decoration channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: usize,
    pub removed: usize,
    /// Widgets kept but given new classes
    pub patched: usize,
    /// Whether the channels were emptied before reconciling
    pub from_scratch: bool,
}

impl Delta {
    const fn from_scratch() -> Self {
        Self {
            added: 0,
            removed: 0,
            patched: 0,
            from_scratch: true,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0 && self.patched == 0
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} removed={} patched={}",
            self.added, self.removed, self.patched
        )?;
        if self.from_scratch {
            write!(f, " from-scratch")?;
        }
        Ok(())
    }
}

/// Everything the reconciler reads from the host for one pass.
#[derive(Debug, Clone)]
pub struct ViewState<'a> {
    pub doc: &'a Document,
    pub syntax: &'a SyntaxTree,
    pub selection: &'a Selection,
    /// Visible byte ranges, each made of whole lines
    pub visible: Vec<Range<usize>>,
    pub file_path: &'a Path,
    pub live_preview: bool,
}

impl<'a> ViewState<'a> {
    /// Snapshot an editor buffer.
    pub fn of(buffer: &'a EditorBuffer) -> Self {
        Self {
            doc: buffer.document(),
            syntax: buffer.syntax(),
            selection: buffer.selection(),
            visible: buffer.visible_ranges(),
            file_path: buffer.file_path().unwrap_or_else(|| Path::new("")),
            live_preview: buffer.is_live_preview(),
        }
    }
}

struct Collaborators {
    engine: Rc<dyn QueryEngine>,
    index: Rc<dyn PageIndex>,
    scripts: Rc<dyn ScriptHost>,
    renderer: Rc<dyn ValueRenderer>,
    settings: Settings,
    tasks: TaskQueue,
}

impl Collaborators {
    fn env<'a>(&'a self, file_path: &'a Path) -> WidgetEnv<'a> {
        WidgetEnv {
            engine: self.engine.as_ref(),
            index: &self.index,
            scripts: self.scripts.as_ref(),
            renderer: &self.renderer,
            settings: &self.settings,
            file_path,
            spawner: &self.tasks,
        }
    }
}

/// The reconciler for one editor view.
pub struct LivePreview {
    cx: Collaborators,
    fields: DecorationSet,
    queries: DecorationSet,
    parked: ParkedWidgets,
}

impl LivePreview {
    /// Create a preview reading from `index`, with the built-in expression
    /// engine, plain-text rendering and no script runtime.
    pub fn new(index: Rc<dyn PageIndex>) -> Self {
        Self {
            cx: Collaborators {
                engine: Rc::new(ExprEngine),
                index,
                scripts: Rc::new(UnavailableScriptHost),
                renderer: Rc::new(TextRenderer),
                settings: Settings::default(),
                tasks: TaskQueue::new(),
            },
            fields: DecorationSet::new(Channel::Field),
            queries: DecorationSet::new(Channel::Query),
            parked: ParkedWidgets::default(),
        }
    }

    #[must_use]
    pub fn with_engine(mut self, engine: Rc<dyn QueryEngine>) -> Self {
        self.cx.engine = engine;
        self
    }

    #[must_use]
    pub fn with_script_host(mut self, scripts: Rc<dyn ScriptHost>) -> Self {
        self.cx.scripts = scripts;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Rc<dyn ValueRenderer>) -> Self {
        self.cx.renderer = renderer;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.cx.settings = settings;
        self
    }

    pub const fn settings(&self) -> &Settings {
        &self.cx.settings
    }

    pub const fn fields(&self) -> &DecorationSet {
        &self.fields
    }

    pub const fn queries(&self) -> &DecorationSet {
        &self.queries
    }

    pub const fn parked(&self) -> &ParkedWidgets {
        &self.parked
    }

    /// Drive deferred widget work queued so far.
    pub fn run_pending_tasks(&mut self) {
        self.cx.tasks.run_until_stalled();
    }

    /// Number of deferred tasks queued since creation.
    pub fn queued_tasks(&self) -> usize {
        self.cx.tasks.queued()
    }

    /// Initial build for a freshly attached view.
    pub fn build(&mut self, view: &ViewState<'_>) -> Delta {
        self.update(Message::ModeChanged, view)
    }

    /// Apply one host event. `view` must describe the state after the
    /// event.
    pub fn update(&mut self, message: Message, view: &ViewState<'_>) -> Delta {
        let _scope = perf::scope("preview.update");
        let kind = message.kind();
        let delta = match message {
            Message::DocChanged(changes) => self.doc_changed(&changes, view),
            Message::SelectionChanged => self.selection_changed(view),
            Message::ViewportChanged => self.viewport_changed(view),
            Message::ModeChanged | Message::IndexReady => self.rebuild(view),
            Message::SettingsChanged(settings) => {
                self.cx.settings = settings;
                self.rebuild(view)
            }
        };
        tracing::debug!(
            kind,
            added = delta.added,
            removed = delta.removed,
            patched = delta.patched,
            from_scratch = delta.from_scratch,
            "reconciled"
        );
        perf::log_event(&format!("reconcile.{kind}"), delta.to_string());
        delta
    }

    fn doc_changed(&mut self, changes: &ChangeSet, view: &ViewState<'_>) -> Delta {
        let mut delta = Delta::default();
        for set in [&mut self.fields, &mut self.queries] {
            let touched = set.map(changes);
            delta.removed += touched.len();
            touched.iter().for_each(Decoration::dispose);
        }
        self.parked.map(changes);
        self.reconcile(view, &mut delta);
        delta
    }

    fn selection_changed(&mut self, view: &ViewState<'_>) -> Delta {
        let mut delta = Delta::default();
        self.reconcile(view, &mut delta);
        delta
    }

    // From scratch, but widgets are parked first so spans still on screen
    // come back without being rebuilt.
    fn viewport_changed(&mut self, view: &ViewState<'_>) -> Delta {
        let mut delta = Delta::from_scratch();
        let fields = self.fields.clear();
        let queries = self.queries.clear();
        delta.removed += fields.len() + queries.len();
        self.parked.park_all(Channel::Field, fields);
        self.parked.park_all(Channel::Query, queries);
        self.reconcile(view, &mut delta);
        delta
    }

    fn rebuild(&mut self, view: &ViewState<'_>) -> Delta {
        let mut delta = Delta::from_scratch();
        delta.removed += self.discard_all();
        self.reconcile(view, &mut delta);
        delta
    }

    fn discard_all(&mut self) -> usize {
        let mut removed = 0;
        for set in [&mut self.fields, &mut self.queries] {
            let dropped = set.clear();
            removed += dropped.len();
            dropped.iter().for_each(Decoration::dispose);
        }
        self.parked.clear();
        removed
    }

    fn reconcile(&mut self, view: &ViewState<'_>, delta: &mut Delta) {
        if !self.cx.index.initialized() {
            delta.removed += self.discard_all();
            return;
        }
        self.reconcile_fields(view, delta);
        self.reconcile_queries(view, delta);
        self.parked.retain_visible(&view.visible);
    }

    fn reconcile_fields(&mut self, view: &ViewState<'_>, delta: &mut Delta) {
        let _scope = perf::scope("preview.fields");
        let pretty = view.live_preview && self.cx.settings.pretty_render_inline_fields_in_live_preview;
        let env = self.cx.env(view.file_path);
        let classes = style::field_widget_classes(&self.cx.settings);
        let mut wanted: HashSet<Range<usize>> = HashSet::new();

        for range in &view.visible {
            for line in view.doc.lines_between(range.start, range.end) {
                if view.syntax.is_excluded_line(line.number) {
                    continue;
                }
                for field in scan_line(&line.text) {
                    let owner = line.from + field.start..line.from + field.end;

                    if !pretty {
                        // Styling only; the selection never hides marks.
                        wanted.insert(owner.clone());
                        delta.added += self.fields.insert_with(&owner, || {
                            field_marks(&field, line.from)
                                .into_iter()
                                .map(|m| Decoration::mark(m.range, owner.clone(), m.class))
                                .collect()
                        });
                        continue;
                    }

                    if overlaps(view.selection, owner.start, owner.end) {
                        let revealed = self.fields.remove_intersecting(owner.start, owner.end);
                        delta.removed += revealed.len();
                        self.parked.park_all(Channel::Field, revealed);
                        continue;
                    }

                    wanted.insert(owner.clone());
                    if let Some(widget) = self.fields.widget_mut(&owner) {
                        if widget.patch_classes(&classes) {
                            delta.patched += 1;
                        }
                        continue;
                    }
                    let source = &line.text[field.range()];
                    let parked = &mut self.parked;
                    delta.added += self.fields.insert_with(&owner, || {
                        let widget = match parked.take(Channel::Field, &owner, source) {
                            Some(mut widget) => {
                                widget.patch_classes(&classes);
                                widget
                            }
                            None => build_field_widget(&field, source, &env),
                        };
                        vec![Decoration::replace(owner.clone(), widget)]
                    });
                }
            }
        }

        let stale = self.fields.remove_where(|d| !wanted.contains(&d.owner));
        delta.removed += stale.len();
        stale.iter().for_each(Decoration::dispose);
    }

    fn reconcile_queries(&mut self, view: &ViewState<'_>, delta: &mut Delta) {
        let _scope = perf::scope("preview.queries");
        let env = self.cx.env(view.file_path);
        let mut wanted: HashSet<Range<usize>> = HashSet::new();

        // Queries only render in live preview.
        let visible: &[Range<usize>] = if view.live_preview { &view.visible } else { &[] };
        for range in visible {
            let nodes = view
                .syntax
                .nodes_in(range.start, range.end)
                .filter(|n| range.start <= n.from && n.to <= range.end);
            for node in nodes {
                let Some(query) = classify(node, view.doc, &self.cx.settings) else {
                    continue;
                };
                let span = query.span.clone();

                if overlaps(view.selection, span.start, span.end) {
                    let revealed = self.queries.remove_intersecting(span.start, span.end);
                    delta.removed += revealed.len();
                    self.parked.park_all(Channel::Query, revealed);
                    continue;
                }

                wanted.insert(span.clone());
                let classes = style::query_widget_classes(node, query.kind == QueryKind::Script);
                if let Some(widget) = self.queries.widget_mut(&span) {
                    if widget.patch_classes(&classes) {
                        delta.patched += 1;
                    }
                    continue;
                }
                let parked = &mut self.parked;
                delta.added += self.queries.insert_with(&span, || {
                    let widget = match parked.take(Channel::Query, &span, &query.source) {
                        Some(mut widget) => {
                            widget.patch_classes(&classes);
                            widget
                        }
                        None => build_query_widget(
                            query.kind,
                            &query.source,
                            &query.code,
                            classes.clone(),
                            &env,
                        ),
                    };
                    vec![Decoration::replace(span.clone(), widget)]
                });
            }
        }

        let stale = self.queries.remove_where(|d| !wanted.contains(&d.owner));
        delta.removed += stale.len();
        stale.iter().for_each(Decoration::dispose);
    }
}

impl fmt::Debug for LivePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LivePreview")
            .field("settings", &self.cx.settings)
            .field("fields", &self.fields.len())
            .field("queries", &self.queries.len())
            .field("parked", &self.parked.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
