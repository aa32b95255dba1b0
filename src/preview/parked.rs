use std::collections::HashMap;
use std::ops::Range;

use crate::decoration::{Channel, Decoration, DecorationKind, map_range};
use crate::document::ChangeSet;
use crate::widget::Widget;

/// Widgets taken off screen while their span is still valid.
///
/// Moving the cursor onto a span reveals it; moving away again should show
/// the same widget without rebuilding or re-evaluating it. Parked widgets
/// stay alive until reused or discarded.
#[derive(Debug, Default)]
pub struct ParkedWidgets {
    entries: HashMap<(Channel, Range<usize>), Widget>,
}

impl ParkedWidgets {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Park the widgets of removed decorations; marks are dropped.
    pub fn park_all(&mut self, channel: Channel, removed: Vec<Decoration>) {
        for decoration in removed {
            if let DecorationKind::Replace(widget) = decoration.kind {
                self.park(channel, decoration.owner, widget);
            }
        }
    }

    pub fn park(&mut self, channel: Channel, owner: Range<usize>, widget: Widget) {
        if let Some(previous) = self.entries.insert((channel, owner), widget) {
            previous.dispose();
        }
    }

    /// Take the widget parked for `owner` if it was built from `source`.
    /// A widget for different text is disposed.
    pub fn take(&mut self, channel: Channel, owner: &Range<usize>, source: &str) -> Option<Widget> {
        let widget = self.entries.remove(&(channel, owner.clone()))?;
        if widget.source() == source {
            Some(widget)
        } else {
            widget.dispose();
            None
        }
    }

    /// Dispose widgets an edit touched and shift the rest.
    pub fn map(&mut self, changes: &ChangeSet) {
        self.entries = std::mem::take(&mut self.entries)
            .into_iter()
            .filter_map(|((channel, owner), widget)| {
                if changes.touches(owner.start, owner.end) {
                    widget.dispose();
                    None
                } else {
                    Some(((channel, map_range(changes, &owner)), widget))
                }
            })
            .collect();
    }

    /// Dispose widgets whose span is no longer fully visible.
    pub fn retain_visible(&mut self, visible: &[Range<usize>]) {
        self.entries.retain(|(_, owner), widget| {
            let keep = visible
                .iter()
                .any(|r| r.start <= owner.start && owner.end <= r.end);
            if !keep {
                widget.dispose();
            }
            keep
        });
    }

    /// Dispose everything.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        for (_, widget) in self.entries.drain() {
            widget.dispose();
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::widget::{Element, QueryKind, WidgetKind};

    fn widget(source: &str) -> Widget {
        Widget::new(
            WidgetKind::Query(QueryKind::Expression),
            source,
            BTreeSet::new(),
            Element::new("span"),
        )
    }

    #[test]
    fn test_take_requires_matching_source() {
        let mut parked = ParkedWidgets::default();
        let w = widget("= 1");
        let probe = w.clone();
        parked.park(Channel::Query, 0..7, w);

        assert!(parked.take(Channel::Field, &(0..7), "= 1").is_none());
        let back = parked.take(Channel::Query, &(0..7), "= 1").unwrap();
        assert_eq!(back.id(), probe.id());
        assert!(parked.is_empty());

        parked.park(Channel::Query, 0..7, back);
        assert!(parked.take(Channel::Query, &(0..7), "= 2").is_none());
        assert!(probe.is_disposed());
    }

    #[test]
    fn test_map_disposes_touched_and_shifts_others() {
        let mut parked = ParkedWidgets::default();
        let touched = widget("= 1");
        let kept = widget("= 2");
        parked.park(Channel::Query, 0..7, touched.clone());
        parked.park(Channel::Query, 20..27, kept.clone());

        parked.map(&ChangeSet::insert(3, "xx"));
        assert!(touched.is_disposed());
        assert!(!kept.is_disposed());
        assert!(parked.take(Channel::Query, &(22..29), "= 2").is_some());
    }

    #[test]
    fn test_retain_visible() {
        let mut parked = ParkedWidgets::default();
        let inside = widget("= 1");
        let outside = widget("= 2");
        parked.park(Channel::Field, 0..5, inside.clone());
        parked.park(Channel::Field, 50..55, outside.clone());
        parked.retain_visible(&[0..40]);
        assert_eq!(parked.len(), 1);
        assert!(outside.is_disposed());
        assert!(!inside.is_disposed());
    }

    #[test]
    fn test_repark_disposes_previous() {
        let mut parked = ParkedWidgets::default();
        let first = widget("= 1");
        parked.park(Channel::Field, 0..5, first.clone());
        parked.park(Channel::Field, 0..5, widget("= 1"));
        assert!(first.is_disposed());
        assert_eq!(parked.clear(), 1);
    }
}
