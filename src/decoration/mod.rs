//! Position-ordered decoration store.
//!
//! One [`DecorationSet`] exists per channel (fields, queries) and editor
//! view. Entries are kept sorted by start offset. Every entry records the
//! span that owns it: the field or query it was built for. Existence checks
//! compare owner spans exactly, and removal deletes every entry whose owner
//! intersects the given span.

use std::fmt;
use std::ops::Range;

use crate::document::{Assoc, ChangeSet};
use crate::widget::Widget;

/// Independent decoration channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Field,
    Query,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field => write!(f, "field"),
            Self::Query => write!(f, "query"),
        }
    }
}

/// What a decoration does to its range.
#[derive(Debug, Clone, PartialEq)]
pub enum DecorationKind {
    /// Hide the range and show the widget instead
    Replace(Widget),
    /// Keep the text and add a class
    Mark(&'static str),
}

/// A decoration over `range`, owned by the span `owner`.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    pub range: Range<usize>,
    pub owner: Range<usize>,
    pub kind: DecorationKind,
}

impl Decoration {
    /// A replacement covering its owner.
    pub const fn replace(owner: Range<usize>, widget: Widget) -> Self {
        Self {
            range: owner.start..owner.end,
            owner,
            kind: DecorationKind::Replace(widget),
        }
    }

    pub const fn mark(range: Range<usize>, owner: Range<usize>, class: &'static str) -> Self {
        Self {
            range,
            owner,
            kind: DecorationKind::Mark(class),
        }
    }

    pub const fn widget(&self) -> Option<&Widget> {
        match &self.kind {
            DecorationKind::Replace(widget) => Some(widget),
            DecorationKind::Mark(_) => None,
        }
    }

    pub const fn is_replace(&self) -> bool {
        matches!(self.kind, DecorationKind::Replace(_))
    }

    /// Release the widget, if any.
    pub fn dispose(&self) {
        if let Some(widget) = self.widget() {
            widget.dispose();
        }
    }

    fn owner_intersects(&self, from: usize, to: usize) -> bool {
        self.owner.start < to && from < self.owner.end
    }
}

/// Sorted decorations for one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DecorationSet {
    channel: Channel,
    entries: Vec<Decoration>,
}

impl DecorationSet {
    pub const fn new(channel: Channel) -> Self {
        Self {
            channel,
            entries: Vec::new(),
        }
    }

    pub const fn channel(&self) -> Channel {
        self.channel
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.entries.iter()
    }

    /// Decorations whose range intersects `from..=to`.
    pub fn between(&self, from: usize, to: usize) -> impl Iterator<Item = &Decoration> {
        self.entries
            .iter()
            .take_while(move |d| d.range.start <= to)
            .filter(move |d| d.range.end >= from)
    }

    /// Number of replacements.
    pub fn replace_count(&self) -> usize {
        self.entries.iter().filter(|d| d.is_replace()).count()
    }

    /// Whether any entry is owned by exactly `owner`.
    pub fn has_owner(&self, owner: &Range<usize>) -> bool {
        self.entries.iter().any(|d| d.owner == *owner)
    }

    /// The replacement owned by exactly `owner`.
    pub fn widget_mut(&mut self, owner: &Range<usize>) -> Option<&mut Widget> {
        self.entries
            .iter_mut()
            .find(|d| d.owner == *owner)
            .and_then(|d| match &mut d.kind {
                DecorationKind::Replace(widget) => Some(widget),
                DecorationKind::Mark(_) => None,
            })
    }

    /// Insert keeping start order; equal starts keep insertion order.
    pub fn insert(&mut self, decoration: Decoration) {
        let at = self
            .entries
            .partition_point(|d| d.range.start <= decoration.range.start);
        self.entries.insert(at, decoration);
    }

    /// Insert the decorations produced by `make` unless something already
    /// owns `owner`. `make` only runs when the insert happens.
    pub fn insert_with(
        &mut self,
        owner: &Range<usize>,
        make: impl FnOnce() -> Vec<Decoration>,
    ) -> usize {
        if self.has_owner(owner) {
            return 0;
        }
        let decorations = make();
        let count = decorations.len();
        for decoration in decorations {
            debug_assert_eq!(&decoration.owner, owner);
            self.insert(decoration);
        }
        count
    }

    /// Remove entries whose owner intersects `from..to` and hand them back.
    pub fn remove_intersecting(&mut self, from: usize, to: usize) -> Vec<Decoration> {
        self.remove_where(|d| d.owner_intersects(from, to))
    }

    /// Remove entries matching `pred` and hand them back.
    pub fn remove_where(&mut self, mut pred: impl FnMut(&Decoration) -> bool) -> Vec<Decoration> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for decoration in self.entries.drain(..) {
            if pred(&decoration) {
                removed.push(decoration);
            } else {
                kept.push(decoration);
            }
        }
        self.entries = kept;
        removed
    }

    /// Map every entry through an edit. Entries whose owner the edit
    /// touches are removed and handed back; the rest shift.
    pub fn map(&mut self, changes: &ChangeSet) -> Vec<Decoration> {
        let removed = self.remove_where(|d| changes.touches(d.owner.start, d.owner.end));
        for decoration in &mut self.entries {
            decoration.range = map_range(changes, &decoration.range);
            decoration.owner = map_range(changes, &decoration.owner);
        }
        self.entries.sort_by_key(|d| d.range.start);
        removed
    }

    /// Remove everything and hand it back.
    pub fn clear(&mut self) -> Vec<Decoration> {
        std::mem::take(&mut self.entries)
    }
}

/// Map a range that no change touches.
pub fn map_range(changes: &ChangeSet, range: &Range<usize>) -> Range<usize> {
    changes.map_pos(range.start, Assoc::After)..changes.map_pos(range.end, Assoc::Before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::{Element, QueryKind, WidgetKind};

    fn mark(owner: Range<usize>) -> Decoration {
        Decoration::mark(owner.clone(), owner, "inline-field-key")
    }

    #[test]
    fn test_insert_keeps_start_order() {
        let mut set = DecorationSet::new(Channel::Field);
        set.insert(mark(10..12));
        set.insert(mark(0..2));
        set.insert(mark(5..6));
        let starts: Vec<_> = set.iter().map(|d| d.range.start).collect();
        assert_eq!(starts, vec![0, 5, 10]);
    }

    #[test]
    fn test_insert_with_checks_existence_first() {
        let mut set = DecorationSet::new(Channel::Field);
        let owner = 3..9;
        assert_eq!(set.insert_with(&owner, || vec![mark(3..9)]), 1);
        let mut called = false;
        assert_eq!(
            set.insert_with(&owner, || {
                called = true;
                vec![mark(3..9)]
            }),
            0
        );
        assert!(!called);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_intersecting_spares_adjacent_owners() {
        let mut set = DecorationSet::new(Channel::Field);
        set.insert(mark(0..5));
        set.insert(mark(5..10));
        set.insert(mark(10..15));
        let removed = set.remove_intersecting(5, 10);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].owner, 5..10);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_between_is_inclusive() {
        let mut set = DecorationSet::new(Channel::Query);
        set.insert(mark(0..5));
        set.insert(mark(8..10));
        assert_eq!(set.between(5, 7).count(), 1);
        assert_eq!(set.between(6, 7).count(), 0);
        assert_eq!(set.between(0, 20).count(), 2);
    }

    #[test]
    fn test_map_drops_touched_and_shifts_the_rest() {
        let mut set = DecorationSet::new(Channel::Field);
        set.insert(mark(0..5));
        set.insert(mark(10..15));
        let removed = set.map(&ChangeSet::insert(7, "abc"));
        assert!(removed.is_empty());
        let ranges: Vec<_> = set.iter().map(|d| d.range.clone()).collect();
        assert_eq!(ranges, vec![0..5, 13..18]);

        let removed = set.map(&ChangeSet::insert(5, "x"));
        assert_eq!(removed.len(), 1);
        assert_eq!(set.iter().next().unwrap().owner, 14..19);
    }

    #[test]
    fn test_widget_mut_finds_replacement() {
        let mut set = DecorationSet::new(Channel::Query);
        let widget = Widget::new(
            WidgetKind::Query(QueryKind::Expression),
            "= 1",
            std::collections::BTreeSet::new(),
            Element::new("span"),
        );
        set.insert(Decoration::replace(4..11, widget));
        assert!(set.widget_mut(&(4..11)).is_some());
        assert!(set.widget_mut(&(4..10)).is_none());
        assert_eq!(set.replace_count(), 1);
    }
}
