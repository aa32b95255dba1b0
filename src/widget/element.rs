use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Node {
    tag: String,
    classes: BTreeSet<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<Element>,
}

/// A shared, mutable display element.
///
/// Clones point at the same node, so content written through one handle
/// (for example by a deferred script result) is visible through all of
/// them.
#[derive(Clone, Default)]
pub struct Element(Rc<RefCell<Node>>);

impl Element {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(Node {
            tag: tag.to_string(),
            ..Node::default()
        })))
    }

    /// Builder form of [`Element::add_class`] accepting space-separated
    /// class lists.
    #[must_use]
    pub fn with_class(self, classes: &str) -> Self {
        for class in classes.split_whitespace() {
            self.add_class(class);
        }
        self
    }

    #[must_use]
    pub fn with_text(self, text: &str) -> Self {
        self.set_text(text);
        self
    }

    #[must_use]
    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    pub fn add_class(&self, class: &str) {
        self.0.borrow_mut().classes.insert(class.to_string());
    }

    pub fn remove_class(&self, class: &str) {
        self.0.borrow_mut().classes.remove(class);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.0.borrow().classes.contains(class)
    }

    pub fn classes(&self) -> BTreeSet<String> {
        self.0.borrow().classes.clone()
    }

    pub fn set_attr(&self, name: &str, value: &str) {
        self.0
            .borrow_mut()
            .attrs
            .insert(name.to_string(), value.to_string());
    }

    pub fn attr(&self, name: &str) -> Option<String> {
        self.0.borrow().attrs.get(name).cloned()
    }

    /// Replace the element's content with plain text.
    pub fn set_text(&self, text: &str) {
        let mut node = self.0.borrow_mut();
        node.children.clear();
        text.clone_into(&mut node.text);
    }

    pub fn append(&self, child: Self) {
        self.0.borrow_mut().children.push(child);
    }

    /// Remove all content.
    pub fn clear(&self) {
        let mut node = self.0.borrow_mut();
        node.children.clear();
        node.text.clear();
    }

    pub fn children(&self) -> Vec<Self> {
        self.0.borrow().children.clone()
    }

    /// First descendant (depth-first) carrying `class`.
    pub fn find_by_class(&self, class: &str) -> Option<Self> {
        self.children().into_iter().find_map(|child| {
            if child.has_class(class) {
                Some(child)
            } else {
                child.find_by_class(class)
            }
        })
    }

    /// Concatenated text of the element and its descendants.
    pub fn text_content(&self) -> String {
        let node = self.0.borrow();
        let mut out = node.text.clone();
        for child in &node.children {
            out.push_str(&child.text_content());
        }
        out
    }

    /// Whether both handles point at the same node.
    pub fn same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.0.borrow();
        f.debug_struct("Element")
            .field("tag", &node.tag)
            .field("classes", &node.classes)
            .field("text", &self.text_content())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_content_includes_children() {
        let root = Element::new("span").with_class("dataview inline-field");
        root.append(Element::new("span").with_text("Rating"));
        root.append(Element::new("span").with_text("5"));
        assert_eq!(root.text_content(), "Rating5");
        assert!(root.has_class("inline-field"));
    }

    #[test]
    fn test_clones_share_the_node() {
        let el = Element::new("span");
        let other = el.clone();
        other.set_text("late");
        assert_eq!(el.text_content(), "late");
        assert!(el.same_node(&other));
        assert!(!el.same_node(&Element::new("span")));
    }

    #[test]
    fn test_set_text_replaces_children() {
        let el = Element::new("span");
        el.append(Element::new("span").with_text("old"));
        el.set_text("new");
        assert!(el.children().is_empty());
        assert_eq!(el.text_content(), "new");
    }

    #[test]
    fn test_find_by_class() {
        let root = Element::new("span");
        let inner = Element::new("span").with_class("inline-field-value");
        root.append(Element::new("span").with_class("wrapper"));
        root.children()[0].append(inner.clone());
        assert!(root.find_by_class("inline-field-value").unwrap().same_node(&inner));
        assert!(root.find_by_class("missing").is_none());
    }
}
