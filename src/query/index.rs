use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::document::{Document, SyntaxTree};
use crate::fields::{canonicalize_key, scan_line};

use super::{Value, parse_inline_value};

/// Metadata known about one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub path: PathBuf,
    pub fields: BTreeMap<String, Value>,
    /// Keys whose value is a list of repeated occurrences
    repeated: BTreeSet<String>,
}

impl Page {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            fields: BTreeMap::new(),
            repeated: BTreeSet::new(),
        }
    }

    /// Collect the inline fields of a document into a page.
    ///
    /// Repeated keys accumulate into a list.
    pub fn from_document(path: impl Into<PathBuf>, doc: &Document, syntax: &SyntaxTree) -> Self {
        let mut page = Self::new(path);
        for number in 0..doc.line_count() {
            if syntax.is_excluded_line(number) {
                continue;
            }
            let Some(line) = doc.line(number) else {
                continue;
            };
            for field in scan_line(&line.text) {
                page.add_field(field.display_key(), parse_inline_value(&field.value));
            }
        }
        page
    }

    /// Add a field value, turning repeated keys into lists.
    ///
    /// A list value is kept whole: `tags:: [a, b]` then `tags:: c` gives
    /// `[[a, b], c]`.
    pub fn add_field(&mut self, key: &str, value: Value) {
        match self.fields.get_mut(key) {
            Some(Value::List(items)) if self.repeated.contains(key) => items.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::List(vec![first, value]);
                self.repeated.insert(key.to_string());
            }
            None => {
                self.fields.insert(key.to_string(), value);
            }
        }
    }

    /// Look a field up by exact key, then by canonical key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key).or_else(|| {
            let wanted = canonicalize_key(key);
            self.fields
                .iter()
                .find(|(k, _)| canonicalize_key(k) == wanted)
                .map(|(_, v)| v)
        })
    }

    /// File name without the extension.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The implicit `file` object.
    pub fn file_value(&self) -> Value {
        let mut file = BTreeMap::new();
        file.insert("name".to_string(), Value::String(self.name()));
        file.insert(
            "path".to_string(),
            Value::String(self.path.to_string_lossy().into_owned()),
        );
        let folder = self
            .path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        file.insert("folder".to_string(), Value::String(folder));
        Value::Object(file)
    }

    /// The page as an object: its fields plus `file`.
    pub fn to_value(&self) -> Value {
        let mut object = self.fields.clone();
        object.insert("file".to_string(), self.file_value());
        Value::Object(object)
    }
}

/// Read-only access to page metadata.
pub trait PageIndex {
    /// Whether the index finished its initial load. Nothing renders before.
    fn initialized(&self) -> bool;

    /// Metadata for a path, if indexed.
    fn page(&self, path: &Path) -> Option<&Page>;
}

/// A page index held in memory.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    pages: BTreeMap<PathBuf, Page>,
    initialized: Cell<bool>,
}

impl MemoryIndex {
    /// An empty index that has not finished loading.
    pub fn new() -> Self {
        Self::default()
    }

    /// An index that is already initialized.
    pub fn ready(pages: impl IntoIterator<Item = Page>) -> Self {
        let index = Self {
            pages: pages.into_iter().map(|p| (p.path.clone(), p)).collect(),
            initialized: Cell::new(false),
        };
        index.mark_initialized();
        index
    }

    /// Parse `{"path": {"field": value, ...}, ...}`.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or not an object of objects.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, serde_json::Value>> =
            serde_json::from_str(json).context("Failed to parse page index")?;
        let pages = raw.into_iter().map(|(path, fields)| Page {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect(),
            ..Page::new(path)
        });
        Ok(Self::ready(pages))
    }

    /// Load a JSON page index from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read page index {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Failed to load page index {}", path.display()))
    }

    /// Add or replace a page. Fields already known for the path are kept
    /// unless the new page sets them.
    pub fn insert(&mut self, page: Page) {
        match self.pages.get_mut(&page.path) {
            Some(existing) => {
                for key in page.fields.keys() {
                    existing.repeated.remove(key);
                }
                existing.repeated.extend(page.repeated);
                existing.fields.extend(page.fields);
            }
            None => {
                self.pages.insert(page.path.clone(), page);
            }
        }
    }

    pub fn mark_initialized(&self) {
        self.initialized.set(true);
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

impl PageIndex for MemoryIndex {
    fn initialized(&self) -> bool {
        self.initialized.get()
    }

    fn page(&self, path: &Path) -> Option<&Page> {
        self.pages.get(path)
    }
}
