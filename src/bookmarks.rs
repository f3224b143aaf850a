//! Browser bookmark access.
//!
//! Bookmarks are an optional capability: every consumer asks
//! [`BookmarkProvider::is_available`] first and hides its surface when the
//! answer is no. Bookmarks can be added, edited and removed but never
//! reordered.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value};

use crate::error::BookmarkError;

/// Node of the provider's bookmark tree. Folders have no url.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BookmarkNode {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub children: Vec<BookmarkNode>,
}

/// A bookmark flattened out of the tree for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
}

impl Bookmark {
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    /// Case-insensitive match on title or url. An empty term matches all.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        term.is_empty()
            || self.display_title().to_lowercase().contains(&term)
            || self.url.to_lowercase().contains(&term)
    }
}

pub trait BookmarkProvider {
    fn is_available(&self) -> bool;
    fn tree(&self) -> Result<Vec<BookmarkNode>, BookmarkError>;
    fn create(&mut self, url: &str, title: &str) -> Result<Bookmark, BookmarkError>;
    fn update(&mut self, id: &str, url: &str, title: &str) -> Result<(), BookmarkError>;
    fn remove(&mut self, id: &str) -> Result<(), BookmarkError>;
}

/// Depth-first list of url bookmarks, skipping `javascript:` bookmarklets.
pub fn flatten(nodes: &[BookmarkNode]) -> Vec<Bookmark> {
    let mut out = Vec::new();
    collect(nodes, &mut out);
    out
}

fn collect(nodes: &[BookmarkNode], out: &mut Vec<Bookmark>) {
    for node in nodes {
        match &node.url {
            Some(url) if !url.starts_with("javascript:") => out.push(Bookmark {
                id: node.id.clone(),
                title: node.title.clone(),
                url: url.clone(),
            }),
            Some(_) => {}
            None => collect(&node.children, out),
        }
    }
}

/// Stand-in used when no bookmark source is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

impl BookmarkProvider for Unavailable {
    fn is_available(&self) -> bool {
        false
    }

    fn tree(&self) -> Result<Vec<BookmarkNode>, BookmarkError> {
        Err(BookmarkError::Unavailable)
    }

    fn create(&mut self, _url: &str, _title: &str) -> Result<Bookmark, BookmarkError> {
        Err(BookmarkError::Unavailable)
    }

    fn update(&mut self, _id: &str, _url: &str, _title: &str) -> Result<(), BookmarkError> {
        Err(BookmarkError::Unavailable)
    }

    fn remove(&mut self, _id: &str) -> Result<(), BookmarkError> {
        Err(BookmarkError::Unavailable)
    }
}

/// Offset between the Windows epoch Chromium stamps with and the Unix epoch.
const CHROMIUM_EPOCH_OFFSET_MICROS: i64 = 11_644_473_600_000_000;

/// Reads and writes a Chromium profile `Bookmarks` file.
#[derive(Clone, Debug)]
pub struct ChromiumBookmarks {
    path: PathBuf,
}

impl ChromiumBookmarks {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Value, BookmarkError> {
        if !self.is_available() {
            return Err(BookmarkError::Unavailable);
        }
        let data = fs::read_to_string(&self.path)?;
        let doc: Value = serde_json::from_str(&data)?;
        if !doc.get("roots").is_some_and(Value::is_object) {
            return Err(BookmarkError::Malformed("missing roots".into()));
        }
        Ok(doc)
    }

    fn store(&self, doc: &mut Value) -> Result<(), BookmarkError> {
        // The stored checksum no longer matches once we edit the tree.
        if let Some(obj) = doc.as_object_mut() {
            obj.remove("checksum");
        }
        fs::write(&self.path, serde_json::to_string_pretty(doc)?)?;
        Ok(())
    }

    fn roots_mut(doc: &mut Value) -> Result<&mut Map<String, Value>, BookmarkError> {
        doc.get_mut("roots")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| BookmarkError::Malformed("missing roots".into()))
    }
}

fn node_id(node: &Value) -> Option<&str> {
    node.get("id").and_then(Value::as_str)
}

fn to_node(value: &Value) -> BookmarkNode {
    let children = value
        .get("children")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(to_node).collect())
        .unwrap_or_default();
    BookmarkNode {
        id: node_id(value).unwrap_or_default().to_string(),
        title: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        url: value.get("url").and_then(Value::as_str).map(str::to_string),
        children,
    }
}

fn max_id(value: &Value) -> u64 {
    let own = node_id(value).and_then(|id| id.parse().ok()).unwrap_or(0);
    value
        .get("children")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(max_id).max().unwrap_or(0))
        .unwrap_or(0)
        .max(own)
}

fn find_mut<'a>(node: &'a mut Value, id: &str) -> Option<&'a mut Value> {
    if node_id(node) == Some(id) {
        return Some(node);
    }
    node.get_mut("children")?
        .as_array_mut()?
        .iter_mut()
        .find_map(|child| find_mut(child, id))
}

fn remove_from(node: &mut Value, id: &str) -> bool {
    let Some(children) = node.get_mut("children").and_then(Value::as_array_mut) else {
        return false;
    };
    if let Some(pos) = children.iter().position(|child| node_id(child) == Some(id)) {
        children.remove(pos);
        return true;
    }
    children.iter_mut().any(|child| remove_from(child, id))
}

fn chromium_timestamp() -> String {
    (chrono::Utc::now().timestamp_micros() + CHROMIUM_EPOCH_OFFSET_MICROS).to_string()
}

impl BookmarkProvider for ChromiumBookmarks {
    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn tree(&self) -> Result<Vec<BookmarkNode>, BookmarkError> {
        let doc = self.load()?;
        let roots = doc
            .get("roots")
            .and_then(Value::as_object)
            .map(|roots| {
                roots
                    .values()
                    .filter(|root| root.is_object())
                    .map(to_node)
                    .collect()
            })
            .unwrap_or_default();
        Ok(roots)
    }

    fn create(&mut self, url: &str, title: &str) -> Result<Bookmark, BookmarkError> {
        let mut doc = self.load()?;
        let roots = Self::roots_mut(&mut doc)?;
        let id = (roots.values().map(max_id).max().unwrap_or(0) + 1).to_string();
        let bar = roots
            .get_mut("bookmark_bar")
            .and_then(|bar| bar.get_mut("children"))
            .and_then(Value::as_array_mut)
            .ok_or_else(|| BookmarkError::Malformed("missing bookmark_bar".into()))?;
        bar.push(json!({
            "date_added": chromium_timestamp(),
            "id": id,
            "name": title,
            "type": "url",
            "url": url,
        }));
        self.store(&mut doc)?;
        log::info!("created bookmark {id}");
        Ok(Bookmark {
            id,
            title: title.to_string(),
            url: url.to_string(),
        })
    }

    fn update(&mut self, id: &str, url: &str, title: &str) -> Result<(), BookmarkError> {
        let mut doc = self.load()?;
        let node = Self::roots_mut(&mut doc)?
            .values_mut()
            .find_map(|root| find_mut(root, id))
            .ok_or_else(|| BookmarkError::NotFound(id.to_string()))?;
        let obj = node
            .as_object_mut()
            .ok_or_else(|| BookmarkError::Malformed(format!("node {id} is not an object")))?;
        obj.insert("name".into(), Value::String(title.to_string()));
        obj.insert("url".into(), Value::String(url.to_string()));
        self.store(&mut doc)?;
        log::info!("updated bookmark {id}");
        Ok(())
    }

    fn remove(&mut self, id: &str) -> Result<(), BookmarkError> {
        let mut doc = self.load()?;
        let removed = Self::roots_mut(&mut doc)?
            .values_mut()
            .any(|root| remove_from(root, id));
        if !removed {
            return Err(BookmarkError::NotFound(id.to_string()));
        }
        self.store(&mut doc)?;
        log::info!("removed bookmark {id}");
        Ok(())
    }
}
