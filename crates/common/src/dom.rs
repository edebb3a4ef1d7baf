//! Document abstraction for preview frames
//!
//! The preview pipeline only needs four operations from a DOM: find an
//! element by its stable identifier attribute, set an inline style, and
//! add/remove a `<style>` element by id. [`Document`] captures exactly that
//! so the pipeline runs against a browser binding or [`MemoryDocument`].

use crate::error::{Error, Result};
use crate::types::StyleMap;
use std::collections::BTreeMap;

/// Attribute carrying the stable element identifier.
pub const STABLE_ID_ATTR: &str = "data-ab-id";

/// Handle to a node inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Minimal mutable DOM surface used by the preview pipeline.
pub trait Document {
    /// First element in document order whose stable identifier attribute
    /// equals `stable_id`.
    fn find_by_stable_id(&self, stable_id: &str) -> Option<NodeId>;

    /// Set one inline style property on an element.
    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()>;

    /// Remove the element whose `id` attribute equals `element_id`.
    /// Returns whether an element was removed.
    fn remove_element_by_id(&mut self, element_id: &str) -> Result<bool>;

    /// Append a `<style id="{element_id}">` element holding `css` to the
    /// document head.
    fn append_style_element(&mut self, element_id: &str, css: &str) -> Result<NodeId>;
}

#[derive(Debug, Clone)]
struct Node {
    tag_name: String,
    attrs: BTreeMap<String, String>,
    inline_style: StyleMap,
    text: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory document with an `html > (head, body)` skeleton.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
    read_only: bool,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            head: NodeId(0),
            body: NodeId(0),
            read_only: false,
        };
        doc.root = doc.create_node(None, "html", BTreeMap::new());
        doc.head = doc.create_node(Some(doc.root), "head", BTreeMap::new());
        doc.body = doc.create_node(Some(doc.root), "body", BTreeMap::new());
        doc
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Reject all further writes, as a sandboxed cross-origin document does.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    fn create_node(
        &mut self,
        parent: Option<NodeId>,
        tag_name: &str,
        attrs: BTreeMap<String, String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
            inline_style: StyleMap::new(),
            text: String::new(),
            parent,
            children: Vec::new(),
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    /// Append an element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag_name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let attrs = attrs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.create_node(Some(parent), tag_name, attrs)
    }

    /// Append an element carrying a stable identifier under `<body>`.
    pub fn append_tracked(&mut self, tag_name: &str, stable_id: &str) -> NodeId {
        let body = self.body;
        self.append_element(body, tag_name, &[(STABLE_ID_ATTR, stable_id)])
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.text = text.to_string();
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.text.as_str())
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(node.0).map(|n| n.tag_name.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes
            .get(node.0)
            .and_then(|n| n.attrs.get(name))
            .map(String::as_str)
    }

    pub fn inline_style(&self, node: NodeId) -> Option<&StyleMap> {
        self.nodes.get(node.0).map(|n| &n.inline_style)
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.inline_style(node)
            .and_then(|s| s.get(property))
            .map(String::as_str)
    }

    /// Attached nodes in document order.
    fn walk(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(element_id))
    }

    pub fn count_by_id(&self, element_id: &str) -> usize {
        self.walk()
            .into_iter()
            .filter(|n| self.attr(*n, "id") == Some(element_id))
            .count()
    }

    /// All attached `<style>` elements in document order.
    pub fn style_elements(&self) -> Vec<NodeId> {
        self.walk()
            .into_iter()
            .filter(|n| self.tag_name(*n) == Some("style"))
            .collect()
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only {
            return Err(Error::Document("document is read-only".to_string()));
        }
        Ok(())
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }
}

impl Document for MemoryDocument {
    fn find_by_stable_id(&self, stable_id: &str) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .find(|n| self.attr(*n, STABLE_ID_ATTR) == Some(stable_id))
    }

    fn set_inline_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        self.check_writable()?;
        let n = self
            .nodes
            .get_mut(node.0)
            .ok_or_else(|| Error::Document(format!("no node {}", node.0)))?;
        n.inline_style.insert(property.to_string(), value.to_string());
        Ok(())
    }

    fn remove_element_by_id(&mut self, element_id: &str) -> Result<bool> {
        self.check_writable()?;
        match self.element_by_id(element_id) {
            Some(node) => {
                self.detach(node);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn append_style_element(&mut self, element_id: &str, css: &str) -> Result<NodeId> {
        self.check_writable()?;
        let head = self.head;
        let node = self.append_element(head, "style", &[("id", element_id)]);
        self.set_text(node, css);
        Ok(node)
    }
}
