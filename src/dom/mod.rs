//! Arena-backed HTML document tree.
//!
//! Every node lives in a single `Vec` owned by the [`Document`] and is
//! addressed by a [`NodeId`]. Parent/child relationships are index links:
//! a node's `children` list is the only ownership edge, and its `parent`
//! index exists purely so a transform can find where a node sits and swap
//! something else into that slot.
//!
//! ```text
//! Document (NodeId 0)
//! ├── Element "p"
//! │   └── Text "hello"
//! └── Element "img" { src: "/a.png" }
//! ```
//!
//! Detached nodes stay in the arena (ids are never reused) but are no longer
//! reachable from the root, so they drop out of traversal and serialization.
//!
//! Parsing goes through [`parse`], serialization through
//! [`Document::to_html`].

mod parse;
mod serialize;

pub use parse::{DomError, parse};

use std::collections::BTreeSet;

/// Index of a node inside its [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag name and attributes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    /// `(name, value)` pairs. A `None` value is a bare attribute (`<video muted>`).
    pub attrs: Vec<(String, Option<String>)>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| v.as_deref())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = Some(value.into());
        match self
            .attrs
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self
            .attrs
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))?;
        self.attrs.remove(pos).1
    }

    /// Move an attribute's value to a new name: `src` → `data-src`.
    ///
    /// Returns `false` when the source attribute is absent.
    pub fn relocate_attr(&mut self, from: &str, to: &str) -> bool {
        match self.remove_attr(from) {
            Some(value) => {
                self.set_attr(to, value);
                true
            }
            None => false,
        }
    }

    pub fn add_class(&mut self, class: &str) {
        let classes = match self.attr("class") {
            Some(existing) if existing.split_whitespace().any(|c| c == class) => return,
            Some(existing) if !existing.trim().is_empty() => {
                format!("{} {}", existing.trim(), class)
            }
            _ => class.to_string(),
        };
        self.set_attr("class", classes);
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(Element),
    /// Raw text, kept exactly as it appeared in the source (entities intact).
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed HTML document or fragment.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Allocate a detached element.
    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Detach `child` from wherever it is and append it to `parent`.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove a node from its parent's child list. The subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Put `new` into the slot `old` occupies in its parent.
    ///
    /// Only that one position changes; `old` becomes detached with its
    /// subtree untouched. Does nothing if `old` has no parent.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.nodes[old.0].parent else {
            return;
        };
        self.detach(new);
        let siblings = &mut self.nodes[parent.0].children;
        if let Some(pos) = siblings.iter().position(|c| *c == old) {
            siblings[pos] = new;
            self.nodes[new.0].parent = Some(parent);
            self.nodes[old.0].parent = None;
        }
    }

    /// Move every child of `from` onto the end of `to`, preserving order.
    pub fn move_children(&mut self, from: NodeId, to: NodeId) {
        let children = std::mem::take(&mut self.nodes[from.0].children);
        for child in children {
            self.nodes[child.0].parent = Some(to);
            self.nodes[to.0].children.push(child);
        }
    }

    /// Replace `target` with `outer` and hang `target` under `inner`.
    ///
    /// `inner` must already be a descendant of `outer` (or `outer` itself).
    pub fn wrap(&mut self, target: NodeId, outer: NodeId, inner: NodeId) {
        self.replace(target, outer);
        self.append_child(inner, target);
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Elements named `tag` reachable from the root, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| {
                self.element(*id)
                    .is_some_and(|el| el.name.eq_ignore_ascii_case(tag))
            })
            .collect()
    }

    /// First element named `tag` strictly below `id`.
    pub fn first_descendant_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|d| {
            self.element(*d)
                .is_some_and(|el| el.name.eq_ignore_ascii_case(tag))
        })
    }

    /// Whether any ancestor of `id` is an element named `tag`.
    pub fn has_ancestor(&self, id: NodeId, tag: &str) -> bool {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self
                .element(node)
                .is_some_and(|el| el.name.eq_ignore_ascii_case(tag))
            {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// Distinct element names present anywhere in the tree.
    pub fn tag_names(&self) -> BTreeSet<String> {
        self.descendants(self.root())
            .into_iter()
            .filter_map(|id| self.element(id))
            .filter(|el| !el.name.starts_with('!'))
            .map(|el| el.name.clone())
            .collect()
    }

    /// Number of reachable elements carrying `attr`.
    pub fn count_with_attr(&self, attr: &str) -> usize {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.element(*id).is_some_and(|el| el.has_attr(attr)))
            .count()
    }
}
