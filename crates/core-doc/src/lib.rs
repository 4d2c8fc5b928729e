//! Arena-backed document tree for the manuscript editing surface.
//!
//! The tree holds two families of nodes: text segments (a run of characters,
//! never any children) and elements (block or inline containers). A forced
//! line break is its own node kind because it contributes a newline to the
//! flattened text without being addressable for replacement.
//!
//! Ownership model:
//! * `Document` exclusively owns every node. Other components hold `NodeId`s
//!   only for the lifetime of one derived `PositionMap`.
//! * Detached nodes stay in the arena as tombstones and ids are never reused,
//!   so a stale `NodeId` is detectable via `is_attached`.
//! * `generation` increases on every mutation. A `PositionMap` remembers the
//!   generation it was built from; offset-addressed edits refuse to run
//!   against a map from another generation.

use thiserror::Error;

pub mod edit;
pub mod map;
pub mod markup;
pub mod stats;

pub use edit::InsertPoint;
pub use map::{MapEntry, Point, PositionMap};
pub use stats::TextStats;

/// Tags treated as block-level containers by the mapper and the paginator.
pub const BLOCK_TAGS: &[&str] = &[
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "li",
    "ul",
    "ol",
    "pre",
    "section",
    "article",
    "header",
    "footer",
    "table",
    "tr",
    "td",
    "th",
    "hr",
    "figure",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

/// Stable handle to a node inside one `Document` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub name: String,
    pub value: String,
}

impl Attr {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Text(String),
    LineBreak,
    Element { tag: String, attrs: Vec<Attr> },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attached: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocError {
    #[error("position map is stale (built at generation {map}, document at {doc})")]
    StaleMap { map: u64, doc: u64 },
    #[error("offset {0} is not covered by any text segment")]
    Unaddressable(usize),
    #[error("invalid range {start}..{end}")]
    InvalidRange { start: usize, end: usize },
    #[error("node {0:?} is detached from the document")]
    NodeDetached(NodeId),
    #[error("image source must be a data:image URI")]
    InvalidImage,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    generation: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Empty document: a root container with no children.
    pub fn new() -> Self {
        let root = Node {
            kind: NodeKind::Element {
                tag: "body".to_string(),
                attrs: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
            attached: true,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            generation: 0,
        }
    }

    /// Build a document from plain text. Blank-line separated paragraphs become
    /// `<p>` blocks and single newlines inside a paragraph become line breaks.
    pub fn from_plain_text(text: &str) -> Self {
        let mut doc = Self::new();
        let normalized = text.replace("\r\n", "\n");
        for para in normalized.split("\n\n") {
            if para.trim().is_empty() {
                continue;
            }
            let p = doc.create_element("p", Vec::new());
            doc.append_child(doc.root, p);
            doc.append_lines(p, para.trim_matches('\n'));
        }
        doc
    }

    /// Build a flat fragment from plain text: text segments separated by
    /// line-break nodes, no block wrappers.
    pub fn fragment_from_plain_text(text: &str) -> Self {
        let mut doc = Self::new();
        let normalized = text.replace("\r\n", "\n");
        let root = doc.root;
        doc.append_lines(root, &normalized);
        doc
    }

    fn append_lines(&mut self, parent: NodeId, text: &str) {
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                let br = self.create_line_break();
                self.append_child(parent, br);
            }
            if !line.is_empty() {
                let t = self.create_text(line);
                self.append_child(parent, t);
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn bump(&mut self) {
        self.generation += 1;
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.nodes.get(id.index()).is_some_and(|n| n.attached)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|a| a.name == name)
                .map(|a| a.value.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[Attr] {
        match &self.nodes[id.index()].kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    pub fn is_block(&self, id: NodeId) -> bool {
        id != self.root && self.tag(id).is_some_and(is_block_tag)
    }

    /// True when the tree has no attached content below the root.
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
            attached: false,
        });
        id
    }

    /// Allocate a detached text segment.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeKind::Text(text.into()))
    }

    pub fn create_line_break(&mut self) -> NodeId {
        self.alloc(NodeKind::LineBreak)
    }

    pub fn create_element(&mut self, tag: impl Into<String>, attrs: Vec<Attr>) -> NodeId {
        self.alloc(NodeKind::Element {
            tag: tag.into(),
            attrs,
        })
    }

    /// Insert `child` into `parent` at `index` (clamped to the child count).
    /// A child currently attached elsewhere is moved.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if self.nodes[child.index()].parent.is_some() {
            self.unlink(child);
        }
        let slot = index.min(self.nodes[parent.index()].children.len());
        self.nodes[parent.index()].children.insert(slot, child);
        self.nodes[child.index()].parent = Some(parent);
        let attached = self.nodes[parent.index()].attached;
        self.mark_subtree(child, attached);
        self.bump();
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let len = self.nodes[parent.index()].children.len();
        self.insert_child(parent, len, child);
    }

    /// Insert `node` as the next sibling of `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), DocError> {
        let parent = self.parent(reference).ok_or(DocError::NodeDetached(reference))?;
        let idx = self.child_index(reference).ok_or(DocError::NodeDetached(reference))?;
        self.insert_child(parent, idx + 1, node);
        Ok(())
    }

    /// Position of `id` within its parent's child list.
    pub fn child_index(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Remove `id` (and its subtree) from the tree. The arena slots remain
    /// as tombstones.
    pub fn detach(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        self.unlink(id);
        self.mark_subtree(id, false);
        self.bump();
    }

    /// Replace `id` with its children in its parent's child list.
    pub fn unwrap_node(&mut self, id: NodeId) {
        let (Some(parent), Some(idx)) = (self.parent(id), self.child_index(id)) else {
            return;
        };
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for (offset, child) in children.iter().enumerate() {
            self.nodes[child.index()].parent = None;
            self.insert_child(parent, idx + 1 + offset, *child);
        }
        self.detach(id);
    }

    fn unlink(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|c| *c != id);
        }
    }

    fn mark_subtree(&mut self, id: NodeId, attached: bool) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            self.nodes[n.index()].attached = attached;
            stack.extend(self.nodes[n.index()].children.iter().copied());
        }
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        if let NodeKind::Text(s) = &mut self.nodes[id.index()].kind {
            *s = text.into();
            self.bump();
        }
    }

    pub(crate) fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes[id.index()].kind {
            NodeKind::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn set_tag(&mut self, id: NodeId, new_tag: impl Into<String>) {
        if let NodeKind::Element { tag, .. } = &mut self.nodes[id.index()].kind {
            *tag = new_tag.into();
            self.bump();
        }
    }

    pub fn set_attrs(&mut self, id: NodeId, new_attrs: Vec<Attr>) {
        if let NodeKind::Element { attrs, .. } = &mut self.nodes[id.index()].kind {
            *attrs = new_attrs;
            self.bump();
        }
    }

    /// Attached nodes below `id` in document order (pre-order), excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.parent(id);
        while let Some(p) = cur {
            out.push(p);
            cur = self.parent(p);
        }
        out
    }

    /// Concatenated text below `id`. Line breaks contribute `"\n"`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(t) = self.text(id) {
            out.push_str(t);
        }
        for n in self.descendants(id) {
            match self.kind(n) {
                NodeKind::Text(t) => out.push_str(t),
                NodeKind::LineBreak => out.push('\n'),
                NodeKind::Element { .. } => {}
            }
        }
        out
    }

    /// Deep-copy the subtree rooted at `id` of `other` into this arena. The
    /// copy is detached.
    pub fn import_subtree(&mut self, other: &Document, id: NodeId) -> NodeId {
        let copy = self.alloc(other.kind(id).clone());
        for child in other.children(id) {
            let c = self.import_subtree(other, *child);
            self.nodes[c.index()].parent = Some(copy);
            self.nodes[copy.index()].children.push(c);
        }
        copy
    }

    /// Swap in the content of `other`, keeping the generation counter
    /// monotonic so maps built before the swap are detected as stale.
    pub fn replace_with(&mut self, other: Document) {
        let next = self.generation.max(other.generation) + 1;
        *self = other;
        self.generation = next;
    }
}
