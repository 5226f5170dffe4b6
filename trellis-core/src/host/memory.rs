use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::{Host, HostNode};
use crate::reactive::Value;

/// One recorded host call.
#[derive(Debug, Clone, PartialEq)]
pub enum HostOp {
    CreateElement { node: HostNode, tag: String },
    CreateText { node: HostNode, text: String },
    CreateComment { node: HostNode, text: String },
    SetElementText { node: HostNode, text: String },
    SetText { node: HostNode, text: String },
    Insert {
        node: HostNode,
        parent: HostNode,
        anchor: Option<HostNode>,
    },
    Remove { node: HostNode },
    PatchProp {
        node: HostNode,
        key: String,
        prev: Option<Value>,
        next: Option<Value>,
    },
}

#[derive(Debug)]
enum NodeKind {
    Element(String),
    Text(String),
    Comment(String),
}

#[derive(Debug)]
struct MemoryNode {
    kind: NodeKind,
    props: IndexMap<String, Value>,
    parent: Option<HostNode>,
    children: Vec<HostNode>,
}

impl MemoryNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            props: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Tree {
    next_id: u64,
    nodes: HashMap<HostNode, MemoryNode>,
    ops: Vec<HostOp>,
    recording: bool,
}

impl Default for Tree {
    fn default() -> Self {
        Self {
            next_id: 0,
            nodes: HashMap::new(),
            ops: Vec::new(),
            recording: true,
        }
    }
}

impl Tree {
    fn record(&mut self, op: HostOp) {
        if self.recording {
            self.ops.push(op);
        }
    }

    /// Forget a detached node and everything below it.
    fn purge(&mut self, node: HostNode) {
        let mut pending = vec![node];
        while let Some(node) = pending.pop() {
            if let Some(entry) = self.nodes.remove(&node) {
                pending.extend(entry.children);
            }
        }
    }

    fn alloc(&mut self, kind: NodeKind) -> HostNode {
        let node = HostNode::new(self.next_id);
        self.next_id += 1;
        self.nodes.insert(node, MemoryNode::new(kind));
        node
    }

    fn detach(&mut self, node: HostNode) {
        let parent = self.nodes.get_mut(&node).and_then(|n| n.parent.take());
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != node);
        }
    }

    fn markup(&self, node: HostNode, out: &mut String) {
        let Some(entry) = self.nodes.get(&node) else {
            return;
        };
        match &entry.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Comment(text) => {
                let _ = write!(out, "<!--{text}-->");
            }
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in &entry.props {
                    let _ = write!(out, " {key}=\"{value}\"");
                }
                out.push('>');
                for child in &entry.children {
                    self.markup(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

/// In-memory output tree.
///
/// Every [`Host`] call is applied to the tree and appended to an operation
/// log, so tests can assert both the final shape and the exact mutations.
///
/// ```rust
/// use trellis_core::host::{Host, MemoryHost};
///
/// let host = MemoryHost::new();
/// let root = host.create_root();
/// let p = host.create_element("p");
/// host.set_element_text(p, "hi");
/// host.insert(p, root, None);
///
/// assert_eq!(host.inner_markup(root), "<p>hi</p>");
/// ```
#[derive(Debug, Default)]
pub struct MemoryHost {
    tree: Mutex<Tree>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a detached container element without recording it.
    pub fn create_root(&self) -> HostNode {
        self.tree.lock().alloc(NodeKind::Element("root".into()))
    }

    /// Copy of the operation log.
    pub fn ops(&self) -> Vec<HostOp> {
        self.tree.lock().ops.clone()
    }

    /// Drain the operation log.
    pub fn take_ops(&self) -> Vec<HostOp> {
        std::mem::take(&mut self.tree.lock().ops)
    }

    pub fn clear_ops(&self) {
        self.tree.lock().ops.clear();
    }

    /// Turn the operation log on or off. Turning it off also clears it.
    pub fn set_recording(&self, recording: bool) {
        let mut tree = self.tree.lock();
        tree.recording = recording;
        if !recording {
            tree.ops.clear();
        }
    }

    /// Number of live nodes, containers included.
    pub fn node_count(&self) -> usize {
        self.tree.lock().nodes.len()
    }

    pub fn children(&self, node: HostNode) -> Vec<HostNode> {
        self.tree
            .lock()
            .nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Tag of an element node.
    pub fn tag(&self, node: HostNode) -> Option<String> {
        match &self.tree.lock().nodes.get(&node)?.kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            _ => None,
        }
    }

    /// Content of a text or comment node.
    pub fn text(&self, node: HostNode) -> Option<String> {
        match &self.tree.lock().nodes.get(&node)?.kind {
            NodeKind::Text(text) | NodeKind::Comment(text) => Some(text.clone()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn prop(&self, node: HostNode, key: &str) -> Option<Value> {
        self.tree.lock().nodes.get(&node)?.props.get(key).cloned()
    }

    /// Serialize a node and its subtree.
    pub fn markup(&self, node: HostNode) -> String {
        let mut out = String::new();
        self.tree.lock().markup(node, &mut out);
        out
    }

    /// Serialize the children of a node.
    pub fn inner_markup(&self, node: HostNode) -> String {
        let tree = self.tree.lock();
        let mut out = String::new();
        if let Some(entry) = tree.nodes.get(&node) {
            for child in &entry.children {
                tree.markup(*child, &mut out);
            }
        }
        out
    }
}

impl Host for MemoryHost {
    fn create_element(&self, tag: &str) -> HostNode {
        let mut tree = self.tree.lock();
        let node = tree.alloc(NodeKind::Element(tag.to_owned()));
        tree.record(HostOp::CreateElement {
            node,
            tag: tag.to_owned(),
        });
        node
    }

    fn create_text(&self, text: &str) -> HostNode {
        let mut tree = self.tree.lock();
        let node = tree.alloc(NodeKind::Text(text.to_owned()));
        tree.record(HostOp::CreateText {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn create_comment(&self, text: &str) -> HostNode {
        let mut tree = self.tree.lock();
        let node = tree.alloc(NodeKind::Comment(text.to_owned()));
        tree.record(HostOp::CreateComment {
            node,
            text: text.to_owned(),
        });
        node
    }

    fn set_element_text(&self, node: HostNode, text: &str) {
        let mut tree = self.tree.lock();
        tree.record(HostOp::SetElementText {
            node,
            text: text.to_owned(),
        });

        let old_children = tree
            .nodes
            .get_mut(&node)
            .map(|n| std::mem::take(&mut n.children))
            .unwrap_or_default();
        for child in old_children {
            tree.purge(child);
        }

        if !text.is_empty() {
            let content = tree.alloc(NodeKind::Text(text.to_owned()));
            if let Some(content) = tree.nodes.get_mut(&content) {
                content.parent = Some(node);
            }
            if let Some(entry) = tree.nodes.get_mut(&node) {
                entry.children.push(content);
            }
        }
    }

    fn set_text(&self, node: HostNode, text: &str) {
        let mut tree = self.tree.lock();
        tree.record(HostOp::SetText {
            node,
            text: text.to_owned(),
        });
        if let Some(entry) = tree.nodes.get_mut(&node) {
            match &mut entry.kind {
                NodeKind::Text(content) | NodeKind::Comment(content) => {
                    *content = text.to_owned();
                }
                NodeKind::Element(_) => {}
            }
        }
    }

    fn insert(&self, node: HostNode, parent: HostNode, anchor: Option<HostNode>) {
        let mut tree = self.tree.lock();
        tree.record(HostOp::Insert {
            node,
            parent,
            anchor,
        });

        tree.detach(node);
        if let Some(entry) = tree.nodes.get_mut(&parent) {
            let position = anchor
                .and_then(|anchor| entry.children.iter().position(|c| *c == anchor))
                .unwrap_or(entry.children.len());
            entry.children.insert(position, node);
        }
        if let Some(entry) = tree.nodes.get_mut(&node) {
            entry.parent = Some(parent);
        }
    }

    fn remove(&self, node: HostNode) {
        let mut tree = self.tree.lock();
        tree.record(HostOp::Remove { node });
        tree.detach(node);
        tree.purge(node);
    }

    fn patch_prop(&self, node: HostNode, key: &str, prev: Option<&Value>, next: Option<&Value>) {
        let mut tree = self.tree.lock();
        tree.record(HostOp::PatchProp {
            node,
            key: key.to_owned(),
            prev: prev.cloned(),
            next: next.cloned(),
        });
        if let Some(entry) = tree.nodes.get_mut(&node) {
            match next {
                Some(value) => {
                    entry.props.insert(key.to_owned(), value.clone());
                }
                None => {
                    entry.props.shift_remove(key);
                }
            }
        }
    }

    fn parent_node(&self, node: HostNode) -> Option<HostNode> {
        self.tree.lock().nodes.get(&node)?.parent
    }

    fn next_sibling(&self, node: HostNode) -> Option<HostNode> {
        let tree = self.tree.lock();
        let parent = tree.nodes.get(&node)?.parent?;
        let siblings = &tree.nodes.get(&parent)?.children;
        let position = siblings.iter().position(|c| *c == node)?;
        siblings.get(position + 1).copied()
    }
}
