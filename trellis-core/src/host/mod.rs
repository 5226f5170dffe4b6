//! Host Interface
//!
//! The renderer never touches an output tree directly. Every mutation goes
//! through a [`Host`], which owns the real nodes and hands out opaque
//! [`HostNode`] handles for them.
//!
//! [`MemoryHost`] is an in-memory implementation that records every call,
//! for headless rendering and tests.

mod memory;

pub use memory::{HostOp, MemoryHost};

use crate::reactive::Value;

/// Opaque handle to a node owned by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostNode(u64);

impl HostNode {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Output-tree operations the renderer calls into.
///
/// Methods take `&self`: a host is shared by the renderer and every
/// component update job, so implementations use interior mutability.
pub trait Host: Send + Sync + 'static {
    fn create_element(&self, tag: &str) -> HostNode;

    fn create_text(&self, text: &str) -> HostNode;

    fn create_comment(&self, text: &str) -> HostNode;

    /// Replace all content of an element with `text`.
    fn set_element_text(&self, node: HostNode, text: &str);

    /// Set the content of a text node.
    fn set_text(&self, node: HostNode, text: &str);

    /// Insert `node` into `parent` before `anchor`, or at the end when there
    /// is no anchor. A node that already has a parent is moved.
    fn insert(&self, node: HostNode, parent: HostNode, anchor: Option<HostNode>);

    /// Detach `node` from its parent.
    fn remove(&self, node: HostNode);

    /// Apply one property change. `None` on either side means absent.
    fn patch_prop(&self, node: HostNode, key: &str, prev: Option<&Value>, next: Option<&Value>);

    fn parent_node(&self, node: HostNode) -> Option<HostNode>;

    fn next_sibling(&self, node: HostNode) -> Option<HostNode>;
}
