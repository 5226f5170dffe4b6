//! Renderer
//!
//! The renderer reconciles successive [`VNode`] trees against a [`Host`].
//! It mounts new subtrees, patches matching subtrees in place and unmounts
//! removed subtrees, issuing the smallest set of host calls it can.
//!
//! # Entry Point
//!
//! [`Renderer::render`] is the only entry point. Each container remembers
//! the last tree rendered into it:
//!
//! - `render(Some(tree), c)` mounts `tree` if `c` is empty, or patches the
//!   stored tree into `tree` otherwise
//! - `render(None, c)` unmounts whatever `c` holds
//!
//! # Components
//!
//! Component nodes own a render effect. State read during render subscribes
//! the effect; a write queues the component's update job on the runtime's
//! scheduler, and the job re-renders and patches just that component.

mod children;
mod component;
mod keyed;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::host::{Host, HostNode};
use crate::reactive::Runtime;
use crate::vnode::{Children, Props, VNode, VNodeType};

/// Reconciler bound to one host.
///
/// Cloning is cheap; clones share the host, runtime and rendered roots.
pub struct Renderer<H: Host> {
    inner: Arc<RendererInner<H>>,
}

struct RendererInner<H> {
    host: H,
    runtime: Runtime,
    roots: Mutex<HashMap<HostNode, VNode>>,
}

impl<H: Host> Renderer<H> {
    /// Create a renderer with its own reactive runtime.
    pub fn new(host: H) -> Self {
        Self::with_runtime(host, Runtime::new())
    }

    /// Create a renderer whose components track into `runtime`.
    pub fn with_runtime(host: H, runtime: Runtime) -> Self {
        Self {
            inner: Arc::new(RendererInner {
                host,
                runtime,
                roots: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn host(&self) -> &H {
        &self.inner.host
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// The tree last rendered into `container`.
    pub fn root(&self, container: HostNode) -> Option<VNode> {
        self.inner.roots.lock().get(&container).cloned()
    }

    /// Render `vnode` into `container`, or clear it with `None`.
    pub fn render(&self, vnode: Option<VNode>, container: HostNode) {
        let previous = self.root(container);

        match (&previous, &vnode) {
            (None, None) => {}
            (Some(previous), None) => {
                tracing::debug!(container = container.raw(), "unmounting root");
                self.unmount(previous, true);
            }
            (previous, Some(next)) => self.patch(previous.as_ref(), next, container, None),
        }

        let mut roots = self.inner.roots.lock();
        match vnode {
            Some(vnode) => {
                roots.insert(container, vnode);
            }
            None => {
                roots.remove(&container);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    pub(crate) fn patch(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let mut anchor = anchor;
        let old = match old {
            Some(old) if old.ptr_eq(new) => return,
            Some(old) if !old.is_same_type(new) => {
                if let Some(last) = last_host_node(old) {
                    anchor = self.inner.host.next_sibling(last);
                }
                self.unmount(old, true);
                None
            }
            old => old,
        };

        match new.ty() {
            VNodeType::Text => self.process_text(old, new, container, anchor),
            VNodeType::Comment => self.process_comment(old, new, container, anchor),
            VNodeType::Fragment => self.process_fragment(old, new, container, anchor),
            VNodeType::Element(_) => self.process_element(old, new, container, anchor),
            VNodeType::Component(_) => self.process_component(old, new, container, anchor),
        }
    }

    fn process_text(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let text = new.children().as_text().unwrap_or_default();
        match old {
            None => {
                let el = self.inner.host.create_text(text);
                new.set_el(Some(el));
                self.inner.host.insert(el, container, anchor);
            }
            Some(old) => {
                let el = old.el();
                new.set_el(el);
                if let Some(el) = el {
                    if old.children().as_text() != Some(text) {
                        self.inner.host.set_text(el, text);
                    }
                }
            }
        }
    }

    fn process_comment(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match old {
            None => {
                let text = new.children().as_text().unwrap_or_default();
                let el = self.inner.host.create_comment(text);
                new.set_el(Some(el));
                self.inner.host.insert(el, container, anchor);
            }
            // Comments are static
            Some(old) => new.set_el(old.el()),
        }
    }

    fn process_fragment(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match old {
            None => {
                // Children are mounted between two empty text nodes, so the
                // fragment keeps its place even while it has no children.
                let host = &self.inner.host;
                let start = host.create_text("");
                let end = host.create_text("");
                new.set_el(Some(start));
                new.set_anchor(Some(end));
                host.insert(start, container, anchor);
                host.insert(end, container, anchor);
                if let Some(children) = new.children().as_nodes() {
                    self.mount_children(children, container, Some(end));
                }
            }
            Some(old) => {
                new.set_el(old.el());
                new.set_anchor(old.anchor());
                self.patch_children(old, new, container, old.anchor().or(anchor));
            }
        }
    }

    fn process_element(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match old {
            None => self.mount_element(new, container, anchor),
            Some(old) => self.patch_element(old, new),
        }
    }

    // ------------------------------------------------------------------------
    // Elements
    // ------------------------------------------------------------------------

    fn mount_element(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        let VNodeType::Element(tag) = vnode.ty() else {
            return;
        };
        let host = &self.inner.host;
        let el = host.create_element(tag);
        vnode.set_el(Some(el));

        match vnode.children() {
            Children::Text(text) => host.set_element_text(el, text),
            Children::Nodes(children) => self.mount_children(children, el, None),
            Children::None => {}
        }

        if let Some(props) = vnode.props() {
            for (key, value) in props.iter() {
                host.patch_prop(el, key, None, Some(value));
            }
        }

        host.insert(el, container, anchor);
    }

    fn patch_element(&self, old: &VNode, new: &VNode) {
        let Some(el) = old.el() else {
            tracing::warn!(?new, "patching an element that was never mounted");
            return;
        };
        new.set_el(Some(el));

        self.patch_children(old, new, el, None);
        self.patch_props(el, old.props(), new.props());
    }

    fn patch_props(&self, el: HostNode, old: Option<&Arc<Props>>, new: Option<&Arc<Props>>) {
        if let (Some(old), Some(new)) = (old, new) {
            if Arc::ptr_eq(old, new) {
                return;
            }
        }
        let host = &self.inner.host;

        if let Some(new) = new {
            for (key, next) in new.iter() {
                let prev = old.and_then(|old| old.get(key));
                if prev != Some(next) {
                    host.patch_prop(el, key, prev, Some(next));
                }
            }
        }

        if let Some(old) = old {
            for (key, prev) in old.iter() {
                if !new.is_some_and(|new| new.contains_key(key)) {
                    host.patch_prop(el, key, Some(prev), None);
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Unmount and move
    // ------------------------------------------------------------------------

    /// Tear down a subtree. With `remove`, host nodes are also detached;
    /// without it only components are torn down, for subtrees whose root is
    /// removed by the caller.
    pub(crate) fn unmount(&self, vnode: &VNode, remove: bool) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(instance) = vnode.instance() {
                    self.unmount_component(&instance, remove);
                }
                vnode.set_instance(None);
            }
            VNodeType::Fragment => {
                if let Some(children) = vnode.children().as_nodes() {
                    for child in children {
                        self.unmount(child, remove);
                    }
                }
                if remove {
                    self.remove_el(vnode);
                    if let Some(end) = vnode.anchor() {
                        self.inner.host.remove(end);
                    }
                }
            }
            VNodeType::Element(_) => {
                if let Some(children) = vnode.children().as_nodes() {
                    for child in children {
                        self.unmount(child, false);
                    }
                }
                if remove {
                    self.remove_el(vnode);
                }
            }
            VNodeType::Text | VNodeType::Comment => {
                if remove {
                    self.remove_el(vnode);
                }
            }
        }
    }

    fn remove_el(&self, vnode: &VNode) {
        if let Some(el) = vnode.el() {
            self.inner.host.remove(el);
        }
    }

    /// Move an already mounted subtree before `anchor`.
    pub(crate) fn move_node(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        match vnode.ty() {
            VNodeType::Component(_) => {
                if let Some(subtree) = vnode.instance().and_then(|i| i.subtree()) {
                    self.move_node(&subtree, container, anchor);
                }
            }
            VNodeType::Fragment => {
                let host = &self.inner.host;
                if let Some(start) = vnode.el() {
                    host.insert(start, container, anchor);
                }
                if let Some(children) = vnode.children().as_nodes() {
                    for child in children {
                        self.move_node(child, container, anchor);
                    }
                }
                if let Some(end) = vnode.anchor() {
                    host.insert(end, container, anchor);
                }
            }
            _ => {
                if let Some(el) = vnode.el() {
                    self.inner.host.insert(el, container, anchor);
                }
            }
        }
    }
}

impl<H: Host> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<H: Host> fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("roots", &self.inner.roots.lock().len())
            .field("runtime", &self.inner.runtime)
            .finish()
    }
}

/// First host node of a mounted subtree, in document order.
pub(crate) fn first_host_node(vnode: &VNode) -> Option<HostNode> {
    match vnode.ty() {
        VNodeType::Component(_) => first_host_node(&vnode.instance()?.subtree()?),
        _ => vnode.el(),
    }
}

/// Last host node of a mounted subtree, in document order.
pub(crate) fn last_host_node(vnode: &VNode) -> Option<HostNode> {
    match vnode.ty() {
        VNodeType::Fragment => vnode.anchor(),
        VNodeType::Component(_) => last_host_node(&vnode.instance()?.subtree()?),
        _ => vnode.el(),
    }
}
