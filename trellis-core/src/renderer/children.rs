use super::Renderer;
use crate::host::{Host, HostNode};
use crate::vnode::{Children, VNode};

impl<H: Host> Renderer<H> {
    pub(super) fn mount_children(
        &self,
        children: &[VNode],
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        for child in children {
            self.patch(None, child, container, anchor);
        }
    }

    pub(super) fn unmount_children(&self, children: &[VNode]) {
        for child in children {
            self.unmount(child, true);
        }
    }

    /// Bring the children of `old` in line with the children of `new`.
    ///
    /// `container` is the host node the children live in: the element itself,
    /// or the parent container for a fragment.
    pub(super) fn patch_children(
        &self,
        old: &VNode,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        let host = &self.inner.host;

        match (old.children(), new.children()) {
            (Children::Nodes(prev), Children::Text(text)) => {
                self.unmount_children(prev);
                host.set_element_text(container, text);
            }
            (prev, Children::Text(text)) => {
                if prev.as_text() != Some(text.as_str()) {
                    host.set_element_text(container, text);
                }
            }
            (Children::Nodes(prev), Children::Nodes(next)) => {
                self.patch_keyed_children(prev, next, container, anchor);
            }
            (Children::Text(_), Children::Nodes(next)) => {
                host.set_element_text(container, "");
                self.mount_children(next, container, anchor);
            }
            (Children::None, Children::Nodes(next)) => {
                self.mount_children(next, container, anchor);
            }
            (Children::Text(_), Children::None) => host.set_element_text(container, ""),
            (Children::Nodes(prev), Children::None) => self.unmount_children(prev),
            (Children::None, Children::None) => {}
        }
    }
}
