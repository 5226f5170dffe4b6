use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::{first_host_node, last_host_node, Renderer};
use crate::component::{ComponentInstance, LifecycleHook};
use crate::error::Error;
use crate::host::{Host, HostNode};
use crate::vnode::{Props, VNode, VNodeType};

impl<H: Host> Renderer<H> {
    pub(super) fn process_component(
        &self,
        old: Option<&VNode>,
        new: &VNode,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        match old.and_then(|old| old.instance().map(|instance| (old, instance))) {
            Some((old, instance)) => self.update_component(old, new, instance),
            None => self.mount_component(new, container, anchor),
        }
    }

    fn mount_component(&self, vnode: &VNode, container: HostNode, anchor: Option<HostNode>) {
        let VNodeType::Component(component) = vnode.ty() else {
            return;
        };

        let renderer = Arc::downgrade(&self.inner);
        let instance = ComponentInstance::new(
            &self.inner.runtime,
            component,
            vnode,
            move |instance: &Arc<ComponentInstance>| {
                if let Some(inner) = renderer.upgrade() {
                    Renderer { inner }.render_component(instance, container, anchor);
                }
            },
        );
        tracing::debug!(component = instance.name(), uid = instance.uid(), "mounting component");

        vnode.set_instance(Some(Arc::clone(&instance)));
        instance.run_effect();
    }

    /// Body of a component's render effect.
    fn render_component(
        &self,
        instance: &ComponentInstance,
        container: HostNode,
        anchor: Option<HostNode>,
    ) {
        if !instance.is_mounted() {
            let subtree = render_root(instance);
            instance.call_hook(LifecycleHook::BeforeMount);
            instance.replace_subtree(subtree.clone());
            self.patch(None, &subtree, container, anchor);
            instance.vnode().set_el(first_host_node(&subtree));
            instance.set_mounted();
            instance.call_hook(LifecycleHook::Mounted);
            return;
        }

        if let Some(next) = instance.take_next() {
            instance.set_vnode(next);
        }

        instance.call_hook(LifecycleHook::BeforeUpdate);
        let next_tree = render_root(instance);
        let Some(prev_tree) = instance.replace_subtree(next_tree.clone()) else {
            return;
        };

        let host = &self.inner.host;
        let parent = first_host_node(&prev_tree)
            .and_then(|node| host.parent_node(node))
            .unwrap_or(container);
        let next_anchor = last_host_node(&prev_tree).and_then(|node| host.next_sibling(node));

        tracing::trace!(component = instance.name(), uid = instance.uid(), "updating component");
        self.patch(Some(&prev_tree), &next_tree, parent, next_anchor);
        instance.vnode().set_el(first_host_node(&next_tree));
        instance.call_hook(LifecycleHook::Updated);
    }

    /// Patch a mounted component node with a new node of the same component.
    fn update_component(&self, old: &VNode, new: &VNode, instance: Arc<ComponentInstance>) {
        new.set_instance(Some(Arc::clone(&instance)));
        new.set_el(old.el());
        old.set_instance(None);

        if props_changed(old.props(), new.props()) {
            instance.set_next(Some(new.clone()));
            // Re-render now; a queued update would only repeat the work
            instance.cancel_queued_update();
            instance.run_effect();
        } else {
            instance.set_vnode(new.clone());
        }
    }

    pub(super) fn unmount_component(&self, instance: &ComponentInstance, remove: bool) {
        tracing::debug!(component = instance.name(), uid = instance.uid(), "unmounting component");

        instance.call_hook(LifecycleHook::BeforeUnmount);
        instance.stop_effect();
        instance.set_unmounted();
        if let Some(subtree) = instance.subtree() {
            self.unmount(&subtree, remove);
        }
        instance.call_hook(LifecycleHook::Unmounted);
    }
}

/// Run the render function at the render-root boundary.
///
/// Errors and panics are logged and replaced by an empty comment, so the
/// component still owns a host node to patch against later.
fn render_root(instance: &ComponentInstance) -> VNode {
    let component = instance.name().to_owned();
    let error = match panic::catch_unwind(AssertUnwindSafe(|| instance.call_render())) {
        Ok(Ok(tree)) => return tree,
        Ok(Err(source)) => Error::Render { component, source },
        Err(payload) => Error::RenderPanic {
            component,
            message: panic_message(payload.as_ref()),
        },
    };

    tracing::error!(uid = instance.uid(), %error, "render failed");
    VNode::comment("")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn props_changed(old: Option<&Arc<Props>>, new: Option<&Arc<Props>>) -> bool {
    match (old, new) {
        (None, None) => false,
        (Some(old), Some(new)) if Arc::ptr_eq(old, new) => false,
        (Some(old), Some(new)) => {
            old.len() != new.len()
                || new
                    .iter()
                    .any(|(key, value)| old.get(key) != Some(value))
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::error::RenderError;
    use crate::host::MemoryHost;
    use crate::reactive::Value;
    use parking_lot::Mutex;
    use serde_json::json;

    fn setup() -> (Renderer<MemoryHost>, HostNode) {
        let renderer = Renderer::new(MemoryHost::new());
        let root = renderer.host().create_root();
        (renderer, root)
    }

    fn counter() -> Component {
        Component::builder("Counter", |instance| {
            let count = instance
                .data()
                .and_then(|data| data.get("count"))
                .unwrap_or(Value::Null);
            Ok(VNode::element("span").text(count.to_string()).build())
        })
        .data(|| Value::from(json!({ "count": 0 })))
        .build()
    }

    #[test]
    fn mount_renders_subtree() {
        let (renderer, root) = setup();
        let node = VNode::component(&counter()).build();
        renderer.render(Some(node.clone()), root);

        assert_eq!(renderer.host().inner_markup(root), "<span>0</span>");
        let instance = node.instance().unwrap();
        assert!(instance.is_mounted());
        assert_eq!(instance.render_count(), 1);
        assert!(node.el().is_some());
    }

    #[test]
    fn state_change_queues_one_update() {
        let (renderer, root) = setup();
        let node = VNode::component(&counter()).build();
        renderer.render(Some(node.clone()), root);
        let instance = node.instance().unwrap();
        let data = instance.data().unwrap().clone();

        data.set("count", 1);
        data.set("count", 2);
        assert_eq!(renderer.runtime().scheduler().pending(), 1);
        assert_eq!(renderer.host().inner_markup(root), "<span>0</span>");

        assert_eq!(renderer.runtime().scheduler().flush().unwrap(), 1);
        assert_eq!(renderer.host().inner_markup(root), "<span>2</span>");
        assert_eq!(instance.render_count(), 2);
    }

    #[test]
    fn lifecycle_order() {
        let (renderer, root) = setup();
        let log = Arc::new(Mutex::new(Vec::new()));

        let mut builder = Component::builder("Logged", |instance| {
            let n = instance.data().and_then(|d| d.get("n")).unwrap_or(Value::Null);
            Ok(VNode::element("i").text(n.to_string()).build())
        })
        .data(|| Value::from(json!({ "n": 0 })));
        for point in [
            LifecycleHook::BeforeCreate,
            LifecycleHook::Created,
            LifecycleHook::BeforeMount,
            LifecycleHook::Mounted,
            LifecycleHook::BeforeUpdate,
            LifecycleHook::Updated,
            LifecycleHook::BeforeUnmount,
            LifecycleHook::Unmounted,
        ] {
            let log = log.clone();
            builder = builder.hook(point, move |_| log.lock().push(point));
        }
        let node = VNode::component(&builder.build()).build();

        renderer.render(Some(node.clone()), root);
        node.instance().unwrap().data().unwrap().set("n", 1);
        renderer.runtime().scheduler().flush().unwrap();
        renderer.render(None, root);

        assert_eq!(
            *log.lock(),
            vec![
                LifecycleHook::BeforeCreate,
                LifecycleHook::Created,
                LifecycleHook::BeforeMount,
                LifecycleHook::Mounted,
                LifecycleHook::BeforeUpdate,
                LifecycleHook::Updated,
                LifecycleHook::BeforeUnmount,
                LifecycleHook::Unmounted,
            ]
        );
    }

    #[test]
    fn hooks_do_not_subscribe_render_effect() {
        let (renderer, root) = setup();
        let component = Component::builder("Quiet", |_| Ok(VNode::element("b").build()))
            .data(|| Value::from(json!({ "secret": 1 })))
            .hook(LifecycleHook::BeforeMount, |instance| {
                instance.data().and_then(|d| d.get("secret"));
            })
            .build();
        let node = VNode::component(&component).build();
        renderer.render(Some(node.clone()), root);

        node.instance().unwrap().data().unwrap().set("secret", 2);
        assert_eq!(renderer.runtime().scheduler().pending(), 0);
    }

    #[test]
    fn render_error_becomes_comment() {
        let (renderer, root) = setup();
        let broken = Component::new("Broken", |_| Err(RenderError::new("boom")));
        renderer.render(Some(VNode::component(&broken).build()), root);
        assert_eq!(renderer.host().inner_markup(root), "<!---->");
    }

    #[test]
    fn render_panic_becomes_comment() {
        let (renderer, root) = setup();
        let broken = Component::new("Panicky", |_| panic!("kaboom"));
        renderer.render(
            Some(VNode::fragment([
                VNode::component(&broken).build(),
                VNode::element("p").build(),
            ])),
            root,
        );
        assert_eq!(renderer.host().inner_markup(root), "<!----><p></p>");
    }

    #[test]
    fn recovered_render_replaces_placeholder_in_place() {
        let (renderer, root) = setup();
        let flaky = Component::builder("Flaky", |instance| {
            match instance.data().and_then(|d| d.get("ok")) {
                Some(Value::Bool(true)) => Ok(VNode::element("em").build()),
                _ => Err(RenderError::new("not ready")),
            }
        })
        .data(|| Value::from(json!({ "ok": false })))
        .build();

        let node = VNode::component(&flaky).build();
        renderer.render(
            Some(VNode::element("div").child(&node).child("tail").build()),
            root,
        );
        assert_eq!(renderer.host().inner_markup(root), "<div><!---->tail</div>");

        node.instance().unwrap().data().unwrap().set("ok", true);
        renderer.runtime().scheduler().flush().unwrap();
        assert_eq!(renderer.host().inner_markup(root), "<div><em></em>tail</div>");
    }

    #[test]
    fn empty_fragment_subtree_updates_in_place() {
        let (renderer, root) = setup();
        let items = Component::builder("Items", |instance| {
            let items = instance
                .data()
                .and_then(|d| d.get("items"))
                .and_then(|v| v.as_array().map(|a| a.to_vec()))
                .unwrap_or_default();
            Ok(VNode::fragment(items.iter().map(|item| item.to_string())))
        })
        .data(|| Value::from(json!({ "items": [] })))
        .build();

        let node = VNode::component(&items).build();
        renderer.render(
            Some(VNode::element("ul").child("head").child(&node).child("tail").build()),
            root,
        );
        assert_eq!(renderer.host().inner_markup(root), "<ul>headtail</ul>");

        node.instance()
            .unwrap()
            .data()
            .unwrap()
            .set("items", Value::from(json!(["x", "y"])));
        renderer.runtime().scheduler().flush().unwrap();
        assert_eq!(renderer.host().inner_markup(root), "<ul>headxytail</ul>");
    }

    #[test]
    fn non_object_data_is_ignored() {
        let (renderer, root) = setup();
        let component = Component::builder("Scalar", |instance| {
            assert!(instance.data().is_none());
            Ok(VNode::text("ok"))
        })
        .data(|| Value::from(5))
        .build();

        renderer.render(Some(VNode::component(&component).build()), root);
        assert_eq!(renderer.host().inner_markup(root), "ok");
    }

    #[test]
    fn props_change_rerenders_synchronously() {
        let (renderer, root) = setup();
        let label = Component::new("Label", |instance| {
            let text = instance.prop("text").unwrap_or(Value::Null);
            Ok(VNode::element("label").text(text.to_string()).build())
        });

        let first = VNode::component(&label).prop("text", "a").build();
        renderer.render(Some(first.clone()), root);
        let instance = first.instance().unwrap();

        renderer.render(Some(VNode::component(&label).prop("text", "b").build()), root);
        assert_eq!(renderer.host().inner_markup(root), "<label>b</label>");
        assert_eq!(instance.render_count(), 2);
        assert!(first.instance().is_none());

        // Same props: the instance is carried over without rendering
        let same = VNode::component(&label).prop("text", "b").build();
        renderer.render(Some(same.clone()), root);
        assert_eq!(instance.render_count(), 2);
        assert!(Arc::ptr_eq(&same.instance().unwrap(), &instance));
    }

    #[test]
    fn unmount_stops_updates() {
        let (renderer, root) = setup();
        let node = VNode::component(&counter()).build();
        renderer.render(Some(node.clone()), root);
        let instance = node.instance().unwrap();
        let data = instance.data().unwrap().clone();

        data.set("count", 1);
        renderer.render(None, root);

        assert!(instance.is_unmounted());
        assert_eq!(renderer.runtime().scheduler().pending(), 0);
        data.set("count", 2);
        assert_eq!(renderer.runtime().scheduler().pending(), 0);
        assert_eq!(renderer.host().inner_markup(root), "");
    }

    #[test]
    fn nested_components_update_independently() {
        let (renderer, root) = setup();
        let child = counter();
        let parent_renders = Arc::new(Mutex::new(0));
        let renders = parent_renders.clone();
        let child_def = child.clone();
        let parent = Component::new("Parent", move |_| {
            *renders.lock() += 1;
            Ok(VNode::element("section")
                .child(VNode::component(&child_def).build())
                .build())
        });

        renderer.render(Some(VNode::component(&parent).build()), root);
        assert_eq!(renderer.host().inner_markup(root), "<section><span>0</span></section>");

        let child_instance = renderer
            .root(root)
            .and_then(|node| node.instance())
            .and_then(|parent| parent.subtree())
            .and_then(|section| section.children().as_nodes().map(|c| c[0].clone()))
            .and_then(|node| node.instance())
            .unwrap();
        child_instance.data().unwrap().set("count", 5);
        renderer.runtime().scheduler().flush().unwrap();

        assert_eq!(renderer.host().inner_markup(root), "<section><span>5</span></section>");
        assert_eq!(*parent_renders.lock(), 1);
    }

    #[test]
    fn child_mount_write_updates_parent() {
        let (renderer, root) = setup();
        let shared = renderer.runtime().create_ref(0);

        let writer = shared.clone();
        let child = Component::builder("Child", |_| Ok(VNode::element("b").build()))
            .hook(LifecycleHook::Mounted, move |_| {
                writer.set(7);
            })
            .build();
        let reader = shared.clone();
        let parent = Component::new("Parent", move |_| {
            Ok(VNode::element("p")
                .child(reader.get())
                .child(VNode::component(&child).build())
                .build())
        });

        renderer.render(Some(VNode::component(&parent).build()), root);
        assert_eq!(renderer.runtime().scheduler().pending(), 1);

        renderer.runtime().scheduler().flush().unwrap();
        assert_eq!(renderer.host().inner_markup(root), "<p>7<b></b></p>");
    }

    #[test]
    fn injected_hooks_run() {
        let (renderer, root) = setup();
        let node = VNode::component(&counter()).build();
        renderer.render(Some(node.clone()), root);

        let unmounted = Arc::new(Mutex::new(false));
        let flag = unmounted.clone();
        node.instance()
            .unwrap()
            .inject_hook(LifecycleHook::Unmounted, move |_| *flag.lock() = true);

        renderer.render(None, root);
        assert!(*unmounted.lock());
    }

    #[test]
    fn functional_components_skip_state_and_hooks() {
        let (renderer, root) = setup();
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let component = Component::builder("Pure", |_| Ok(VNode::text("pure")))
            .data(|| Value::from(json!({ "x": 1 })))
            .hook(LifecycleHook::Mounted, move |_| *flag.lock() = true)
            .functional()
            .build();

        let node = VNode::component(&component).build();
        renderer.render(Some(node.clone()), root);

        assert!(node.shape_flag().contains(crate::vnode::ShapeFlags::FUNCTIONAL_COMPONENT));
        assert!(node.instance().unwrap().data().is_none());
        assert!(!*called.lock());
        assert_eq!(renderer.host().inner_markup(root), "pure");
    }
}
