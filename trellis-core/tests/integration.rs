//! Integration Tests for Reactivity and Rendering
//!
//! These tests drive the public API end to end: tracked state feeding
//! effects and computeds, and components re-rendering into a `MemoryHost`.

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rstest::rstest;
use serde_json::json;

use trellis_core::component::{Component, LifecycleHook};
use trellis_core::config::RuntimeConfig;
use trellis_core::host::{HostNode, HostOp, MemoryHost};
use trellis_core::reactive::{Effect, EffectOptions, Object, Runtime, Value};
use trellis_core::renderer::Renderer;
use trellis_core::scheduler::Job;
use trellis_core::vnode::VNode;
use trellis_core::Error;

fn setup() -> (Renderer<MemoryHost>, HostNode) {
    let renderer = Renderer::new(MemoryHost::new());
    let root = renderer.host().create_root();
    (renderer, root)
}

fn list(keys: &[i64]) -> VNode {
    VNode::element("ul")
        .children(
            keys.iter()
                .map(|k| VNode::element("li").key(*k).text(k.to_string()).build()),
        )
        .build()
}

/// A tracked read followed by a different write re-runs the effect once.
#[test]
fn effect_reruns_once_per_write() {
    let runtime = Runtime::new();
    let count = runtime.create_ref(0);
    let runs = Arc::new(AtomicUsize::new(0));

    let (source, runs_clone) = (count.clone(), runs.clone());
    let _effect = runtime.effect(move || {
        source.get();
        runs_clone.fetch_add(1, Ordering::SeqCst);
    });

    count.set(1);
    count.set(2);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Writes through a scheduler are batched into one run per flush.
#[test]
fn scheduled_effect_batches_writes() {
    let runtime = Runtime::new();
    let count = runtime.create_ref(0);
    let observed = Arc::new(AtomicI32::new(-1));

    let (source, seen) = (count.clone(), observed.clone());
    let effect = Arc::new(Mutex::new(None::<Effect>));
    let slot = effect.clone();
    let scheduler = runtime.scheduler().clone();
    let job = Job::new(move || {
        if let Some(effect) = slot.lock().clone() {
            effect.run();
        }
    });
    *effect.lock() = Some(Effect::with_options(
        &runtime,
        move || seen.store(source.get(), Ordering::SeqCst),
        EffectOptions::new().scheduler(move || {
            scheduler.queue_job(job.clone());
        }),
    ));

    count.set(1);
    count.set(2);
    count.set(3);
    assert_eq!(observed.load(Ordering::SeqCst), 0);

    assert_eq!(runtime.scheduler().flush().unwrap(), 1);
    assert_eq!(observed.load(Ordering::SeqCst), 3);
}

/// Writing the current value never re-runs dependents.
#[rstest]
#[case(Value::from(1))]
#[case(Value::from("text"))]
#[case(Value::from(f64::NAN))]
#[case(Value::Null)]
fn equal_writes_are_silent(#[case] value: Value) {
    let runtime = Runtime::new();
    let cell = runtime.create_ref(value.clone());
    let reader = cell.clone();
    let effect = runtime.effect(move || {
        reader.get();
    });

    assert!(!cell.set(value));
    assert_eq!(effect.run_count(), 1);
}

/// Derived values are refreshed before plain effects observe them.
#[test]
fn derived_before_watcher() {
    let runtime = Runtime::new();
    let price = runtime.create_ref(10);
    let source = price.clone();
    let taxed = runtime.computed(move || source.get() * 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (p, t, s) = (price.clone(), taxed.clone(), seen.clone());
    let watcher = runtime.effect(move || {
        let raw = p.get();
        s.lock().push((raw, t.get()));
    });

    price.set(20);
    assert_eq!(*seen.lock(), vec![(10, 20), (20, 40)]);
    assert_eq!(watcher.run_count(), 2);
}

/// Object properties are tracked individually and nested objects lazily.
#[test]
fn reactive_objects_track_per_property() {
    let runtime = Runtime::new();
    let Value::Object(raw) = Value::from(json!({ "user": { "name": "ada" }, "visits": 1 })) else {
        panic!("expected object");
    };
    let state = runtime.reactive(raw);

    let names = Arc::new(Mutex::new(Vec::new()));
    let (reader, log) = (state.clone(), names.clone());
    let effect = runtime.effect(move || {
        let name = reader.object("user").and_then(|u| u.get("name"));
        log.lock().push(name.map(|n| n.to_string()).unwrap_or_default());
    });

    state.set("visits", 2);
    assert_eq!(effect.run_count(), 1);

    state.object("user").unwrap().set("name", "grace");
    assert_eq!(*names.lock(), vec!["ada", "grace"]);
}

/// Independent runtimes never see each other's writes.
#[test]
fn runtimes_are_isolated() {
    let first = Runtime::new();
    let second = Runtime::new();
    let shared = Object::from_iter([("n", 0)]);

    let a = first.reactive(shared.clone());
    let effect = first.effect(move || {
        a.get("n");
    });

    second.reactive(shared).set("n", 1);
    assert_eq!(effect.run_count(), 1);
}

/// Mounting an element patches each prop once with no previous value.
#[test]
fn mount_sets_props_once() {
    let (renderer, root) = setup();
    renderer.render(
        Some(
            VNode::element("div")
                .prop("id", "a")
                .prop("class", "b")
                .build(),
        ),
        root,
    );

    let patches: Vec<_> = renderer
        .host()
        .take_ops()
        .into_iter()
        .filter_map(|op| match op {
            HostOp::PatchProp { key, prev, .. } => Some((key, prev)),
            _ => None,
        })
        .collect();
    assert_eq!(
        patches,
        vec![("id".to_string(), None), ("class".to_string(), None)]
    );
}

/// Patching props touches only what changed.
#[test]
fn prop_patch_is_minimal() {
    let (renderer, root) = setup();
    renderer.render(Some(VNode::element("div").prop("a", 1).prop("b", 2).build()), root);
    renderer.host().clear_ops();

    renderer.render(Some(VNode::element("div").prop("a", 1).prop("c", 3).build()), root);

    let keys: Vec<String> = renderer
        .host()
        .take_ops()
        .into_iter()
        .filter_map(|op| match op {
            HostOp::PatchProp { key, .. } => Some(key),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!["c", "b"]);
    assert_eq!(renderer.host().inner_markup(root), r#"<div a="1" c="3"></div>"#);
}

/// Keyed lists reach the target order with reused host nodes.
#[rstest]
#[case(&[1, 2, 3], &[1, 2, 4])]
#[case(&[1, 2, 3, 4, 5], &[5, 1, 2, 3, 4])]
#[case(&[1, 2, 3, 4, 5, 6], &[1, 5, 3, 2, 7, 6])]
#[case(&[1, 2, 3, 4], &[4, 3, 2, 1])]
#[case(&[1, 2], &[3, 1, 4, 2, 5])]
fn keyed_lists(#[case] before: &[i64], #[case] after: &[i64]) {
    let (renderer, root) = setup();
    renderer.render(Some(list(before)), root);
    let ul = renderer.host().children(root)[0];
    let old_nodes: Vec<(i64, HostNode)> = before
        .iter()
        .copied()
        .zip(renderer.host().children(ul))
        .collect();

    renderer.render(Some(list(after)), root);

    let expected: String = after.iter().map(|k| format!("<li>{k}</li>")).collect();
    assert_eq!(renderer.host().inner_markup(root), format!("<ul>{expected}</ul>"));

    // Survivors keep their host node
    let new_nodes = renderer.host().children(ul);
    for (position, key) in after.iter().enumerate() {
        if let Some((_, node)) = old_nodes.iter().find(|(k, _)| k == key) {
            assert_eq!(new_nodes[position], *node, "key {key} was recreated");
        }
    }
}

/// Rendering nothing removes the root and forgets the stored tree.
#[test]
fn render_none_unmounts() {
    let (renderer, root) = setup();
    let tree = list(&[1, 2]);
    renderer.render(Some(tree.clone()), root);
    renderer.host().clear_ops();

    renderer.render(None, root);

    assert_eq!(renderer.host().ops(), vec![HostOp::Remove { node: tree.el().unwrap() }]);
    assert!(renderer.root(root).is_none());
}

/// Unmounting releases every host node the tree created.
#[test]
fn unmount_releases_host_nodes() {
    let (renderer, root) = setup();
    renderer.host().set_recording(false);
    let baseline = renderer.host().node_count();

    renderer.render(Some(list(&[1, 2, 3])), root);
    renderer.render(Some(list(&[3, 4])), root);
    renderer.render(Some(VNode::fragment([list(&[5]), VNode::text("x")])), root);
    assert!(renderer.host().node_count() > baseline);

    renderer.render(None, root);
    assert_eq!(renderer.host().node_count(), baseline);
}

/// A component re-renders after the scheduler's next tick.
#[tokio::test]
async fn component_updates_on_tick() {
    let (renderer, root) = setup();
    let todo = Component::builder("Todo", |instance| {
        let data = instance.data().cloned();
        let items = data
            .as_ref()
            .and_then(|d| d.get("items"))
            .and_then(|v| v.as_array().map(|a| a.to_vec()))
            .unwrap_or_default();
        Ok(VNode::element("ol")
            .children(items.iter().map(|item| {
                VNode::element("li")
                    .key(item.to_string())
                    .text(item.to_string())
                    .build()
            }))
            .build())
    })
    .data(|| Value::from(json!({ "items": ["a", "b"] })))
    .build();

    let node = VNode::component(&todo).build();
    renderer.render(Some(node.clone()), root);
    assert_eq!(renderer.host().inner_markup(root), "<ol><li>a</li><li>b</li></ol>");

    let state = node.instance().unwrap().data().unwrap().clone();
    state.set("items", Value::from(json!(["b", "a", "c"])));
    assert_eq!(renderer.runtime().scheduler().pending(), 1);

    renderer.runtime().scheduler().tick().await.unwrap();
    assert_eq!(
        renderer.host().inner_markup(root),
        "<ol><li>b</li><li>a</li><li>c</li></ol>"
    );
}

/// Hooks fire in lifecycle order across mount, update and unmount.
#[tokio::test]
async fn lifecycle_across_updates() {
    let (renderer, root) = setup();
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut builder = Component::builder("Clock", |instance| {
        let tick = instance.data().and_then(|d| d.get("tick")).unwrap_or(Value::Null);
        Ok(VNode::text(tick.to_string()))
    })
    .data(|| Value::from(json!({ "tick": 0 })));
    for point in [
        LifecycleHook::Mounted,
        LifecycleHook::Updated,
        LifecycleHook::Unmounted,
    ] {
        let log = log.clone();
        builder = builder.hook(point, move |_| log.lock().push(point));
    }
    let node = VNode::component(&builder.build()).build();

    renderer.render(Some(node.clone()), root);
    let state = node.instance().unwrap().data().unwrap().clone();
    for tick in 1..=3 {
        state.set("tick", tick);
        renderer.runtime().scheduler().tick().await.unwrap();
    }
    renderer.render(None, root);

    assert_eq!(
        *log.lock(),
        vec![
            LifecycleHook::Mounted,
            LifecycleHook::Updated,
            LifecycleHook::Updated,
            LifecycleHook::Updated,
            LifecycleHook::Unmounted,
        ]
    );
}

/// A render that keeps invalidating itself hits the recursion limit.
#[test]
fn runaway_updates_hit_recursion_limit() {
    let config = RuntimeConfig::from_json(r#"{ "recursion_limit": 5 }"#).unwrap();
    let renderer = Renderer::with_runtime(MemoryHost::new(), Runtime::with_config(config));
    let root = renderer.host().create_root();

    let looping = Component::builder("Looping", |instance| {
        let n = instance.data().and_then(|d| d.get("n")).unwrap_or(Value::Null);
        Ok(VNode::text(n.to_string()))
    })
    .data(|| Value::from(json!({ "n": 0 })))
    .hook(LifecycleHook::Updated, |instance| {
        instance.queue_update();
    })
    .build();

    let node = VNode::component(&looping).build();
    renderer.render(Some(node.clone()), root);
    node.instance().unwrap().data().unwrap().set("n", 1);

    let result = renderer.runtime().scheduler().flush();
    assert!(matches!(result, Err(Error::RecursionLimit { limit: 5 })));
    assert_eq!(renderer.runtime().scheduler().pending(), 0);
}
