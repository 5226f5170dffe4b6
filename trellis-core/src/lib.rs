//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI library.
//! It implements:
//!
//! - Reactive primitives (refs, reactive objects, computeds, effects)
//! - A deduplicating job scheduler for batched component updates
//! - Virtual nodes and an incremental, keyed tree reconciler
//! - A host abstraction with an in-memory host for headless rendering
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Dependency bookkeeping between sources and effects
//! - `reactive`: The runtime and its tracked containers
//! - `scheduler`: Job queue flushed after the current synchronous turn
//! - `vnode`: Tree node descriptions and builders
//! - `component`: Component definitions, instances and lifecycle hooks
//! - `renderer`: Mount, patch and unmount against a host
//! - `host`: The host interface and [`host::MemoryHost`]
//!
//! # Example
//!
//! ```rust
//! use trellis_core::component::Component;
//! use trellis_core::host::MemoryHost;
//! use trellis_core::reactive::Value;
//! use trellis_core::renderer::Renderer;
//! use trellis_core::vnode::VNode;
//!
//! let counter = Component::builder("Counter", |instance| {
//!     let count = instance.data().and_then(|d| d.get("count")).unwrap_or(Value::Null);
//!     Ok(VNode::element("span").text(count.to_string()).build())
//! })
//! .data(|| Value::from(serde_json::json!({ "count": 0 })))
//! .build();
//!
//! let renderer = Renderer::new(MemoryHost::new());
//! let root = renderer.host().create_root();
//! let node = VNode::component(&counter).build();
//! renderer.render(Some(node.clone()), root);
//!
//! // Writes queue one re-render; flushing applies it
//! let state = node.instance().unwrap().data().unwrap().clone();
//! state.set("count", 1);
//! state.set("count", 2);
//! renderer.runtime().scheduler().flush().unwrap();
//!
//! assert_eq!(renderer.host().inner_markup(root), "<span>2</span>");
//! ```

pub mod component;
pub mod config;
pub mod error;
pub mod graph;
pub mod host;
pub mod reactive;
pub mod renderer;
pub mod scheduler;
pub mod vnode;

pub use error::{Error, RenderError, Result};
