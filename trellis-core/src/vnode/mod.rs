//! Tree Nodes
//!
//! A [`VNode`] describes one node of the output tree: its type, properties,
//! children, shape flags and optional key. The renderer compares successive
//! descriptions and applies only the differences to the host.
//!
//! # Same Type
//!
//! Two nodes are patched in place only when their types are identical and
//! their keys are equal. Anything else is treated as a replacement: the old
//! subtree is unmounted and the new one is mounted from scratch.

mod builder;
mod node;
mod shape;

pub use builder::VNodeBuilder;
pub use node::{Children, Key, Props, VNode, VNodeType};
pub use shape::ShapeFlags;
