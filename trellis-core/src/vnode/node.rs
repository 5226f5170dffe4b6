use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::shape::ShapeFlags;
use crate::component::{Component, ComponentInstance};
use crate::host::HostNode;
use crate::reactive::Value;

/// Property map of a node, in declaration order.
pub type Props = IndexMap<String, Value>;

/// What a node describes.
#[derive(Clone)]
pub enum VNodeType {
    Text,
    Comment,
    /// A group of children mounted straight into the parent container.
    Fragment,
    Element(Arc<str>),
    Component(Component),
}

impl VNodeType {
    /// Identity comparison. Components compare by definition identity.
    pub fn same(&self, other: &VNodeType) -> bool {
        match (self, other) {
            (Self::Text, Self::Text)
            | (Self::Comment, Self::Comment)
            | (Self::Fragment, Self::Fragment) => true,
            (Self::Element(a), Self::Element(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("Text"),
            Self::Comment => f.write_str("Comment"),
            Self::Fragment => f.write_str("Fragment"),
            Self::Element(tag) => write!(f, "Element({tag})"),
            Self::Component(component) => write!(f, "Component({})", component.name()),
        }
    }
}

/// Identity key used to pair children across a list diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Arc<str>),
    Int(i64),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(key) => f.write_str(key),
            Self::Int(key) => write!(f, "{key}"),
        }
    }
}

impl From<&str> for Key {
    fn from(key: &str) -> Self {
        Self::Str(Arc::from(key))
    }
}

impl From<String> for Key {
    fn from(key: String) -> Self {
        Self::Str(Arc::from(key))
    }
}

impl From<i64> for Key {
    fn from(key: i64) -> Self {
        Self::Int(key)
    }
}

impl From<i32> for Key {
    fn from(key: i32) -> Self {
        Self::Int(i64::from(key))
    }
}

impl From<usize> for Key {
    fn from(key: usize) -> Self {
        Self::Int(key as i64)
    }
}

/// Children of a node.
#[derive(Debug, Clone, Default)]
pub enum Children {
    #[default]
    None,
    Text(String),
    Nodes(Vec<VNode>),
}

impl Children {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[VNode]> {
        match self {
            Self::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    fn shape(&self) -> ShapeFlags {
        match self {
            Self::None => ShapeFlags::empty(),
            Self::Text(_) => ShapeFlags::TEXT_CHILDREN,
            Self::Nodes(_) => ShapeFlags::ARRAY_CHILDREN,
        }
    }
}

/// Description of one output-tree node.
///
/// Nodes are shared handles: cloning yields the same node, and two handles
/// are [`ptr_eq`](VNode::ptr_eq) when they came from the same construction.
/// The description itself never changes after construction; only the
/// realized host node and the owning component instance are filled in as
/// the renderer mounts it.
#[derive(Clone)]
pub struct VNode {
    inner: Arc<VNodeInner>,
}

struct VNodeInner {
    ty: VNodeType,
    props: Option<Arc<Props>>,
    children: Children,
    shape: ShapeFlags,
    key: Option<Key>,
    el: Mutex<Option<HostNode>>,
    // Fragments only: the empty text node closing the fragment.
    anchor: Mutex<Option<HostNode>>,
    instance: Mutex<Option<Arc<ComponentInstance>>>,
}

impl VNode {
    pub(crate) fn from_parts(
        ty: VNodeType,
        props: Option<Arc<Props>>,
        children: Children,
        key: Option<Key>,
    ) -> Self {
        let kind = match &ty {
            VNodeType::Element(_) => ShapeFlags::ELEMENT,
            VNodeType::Component(component) if component.is_functional() => {
                ShapeFlags::FUNCTIONAL_COMPONENT
            }
            VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            _ => ShapeFlags::empty(),
        };

        Self {
            inner: Arc::new(VNodeInner {
                shape: kind | children.shape(),
                ty,
                props,
                children,
                key,
                el: Mutex::new(None),
                anchor: Mutex::new(None),
                instance: Mutex::new(None),
            }),
        }
    }

    /// A text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::from_parts(VNodeType::Text, None, Children::Text(content.into()), None)
    }

    /// A comment node.
    pub fn comment(content: impl Into<String>) -> Self {
        Self::from_parts(
            VNodeType::Comment,
            None,
            Children::Text(content.into()),
            None,
        )
    }

    /// A fragment. Raw strings and numbers become text nodes.
    pub fn fragment<I, N>(children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<VNode>,
    {
        let children = children.into_iter().map(Into::into).collect();
        Self::from_parts(VNodeType::Fragment, None, Children::Nodes(children), None)
    }

    /// A keyed fragment, for fragments that are themselves list items.
    pub fn keyed_fragment<I, N>(key: impl Into<Key>, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<VNode>,
    {
        let children = children.into_iter().map(Into::into).collect();
        Self::from_parts(
            VNodeType::Fragment,
            None,
            Children::Nodes(children),
            Some(key.into()),
        )
    }

    pub fn ty(&self) -> &VNodeType {
        &self.inner.ty
    }

    pub fn props(&self) -> Option<&Arc<Props>> {
        self.inner.props.as_ref()
    }

    pub fn children(&self) -> &Children {
        &self.inner.children
    }

    pub fn shape_flag(&self) -> ShapeFlags {
        self.inner.shape
    }

    pub fn key(&self) -> Option<&Key> {
        self.inner.key.as_ref()
    }

    /// The realized host node, once mounted. For a fragment this is the
    /// empty text node opening it.
    pub fn el(&self) -> Option<HostNode> {
        *self.inner.el.lock()
    }

    pub(crate) fn set_el(&self, el: Option<HostNode>) {
        *self.inner.el.lock() = el;
    }

    /// The empty text node closing a mounted fragment.
    pub fn anchor(&self) -> Option<HostNode> {
        *self.inner.anchor.lock()
    }

    pub(crate) fn set_anchor(&self, anchor: Option<HostNode>) {
        *self.inner.anchor.lock() = anchor;
    }

    /// The component instance owning this node, for component nodes.
    pub fn instance(&self) -> Option<Arc<ComponentInstance>> {
        self.inner.instance.lock().clone()
    }

    pub(crate) fn set_instance(&self, instance: Option<Arc<ComponentInstance>>) {
        *self.inner.instance.lock() = instance;
    }

    /// Check whether two handles refer to the same node.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Same type and same key. Only such nodes are patched in place.
    pub fn is_same_type(&self, other: &VNode) -> bool {
        self.inner.ty.same(&other.inner.ty) && self.inner.key == other.inner.key
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("VNode");
        debug.field("type", &self.inner.ty);
        if let Some(key) = &self.inner.key {
            debug.field("key", key);
        }
        if let Some(props) = &self.inner.props {
            debug.field("props", props);
        }
        debug.field("children", &self.inner.children);
        debug.finish()
    }
}

impl From<&str> for VNode {
    fn from(text: &str) -> Self {
        VNode::text(text)
    }
}

impl From<String> for VNode {
    fn from(text: String) -> Self {
        VNode::text(text)
    }
}

impl From<i32> for VNode {
    fn from(number: i32) -> Self {
        VNode::text(Value::from(number).to_string())
    }
}

impl From<i64> for VNode {
    fn from(number: i64) -> Self {
        VNode::text(Value::from(number).to_string())
    }
}

impl From<f64> for VNode {
    fn from(number: f64) -> Self {
        VNode::text(Value::from(number).to_string())
    }
}

impl From<&VNode> for VNode {
    fn from(node: &VNode) -> Self {
        node.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_type_needs_type_and_key() {
        let a = VNode::element("li").key(1).build();
        let b = VNode::element("li").key(1).build();
        let c = VNode::element("li").key(2).build();
        let d = VNode::element("p").key(1).build();

        assert!(a.is_same_type(&b));
        assert!(!a.ptr_eq(&b));
        assert!(!a.is_same_type(&c));
        assert!(!a.is_same_type(&d));
        assert!(VNode::text("x").is_same_type(&VNode::text("y")));
        assert!(!VNode::text("x").is_same_type(&VNode::comment("x")));
    }

    #[test]
    fn numbers_normalize_to_text() {
        assert_eq!(VNode::from(3).children().as_text(), Some("3"));
        assert_eq!(VNode::from(1.5).children().as_text(), Some("1.5"));
        assert_eq!(VNode::from(2.0).children().as_text(), Some("2"));
        assert!(matches!(VNode::from("hi").ty(), VNodeType::Text));
    }

    #[test]
    fn shape_reflects_children() {
        let text = VNode::element("p").text("hello").build();
        assert_eq!(
            text.shape_flag(),
            ShapeFlags::ELEMENT | ShapeFlags::TEXT_CHILDREN
        );

        let list = VNode::element("ul").child("a").build();
        assert!(list.shape_flag().has_array_children());

        let empty = VNode::element("br").build();
        assert_eq!(empty.shape_flag(), ShapeFlags::ELEMENT);
    }

    #[test]
    fn keys_from_primitives() {
        assert_eq!(Key::from("a"), Key::Str(Arc::from("a")));
        assert_eq!(Key::from(3usize), Key::Int(3));
        assert_eq!(Key::from(7).to_string(), "7");
    }
}
