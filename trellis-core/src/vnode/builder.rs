use std::sync::Arc;

use super::node::{Children, Key, Props, VNode, VNodeType};
use crate::component::Component;
use crate::reactive::Value;

/// Incremental constructor for element and component nodes.
///
/// ```rust
/// use trellis_core::vnode::VNode;
///
/// let list = VNode::element("ul")
///     .prop("class", "todo")
///     .children(["milk", "eggs"].map(|item| VNode::element("li").key(item).text(item).build()))
///     .build();
///
/// assert_eq!(list.children().as_nodes().map(<[_]>::len), Some(2));
/// ```
#[derive(Debug)]
pub struct VNodeBuilder {
    ty: VNodeType,
    props: Props,
    key: Option<Key>,
    children: Children,
}

impl VNode {
    /// Start building an element node.
    pub fn element(tag: &str) -> VNodeBuilder {
        VNodeBuilder::new(VNodeType::Element(Arc::from(tag)))
    }

    /// Start building a component node.
    pub fn component(component: &Component) -> VNodeBuilder {
        VNodeBuilder::new(VNodeType::Component(component.clone()))
    }
}

impl VNodeBuilder {
    fn new(ty: VNodeType) -> Self {
        Self {
            ty,
            props: Props::new(),
            key: None,
            children: Children::None,
        }
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn props<I, K, V>(mut self, props: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.props
            .extend(props.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replace the children with text content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children = Children::Text(text.into());
        self
    }

    /// Append one child. Text content set earlier is discarded.
    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        match &mut self.children {
            Children::Nodes(nodes) => nodes.push(child.into()),
            children => *children = Children::Nodes(vec![child.into()]),
        }
        self
    }

    /// Append several children. An empty iterator still yields array children.
    pub fn children<I, N>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<VNode>,
    {
        let iter = children.into_iter().map(Into::into);
        match &mut self.children {
            Children::Nodes(nodes) => nodes.extend(iter),
            slot => *slot = Children::Nodes(iter.collect()),
        }
        self
    }

    pub fn build(self) -> VNode {
        let props = (!self.props.is_empty()).then(|| Arc::new(self.props));
        VNode::from_parts(self.ty, props, self.children, self.key)
    }
}
