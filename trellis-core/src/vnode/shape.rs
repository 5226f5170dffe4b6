//! Shape flags classify a node's kind and the layout of its children, so the
//! renderer can dispatch with a bit test instead of matching on payloads.

use bitflags::bitflags;

bitflags! {
    /// Structural classification of a [`VNode`](super::VNode).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShapeFlags: u16 {
        const ELEMENT = 1;
        const FUNCTIONAL_COMPONENT = 1 << 1;
        const STATEFUL_COMPONENT = 1 << 2;
        const TEXT_CHILDREN = 1 << 3;
        const ARRAY_CHILDREN = 1 << 4;
        const COMPONENT = Self::STATEFUL_COMPONENT.bits() | Self::FUNCTIONAL_COMPONENT.bits();
    }
}

impl ShapeFlags {
    pub fn is_element(self) -> bool {
        self.contains(Self::ELEMENT)
    }

    /// True for both stateful and functional components.
    pub fn is_component(self) -> bool {
        self.intersects(Self::COMPONENT)
    }

    pub fn has_text_children(self) -> bool {
        self.contains(Self::TEXT_CHILDREN)
    }

    pub fn has_array_children(self) -> bool {
        self.contains(Self::ARRAY_CHILDREN)
    }
}
