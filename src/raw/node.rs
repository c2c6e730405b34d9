use super::handle::Link;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Color and tree linkage shared by the header and every stored node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Links {
    pub(crate) color: Color,
    // For the header: the root, or the header itself when the tree is empty.
    pub(crate) parent: Link,
    // For the header: the minimum node. `None` marks a missing child on real nodes.
    pub(crate) left: Option<Link>,
    // For the header: the maximum node.
    pub(crate) right: Option<Link>,
}

impl Links {
    /// Links of a freshly allocated node hanging below `parent`.
    pub(crate) const fn leaf(parent: Link) -> Self {
        Self {
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }
    }

    /// Links of the header of an empty tree.
    ///
    /// The header is tagged red so that stepping back from `end()` can tell it apart
    /// from the (always black) root, which also sits in a two-step parent cycle.
    pub(crate) const fn empty_header() -> Self {
        Self {
            color: Color::Red,
            parent: Link::Header,
            left: Some(Link::Header),
            right: Some(Link::Header),
        }
    }

    #[inline]
    pub(crate) const fn is_red(&self) -> bool {
        matches!(self.color, Color::Red)
    }
}

pub(crate) struct Node<T> {
    pub(crate) links: Links,
    pub(crate) entry: T,
}

impl<T> Node<T> {
    pub(crate) const fn new(entry: T, parent: Link) -> Self {
        Self {
            links: Links::leaf(parent),
            entry,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_header_is_self_referential() {
        let header = Links::empty_header();
        assert!(header.is_red());
        assert_eq!(header.parent, Link::Header);
        assert_eq!(header.left, Some(Link::Header));
        assert_eq!(header.right, Some(Link::Header));
    }

    #[test]
    fn new_nodes_are_red_leaves() {
        let node = Node::new('x', Link::Header);
        assert_eq!(node.links.color, Color::Red);
        assert_eq!(node.links.left, None);
        assert_eq!(node.links.right, None);
        assert_eq!(node.entry, 'x');
    }
}
