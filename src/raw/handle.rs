use core::num::NonZero;

#[cfg(test)]
type RawHandle = u16;
#[cfg(not(test))]
type RawHandle = u32;

/// Index of a node slot in the node store.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub(crate) struct Handle(NonZero<RawHandle>);

impl Handle {
    pub(crate) const MAX: usize = (RawHandle::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Handle::from_index()` - `index` > `Handle::MAX`!");
        // `index <= MAX`, so `index + 1` is non-zero and fits in `RawHandle`.
        #[allow(clippy::cast_possible_truncation)]
        Self(NonZero::new((index + 1) as RawHandle).unwrap())
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

/// A reference to a position in the tree's link graph.
///
/// The header sentinel lives inline in the tree rather than in the node store, so
/// a link either names it or names a stored node.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) enum Link {
    Header,
    Node(Handle),
}

impl Link {
    #[inline]
    pub(crate) const fn is_header(self) -> bool {
        matches!(self, Link::Header)
    }

    /// Returns the node handle, or `None` for the header.
    #[inline]
    pub(crate) const fn handle(self) -> Option<Handle> {
        match self {
            Link::Header => None,
            Link::Node(handle) => Some(handle),
        }
    }
}

impl From<Handle> for Link {
    #[inline]
    fn from(handle: Handle) -> Self {
        Link::Node(handle)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use static_assertions::assert_eq_size;

    // `Option<Handle>` is used for every child slot, so the niche must hold.
    assert_eq_size!(Handle, Option<Handle>);
    assert_eq_size!(Handle, RawHandle);
    // The header takes the zero niche, so a link is no wider than a handle.
    assert_eq_size!(Link, Handle);

    #[test]
    #[should_panic(expected = "`Handle::from_index()` - `index` > `Handle::MAX`!")]
    fn invalid_handle() {
        let _ = Handle::from_index(Handle::MAX + 1);
    }

    #[test]
    fn header_link_has_no_handle() {
        assert!(Link::Header.is_header());
        assert_eq!(Link::Header.handle(), None);

        let node = Link::from(Handle::from_index(7));
        assert!(!node.is_header());
        assert_eq!(node.handle().map(Handle::to_index), Some(7));
    }

    proptest! {
        #[test]
        fn handle_round_trip(index in 0..=Handle::MAX) {
            let handle = Handle::from_index(index);
            assert_eq!(handle.to_index(), index);
            assert_eq!(Link::Node(handle).handle(), Some(handle));
        }
    }
}
