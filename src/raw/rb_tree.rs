use smallvec::SmallVec;

use super::arena::Arena;
use super::handle::{Handle, Link};
use super::node::{Color, Links, Node};
use crate::compare::{Compare, KeyOf};
use crate::error::AllocError;

/// The red-black tree engine backing `RbTree`.
///
/// The header is kept inline and addressed as [`Link::Header`]. Its `parent` is the
/// root, its `left`/`right` cache the minimum and maximum nodes, and it doubles as the
/// past-the-end position.
pub(crate) struct RawRbTree<T, X, C> {
    /// Node store holding every linked node.
    nodes: Arena<Node<T>>,
    /// Sentinel linkage: root, leftmost and rightmost.
    header: Links,
    /// Number of linked nodes.
    len: usize,
    key_of: X,
    compare: C,
}

/// Where a freshly cloned node hangs in the copy.
#[derive(Clone, Copy)]
enum Slot {
    Root,
    Left(Handle),
    Right(Handle),
}

/// Pending work for the iterative deep copy: a source node and the slot its copy fills.
type CloneStack = SmallVec<[(Handle, Slot); 32]>;

impl<T, X, C> RawRbTree<T, X, C> {
    pub(crate) const fn new(key_of: X, compare: C) -> Self {
        Self {
            nodes: Arena::new(),
            header: Links::empty_header(),
            len: 0,
            key_of,
            compare,
        }
    }

    pub(crate) fn with_capacity(capacity: usize, key_of: X, compare: C) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            header: Links::empty_header(),
            len: 0,
            key_of,
            compare,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    pub(crate) const fn node_limit(&self) -> usize {
        self.nodes.limit()
    }

    pub(crate) fn set_node_limit(&mut self, limit: usize) {
        self.nodes.set_limit(limit);
    }

    pub(crate) const fn key_of(&self) -> &X {
        &self.key_of
    }

    pub(crate) const fn compare(&self) -> &C {
        &self.compare
    }

    /// Returns the root node, if the tree is non-empty.
    pub(crate) const fn root(&self) -> Option<Handle> {
        self.header.parent.handle()
    }

    /// The first position in order: the minimum node, or the header when empty.
    pub(crate) fn begin(&self) -> Link {
        self.header.left.unwrap_or(Link::Header)
    }

    /// The last node in order: the maximum node, or the header when empty.
    pub(crate) fn back(&self) -> Link {
        self.header.right.unwrap_or(Link::Header)
    }

    /// Returns `true` if `link` is the header or a live node of this tree.
    pub(crate) fn is_live(&self, link: Link) -> bool {
        match link {
            Link::Header => true,
            Link::Node(handle) => self.nodes.contains(handle),
        }
    }

    pub(crate) fn entry(&self, handle: Handle) -> &T {
        &self.nodes.get(handle).entry
    }

    pub(crate) fn entry_mut(&mut self, handle: Handle) -> &mut T {
        &mut self.nodes.get_mut(handle).entry
    }

    /// Releases every node and resets the header.
    pub(crate) fn clear(&mut self) {
        log::debug!("clearing tree of {} nodes", self.len);
        self.nodes.clear();
        self.header = Links::empty_header();
        self.len = 0;
    }

    /// Moves every entry out in order and leaves the tree empty.
    /// This is O(n) as it avoids rebalancing, unlike repeated erasure of the minimum.
    pub(crate) fn drain_to_vec(&mut self) -> alloc::vec::Vec<T> {
        let mut handles = alloc::vec::Vec::with_capacity(self.len);
        let mut position = self.begin();
        while let Link::Node(handle) = position {
            handles.push(handle);
            position = self.increment(position);
        }

        let entries = handles.into_iter().map(|handle| self.nodes.take(handle).entry).collect();
        self.clear();
        entries
    }

    // ─── Link accessors ──────────────────────────────────────────────────────

    #[inline]
    fn links(&self, link: Link) -> &Links {
        match link {
            Link::Header => &self.header,
            Link::Node(handle) => &self.nodes.get(handle).links,
        }
    }

    #[inline]
    fn parent_of(&self, handle: Handle) -> Link {
        self.nodes.get(handle).links.parent
    }

    #[inline]
    fn left_of(&self, handle: Handle) -> Option<Handle> {
        self.nodes.get(handle).links.left.and_then(Link::handle)
    }

    #[inline]
    fn right_of(&self, handle: Handle) -> Option<Handle> {
        self.nodes.get(handle).links.right.and_then(Link::handle)
    }

    #[inline]
    fn set_parent(&mut self, handle: Handle, parent: Link) {
        self.nodes.get_mut(handle).links.parent = parent;
    }

    #[inline]
    fn set_left(&mut self, handle: Handle, left: Option<Handle>) {
        self.nodes.get_mut(handle).links.left = left.map(Link::Node);
    }

    #[inline]
    fn set_right(&mut self, handle: Handle, right: Option<Handle>) {
        self.nodes.get_mut(handle).links.right = right.map(Link::Node);
    }

    #[inline]
    fn color(&self, handle: Handle) -> Color {
        self.nodes.get(handle).links.color
    }

    #[inline]
    fn set_color(&mut self, handle: Handle, color: Color) {
        self.nodes.get_mut(handle).links.color = color;
    }

    /// Missing children count as black.
    #[inline]
    fn is_red(&self, handle: Option<Handle>) -> bool {
        handle.is_some_and(|h| self.nodes.get(h).links.is_red())
    }

    fn minimum(&self, mut handle: Handle) -> Handle {
        while let Some(left) = self.left_of(handle) {
            handle = left;
        }
        handle
    }

    fn maximum(&self, mut handle: Handle) -> Handle {
        while let Some(right) = self.right_of(handle) {
            handle = right;
        }
        handle
    }

    /// Points whichever slot of `parent` held `old` at `new`. A header parent means
    /// `old` was the root.
    fn replace_child(&mut self, parent: Link, old: Handle, new: Option<Handle>) {
        match parent {
            Link::Header => self.header.parent = new.map_or(Link::Header, Link::Node),
            Link::Node(p) => {
                if self.left_of(p) == Some(old) {
                    self.set_left(p, new);
                } else {
                    self.set_right(p, new);
                }
            }
        }
    }

    // ─── Rotations ───────────────────────────────────────────────────────────

    fn rotate_left(&mut self, x: Handle) {
        let Some(y) = self.right_of(x) else {
            return;
        };
        let y_left = self.left_of(y);
        self.set_right(x, y_left);
        if let Some(yl) = y_left {
            self.set_parent(yl, Link::Node(x));
        }
        let x_parent = self.parent_of(x);
        self.set_parent(y, x_parent);
        self.replace_child(x_parent, x, Some(y));
        self.set_left(y, Some(x));
        self.set_parent(x, Link::Node(y));
    }

    fn rotate_right(&mut self, x: Handle) {
        let Some(y) = self.left_of(x) else {
            return;
        };
        let y_right = self.right_of(y);
        self.set_left(x, y_right);
        if let Some(yr) = y_right {
            self.set_parent(yr, Link::Node(x));
        }
        let x_parent = self.parent_of(x);
        self.set_parent(y, x_parent);
        self.replace_child(x_parent, x, Some(y));
        self.set_right(y, Some(x));
        self.set_parent(x, Link::Node(y));
    }

    // ─── Iterator protocol ───────────────────────────────────────────────────

    /// In-order successor. Stepping past the maximum yields the header; the header
    /// steps to itself.
    pub(crate) fn increment(&self, link: Link) -> Link {
        let Link::Node(handle) = link else {
            return Link::Header;
        };
        if let Some(right) = self.right_of(handle) {
            return Link::Node(self.minimum(right));
        }

        let mut node = link;
        let mut y = self.links(node).parent;
        while self.links(y).right == Some(node) {
            node = y;
            y = self.links(y).parent;
        }
        // When the root is the maximum, the climb overshoots into the header's
        // parent cycle and `node` already is the header.
        if self.links(node).right != Some(y) {
            node = y;
        }
        node
    }

    /// In-order predecessor. Stepping back from the header yields the maximum;
    /// stepping back from the minimum yields the header.
    pub(crate) fn decrement(&self, link: Link) -> Link {
        let links = self.links(link);
        // Only the red-tagged header sits in a two-step parent cycle with a node.
        if links.is_red() && self.links(links.parent).parent == link {
            return self.back();
        }
        let Link::Node(handle) = link else {
            return Link::Header;
        };
        if self.begin() == link {
            return Link::Header;
        }
        if let Some(left) = self.left_of(handle) {
            return Link::Node(self.maximum(left));
        }

        let mut node = link;
        let mut y = links.parent;
        while self.links(y).left == Some(node) {
            node = y;
            y = self.links(y).parent;
        }
        y
    }

    /// Counts the steps from `first` to `last`.
    pub(crate) fn distance(&self, mut first: Link, last: Link) -> usize {
        let mut steps = 0;
        while first != last && !first.is_header() {
            first = self.increment(first);
            steps += 1;
        }
        steps
    }

    // ─── Rebalancing ─────────────────────────────────────────────────────────

    /// Restores the red-black invariants after `x` was linked in as a red leaf.
    fn rebalance_after_insert(&mut self, mut x: Handle) {
        loop {
            let p = match self.parent_of(x) {
                Link::Node(p) if self.is_red(Some(p)) => p,
                _ => break,
            };
            // A red parent is never the root, so the grandparent is a node.
            let Link::Node(g) = self.parent_of(p) else {
                break;
            };

            if self.left_of(g) == Some(p) {
                let uncle = self.right_of(g);
                if let Some(u) = uncle.filter(|&u| self.is_red(Some(u))) {
                    self.set_color(p, Color::Black);
                    self.set_color(u, Color::Black);
                    self.set_color(g, Color::Red);
                    x = g;
                    continue;
                }
                if self.right_of(p) == Some(x) {
                    x = p;
                    self.rotate_left(x);
                }
                self.finish_insert_rotation(x, Self::rotate_right);
            } else {
                let uncle = self.left_of(g);
                if let Some(u) = uncle.filter(|&u| self.is_red(Some(u))) {
                    self.set_color(p, Color::Black);
                    self.set_color(u, Color::Black);
                    self.set_color(g, Color::Red);
                    x = g;
                    continue;
                }
                if self.left_of(p) == Some(x) {
                    x = p;
                    self.rotate_right(x);
                }
                self.finish_insert_rotation(x, Self::rotate_left);
            }
            log::trace!("insert fix-up ended with a rotation");
            break;
        }

        if let Some(root) = self.root() {
            self.set_color(root, Color::Black);
        }
    }

    /// Recolors the parent/grandparent of `x` and rotates the grandparent towards
    /// the uncle's side.
    fn finish_insert_rotation(&mut self, x: Handle, rotate: fn(&mut Self, Handle)) {
        let Link::Node(p) = self.parent_of(x) else {
            return;
        };
        let Link::Node(g) = self.parent_of(p) else {
            return;
        };
        self.set_color(p, Color::Black);
        self.set_color(g, Color::Red);
        rotate(self, g);
    }

    /// Restores black-height after a black node was spliced out. `x` is the node that
    /// took its place (possibly missing) and `x_parent` is where it hangs.
    fn rebalance_after_erase(&mut self, mut x: Option<Handle>, mut x_parent: Link) {
        while x != self.root() && !self.is_red(x) {
            let Link::Node(p) = x_parent else {
                break;
            };

            if self.left_of(p) == x {
                let Some(mut s) = self.right_of(p) else {
                    break;
                };
                if self.is_red(Some(s)) {
                    self.set_color(s, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_left(p);
                    let Some(next) = self.right_of(p) else {
                        break;
                    };
                    s = next;
                }
                if !self.is_red(self.left_of(s)) && !self.is_red(self.right_of(s)) {
                    self.set_color(s, Color::Red);
                    x = Some(p);
                    x_parent = self.parent_of(p);
                    continue;
                }
                if !self.is_red(self.right_of(s)) {
                    if let Some(near) = self.left_of(s) {
                        self.set_color(near, Color::Black);
                    }
                    self.set_color(s, Color::Red);
                    self.rotate_right(s);
                    let Some(next) = self.right_of(p) else {
                        break;
                    };
                    s = next;
                }
                self.set_color(s, self.color(p));
                self.set_color(p, Color::Black);
                if let Some(far) = self.right_of(s) {
                    self.set_color(far, Color::Black);
                }
                self.rotate_left(p);
            } else {
                let Some(mut s) = self.left_of(p) else {
                    break;
                };
                if self.is_red(Some(s)) {
                    self.set_color(s, Color::Black);
                    self.set_color(p, Color::Red);
                    self.rotate_right(p);
                    let Some(next) = self.left_of(p) else {
                        break;
                    };
                    s = next;
                }
                if !self.is_red(self.left_of(s)) && !self.is_red(self.right_of(s)) {
                    self.set_color(s, Color::Red);
                    x = Some(p);
                    x_parent = self.parent_of(p);
                    continue;
                }
                if !self.is_red(self.left_of(s)) {
                    if let Some(near) = self.right_of(s) {
                        self.set_color(near, Color::Black);
                    }
                    self.set_color(s, Color::Red);
                    self.rotate_left(s);
                    let Some(next) = self.left_of(p) else {
                        break;
                    };
                    s = next;
                }
                self.set_color(s, self.color(p));
                self.set_color(p, Color::Black);
                if let Some(far) = self.left_of(s) {
                    self.set_color(far, Color::Black);
                }
                self.rotate_right(p);
            }
            log::trace!("erase fix-up ended with a far-red rotation");
            break;
        }

        if let Some(x) = x {
            self.set_color(x, Color::Black);
        }
    }

    // ─── Erasure ─────────────────────────────────────────────────────────────

    /// Unlinks the node at `z`, rebalances, and returns its entry.
    ///
    /// Entries never move between nodes, so every other handle stays valid.
    ///
    /// # Panics
    ///
    /// Panics if `z` is not a live node of this tree.
    pub(crate) fn erase(&mut self, z: Handle) -> T {
        let z_left = self.left_of(z);
        let z_right = self.right_of(z);
        let z_parent = self.parent_of(z);

        let (x, x_parent) = match (z_left, z_right) {
            (Some(zl), Some(zr)) => {
                // Relink the in-order successor `y` into `z`'s place.
                let y = self.minimum(zr);
                let x = self.right_of(y);
                self.set_left(y, Some(zl));
                self.set_parent(zl, Link::Node(y));

                let x_parent = if y == zr {
                    Link::Node(y)
                } else {
                    let y_parent = self.parent_of(y);
                    if let Some(x) = x {
                        self.set_parent(x, y_parent);
                    }
                    if let Link::Node(yp) = y_parent {
                        self.set_left(yp, x);
                    }
                    self.set_right(y, Some(zr));
                    self.set_parent(zr, Link::Node(y));
                    y_parent
                };

                self.replace_child(z_parent, z, Some(y));
                self.set_parent(y, z_parent);
                let y_color = self.color(y);
                self.set_color(y, self.color(z));
                self.set_color(z, y_color);
                (x, x_parent)
            }
            (left, right) => {
                let x = left.or(right);
                if let Some(x) = x {
                    self.set_parent(x, z_parent);
                }
                self.replace_child(z_parent, z, x);

                if self.header.left == Some(Link::Node(z)) {
                    self.header.left = Some(match x {
                        Some(x) => Link::Node(self.minimum(x)),
                        None => z_parent,
                    });
                }
                if self.header.right == Some(Link::Node(z)) {
                    self.header.right = Some(match x {
                        Some(x) => Link::Node(self.maximum(x)),
                        None => z_parent,
                    });
                }
                (x, z_parent)
            }
        };

        let removed_color = self.color(z);
        let node = self.nodes.take(z);
        self.len -= 1;

        if removed_color == Color::Black {
            self.rebalance_after_erase(x, x_parent);
        }
        node.entry
    }

    /// Erases every node in `[first, last)` and returns how many were removed.
    pub(crate) fn erase_range(&mut self, mut first: Link, last: Link) -> usize {
        if first == self.begin() && last.is_header() {
            let removed = self.len;
            self.clear();
            return removed;
        }

        let mut removed = 0;
        while first != last {
            let Link::Node(handle) = first else {
                break;
            };
            first = self.increment(first);
            drop(self.erase(handle));
            removed += 1;
        }
        log::debug!("erased a run of {removed} nodes");
        removed
    }
}

impl<T, X, C> RawRbTree<T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    #[inline]
    fn key(&self, handle: Handle) -> &X::Key {
        self.key_of.key(&self.nodes.get(handle).entry)
    }

    // ─── Insertion ───────────────────────────────────────────────────────────

    /// Links `entry` below `y` (the header when the tree is empty) and rebalances.
    ///
    /// The node is allocated before any linkage changes, so on failure the tree is
    /// untouched.
    fn insert_below(&mut self, y: Link, entry: T) -> Result<Handle, AllocError> {
        let goes_left = match y {
            Link::Header => true,
            Link::Node(yh) => self.compare.less(self.key_of.key(&entry), self.key(yh)),
        };
        let z = self.nodes.try_alloc(Node::new(entry, y))?;

        match y {
            Link::Header => {
                self.header.parent = Link::Node(z);
                self.header.left = Some(Link::Node(z));
                self.header.right = Some(Link::Node(z));
            }
            Link::Node(yh) if goes_left => {
                self.set_left(yh, Some(z));
                if self.header.left == Some(y) {
                    self.header.left = Some(Link::Node(z));
                }
            }
            Link::Node(yh) => {
                self.set_right(yh, Some(z));
                if self.header.right == Some(y) {
                    self.header.right = Some(Link::Node(z));
                }
            }
        }

        self.rebalance_after_insert(z);
        self.len += 1;
        Ok(z)
    }

    /// Inserts `entry` unless an equivalent key is present.
    ///
    /// Returns the new node and `true`, or the existing node and `false`. Nothing is
    /// allocated in the second case.
    pub(crate) fn insert_unique(&mut self, entry: T) -> Result<(Handle, bool), AllocError> {
        let (y, existing) = {
            let key = self.key_of.key(&entry);
            let mut y = Link::Header;
            let mut x = self.root();
            let mut went_left = true;
            while let Some(xh) = x {
                y = Link::Node(xh);
                went_left = self.compare.less(key, self.key(xh));
                x = if went_left { self.left_of(xh) } else { self.right_of(xh) };
            }

            // The only possible equivalent is the in-order predecessor of the
            // insertion point.
            let candidate = if went_left {
                if y == self.begin() {
                    None
                } else {
                    self.decrement(y).handle()
                }
            } else {
                y.handle()
            };
            let existing = candidate.filter(|&j| !self.compare.less(self.key(j), key));
            (y, existing)
        };

        match existing {
            Some(j) => Ok((j, false)),
            None => self.insert_below(y, entry).map(|z| (z, true)),
        }
    }

    /// Inserts `entry` after any equivalent keys already present.
    pub(crate) fn insert_equal(&mut self, entry: T) -> Result<Handle, AllocError> {
        let y = {
            let key = self.key_of.key(&entry);
            let mut y = Link::Header;
            let mut x = self.root();
            while let Some(xh) = x {
                y = Link::Node(xh);
                x = if self.compare.less(key, self.key(xh)) {
                    self.left_of(xh)
                } else {
                    self.right_of(xh)
                };
            }
            y
        };
        self.insert_below(y, entry)
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// First node whose key is not less than `key`, or the header.
    pub(crate) fn lower_bound(&self, key: &X::Key) -> Link {
        let mut y = Link::Header;
        let mut x = self.root();
        while let Some(xh) = x {
            if self.compare.less(self.key(xh), key) {
                x = self.right_of(xh);
            } else {
                y = Link::Node(xh);
                x = self.left_of(xh);
            }
        }
        y
    }

    /// First node whose key is greater than `key`, or the header.
    pub(crate) fn upper_bound(&self, key: &X::Key) -> Link {
        let mut y = Link::Header;
        let mut x = self.root();
        while let Some(xh) = x {
            if self.compare.less(key, self.key(xh)) {
                y = Link::Node(xh);
                x = self.left_of(xh);
            } else {
                x = self.right_of(xh);
            }
        }
        y
    }

    /// A node whose key is equivalent to `key` (the first of its run), or the header.
    pub(crate) fn find(&self, key: &X::Key) -> Link {
        match self.lower_bound(key) {
            Link::Node(j) if !self.compare.less(key, self.key(j)) => Link::Node(j),
            _ => Link::Header,
        }
    }

    pub(crate) fn count(&self, key: &X::Key) -> usize {
        self.distance(self.lower_bound(key), self.upper_bound(key))
    }

    /// Erases the whole run of keys equivalent to `key`.
    pub(crate) fn erase_key(&mut self, key: &X::Key) -> usize {
        let first = self.lower_bound(key);
        let last = self.upper_bound(key);
        self.erase_range(first, last)
    }
}

impl<T: Clone, X: Clone, C: Clone> RawRbTree<T, X, C> {
    /// Deep-copies the tree node for node, preserving shape and colors.
    ///
    /// The walk keeps its own stack, so degenerate shapes cannot exhaust the call
    /// stack. If the store runs out partway, the partial copy is dropped whole.
    pub(crate) fn try_clone(&self) -> Result<Self, AllocError> {
        let mut copy = Self::new(self.key_of.clone(), self.compare.clone());
        copy.nodes.set_limit(self.nodes.limit());
        copy.nodes.try_reserve(self.len)?;

        let Some(root) = self.root() else {
            return Ok(copy);
        };

        let mut stack: CloneStack = SmallVec::new();
        stack.push((root, Slot::Root));
        while let Some((source, slot)) = stack.pop() {
            let from = self.nodes.get(source);
            let parent = match slot {
                Slot::Root => Link::Header,
                Slot::Left(p) | Slot::Right(p) => Link::Node(p),
            };
            let mut node = Node::new(from.entry.clone(), parent);
            node.links.color = from.links.color;

            let cloned = match copy.nodes.try_alloc(node) {
                Ok(handle) => handle,
                Err(err) => {
                    log::debug!("clone aborted after {} of {} nodes", copy.nodes.len(), self.len);
                    return Err(err);
                }
            };
            match slot {
                Slot::Root => copy.header.parent = Link::Node(cloned),
                Slot::Left(p) => copy.set_left(p, Some(cloned)),
                Slot::Right(p) => copy.set_right(p, Some(cloned)),
            }

            if let Some(right) = self.right_of(source) {
                stack.push((right, Slot::Right(cloned)));
            }
            if let Some(left) = self.left_of(source) {
                stack.push((left, Slot::Left(cloned)));
            }
        }

        if let Some(new_root) = copy.root() {
            copy.header.left = Some(Link::Node(copy.minimum(new_root)));
            copy.header.right = Some(Link::Node(copy.maximum(new_root)));
        }
        copy.len = self.len;
        log::debug!("cloned tree of {} nodes", copy.len);
        Ok(copy)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(clippy::manual_assert, clippy::uninlined_format_args)]
mod tests {
    use super::*;
    use crate::compare::{Identity, Less};
    use alloc::format;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use proptest::prelude::*;

    type Tree = RawRbTree<i32, Identity, Less>;

    fn tree() -> Tree {
        RawRbTree::new(Identity, Less)
    }

    impl<T, X, C> RawRbTree<T, X, C>
    where
        X: KeyOf<T>,
        C: Compare<X::Key>,
    {
        /// Validates every red-black and header invariant. Panics with a descriptive
        /// message if any are violated.
        pub(crate) fn validate_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();

            let Some(root) = self.root() else {
                assert_eq!(self.len, 0, "Empty tree should have len 0");
                assert_eq!(self.header, Links::empty_header(), "Empty tree should have a self-referential header");
                assert_eq!(self.nodes.len(), 0, "Empty tree should hold no nodes");
                return;
            };

            if self.parent_of(root) != Link::Header {
                errors.push("root's parent is not the header".into());
            }
            if self.color(root) != Color::Black {
                errors.push("root is red".into());
            }
            if !self.header.is_red() {
                errors.push("header lost its red tag".into());
            }

            let mut count = 0;
            self.validate_node(root, &mut count, &mut errors);

            if count != self.len {
                errors.push(format!("len mismatch: self.len={}, reachable={}", self.len, count));
            }
            if self.nodes.len() != self.len {
                errors.push(format!("store mismatch: store.len={}, self.len={}", self.nodes.len(), self.len));
            }
            if self.header.left != Some(Link::Node(self.minimum(root))) {
                errors.push("header.left is not the minimum".into());
            }
            if self.header.right != Some(Link::Node(self.maximum(root))) {
                errors.push("header.right is not the maximum".into());
            }

            // In-order walk must be non-decreasing and agree with `len`.
            let mut walked = 0;
            let mut previous: Option<Handle> = None;
            let mut position = self.begin();
            while let Link::Node(handle) = position {
                if let Some(prev) = previous
                    && self.compare.less(self.key(handle), self.key(prev))
                {
                    errors.push(format!("in-order walk decreases at {:?}", handle));
                }
                previous = Some(handle);
                walked += 1;
                position = self.increment(position);
            }
            if walked != self.len {
                errors.push(format!("walk mismatch: walked={}, self.len={}", walked, self.len));
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Returns the black-height below `handle`, counting `handle` itself.
        fn validate_node(&self, handle: Handle, count: &mut usize, errors: &mut Vec<String>) -> usize {
            *count += 1;
            let red = self.is_red(Some(handle));
            let mut heights = [1usize; 2];

            for (slot, child) in [self.left_of(handle), self.right_of(handle)].into_iter().enumerate() {
                let Some(child) = child else {
                    continue;
                };
                if self.parent_of(child) != Link::Node(handle) {
                    errors.push(format!("child {:?} does not point back to {:?}", child, handle));
                }
                if red && self.is_red(Some(child)) {
                    errors.push(format!("red node {:?} has red child {:?}", handle, child));
                }
                heights[slot] = self.validate_node(child, count, errors);
            }

            if heights[0] != heights[1] {
                errors.push(format!(
                    "black-height mismatch at {:?}: left={}, right={}",
                    handle, heights[0], heights[1]
                ));
            }
            heights[0] + usize::from(!red)
        }
    }

    fn in_order<X, C>(tree: &RawRbTree<i32, X, C>) -> Vec<i32> {
        let mut out = Vec::new();
        let mut position = tree.begin();
        while let Link::Node(handle) = position {
            out.push(*tree.entry(handle));
            position = tree.increment(position);
        }
        out
    }

    #[test]
    fn empty_tree_positions() {
        let tree = tree();
        tree.validate_invariants();
        assert_eq!(tree.begin(), Link::Header);
        assert_eq!(tree.increment(Link::Header), Link::Header);
        assert_eq!(tree.decrement(Link::Header), Link::Header);
        assert_eq!(tree.find(&3), Link::Header);
        assert_eq!(tree.count(&3), 0);
    }

    #[test]
    fn scripted_insert_erase_sequence() {
        let mut tree = tree();
        for key in [10, 7, 8, 15, 5, 6, 11, 13, 12] {
            assert!(tree.insert_unique(key).unwrap().1);
            tree.validate_invariants();
        }
        assert_eq!(in_order(&tree), vec![5, 6, 7, 8, 10, 11, 12, 13, 15]);

        assert_eq!(tree.erase_key(&12), 1);
        tree.validate_invariants();
        assert_eq!(tree.erase_key(&8), 1);
        tree.validate_invariants();

        tree.insert_unique(0).unwrap();
        tree.insert_unique(1).unwrap();
        tree.insert_equal(0).unwrap();
        tree.validate_invariants();
        assert_eq!(tree.len(), 10);
        assert_eq!(tree.count(&0), 2);

        assert_eq!(tree.erase_key(&0), 2);
        tree.validate_invariants();
        assert_eq!(tree.len(), 8);
        assert_eq!(in_order(&tree), vec![1, 5, 6, 7, 10, 11, 13, 15]);
    }

    #[test]
    fn duplicate_unique_insert_returns_existing() {
        let mut tree = tree();
        let (first, inserted) = tree.insert_unique(4).unwrap();
        assert!(inserted);
        let (again, inserted) = tree.insert_unique(4).unwrap();
        assert!(!inserted);
        assert_eq!(first, again);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn decrement_from_header_reaches_maximum() {
        let mut tree = tree();
        for key in [3, 1, 2] {
            tree.insert_unique(key).unwrap();
        }
        let last = tree.decrement(Link::Header);
        assert_eq!(last.handle().map(|h| *tree.entry(h)), Some(3));
        // Stepping back from the minimum lands on the header.
        assert_eq!(tree.decrement(tree.begin()), Link::Header);
    }

    #[test]
    fn increment_past_root_maximum_reaches_header() {
        let mut tree = tree();
        tree.insert_unique(2).unwrap();
        tree.insert_unique(1).unwrap();
        // The root (2) is the maximum and has no right child.
        let root = Link::Node(tree.root().unwrap());
        assert_eq!(tree.increment(root), Link::Header);
    }

    #[test]
    fn erase_keeps_other_handles_valid() {
        let mut tree = tree();
        let handles: Vec<(i32, Handle)> = (0..64).map(|k| (k, tree.insert_unique(k).unwrap().0)).collect();

        for &(key, handle) in handles.iter().filter(|(k, _)| k % 3 == 0) {
            assert_eq!(tree.erase(handle), key);
            tree.validate_invariants();
        }
        for &(key, handle) in handles.iter().filter(|(k, _)| k % 3 != 0) {
            assert_eq!(*tree.entry(handle), key);
        }
    }

    #[test]
    fn node_limit_failure_leaves_tree_untouched() {
        let mut tree = tree();
        tree.set_node_limit(3);
        for key in [2, 1, 3] {
            tree.insert_unique(key).unwrap();
        }
        assert_eq!(tree.insert_unique(4), Err(AllocError::NodeLimit { limit: 3 }));
        assert_eq!(tree.insert_equal(2), Err(AllocError::NodeLimit { limit: 3 }));
        // Present keys do not need a node.
        assert_eq!(tree.insert_unique(2).map(|(_, inserted)| inserted), Ok(false));
        tree.validate_invariants();
        assert_eq!(in_order(&tree), vec![1, 2, 3]);
    }

    #[test]
    fn clone_is_structurally_identical_and_independent() {
        let mut tree = tree();
        for key in 0..100 {
            tree.insert_equal(key % 17).unwrap();
        }
        let mut copy = tree.try_clone().unwrap();
        copy.validate_invariants();
        assert_eq!(in_order(&copy), in_order(&tree));
        assert_same_shape(&tree, &copy);

        copy.erase_key(&3);
        copy.insert_unique(1000).unwrap();
        copy.validate_invariants();
        assert_eq!(tree.len(), 100);
        assert_eq!(tree.count(&3), 6);
        assert_eq!(tree.find(&1000), Link::Header);
    }

    /// Walks both trees in lockstep, comparing entries, colors and child presence.
    fn assert_same_shape(a: &Tree, b: &Tree) {
        let mut stack: Vec<(Option<Handle>, Option<Handle>)> = vec![(a.root(), b.root())];
        while let Some(pair) = stack.pop() {
            match pair {
                (None, None) => {}
                (Some(x), Some(y)) => {
                    assert_eq!(a.entry(x), b.entry(y), "entry mismatch");
                    assert_eq!(a.color(x), b.color(y), "color mismatch at {}", a.entry(x));
                    stack.push((a.left_of(x), b.left_of(y)));
                    stack.push((a.right_of(x), b.right_of(y)));
                }
                (x, y) => panic!("child presence differs: {:?} vs {:?}", x.map(|h| *a.entry(h)), y.map(|h| *b.entry(h))),
            }
        }
    }

    #[test]
    fn clone_fails_when_limit_is_below_len() {
        let mut tree = tree();
        for key in [8, 3, 12, 1, 5, 9, 15, 4, 6, 2] {
            tree.insert_unique(key).unwrap();
        }
        let before = in_order(&tree);
        tree.set_node_limit(5);

        assert_eq!(tree.try_clone().err(), Some(AllocError::NodeLimit { limit: 5 }));
        tree.validate_invariants();
        assert_eq!(in_order(&tree), before);
        assert_eq!(tree.nodes.len(), 10);

        // Raising the limit again makes the copy possible.
        tree.set_node_limit(10);
        let copy = tree.try_clone().unwrap();
        assert_same_shape(&tree, &copy);
    }

    #[test]
    fn clone_respects_node_limit() {
        let mut tree = tree();
        for key in 0..10 {
            tree.insert_unique(key).unwrap();
        }
        tree.set_node_limit(10);
        assert!(tree.try_clone().is_ok());

        let mut cramped = tree.try_clone().unwrap();
        cramped.set_node_limit(10);
        cramped.insert_equal(0).unwrap_err();
        cramped.validate_invariants();
    }

    #[test]
    fn degenerate_sequences_stay_balanced() {
        let mut ascending = tree();
        let mut descending = tree();
        for key in 0..1_000 {
            ascending.insert_equal(key).unwrap();
            descending.insert_equal(-key).unwrap();
        }
        ascending.validate_invariants();
        descending.validate_invariants();

        for key in 0..1_000 {
            if key % 2 == 0 {
                ascending.erase_key(&key);
                descending.erase_key(&-key);
            }
        }
        ascending.validate_invariants();
        descending.validate_invariants();
        assert_eq!(ascending.len(), 500);
    }

    #[test]
    fn erase_range_of_everything_clears() {
        let mut tree = tree();
        for key in 0..20 {
            tree.insert_unique(key).unwrap();
        }
        assert_eq!(tree.erase_range(tree.begin(), Link::Header), 20);
        tree.validate_invariants();
        assert!(tree.is_empty());

        // The tree is usable again afterwards.
        tree.insert_unique(5).unwrap();
        tree.validate_invariants();
    }

    // Test operations enum for property testing
    #[derive(Clone, Debug)]
    enum Op {
        InsertUnique(i32),
        InsertEqual(i32),
        EraseKey(i32),
        EraseFirst,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => (0i32..200).prop_map(Op::InsertUnique),
            2 => (0i32..200).prop_map(Op::InsertEqual),
            2 => (0i32..200).prop_map(Op::EraseKey),
            1 => Just(Op::EraseFirst),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn tree_invariants_maintained_after_operations(ops in prop::collection::vec(op_strategy(), 0..500)) {
            let mut tree = tree();
            let mut model: Vec<i32> = Vec::new();

            for op in ops {
                match op {
                    Op::InsertUnique(key) => {
                        let (_, inserted) = tree.insert_unique(key).unwrap();
                        prop_assert_eq!(inserted, !model.contains(&key));
                        if inserted {
                            model.push(key);
                        }
                    }
                    Op::InsertEqual(key) => {
                        tree.insert_equal(key).unwrap();
                        model.push(key);
                    }
                    Op::EraseKey(key) => {
                        let expected = model.iter().filter(|&&k| k == key).count();
                        prop_assert_eq!(tree.erase_key(&key), expected);
                        model.retain(|&k| k != key);
                    }
                    Op::EraseFirst => {
                        if let Link::Node(first) = tree.begin() {
                            let key = tree.erase(first);
                            let at = model.iter().position(|&k| k == key).unwrap();
                            model.remove(at);
                        }
                    }
                }
                tree.validate_invariants();
                model.sort_unstable();
                prop_assert_eq!(in_order(&tree), model.clone());
            }
        }

        #[test]
        fn bounds_match_sorted_model(keys in prop::collection::vec(0i32..50, 0..200), probe in -5i32..55) {
            let mut tree = tree();
            for &key in &keys {
                tree.insert_equal(key).unwrap();
            }
            let mut sorted = keys.clone();
            sorted.sort_unstable();

            let below = sorted.iter().filter(|&&k| k < probe).count();
            let not_above = sorted.iter().filter(|&&k| k <= probe).count();
            prop_assert_eq!(tree.distance(tree.begin(), tree.lower_bound(&probe)), below);
            prop_assert_eq!(tree.distance(tree.begin(), tree.upper_bound(&probe)), not_above);
            prop_assert_eq!(tree.count(&probe), not_above - below);
            prop_assert_eq!(tree.find(&probe).is_header(), not_above == below);
        }

        #[test]
        fn backward_walk_mirrors_forward_walk(keys in prop::collection::vec(any::<i32>(), 0..200)) {
            let mut tree = tree();
            for key in keys {
                tree.insert_equal(key).unwrap();
            }
            let forward = in_order(&tree);

            let mut backward = Vec::new();
            let mut position = tree.decrement(Link::Header);
            while let Link::Node(handle) = position {
                backward.push(*tree.entry(handle));
                position = tree.decrement(position);
            }
            backward.reverse();
            prop_assert_eq!(backward, forward);
        }
    }
}
