use core::fmt;
use core::iter::FusedIterator;

use crate::compare::{Compare, Identity, KeyOf, Less};
use crate::error::AllocError;
use crate::raw::{Handle, Link, RawRbTree};

mod capacity;

/// An ordered container based on a [red-black tree].
///
/// Entries are kept sorted by the key a [`KeyOf`] extractor derives from each one,
/// under the strict weak order of a [`Compare`]. Both are fixed when the tree is
/// built. The defaults, [`Identity`] and [`Less`], make the tree a sorted collection
/// of `Ord` values; [`First`](crate::compare::First) turns it into a map of pairs.
///
/// The tree can hold keys uniquely ([`insert_unique`](Self::insert_unique)) or with
/// equivalent keys side by side ([`insert_equal`](Self::insert_equal)), so it can
/// back set, map, multiset and multimap wrappers alike.
///
/// Positions ([`Position`]) work like iterators: they are cheap copies that name a
/// node (or the past-the-end slot) and stay valid across inserts and across erasure
/// of *other* nodes.
///
/// It is a logic error for an entry's key to be modified in such a way that its
/// ordering relative to any other key changes while it is in the tree, or for the
/// comparator to be inconsistent. The behavior resulting from such a logic error is
/// not specified, but will be encapsulated to the `RbTree` that observed it and not
/// result in undefined behavior.
///
/// [red-black tree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
///
/// # Examples
///
/// ```
/// use ordtree::RbTree;
/// use ordtree::compare::{First, Less};
///
/// let mut scores = RbTree::with_key_and_compare(First, Less);
/// scores.insert_equal(("ada", 3));
/// scores.insert_equal(("bob", 1));
/// scores.insert_equal(("ada", 5));
///
/// assert_eq!(scores.count(&"ada"), 2);
/// let (first, last) = scores.equal_range(&"ada");
/// assert_eq!(scores.get_at(first), Some(&("ada", 3)));
/// assert_eq!(scores.get_at(scores.next(first)), Some(&("ada", 5)));
/// assert_eq!(scores.get_at(last), Some(&("bob", 1)));
/// ```
pub struct RbTree<T, X = Identity, C = Less> {
    raw: RawRbTree<T, X, C>,
}

/// A position in an [`RbTree`]: a node, or the past-the-end slot.
///
/// Positions are plain handles. They do not borrow the tree, stay valid across
/// inserts and across erasure of other nodes, and are only meaningful for the tree
/// that produced them. Using a position after its node was erased is a logic error.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Position(Link);

impl Position {
    /// Returns `true` if this is the past-the-end position.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// assert!(tree.find(&1).is_end());
    /// tree.insert_unique(1);
    /// assert!(!tree.find(&1).is_end());
    /// ```
    #[must_use]
    pub const fn is_end(self) -> bool {
        self.0.is_header()
    }
}

impl Position {
    const fn node(handle: Handle) -> Self {
        Position(Link::Node(handle))
    }
}

/// An iterator over the entries of an [`RbTree`], in order.
///
/// This `struct` is created by the [`iter`] method on [`RbTree`].
///
/// [`iter`]: RbTree::iter
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T, X = Identity, C = Less> {
    tree: &'a RawRbTree<T, X, C>,
    front: Link,
    back: Link,
    remaining: usize,
}

/// An owning iterator over the entries of an [`RbTree`], in order.
///
/// This `struct` is created by the [`into_iter`] method on [`RbTree`]
/// (provided by the [`IntoIterator`] trait).
///
/// [`into_iter`]: IntoIterator::into_iter
pub struct IntoIter<T> {
    inner: alloc::vec::IntoIter<T>,
}

impl<T> RbTree<T> {
    /// Makes a new, empty `RbTree` ordered by `Ord`.
    ///
    /// Does not allocate anything on its own.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    ///
    /// // entries can now be inserted into the empty tree
    /// tree.insert_unique(1);
    /// ```
    #[must_use]
    pub const fn new() -> RbTree<T> {
        RbTree {
            raw: RawRbTree::new(Identity, Less),
        }
    }
}

impl<T, X, C> RbTree<T, X, C> {
    /// Makes a new, empty `RbTree` with a custom key extractor and comparator.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    /// use ordtree::compare::Identity;
    ///
    /// let mut tree = RbTree::with_key_and_compare(Identity, |a: &i32, b: &i32| a > b);
    /// tree.insert_unique(1);
    /// tree.insert_unique(3);
    /// tree.insert_unique(2);
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [3, 2, 1]);
    /// ```
    #[must_use]
    pub const fn with_key_and_compare(key_of: X, compare: C) -> Self {
        RbTree {
            raw: RawRbTree::new(key_of, compare),
        }
    }

    /// Returns the number of entries in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut a = RbTree::new();
    /// assert_eq!(a.len(), 0);
    /// a.insert_equal(1);
    /// a.insert_equal(1);
    /// assert_eq!(a.len(), 2);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no entries.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Returns the largest number of entries any tree can hold.
    ///
    /// This is the number of distinct node handles, independent of available memory.
    #[must_use]
    #[allow(clippy::unused_self)]
    pub const fn max_len(&self) -> usize {
        Handle::MAX
    }

    /// Returns the key extractor the tree was built with.
    #[must_use]
    pub const fn key_of(&self) -> &X {
        self.raw.key_of()
    }

    /// Returns the comparator the tree was built with.
    #[must_use]
    pub const fn key_comp(&self) -> &C {
        self.raw.compare()
    }

    /// Clears the tree, removing all entries.
    ///
    /// Every outstanding [`Position`] other than [`end`](Self::end) is invalidated.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut a = RbTree::new();
    /// a.insert_unique(1);
    /// a.clear();
    /// assert!(a.is_empty());
    /// assert_eq!(a.begin(), a.end());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Exchanges the contents of two trees, including their extractors, comparators
    /// and node limits.
    ///
    /// Positions keep naming the same entries, which now live in the other tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut a = RbTree::new();
    /// let mut b = RbTree::new();
    /// a.insert_unique(1);
    /// let one = a.find(&1);
    ///
    /// a.swap(&mut b);
    /// assert!(a.is_empty());
    /// assert_eq!(b.get_at(one), Some(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    pub fn swap(&mut self, other: &mut Self) {
        log::debug!("swapping trees of {} and {} entries", self.len(), other.len());
        core::mem::swap(&mut self.raw, &mut other.raw);
    }

    // ─── Positions ───────────────────────────────────────────────────────────

    /// Returns the position of the first entry, or [`end`](Self::end) if the tree
    /// is empty.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn begin(&self) -> Position {
        Position(self.raw.begin())
    }

    /// Returns the past-the-end position.
    ///
    /// Stepping back from it with [`prev`](Self::prev) reaches the last entry.
    #[must_use]
    pub const fn end(&self) -> Position {
        Position(Link::Header)
    }

    /// Returns the position after `position`.
    ///
    /// The last entry steps to [`end`](Self::end), and `end` steps to itself.
    ///
    /// # Panics
    ///
    /// May panic if `position` names an erased node.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(2);
    /// tree.insert_unique(1);
    ///
    /// let first = tree.begin();
    /// assert_eq!(tree.get_at(tree.next(first)), Some(&2));
    /// assert_eq!(tree.next(tree.next(first)), tree.end());
    /// ```
    ///
    /// # Complexity
    ///
    /// Amortized O(1), O(log n) worst case.
    #[must_use]
    pub fn next(&self, position: Position) -> Position {
        Position(self.raw.increment(position.0))
    }

    /// Returns the position before `position`.
    ///
    /// [`end`](Self::end) steps back to the last entry. Stepping back from the first
    /// entry yields `end`.
    ///
    /// # Panics
    ///
    /// May panic if `position` names an erased node.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(2);
    /// tree.insert_unique(1);
    ///
    /// assert_eq!(tree.get_at(tree.prev(tree.end())), Some(&2));
    /// assert_eq!(tree.prev(tree.begin()), tree.end());
    /// ```
    #[must_use]
    pub fn prev(&self, position: Position) -> Position {
        Position(self.raw.decrement(position.0))
    }

    /// Returns the entry at `position`, or `None` for [`end`](Self::end) or a
    /// position whose node is gone.
    #[must_use]
    pub fn get_at(&self, position: Position) -> Option<&T> {
        match position.0 {
            Link::Node(handle) if self.raw.is_live(position.0) => Some(self.raw.entry(handle)),
            _ => None,
        }
    }

    /// Returns a mutable reference to the entry at `position`.
    ///
    /// Changing the part of the entry its key is derived from is a logic error.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    /// use ordtree::compare::{First, Less};
    ///
    /// let mut map = RbTree::with_key_and_compare(First, Less);
    /// let (at, _) = map.insert_unique(("a", 1));
    /// if let Some(entry) = map.get_at_mut(at) {
    ///     entry.1 += 10;
    /// }
    /// assert_eq!(map.get(&"a"), Some(&("a", 11)));
    /// ```
    #[must_use]
    pub fn get_at_mut(&mut self, position: Position) -> Option<&mut T> {
        match position.0 {
            Link::Node(handle) if self.raw.is_live(position.0) => Some(self.raw.entry_mut(handle)),
            _ => None,
        }
    }

    /// Returns the first entry in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// assert_eq!(tree.first(), None);
    /// tree.insert_unique(2);
    /// tree.insert_unique(1);
    /// assert_eq!(tree.first(), Some(&1));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.raw.begin().handle().map(|handle| self.raw.entry(handle))
    }

    /// Returns the last entry in order.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.raw.back().handle().map(|handle| self.raw.entry(handle))
    }

    /// Gets an iterator over the entries of the tree, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_equal(3);
    /// tree.insert_equal(1);
    /// tree.insert_equal(3);
    ///
    /// let mut iter = tree.iter();
    /// assert_eq!(iter.next(), Some(&1));
    /// assert_eq!(iter.next_back(), Some(&3));
    /// assert_eq!(iter.len(), 1);
    /// ```
    pub fn iter(&self) -> Iter<'_, T, X, C> {
        Iter {
            tree: &self.raw,
            front: self.raw.begin(),
            back: self.raw.back(),
            remaining: self.raw.len(),
        }
    }

    /// Gets an iterator over the entries in `[first, last)`.
    ///
    /// `last` must be reachable from `first` by [`next`](Self::next).
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in [1, 3, 3, 5, 7] {
    ///     tree.insert_equal(key);
    /// }
    /// let (first, last) = tree.equal_range(&3);
    /// assert_eq!(tree.range(first, last).count(), 2);
    ///
    /// let tail: Vec<_> = tree.range(tree.upper_bound(&3), tree.end()).rev().collect();
    /// assert_eq!(tail, [&7, &5]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(k) to set up for `k` entries in the range.
    pub fn range(&self, first: Position, last: Position) -> Iter<'_, T, X, C> {
        Iter {
            tree: &self.raw,
            front: first.0,
            back: self.raw.decrement(last.0),
            remaining: self.raw.distance(first.0, last.0),
        }
    }

    // ─── Erasure ─────────────────────────────────────────────────────────────

    /// Removes the entry at `position` and returns it.
    ///
    /// Positions of all other entries stay valid.
    ///
    /// # Panics
    ///
    /// Panics if `position` is [`end`](Self::end) or names an erased node.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(1);
    /// let (two, _) = tree.insert_unique(2);
    ///
    /// assert_eq!(tree.erase(tree.begin()), 1);
    /// assert_eq!(tree.get_at(two), Some(&2));
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn erase(&mut self, position: Position) -> T {
        let Link::Node(handle) = position.0 else {
            panic!("`RbTree::erase()` - `position` is `end()`!");
        };
        self.raw.erase(handle)
    }

    /// Removes every entry in `[first, last)` and returns how many were removed.
    ///
    /// `last` must be reachable from `first` by [`next`](Self::next).
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in 0..10 {
    ///     tree.insert_unique(key);
    /// }
    /// let removed = tree.erase_range(tree.lower_bound(&3), tree.lower_bound(&7));
    /// assert_eq!(removed, 4);
    /// assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [0, 1, 2, 7, 8, 9]);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(k log n) for `k` removed entries, O(n) when the range is the whole tree.
    pub fn erase_range(&mut self, first: Position, last: Position) -> usize {
        self.raw.erase_range(first.0, last.0)
    }
}

impl<T, X, C> RbTree<T, X, C>
where
    X: KeyOf<T>,
    C: Compare<X::Key>,
{
    // ─── Insertion ───────────────────────────────────────────────────────────

    /// Inserts `entry` unless an entry with an equivalent key is present.
    ///
    /// Returns the position of the new entry and `true`, or the position of the
    /// existing entry and `false`. In the second case `entry` is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if no node could be allocated. The tree is unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::{AllocError, RbTree};
    ///
    /// let mut tree = RbTree::new().with_node_limit(1);
    /// assert!(tree.try_insert_unique(1)?.1);
    /// assert!(!tree.try_insert_unique(1)?.1);
    /// assert_eq!(tree.try_insert_unique(2), Err(AllocError::NodeLimit { limit: 1 }));
    /// # Ok::<(), AllocError>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn try_insert_unique(&mut self, entry: T) -> Result<(Position, bool), AllocError> {
        let (handle, inserted) = self.raw.insert_unique(entry)?;
        Ok((Position::node(handle), inserted))
    }

    /// Inserts `entry` unless an entry with an equivalent key is present.
    ///
    /// See [`try_insert_unique`](Self::try_insert_unique).
    ///
    /// # Panics
    ///
    /// Panics if no node could be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// let (at, inserted) = tree.insert_unique(37);
    /// assert!(inserted);
    ///
    /// let (again, inserted) = tree.insert_unique(37);
    /// assert!(!inserted);
    /// assert_eq!(at, again);
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn insert_unique(&mut self, entry: T) -> (Position, bool) {
        self.try_insert_unique(entry)
            .unwrap_or_else(|err| panic!("`RbTree::insert_unique()` - {err}!"))
    }

    /// Inserts `entry` after every entry with an equivalent key.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if no node could be allocated. The tree is unchanged.
    ///
    /// # Complexity
    ///
    /// O(log n)
    pub fn try_insert_equal(&mut self, entry: T) -> Result<Position, AllocError> {
        self.raw.insert_equal(entry).map(Position::node)
    }

    /// Inserts `entry` after every entry with an equivalent key.
    ///
    /// # Panics
    ///
    /// Panics if no node could be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    /// use ordtree::compare::{First, Less};
    ///
    /// let mut tree = RbTree::with_key_and_compare(First, Less);
    /// tree.insert_equal((1, 'a'));
    /// tree.insert_equal((0, 'b'));
    /// tree.insert_equal((1, 'c'));
    ///
    /// let values: String = tree.iter().map(|&(_, v)| v).collect();
    /// assert_eq!(values, "bac");
    /// ```
    pub fn insert_equal(&mut self, entry: T) -> Position {
        self.try_insert_equal(entry)
            .unwrap_or_else(|err| panic!("`RbTree::insert_equal()` - {err}!"))
    }

    // ─── Queries ─────────────────────────────────────────────────────────────

    /// Returns the position of the first entry whose key is equivalent to `key`, or
    /// [`end`](Self::end).
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn find(&self, key: &X::Key) -> Position {
        Position(self.raw.find(key))
    }

    /// Returns the entry whose key is equivalent to `key`, the first one if there are
    /// several.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    /// use ordtree::compare::{First, Less};
    ///
    /// let mut map = RbTree::with_key_and_compare(First, Less);
    /// map.insert_unique((1, "a"));
    /// assert_eq!(map.get(&1), Some(&(1, "a")));
    /// assert_eq!(map.get(&2), None);
    /// ```
    #[must_use]
    pub fn get(&self, key: &X::Key) -> Option<&T> {
        self.raw.find(key).handle().map(|handle| self.raw.entry(handle))
    }

    /// Returns `true` if the tree holds an entry whose key is equivalent to `key`.
    #[must_use]
    pub fn contains(&self, key: &X::Key) -> bool {
        !self.raw.find(key).is_header()
    }

    /// Returns the position of the first entry whose key is not less than `key`, or
    /// [`end`](Self::end).
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in [10, 20, 30] {
    ///     tree.insert_unique(key);
    /// }
    /// assert_eq!(tree.get_at(tree.lower_bound(&20)), Some(&20));
    /// assert_eq!(tree.get_at(tree.lower_bound(&21)), Some(&30));
    /// assert!(tree.lower_bound(&31).is_end());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn lower_bound(&self, key: &X::Key) -> Position {
        Position(self.raw.lower_bound(key))
    }

    /// Returns the position of the first entry whose key is greater than `key`, or
    /// [`end`](Self::end).
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for key in [10, 20, 30] {
    ///     tree.insert_unique(key);
    /// }
    /// assert_eq!(tree.get_at(tree.upper_bound(&20)), Some(&30));
    /// assert!(tree.upper_bound(&30).is_end());
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n)
    #[must_use]
    pub fn upper_bound(&self, key: &X::Key) -> Position {
        Position(self.raw.upper_bound(key))
    }

    /// Returns `(lower_bound(key), upper_bound(key))`, the run of entries whose keys
    /// are equivalent to `key`.
    #[must_use]
    pub fn equal_range(&self, key: &X::Key) -> (Position, Position) {
        (self.lower_bound(key), self.upper_bound(key))
    }

    /// Returns the number of entries whose key is equivalent to `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(4);
    /// tree.insert_equal(4);
    /// tree.insert_equal(4);
    /// assert_eq!(tree.count(&4), 3);
    /// assert_eq!(tree.count(&5), 0);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(log n + k) for a run of `k` entries.
    #[must_use]
    pub fn count(&self, key: &X::Key) -> usize {
        self.raw.count(key)
    }

    /// Removes every entry whose key is equivalent to `key` and returns how many were
    /// removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_equal(4);
    /// tree.insert_equal(4);
    /// tree.insert_equal(5);
    /// assert_eq!(tree.erase_key(&4), 2);
    /// assert_eq!(tree.erase_key(&4), 0);
    /// assert!(tree.find(&4).is_end());
    /// ```
    ///
    /// # Complexity
    ///
    /// O((k + 1) log n) for a run of `k` entries.
    pub fn erase_key(&mut self, key: &X::Key) -> usize {
        self.raw.erase_key(key)
    }
}

impl<T: Clone, X: Clone, C: Clone> RbTree<T, X, C> {
    /// Makes an independent deep copy of the tree, with the same shape and colors.
    ///
    /// The copy has the same key extractor, comparator and node limit.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError`] if the copy could not be fully allocated. Since the copy
    /// inherits the node limit, this includes a limit lowered below
    /// [`len`](Self::len). Nothing is leaked and `self` is unaffected.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(1);
    ///
    /// let mut copy = tree.try_clone()?;
    /// copy.insert_unique(2);
    /// assert_eq!(tree.len(), 1);
    /// assert_eq!(copy.len(), 2);
    /// # Ok::<(), ordtree::AllocError>(())
    /// ```
    ///
    /// # Complexity
    ///
    /// O(n)
    pub fn try_clone(&self) -> Result<Self, AllocError> {
        Ok(RbTree {
            raw: self.raw.try_clone()?,
        })
    }
}

impl<T: Clone, X: Clone, C: Clone> Clone for RbTree<T, X, C> {
    /// # Panics
    ///
    /// Panics if the copy cannot be allocated, including when the node limit was
    /// lowered below [`len`](RbTree::len). Use [`try_clone`](RbTree::try_clone) to
    /// handle that case.
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|err| panic!("`RbTree::clone()` - {err}!"))
    }

    /// Replaces the contents of `self` with a deep copy of `source`.
    ///
    /// `self` is only modified once the copy has succeeded.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`clone`](Clone::clone), leaving `self`
    /// as it was.
    fn clone_from(&mut self, source: &Self) {
        let copy = source.try_clone().unwrap_or_else(|err| panic!("`RbTree::clone_from()` - {err}!"));
        self.raw = copy.raw;
    }
}

impl<T: fmt::Debug, X, C> fmt::Debug for RbTree<T, X, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T, X: Default, C: Default> Default for RbTree<T, X, C> {
    /// Creates an empty `RbTree` with the default extractor and comparator.
    fn default() -> RbTree<T, X, C> {
        RbTree::with_key_and_compare(X::default(), C::default())
    }
}

impl<T: PartialEq, X, C> PartialEq for RbTree<T, X, C> {
    fn eq(&self, other: &RbTree<T, X, C>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, X, C> Eq for RbTree<T, X, C> {}

impl<'a, T, X, C> IntoIterator for &'a RbTree<T, X, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, X, C>;

    fn into_iter(self) -> Iter<'a, T, X, C> {
        self.iter()
    }
}

impl<T, X, C> IntoIterator for RbTree<T, X, C> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    /// Gets an owning iterator over the entries of the tree, in order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(3);
    /// tree.insert_unique(1);
    ///
    /// let entries: Vec<i32> = tree.into_iter().collect();
    /// assert_eq!(entries, [1, 3]);
    /// ```
    fn into_iter(mut self) -> IntoIter<T> {
        IntoIter {
            inner: self.raw.drain_to_vec().into_iter(),
        }
    }
}

impl<'a, T, X, C> Iterator for Iter<'a, T, X, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front.handle()?;
        self.front = self.tree.increment(self.front);
        self.remaining -= 1;
        Some(self.tree.entry(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn last(mut self) -> Option<&'a T> {
        self.next_back()
    }
}

impl<'a, T, X, C> DoubleEndedIterator for Iter<'a, T, X, C> {
    fn next_back(&mut self) -> Option<&'a T> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back.handle()?;
        self.back = self.tree.decrement(self.back);
        self.remaining -= 1;
        Some(self.tree.entry(handle))
    }
}

impl<T, X, C> ExactSizeIterator for Iter<'_, T, X, C> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T, X, C> FusedIterator for Iter<'_, T, X, C> {}

impl<T, X, C> Clone for Iter<'_, T, X, C> {
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

impl<T: fmt::Debug, X, C> fmt::Debug for Iter<'_, T, X, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> DoubleEndedIterator for IntoIter<T> {
    fn next_back(&mut self) -> Option<T> {
        self.inner.next_back()
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {
    fn len(&self) -> usize {
        self.inner.len()
    }
}

impl<T> FusedIterator for IntoIter<T> {}

impl<T: fmt::Debug> fmt::Debug for IntoIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntoIter").field("len", &self.inner.len()).finish()
    }
}

impl<T> Default for IntoIter<T> {
    /// Creates an empty `rb_tree::IntoIter`.
    ///
    /// ```
    /// # use ordtree::rb_tree;
    /// let iter: rb_tree::IntoIter<u8> = Default::default();
    /// assert_eq!(iter.len(), 0);
    /// ```
    fn default() -> Self {
        IntoIter {
            inner: alloc::vec::Vec::new().into_iter(),
        }
    }
}
