use super::RbTree;
use crate::compare::{Identity, Less};
use crate::raw::RawRbTree;

impl<T> RbTree<T> {
    /// Creates an empty tree with room for at least `capacity` nodes.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let tree: RbTree<i32> = RbTree::with_capacity(32);
    /// assert!(tree.is_empty());
    /// assert!(tree.capacity() >= 32);
    /// ```
    ///
    /// # Complexity
    ///
    /// O(capacity) for memory allocation.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        RbTree {
            raw: RawRbTree::with_capacity(capacity, Identity, Less),
        }
    }
}

impl<T, X, C> RbTree<T, X, C> {
    /// Returns the number of nodes the tree can hold without reallocating.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Returns the most nodes the tree may hold at once.
    ///
    /// Defaults to [`max_len`](Self::max_len).
    #[must_use]
    pub const fn node_limit(&self) -> usize {
        self.raw.node_limit()
    }

    /// Caps the number of nodes the tree may hold at once.
    ///
    /// Once the cap is reached, `try_insert_*` return
    /// [`AllocError::NodeLimit`](crate::AllocError::NodeLimit) and the infallible
    /// inserts panic. Lowering the cap below [`len`](Self::len) removes nothing; it only
    /// blocks further inserts. A deep copy inherits the cap, so cloning a tree
    /// holding more than `limit` entries fails. Values above `max_len` are clamped.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::{AllocError, RbTree};
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert_unique(1);
    /// tree.set_node_limit(1);
    /// assert_eq!(tree.try_insert_equal(1), Err(AllocError::NodeLimit { limit: 1 }));
    ///
    /// tree.set_node_limit(2);
    /// assert!(tree.try_insert_equal(1).is_ok());
    /// ```
    pub fn set_node_limit(&mut self, limit: usize) {
        self.raw.set_node_limit(limit);
    }

    /// Builder form of [`set_node_limit`](Self::set_node_limit).
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::RbTree;
    ///
    /// let tree: RbTree<u8> = RbTree::new().with_node_limit(16);
    /// assert_eq!(tree.node_limit(), 16);
    /// ```
    #[must_use]
    pub fn with_node_limit(mut self, limit: usize) -> Self {
        self.set_node_limit(limit);
        self
    }
}
