use thiserror::Error;

/// The node store could not provide a slot for a new node.
///
/// Returned by the fallible insertion and cloning methods of [`RbTree`](crate::RbTree).
/// When it is returned the tree is exactly as it was before the call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Error)]
pub enum AllocError {
    /// The tree already holds as many nodes as its configured limit allows.
    ///
    /// See [`RbTree::set_node_limit`](crate::RbTree::set_node_limit).
    #[error("node limit of {limit} reached")]
    NodeLimit {
        /// The limit in force when the allocation was attempted.
        limit: usize,
    },
    /// The backing storage could not grow.
    #[error("out of memory while growing the node store")]
    OutOfMemory,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn display_names_the_limit() {
        assert_eq!(AllocError::NodeLimit { limit: 3 }.to_string(), "node limit of 3 reached");
        assert_eq!(AllocError::OutOfMemory.to_string(), "out of memory while growing the node store");
    }
}
