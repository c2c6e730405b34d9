//! Red-black tree engine for ordered associative containers.
//!
//! This crate provides [`RbTree`], the balanced binary search tree that ordered
//! map, set, multimap and multiset wrappers are built on. Entries are ordered by a
//! key derived from each entry ([`KeyOf`](compare::KeyOf)) under a strict weak order
//! ([`Compare`](compare::Compare)), both fixed at construction time.
//!
//! - [`insert_unique`](RbTree::insert_unique) - Insert unless an equivalent key exists
//! - [`insert_equal`](RbTree::insert_equal) - Insert after any equivalent keys
//! - [`lower_bound`](RbTree::lower_bound) / [`upper_bound`](RbTree::upper_bound) - Equal-range boundaries
//! - [`Position`] - A copyable node reference that survives unrelated inserts and erases
//!
//! # Example
//!
//! ```
//! use ordtree::RbTree;
//!
//! let mut tree = RbTree::new();
//! for key in [10, 7, 8, 15, 5] {
//!     tree.insert_unique(key);
//! }
//! tree.insert_equal(7);
//!
//! assert_eq!(tree.count(&7), 2);
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [5, 7, 7, 8, 10, 15]);
//!
//! // Positions behave like iterators into the tree.
//! let eight = tree.find(&8);
//! assert_eq!(tree.get_at(tree.next(eight)), Some(&10));
//! assert_eq!(tree.erase_key(&7), 2);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **No `unsafe`** - Nodes live in an index-based store; positions are handles, not pointers
//! - **O(log n) mutation** - Red-black rebalancing after every insert and erase
//! - **O(1) ends** - A header sentinel caches the minimum and maximum nodes
//! - **Fallible allocation** - `try_insert_*` and [`try_clone`](RbTree::try_clone) report
//!   [`AllocError`] and leave the tree untouched
//!
//! # Implementation
//!
//! Every node records its color and its parent, left and right links. A header
//! sentinel, stored inline in the tree, holds the root in its parent slot and the
//! minimum and maximum in its child slots, and serves as the past-the-end position.
//! In-order stepping follows parent links, so iteration needs no auxiliary stack.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod error;
mod raw;

pub mod compare;
pub mod rb_tree;

pub use error::AllocError;
pub use rb_tree::{Position, RbTree};
