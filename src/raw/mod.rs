mod arena;
mod handle;
mod node;
mod rb_tree;

pub(crate) use handle::{Handle, Link};
pub(crate) use rb_tree::RawRbTree;
