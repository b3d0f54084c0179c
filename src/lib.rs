//! `rb_key_tree` is an ordered key container based on a red-black tree.
//!
//! It implements the insertion and deletion of a red-black tree as described in CLRS,
//! so every modification takes at most O(logN) time. Duplicate keys are kept, and
//! equal keys are placed to the right of the keys already present.
//!
//! Nodes live in a vector and refer to each other by index. Slot 0 holds the black
//! sentinel that stands in for every missing child and for the root's parent, so the
//! rotation and fix-up code never has to check for absent links. Erased slots are
//! recycled, which keeps a [`NodeIndex`] returned by [`RbTree::insert`] or
//! [`RbTree::find`] valid until its node is erased.
//!
//! # Example
//!
//! ```rust
//! use rb_key_tree::RbTree;
//!
//! let mut tree = RbTree::new();
//! for key in [50, 30, 70, 20, 40, 60, 80] {
//!     tree.insert(key).unwrap();
//! }
//! let node = tree.find(&70).unwrap();
//! tree.erase(node).unwrap();
//! assert_eq!(tree.to_vec(), vec![20, 30, 40, 50, 60, 80]);
//! ```
//!

mod error;
mod index;
mod node;
mod rbtree;


pub use error::TreeError;
pub use index::{DefaultIx, IndexType, NodeIndex};
pub use rbtree::RbTree;
