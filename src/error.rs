/// Errors reported by [`RbTree`](crate::RbTree) operations.
///
/// A lookup miss is not an error; [`RbTree::find`](crate::RbTree::find) returns `None`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TreeError {
    /// The node arena could not grow, either because the allocator refused
    /// or because the index type has no free values left.
    #[error("out of memory while allocating a tree node")]
    OutOfMemory,
    /// `min`/`max` on a tree without nodes.
    #[error("tree is empty")]
    Empty,
    /// The handle does not name a live node of this tree.
    #[error("node {0} does not belong to this tree")]
    InvalidNode(usize),
    /// The export buffer cannot hold every key.
    #[error("buffer holds {capacity} keys but the tree has {needed}")]
    CapacityExceeded { needed: usize, capacity: usize },
}
