use log::{debug, trace, warn};

use crate::error::TreeError;
use crate::index::{DefaultIx, IndexType, NodeIndex};
use crate::node::{Color, Direction, Node};

/// An ordered set of keys backed by a red-black tree, duplicates allowed.
#[derive(Debug, Clone)]
pub struct RbTree<K, Ix = DefaultIx> {
    /// Vector that stores nodes, slot 0 is the sentinel
    pub(crate) nodes: Vec<Node<K, Ix>>,
    /// Root of the tree
    pub(crate) root: NodeIndex<Ix>,
    /// Released slots waiting for reuse
    pub(crate) free: Vec<NodeIndex<Ix>>,
    /// Number of keys in the tree
    pub(crate) len: usize,
}

impl<K, Ix> RbTree<K, Ix>
where
    K: Ord,
    Ix: IndexType,
{
    /// Creates a new `RbTree` with estimated capacity.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut nodes = vec![Self::new_sentinel()];
        nodes.reserve(capacity);
        RbTree {
            nodes,
            root: Self::sentinel(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Creates a new `RbTree`, reporting allocation failure instead of aborting.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::OutOfMemory`] when the node arena cannot be reserved.
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::RbTree;
    ///
    /// let tree = RbTree::<i64>::try_with_capacity(16).unwrap();
    /// assert!(tree.is_empty());
    /// ```
    #[inline]
    pub fn try_with_capacity(capacity: usize) -> Result<Self, TreeError> {
        let mut nodes = Vec::new();
        nodes.try_reserve(capacity.saturating_add(1)).map_err(|e| {
            warn!("failed to reserve {capacity} tree nodes: {e}");
            TreeError::OutOfMemory
        })?;
        nodes.push(Self::new_sentinel());
        Ok(RbTree {
            nodes,
            root: Self::sentinel(),
            free: Vec::new(),
            len: 0,
        })
    }

    /// Insert a key into the tree and return the handle of its node.
    ///
    /// Keys equal to an existing key are kept and placed to its right.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::OutOfMemory`] when no node can be allocated. The tree is unchanged.
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// let node = tree.insert(7).unwrap();
    /// tree.insert(7).unwrap();
    /// assert_eq!(tree.key(node), Some(&7));
    /// assert_eq!(tree.len(), 2);
    /// ```
    #[inline]
    pub fn insert(&mut self, key: K) -> Result<NodeIndex<Ix>, TreeError> {
        let node_idx = self.alloc_node(key)?;
        self.insert_inner(node_idx);
        trace!("inserted {node_idx:?}");
        Ok(node_idx)
    }

    /// Find a node holding the given key.
    ///
    /// With duplicates, the first match met while descending from the root is returned.
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(3).unwrap();
    /// let node = tree.find(&3).unwrap();
    /// assert_eq!(tree.key(node), Some(&3));
    /// assert_eq!(tree.find(&4), None);
    /// ```
    #[inline]
    pub fn find(&self, key: &K) -> Option<NodeIndex<Ix>> {
        let mut x = self.root;
        while x != Self::sentinel() {
            let xk = self.node_ref(x, Node::key);
            if key == xk {
                return Some(x);
            }
            if key < xk {
                x = self.node_ref(x, Node::left);
            } else {
                x = self.node_ref(x, Node::right);
            }
        }
        None
    }

    /// Return `true` if the tree holds at least one copy of the key.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Return the node with the smallest key.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Empty`] when the tree has no nodes.
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::{RbTree, TreeError};
    ///
    /// let mut tree = RbTree::new();
    /// assert_eq!(tree.min(), Err(TreeError::Empty));
    /// tree.insert(5).unwrap();
    /// tree.insert(2).unwrap();
    /// let min = tree.min().unwrap();
    /// assert_eq!(tree.key(min), Some(&2));
    /// ```
    #[inline]
    pub fn min(&self) -> Result<NodeIndex<Ix>, TreeError> {
        if self.is_empty() {
            return Err(TreeError::Empty);
        }
        Ok(self.extreme(self.root, Direction::Left))
    }

    /// Return the node with the largest key.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Empty`] when the tree has no nodes.
    #[inline]
    pub fn max(&self) -> Result<NodeIndex<Ix>, TreeError> {
        if self.is_empty() {
            return Err(TreeError::Empty);
        }
        Ok(self.extreme(self.root, Direction::Right))
    }

    /// Erase a node previously returned by this tree and return its key.
    ///
    /// The slot of the erased node may be reused by a later insert, after which
    /// the old handle names the new node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvalidNode`] when the handle is the sentinel, out of
    /// range, or already erased. The tree is unchanged.
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for k in [50, 30, 70] {
    ///     tree.insert(k).unwrap();
    /// }
    /// let node = tree.find(&70).unwrap();
    /// assert_eq!(tree.erase(node), Ok(70));
    /// assert!(tree.erase(node).is_err());
    /// assert_eq!(tree.to_vec(), vec![30, 50]);
    /// ```
    #[inline]
    pub fn erase(&mut self, node: NodeIndex<Ix>) -> Result<K, TreeError> {
        if !self.is_live(node) {
            warn!("refusing to erase {node:?}: not a live node");
            return Err(TreeError::InvalidNode(node.index()));
        }
        let key = self.erase_inner(node);
        trace!("erased {node:?}");
        Ok(key)
    }

    /// Remove one copy of the key, returning it if it was present.
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// tree.insert(1).unwrap();
    /// assert_eq!(tree.remove(&1), Some(1));
    /// assert_eq!(tree.remove(&1), None);
    /// ```
    #[inline]
    pub fn remove(&mut self, key: &K) -> Option<K> {
        let node_idx = self.find(key)?;
        Some(self.erase_inner(node_idx))
    }

    /// Return the key stored behind a handle, or `None` if it names no live node.
    #[inline]
    pub fn key(&self, node: NodeIndex<Ix>) -> Option<&K> {
        self.nodes
            .get(node.index())
            .and_then(|n| n.key.as_ref())
    }

    /// Copy the keys in ascending order into `buf`, returning how many were written.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::CapacityExceeded`] without writing anything when
    /// `buf` is shorter than [`len`](Self::len).
    ///
    /// # Example
    /// ```rust
    /// use rb_key_tree::RbTree;
    ///
    /// let mut tree = RbTree::new();
    /// for k in [50, 30, 70, 20, 40, 60, 80] {
    ///     tree.insert(k).unwrap();
    /// }
    /// let mut buf = [0; 8];
    /// assert_eq!(tree.to_array(&mut buf), Ok(7));
    /// assert_eq!(&buf[..7], &[20, 30, 40, 50, 60, 70, 80]);
    /// ```
    #[inline]
    pub fn to_array(&self, buf: &mut [K]) -> Result<usize, TreeError>
    where
        K: Clone,
    {
        if buf.len() < self.len {
            warn!(
                "export buffer of {} slots is too small for {} keys",
                buf.len(),
                self.len
            );
            return Err(TreeError::CapacityExceeded {
                needed: self.len,
                capacity: buf.len(),
            });
        }
        let mut slots = buf.iter_mut();
        let mut written = 0;
        self.for_each_in_order(|key| {
            if let Some(slot) = slots.next() {
                slot.clone_from(key);
                written += 1;
            }
        });
        Ok(written)
    }

    /// Collect the keys in ascending order.
    #[inline]
    #[must_use]
    pub fn to_vec(&self) -> Vec<K>
    where
        K: Clone,
    {
        let mut keys = Vec::with_capacity(self.len);
        self.for_each_in_order(|key| keys.push(key.clone()));
        keys
    }

    /// Remove all keys from the tree.
    ///
    /// Nodes are released children first.
    #[inline]
    pub fn clear(&mut self) {
        let released = self.release_all();
        debug!("cleared tree, released {released} nodes");
    }

    /// Tear the tree down, releasing every node children first and the sentinel last.
    #[inline]
    pub fn destroy(mut self) {
        let released = self.release_all();
        debug!("destroyed tree, released {released} nodes");
    }

    /// Return the number of keys in the tree.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Return `true` if the tree contains no keys.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> RbTree<K>
where
    K: Ord,
{
    /// Create an empty `RbTree`
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Self::new_sentinel()],
            root: Self::sentinel(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<K> Default for RbTree<K>
where
    K: Ord,
{
    #[inline]
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<K, Ix> RbTree<K, Ix>
where
    K: Ord,
    Ix: IndexType,
{
    /// Create a new sentinel node
    fn new_sentinel() -> Node<K, Ix> {
        Node {
            key: None,
            left: Self::sentinel(),
            right: Self::sentinel(),
            parent: Self::sentinel(),
            color: Color::Black,
        }
    }

    /// Create a new tree node
    fn new_node(key: K) -> Node<K, Ix> {
        Node {
            key: Some(key),
            left: Self::sentinel(),
            right: Self::sentinel(),
            parent: Self::sentinel(),
            color: Color::Red,
        }
    }

    /// Get the sentinel node index
    fn sentinel() -> NodeIndex<Ix> {
        NodeIndex::new(0)
    }

    /// Check that a handle names a live node of this tree.
    fn is_live(&self, node: NodeIndex<Ix>) -> bool {
        node != Self::sentinel()
            && self
                .nodes
                .get(node.index())
                .is_some_and(Node::is_live)
    }

    /// Place a key in a released slot or at the end of the arena.
    fn alloc_node(&mut self, key: K) -> Result<NodeIndex<Ix>, TreeError> {
        if let Some(node_idx) = self.free.pop() {
            self.nodes[node_idx.index()] = Self::new_node(key);
            return Ok(node_idx);
        }
        let node_idx = NodeIndex::new(self.nodes.len());
        // check for max capacity, except if we use usize
        if <Ix as IndexType>::max().index() != !0 && NodeIndex::end() == node_idx {
            warn!("index space exhausted at {node_idx:?}");
            return Err(TreeError::OutOfMemory);
        }
        self.nodes.try_reserve(1).map_err(|e| {
            warn!("failed to allocate tree node: {e}");
            TreeError::OutOfMemory
        })?;
        self.nodes.push(Self::new_node(key));
        Ok(node_idx)
    }

    /// Return a detached slot to the free list and hand back its key.
    fn release(&mut self, node_idx: NodeIndex<Ix>) -> K {
        let node = &mut self.nodes[node_idx.index()];
        let key = node.key.take().expect("released node must be live");
        node.left = Self::sentinel();
        node.right = Self::sentinel();
        node.parent = Self::sentinel();
        node.color = Color::Black;
        self.free.push(node_idx);
        key
    }

    /// Release every node in post-order and reset the tree to only the sentinel.
    fn release_all(&mut self) -> usize {
        let mut released = 0;
        let mut stack = Vec::new();
        if self.root != Self::sentinel() {
            stack.push((self.root, false));
        }
        while let Some((x, children_done)) = stack.pop() {
            if children_done {
                let _ignore = self.node_mut(x, Node::take_key);
                released += 1;
                continue;
            }
            stack.push((x, true));
            for child in [self.node_ref(x, Node::right), self.node_ref(x, Node::left)] {
                if child != Self::sentinel() {
                    stack.push((child, false));
                }
            }
        }
        self.nodes.truncate(1);
        self.free.clear();
        self.root = Self::sentinel();
        self.len = 0;
        released
    }

    /// Link an allocated node into the tree.
    fn insert_inner(&mut self, z: NodeIndex<Ix>) {
        let mut y = Self::sentinel();
        let mut x = self.root;
        let mut side = Direction::Left;

        while x != Self::sentinel() {
            y = x;
            side = if self.node_ref(z, Node::key) < self.node_ref(x, Node::key) {
                Direction::Left
            } else {
                Direction::Right
            };
            x = self.node_ref(x, Node::child(side));
        }
        self.node_mut(z, Node::set_parent(y));
        if y == Self::sentinel() {
            self.root = z;
        } else {
            self.node_mut(y, Node::set_child(side, z));
        }

        self.insert_fixup(z);

        self.len = self.len.wrapping_add(1);
    }

    /// Unlink a live node from the tree and release its slot.
    fn erase_inner(&mut self, z: NodeIndex<Ix>) -> K {
        let mut removed_color = self.node_ref(z, Node::color);
        let z_left = self.node_ref(z, Node::left);
        let z_right = self.node_ref(z, Node::right);
        let x;
        let x_parent;
        if z_left == Self::sentinel() {
            x = z_right;
            x_parent = self.node_ref(z, Node::parent);
            self.transplant(z, x);
        } else if z_right == Self::sentinel() {
            x = z_left;
            x_parent = self.node_ref(z, Node::parent);
            self.transplant(z, x);
        } else {
            let y = self.successor(z);
            removed_color = self.node_ref(y, Node::color);
            x = self.node_ref(y, Node::right);
            if self.node_ref(y, Node::parent) == z {
                x_parent = y;
            } else {
                x_parent = self.node_ref(y, Node::parent);
                self.transplant(y, x);
                self.node_mut(y, Node::set_right(z_right));
                self.node_mut(z_right, Node::set_parent(y));
            }
            self.transplant(z, y);
            self.node_mut(y, Node::set_left(z_left));
            self.node_mut(z_left, Node::set_parent(y));
            self.node_mut(y, Node::set_color(self.node_ref(z, Node::color)));
        }

        let key = self.release(z);

        if matches!(removed_color, Color::Black) {
            self.erase_fixup(x, x_parent);
        }

        self.len = self.len.wrapping_sub(1);
        key
    }

    /// Restore red-black tree properties after an insert.
    fn insert_fixup(&mut self, mut z: NodeIndex<Ix>) {
        while self.parent_ref(z, Node::is_red) {
            let p = self.node_ref(z, Node::parent);
            let g = self.node_ref(p, Node::parent);
            let side = self.side_of(p);
            let uncle = self.node_ref(g, Node::child(side.opposite()));
            if self.node_ref(uncle, Node::is_red) {
                trace!("insert fixup at {z:?}: red uncle, recolor");
                self.node_mut(p, Node::set_color(Color::Black));
                self.node_mut(uncle, Node::set_color(Color::Black));
                self.node_mut(g, Node::set_color(Color::Red));
                z = g;
            } else {
                if self.side_of(z) != side {
                    trace!("insert fixup at {z:?}: inner child, rotate parent");
                    z = p;
                    self.rotate(side, z);
                }
                trace!("insert fixup at {z:?}: outer child, rotate grandparent");
                self.parent_mut(z, Node::set_color(Color::Black));
                self.grand_parent_mut(z, Node::set_color(Color::Red));
                self.rotate(side.opposite(), self.parent_ref(z, Node::parent));
            }
        }
        self.node_mut(self.root, Node::set_color(Color::Black));
    }

    /// Restore red-black tree properties after an erase.
    ///
    /// `x` carries an extra black. `x` may be the sentinel, so its parent is
    /// tracked here rather than read from the node.
    fn erase_fixup(&mut self, mut x: NodeIndex<Ix>, mut parent: NodeIndex<Ix>) {
        while x != self.root && self.node_ref(x, Node::is_black) {
            let side = if self.node_ref(parent, Node::left) == x {
                Direction::Left
            } else {
                Direction::Right
            };
            let far = side.opposite();
            let mut w = self.node_ref(parent, Node::child(far));
            if self.node_ref(w, Node::is_red) {
                trace!("erase fixup at {x:?}: red sibling, rotate parent");
                self.node_mut(w, Node::set_color(Color::Black));
                self.node_mut(parent, Node::set_color(Color::Red));
                self.rotate(side, parent);
                w = self.node_ref(parent, Node::child(far));
            }
            if self.left_ref(w, Node::is_black) && self.right_ref(w, Node::is_black) {
                trace!("erase fixup at {x:?}: black nephews, move up");
                self.node_mut(w, Node::set_color(Color::Red));
                x = parent;
                parent = self.node_ref(x, Node::parent);
            } else {
                if self.child_ref(w, far, Node::is_black) {
                    trace!("erase fixup at {x:?}: red near nephew, rotate sibling");
                    self.child_mut(w, side, Node::set_color(Color::Black));
                    self.node_mut(w, Node::set_color(Color::Red));
                    self.rotate(far, w);
                    w = self.node_ref(parent, Node::child(far));
                }
                trace!("erase fixup at {x:?}: red far nephew, rotate parent");
                self.node_mut(w, Node::set_color(self.node_ref(parent, Node::color)));
                self.node_mut(parent, Node::set_color(Color::Black));
                self.child_mut(w, far, Node::set_color(Color::Black));
                self.rotate(side, parent);
                x = self.root;
            }
        }
        if x != Self::sentinel() {
            self.node_mut(x, Node::set_color(Color::Black));
        }
    }

    /// Binary tree rotation around `x`.
    ///
    /// The child of `x` opposite to `dir` takes its place and `x` becomes that
    /// child's `dir` child.
    fn rotate(&mut self, dir: Direction, x: NodeIndex<Ix>) {
        let y = self.node_ref(x, Node::child(dir.opposite()));
        if y == Self::sentinel() {
            return;
        }
        let inner = self.node_ref(y, Node::child(dir));
        self.node_mut(x, Node::set_child(dir.opposite(), inner));
        if inner != Self::sentinel() {
            self.node_mut(inner, Node::set_parent(x));
        }

        self.replace_parent(x, y);
        self.node_mut(y, Node::set_child(dir, x));
    }

    /// Replace parent during a rotation.
    fn replace_parent(&mut self, x: NodeIndex<Ix>, y: NodeIndex<Ix>) {
        let p = self.node_ref(x, Node::parent);
        self.node_mut(y, Node::set_parent(p));
        if p == Self::sentinel() {
            self.root = y;
        } else {
            let side = self.side_of(x);
            self.node_mut(p, Node::set_child(side, y));
        }
        self.node_mut(x, Node::set_parent(y));
    }

    /// Replace one subtree as a child of its parent with another subtree.
    fn transplant(&mut self, u: NodeIndex<Ix>, v: NodeIndex<Ix>) {
        let p = self.node_ref(u, Node::parent);
        if p == Self::sentinel() {
            self.root = v;
        } else {
            let side = self.side_of(u);
            self.node_mut(p, Node::set_child(side, v));
        }
        if v != Self::sentinel() {
            self.node_mut(v, Node::set_parent(p));
        }
    }

    /// In-order successor of a node that has a right subtree.
    fn successor(&self, node: NodeIndex<Ix>) -> NodeIndex<Ix> {
        self.extreme(self.node_ref(node, Node::right), Direction::Left)
    }

    /// Follow `dir` children from `x` until the next one is the sentinel.
    fn extreme(&self, mut x: NodeIndex<Ix>, dir: Direction) -> NodeIndex<Ix> {
        while self.node_ref(x, Node::child(dir)) != Self::sentinel() {
            x = self.node_ref(x, Node::child(dir));
        }
        x
    }

    /// Which side of its parent a non-root node hangs from.
    fn side_of(&self, node: NodeIndex<Ix>) -> Direction {
        if self.parent_ref(node, Node::left) == node {
            Direction::Left
        } else {
            Direction::Right
        }
    }

    /// Pushes a link of nodes on the left to stack.
    fn left_link(&self, mut x: NodeIndex<Ix>, stack: &mut Vec<NodeIndex<Ix>>) {
        while x != Self::sentinel() {
            stack.push(x);
            x = self.node_ref(x, Node::left);
        }
    }

    /// Visit every key in ascending order.
    fn for_each_in_order<F>(&self, mut f: F)
    where
        F: FnMut(&K),
    {
        let mut stack = Vec::new();
        self.left_link(self.root, &mut stack);
        while let Some(x) = stack.pop() {
            f(self.node_ref(x, Node::key));
            self.left_link(self.node_ref(x, Node::right), &mut stack);
        }
    }
}

// Closure access to a node or to its parent, child or grandparent
impl<'a, K, Ix> RbTree<K, Ix>
where
    Ix: IndexType,
{
    pub(crate) fn node_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<K, Ix>) -> R,
    {
        op(&self.nodes[node.index()])
    }

    pub(crate) fn node_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<K, Ix>) -> R,
    {
        op(&mut self.nodes[node.index()])
    }

    pub(crate) fn left_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<K, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].left().index();
        op(&self.nodes[idx])
    }

    pub(crate) fn right_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<K, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].right().index();
        op(&self.nodes[idx])
    }

    fn child_ref<F, R>(&'a self, node: NodeIndex<Ix>, dir: Direction, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<K, Ix>) -> R,
    {
        let idx = Node::child(dir)(&self.nodes[node.index()]).index();
        op(&self.nodes[idx])
    }

    fn parent_ref<F, R>(&'a self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a Node<K, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].parent().index();
        op(&self.nodes[idx])
    }

    fn child_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, dir: Direction, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<K, Ix>) -> R,
    {
        let idx = Node::child(dir)(&self.nodes[node.index()]).index();
        op(&mut self.nodes[idx])
    }

    fn parent_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<K, Ix>) -> R,
    {
        let idx = self.nodes[node.index()].parent().index();
        op(&mut self.nodes[idx])
    }

    fn grand_parent_mut<F, R>(&'a mut self, node: NodeIndex<Ix>, op: F) -> R
    where
        R: 'a,
        F: FnOnce(&'a mut Node<K, Ix>) -> R,
    {
        let parent_idx = self.nodes[node.index()].parent().index();
        let grand_parent_idx = self.nodes[parent_idx].parent().index();
        op(&mut self.nodes[grand_parent_idx])
    }
}
