//! The AVL tree engine shared by every container in this crate.
//!
//! Nodes are heap allocated and linked with raw pointers. A child link owns its
//! subtree, a parent link is a plain back pointer that is only ever followed
//! upwards and never frees anything. Each node stores its balance factor,
//! `height(right) - height(left)`, which is -1, 0 or +1 between operations and
//! may reach ±2 only while a repair is in progress.

use std::alloc::{self, Layout};
use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::error::{handle_error, Error, Result};

pub(crate) struct RawTree<K, P, C> {
    root: Link<K, P>,
    num_nodes: usize,
    compare: C,
    marker: PhantomData<Box<Node<K, P>>>,
}

pub(crate) struct Node<K, P> {
    key: K,
    payload: P,
    parent: Link<K, P>,
    left: Link<K, P>,
    right: Link<K, P>,
    balance: i8,
}

type NodePtr<K, P> = NonNull<Node<K, P>>;
type Link<K, P> = Option<NodePtr<K, P>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

/// The four ways of restoring balance at a node whose balance reached ±2.
/// Which one applies is fully determined by the signs of the node's balance
/// and of its heavier child's balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Repair {
    RotateLeft,
    RotateRight,
    RotateLeftRight,
    RotateRightLeft,
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

/// A view into a single position of the tree, as returned by [`RawTree::entry`].
pub(crate) enum Entry<'a, K, P, C> {
    Occupied(OccupiedEntry<'a, K, P, C>),
    Vacant(VacantEntry<'a, K, P, C>),
}

pub(crate) struct OccupiedEntry<'a, K, P, C> {
    tree: &'a mut RawTree<K, P, C>,
    node_ptr: NodePtr<K, P>,
}

pub(crate) struct VacantEntry<'a, K, P, C> {
    tree: &'a mut RawTree<K, P, C>,
    parent: Link<K, P>,
    side: Side,
}

/// In-order iterator over keys and payloads.
pub(crate) struct Iter<'a, K, P> {
    front: Link<K, P>,
    back: Link<K, P>,
    remaining: usize,
    marker: PhantomData<&'a Node<K, P>>,
}

// The tree owns its nodes exclusively, so it is as thread safe as its contents.
unsafe impl<K: Send, P: Send, C: Send> Send for RawTree<K, P, C> {}
unsafe impl<K: Sync, P: Sync, C: Sync> Sync for RawTree<K, P, C> {}
unsafe impl<K: Sync, P: Sync> Send for Iter<'_, K, P> {}
unsafe impl<K: Sync, P: Sync> Sync for Iter<'_, K, P> {}

impl Repair {
    fn classify(parent_balance: i8, child_balance: i8) -> Self {
        match (parent_balance, child_balance) {
            (2, child) if child >= 0 => Repair::RotateLeft,
            (2, _) => Repair::RotateRightLeft,
            (-2, child) if child <= 0 => Repair::RotateRight,
            (-2, _) => Repair::RotateLeftRight,
            _ => unreachable!("node with balance {parent_balance} does not need a repair"),
        }
    }
}

impl<K, P, C> RawTree<K, P, C> {
    pub(crate) fn new(compare: C) -> Self {
        Self {
            root: None,
            num_nodes: 0,
            compare,
            marker: PhantomData,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of nodes, i.e. the number of distinct keys.
    pub(crate) fn len(&self) -> usize {
        self.num_nodes
    }

    /// Destroys all nodes.
    /// The tree is emptied before any key or payload is dropped, so a panicking
    /// destructor leaks the remaining nodes instead of leaving dangling links.
    pub(crate) fn clear(&mut self) {
        let root = self.root.take();
        let num_nodes = mem::replace(&mut self.num_nodes, 0);
        if root.is_some() {
            debug!(nodes = num_nodes, "clearing tree");
        }
        Self::postorder(root, |node_ptr| unsafe {
            drop(Node::destroy(node_ptr));
        });
    }

    pub(crate) fn first(&self) -> Option<&K> {
        self.root
            .map(|root_ptr| unsafe { &(*Node::leftmost(root_ptr).as_ptr()).key })
    }

    pub(crate) fn last(&self) -> Option<&K> {
        self.root
            .map(|root_ptr| unsafe { &(*Node::rightmost(root_ptr).as_ptr()).key })
    }

    pub(crate) fn iter(&self) -> Iter<'_, K, P> {
        Iter {
            front: self.root.map(Node::leftmost),
            back: self.root.map(Node::rightmost),
            remaining: self.num_nodes,
            marker: PhantomData,
        }
    }

    /// Height of the tree counted in edges; an empty tree and a single node both have height 0.
    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn height(&self) -> usize {
        fn levels<K, P>(link: Link<K, P>) -> usize {
            match link {
                None => 0,
                Some(node_ptr) => unsafe {
                    1 + std::cmp::max(levels(node_ptr.as_ref().left), levels(node_ptr.as_ref().right))
                },
            }
        }
        levels(self.root).saturating_sub(1)
    }

    /// Makes `child_ptr` take the structural position of `parent_ptr`:
    /// the grandparent (or the root link) now points to the child.
    fn reference_parent(&mut self, parent_ptr: NodePtr<K, P>, mut child_ptr: NodePtr<K, P>) {
        unsafe {
            let grand_parent = parent_ptr.as_ref().parent;
            child_ptr.as_mut().parent = grand_parent;
            match grand_parent {
                None => self.root = Some(child_ptr),
                Some(mut grand_parent_ptr) => {
                    let side = Node::side_of(grand_parent_ptr, parent_ptr);
                    grand_parent_ptr.as_mut().set_child(side, Some(child_ptr));
                }
            }
        }
    }

    // `child_ptr` must be the right child of `parent_ptr`. Balances are left untouched.
    fn rotate_left(&mut self, mut parent_ptr: NodePtr<K, P>, mut child_ptr: NodePtr<K, P>) {
        unsafe {
            debug_assert!(parent_ptr.as_ref().right == Some(child_ptr));
            self.reference_parent(parent_ptr, child_ptr);
            let grand_child = child_ptr.as_ref().left;
            if let Some(mut grand_child_ptr) = grand_child {
                grand_child_ptr.as_mut().parent = Some(parent_ptr);
            }
            parent_ptr.as_mut().parent = Some(child_ptr);
            parent_ptr.as_mut().right = grand_child;
            child_ptr.as_mut().left = Some(parent_ptr);
        }
    }

    // `child_ptr` must be the left child of `parent_ptr`. Balances are left untouched.
    fn rotate_right(&mut self, mut parent_ptr: NodePtr<K, P>, mut child_ptr: NodePtr<K, P>) {
        unsafe {
            debug_assert!(parent_ptr.as_ref().left == Some(child_ptr));
            self.reference_parent(parent_ptr, child_ptr);
            let grand_child = child_ptr.as_ref().right;
            if let Some(mut grand_child_ptr) = grand_child {
                grand_child_ptr.as_mut().parent = Some(parent_ptr);
            }
            parent_ptr.as_mut().parent = Some(child_ptr);
            parent_ptr.as_mut().left = grand_child;
            child_ptr.as_mut().right = Some(parent_ptr);
        }
    }

    /// Restores balance at `parent_ptr`, whose balance is ±2 and whose heavier
    /// child is `child_ptr`. Returns the new root of the repaired subtree.
    fn repair(
        &mut self,
        mut parent_ptr: NodePtr<K, P>,
        mut child_ptr: NodePtr<K, P>,
    ) -> NodePtr<K, P> {
        unsafe {
            let repair = Repair::classify(parent_ptr.as_ref().balance, child_ptr.as_ref().balance);
            trace!(?repair, "repairing unbalanced subtree");
            match repair {
                Repair::RotateLeft => {
                    self.rotate_left(parent_ptr, child_ptr);
                    if child_ptr.as_ref().balance == 0 {
                        parent_ptr.as_mut().balance = 1;
                        child_ptr.as_mut().balance = -1;
                    } else {
                        parent_ptr.as_mut().balance = 0;
                        child_ptr.as_mut().balance = 0;
                    }
                    child_ptr
                }
                Repair::RotateRight => {
                    self.rotate_right(parent_ptr, child_ptr);
                    if child_ptr.as_ref().balance == 0 {
                        parent_ptr.as_mut().balance = -1;
                        child_ptr.as_mut().balance = 1;
                    } else {
                        parent_ptr.as_mut().balance = 0;
                        child_ptr.as_mut().balance = 0;
                    }
                    child_ptr
                }
                Repair::RotateLeftRight => {
                    let Some(mut grand_child_ptr) = child_ptr.as_ref().right else {
                        unreachable!("right-heavy child without right subtree");
                    };
                    self.rotate_left(child_ptr, grand_child_ptr);
                    self.rotate_right(parent_ptr, grand_child_ptr);
                    let (parent_balance, child_balance) = match grand_child_ptr.as_ref().balance {
                        1 => (0, -1),
                        0 => (0, 0),
                        _ => (1, 0),
                    };
                    parent_ptr.as_mut().balance = parent_balance;
                    child_ptr.as_mut().balance = child_balance;
                    grand_child_ptr.as_mut().balance = 0;
                    grand_child_ptr
                }
                Repair::RotateRightLeft => {
                    let Some(mut grand_child_ptr) = child_ptr.as_ref().left else {
                        unreachable!("left-heavy child without left subtree");
                    };
                    self.rotate_right(child_ptr, grand_child_ptr);
                    self.rotate_left(parent_ptr, grand_child_ptr);
                    let (parent_balance, child_balance) = match grand_child_ptr.as_ref().balance {
                        1 => (-1, 0),
                        0 => (0, 0),
                        _ => (0, 1),
                    };
                    parent_ptr.as_mut().balance = parent_balance;
                    child_ptr.as_mut().balance = child_balance;
                    grand_child_ptr.as_mut().balance = 0;
                    grand_child_ptr
                }
            }
        }
    }

    /// Walks up from a freshly linked leaf adjusting balances.
    /// A single repair always restores the whole tree after an insertion.
    fn insert_rebalance(&mut self, node_ptr: NodePtr<K, P>) {
        let mut child_ptr = node_ptr;
        unsafe {
            while let Some(mut parent_ptr) = child_ptr.as_ref().parent {
                match Node::side_of(parent_ptr, child_ptr) {
                    Side::Left => parent_ptr.as_mut().balance -= 1,
                    Side::Right => parent_ptr.as_mut().balance += 1,
                }
                match parent_ptr.as_ref().balance {
                    // Subtree height is unchanged
                    0 => return,
                    -1 | 1 => child_ptr = parent_ptr,
                    _ => {
                        self.repair(parent_ptr, child_ptr);
                        return;
                    }
                }
            }
        }
    }

    /// Walks up from `node_ptr`, whose `shrunk` subtree just lost one level of height.
    /// Unlike insertion, repairs may be needed at several levels.
    fn delete_rebalance(&mut self, mut node_ptr: NodePtr<K, P>, mut shrunk: Side) {
        unsafe {
            loop {
                match shrunk {
                    Side::Left => node_ptr.as_mut().balance += 1,
                    Side::Right => node_ptr.as_mut().balance -= 1,
                }
                match node_ptr.as_ref().balance {
                    // Subtree height is unchanged
                    -1 | 1 => return,
                    0 => {}
                    balance => {
                        let heavy = if balance > 0 {
                            node_ptr.as_ref().right
                        } else {
                            node_ptr.as_ref().left
                        };
                        let Some(heavy_ptr) = heavy else {
                            unreachable!("unbalanced node without heavy child");
                        };
                        node_ptr = self.repair(node_ptr, heavy_ptr);
                        if node_ptr.as_ref().balance != 0 {
                            return;
                        }
                    }
                }
                let Some(parent_ptr) = node_ptr.as_ref().parent else {
                    return;
                };
                shrunk = Node::side_of(parent_ptr, node_ptr);
                node_ptr = parent_ptr;
            }
        }
    }

    /// Detaches a node from the tree and rebalances. The node itself is not freed.
    fn unlink(&mut self, node_ptr: NodePtr<K, P>) {
        unsafe {
            let parent = node_ptr.as_ref().parent;
            match (node_ptr.as_ref().left, node_ptr.as_ref().right) {
                (None, None) => {
                    trace!("unlinking leaf node");
                    match parent {
                        None => self.root = None,
                        Some(mut parent_ptr) => {
                            let side = Node::side_of(parent_ptr, node_ptr);
                            parent_ptr.as_mut().set_child(side, None);
                            self.delete_rebalance(parent_ptr, side);
                        }
                    }
                }
                (Some(mut child_ptr), None) | (None, Some(mut child_ptr)) => {
                    trace!("splicing node with one child");
                    child_ptr.as_mut().parent = parent;
                    match parent {
                        None => self.root = Some(child_ptr),
                        Some(mut parent_ptr) => {
                            let side = Node::side_of(parent_ptr, node_ptr);
                            parent_ptr.as_mut().set_child(side, Some(child_ptr));
                            self.delete_rebalance(parent_ptr, side);
                        }
                    }
                }
                (Some(mut left_ptr), Some(mut right_ptr)) => {
                    trace!("replacing node with two children by its successor");
                    // The successor takes over position, balance and children of the node.
                    // Rebalancing starts where the successor was taken from.
                    let (mut successor_ptr, rebalance_from, shrunk) =
                        if right_ptr.as_ref().left.is_none() {
                            (right_ptr, right_ptr, Side::Right)
                        } else {
                            let successor_ptr = Node::leftmost(right_ptr);
                            let Some(mut successor_parent_ptr) = successor_ptr.as_ref().parent
                            else {
                                unreachable!("successor below the right child has a parent");
                            };
                            successor_parent_ptr.as_mut().left = successor_ptr.as_ref().right;
                            if let Some(mut successor_right_ptr) = successor_ptr.as_ref().right {
                                successor_right_ptr.as_mut().parent = Some(successor_parent_ptr);
                            }
                            right_ptr.as_mut().parent = Some(successor_ptr);
                            (successor_ptr, successor_parent_ptr, Side::Left)
                        };
                    if shrunk == Side::Left {
                        successor_ptr.as_mut().right = Some(right_ptr);
                    }
                    successor_ptr.as_mut().left = Some(left_ptr);
                    left_ptr.as_mut().parent = Some(successor_ptr);
                    successor_ptr.as_mut().balance = node_ptr.as_ref().balance;
                    self.reference_parent(node_ptr, successor_ptr);
                    self.delete_rebalance(rebalance_from, shrunk);
                }
            }
        }
    }

    fn remove_node(&mut self, node_ptr: NodePtr<K, P>) -> (K, P) {
        debug_assert!(self.num_nodes >= 1);
        self.unlink(node_ptr);
        self.num_nodes -= 1;
        unsafe { Node::destroy(node_ptr) }
    }

    fn postorder<F: FnMut(NodePtr<K, P>)>(root: Link<K, P>, mut postorder: F) {
        if let Some(mut node_ptr) = root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }

    fn clone_subtree(
        &mut self,
        source_ptr: NodePtr<K, P>,
        parent: Link<K, P>,
        side: Side,
    ) -> Result<()>
    where
        K: Clone,
        P: Clone,
    {
        unsafe {
            let source = source_ptr.as_ref();
            let mut node_ptr = Node::try_create(parent, source.key.clone(), source.payload.clone())?;
            node_ptr.as_mut().balance = source.balance;
            // Link right away so a failure further down frees this node with the rest.
            match parent {
                None => self.root = Some(node_ptr),
                Some(mut parent_ptr) => parent_ptr.as_mut().set_child(side, Some(node_ptr)),
            }
            self.num_nodes += 1;
            if let Some(left_ptr) = source.left {
                self.clone_subtree(left_ptr, Some(node_ptr), Side::Left)?;
            }
            if let Some(right_ptr) = source.right {
                self.clone_subtree(right_ptr, Some(node_ptr), Side::Right)?;
            }
        }
        Ok(())
    }
}

impl<K, P, C> RawTree<K, P, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    fn find(&self, key: &K) -> Link<K, P> {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match (self.compare)(key, &node_ptr.as_ref().key) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    pub(crate) fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    pub(crate) fn get(&self, key: &K) -> Option<(&K, &P)> {
        self.find(key).map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.payload)
        })
    }

    pub(crate) fn get_mut(&mut self, key: &K) -> Option<&mut P> {
        self.find(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).payload })
    }

    /// Locates the node holding `key`, or the vacant child slot where it belongs.
    pub(crate) fn entry(&mut self, key: &K) -> Entry<'_, K, P, C> {
        let mut parent: Link<K, P> = None;
        let mut side = Side::Left;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            unsafe {
                match (self.compare)(key, &node_ptr.as_ref().key) {
                    Ordering::Equal => {
                        return Entry::Occupied(OccupiedEntry {
                            tree: self,
                            node_ptr,
                        });
                    }
                    Ordering::Less => {
                        side = Side::Left;
                        current = node_ptr.as_ref().left;
                    }
                    Ordering::Greater => {
                        side = Side::Right;
                        current = node_ptr.as_ref().right;
                    }
                }
            }
            parent = Some(node_ptr);
        }
        Entry::Vacant(VacantEntry {
            tree: self,
            parent,
            side,
        })
    }

    /// Returns the greatest key strictly less than `key`.
    pub(crate) fn lower(&self, key: &K) -> Option<&K> {
        let mut best = None;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { &*node_ptr.as_ptr() };
            if (self.compare)(key, &node.key) == Ordering::Greater {
                best = Some(&node.key);
                current = node.right;
            } else {
                current = node.left;
            }
        }
        best
    }

    /// Returns the least key strictly greater than `key`.
    pub(crate) fn higher(&self, key: &K) -> Option<&K> {
        let mut best = None;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { &*node_ptr.as_ptr() };
            if (self.compare)(key, &node.key) == Ordering::Less {
                best = Some(&node.key);
                current = node.left;
            } else {
                current = node.right;
            }
        }
        best
    }

    /// Returns the greatest key less than or equal to `key`.
    pub(crate) fn floor(&self, key: &K) -> Option<&K> {
        let mut best = None;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { &*node_ptr.as_ptr() };
            match (self.compare)(key, &node.key) {
                Ordering::Equal => return Some(&node.key),
                Ordering::Greater => {
                    best = Some(&node.key);
                    current = node.right;
                }
                Ordering::Less => current = node.left,
            }
        }
        best
    }

    /// Returns the least key greater than or equal to `key`.
    pub(crate) fn ceiling(&self, key: &K) -> Option<&K> {
        let mut best = None;
        let mut current = self.root;
        while let Some(node_ptr) = current {
            let node = unsafe { &*node_ptr.as_ptr() };
            match (self.compare)(key, &node.key) {
                Ordering::Equal => return Some(&node.key),
                Ordering::Less => {
                    best = Some(&node.key);
                    current = node.left;
                }
                Ordering::Greater => current = node.right,
            }
        }
        best
    }

    /// Asserts ordering, parent links, stored balances and the node count.
    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn check_consistency(&self) {
        // Returns the number of levels of the subtree
        fn check_subtree<K, P, C>(tree: &RawTree<K, P, C>, link: Link<K, P>, count: &mut usize) -> i64
        where
            C: Fn(&K, &K) -> Ordering,
        {
            let Some(node_ptr) = link else {
                return 0;
            };
            let node = unsafe { node_ptr.as_ref() };
            *count += 1;
            if let Some(left_ptr) = node.left {
                let left = unsafe { left_ptr.as_ref() };
                assert!(left.parent == Some(node_ptr));
                assert_eq!((tree.compare)(&left.key, &node.key), Ordering::Less);
            }
            if let Some(right_ptr) = node.right {
                let right = unsafe { right_ptr.as_ref() };
                assert!(right.parent == Some(node_ptr));
                assert_eq!((tree.compare)(&node.key, &right.key), Ordering::Less);
            }
            let left_levels = check_subtree(tree, node.left, count);
            let right_levels = check_subtree(tree, node.right, count);

            // Check stored balance and AVL condition
            assert_eq!(i64::from(node.balance), right_levels - left_levels);
            assert!((-1..=1).contains(&node.balance));
            1 + std::cmp::max(left_levels, right_levels)
        }

        // Check root link
        if let Some(root_ptr) = self.root {
            assert!(unsafe { root_ptr.as_ref() }.parent.is_none());
        }

        let mut num_nodes = 0;
        check_subtree(self, self.root, &mut num_nodes);
        assert_eq!(num_nodes, self.num_nodes);

        // Whole-subtree ordering follows from strictly increasing in-order keys
        let mut keys = self.iter().map(|(key, _)| key);
        if let Some(mut previous) = keys.next() {
            for key in keys {
                assert_eq!((self.compare)(previous, key), Ordering::Less);
                previous = key;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn preorder_balances(&self) -> Vec<(&K, i8)> {
        fn visit<'a, K, P>(link: Link<K, P>, out: &mut Vec<(&'a K, i8)>) {
            if let Some(node_ptr) = link {
                let key: &'a K = unsafe { &(*node_ptr.as_ptr()).key };
                let (balance, left, right) = unsafe {
                    let node = node_ptr.as_ref();
                    (node.balance, node.left, node.right)
                };
                out.push((key, balance));
                visit(left, out);
                visit(right, out);
            }
        }
        let mut out = Vec::with_capacity(self.num_nodes);
        visit(self.root, &mut out);
        out
    }
}

impl<K, P, C> Drop for RawTree<K, P, C> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K: Clone, P: Clone, C: Clone> Clone for RawTree<K, P, C> {
    fn clone(&self) -> Self {
        let mut cloned = Self::new(self.compare.clone());
        if let Some(root_ptr) = self.root {
            if let Err(err) = cloned.clone_subtree(root_ptr, None, Side::Left) {
                handle_error(err);
            }
        }
        cloned
    }
}

impl<K, P> Node<K, P> {
    /// Allocates a detached node. Nothing in the tree is touched, so a failure
    /// leaves the tree exactly as it was.
    fn try_create(parent: Link<K, P>, key: K, payload: P) -> Result<NodePtr<K, P>> {
        let layout = Layout::new::<Self>();
        // A node always holds three links, so the layout is never zero sized
        let raw = unsafe { alloc::alloc(layout) }.cast::<Self>();
        let Some(node_ptr) = NonNull::new(raw) else {
            debug!(size = layout.size(), "node allocation failed");
            return Err(Error::OutOfMemory { layout });
        };
        unsafe {
            node_ptr.as_ptr().write(Node {
                key,
                payload,
                parent,
                left: None,
                right: None,
                balance: 0,
            });
        }
        Ok(node_ptr)
    }

    unsafe fn destroy(node_ptr: NodePtr<K, P>) -> (K, P) {
        // Allocated with the global allocator and the layout of `Node`, as a `Box` would be
        let node = *Box::from_raw(node_ptr.as_ptr());
        (node.key, node.payload)
    }

    fn set_child(&mut self, side: Side, child: Link<K, P>) {
        match side {
            Side::Left => self.left = child,
            Side::Right => self.right = child,
        }
    }

    fn side_of(parent_ptr: NodePtr<K, P>, child_ptr: NodePtr<K, P>) -> Side {
        if unsafe { parent_ptr.as_ref().left } == Some(child_ptr) {
            Side::Left
        } else {
            Side::Right
        }
    }

    fn leftmost(mut node_ptr: NodePtr<K, P>) -> NodePtr<K, P> {
        while let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    fn rightmost(mut node_ptr: NodePtr<K, P>) -> NodePtr<K, P> {
        while let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    fn successor(node_ptr: NodePtr<K, P>) -> Link<K, P> {
        unsafe {
            if let Some(right_ptr) = node_ptr.as_ref().right {
                return Some(Self::leftmost(right_ptr));
            }
            let mut child_ptr = node_ptr;
            while let Some(parent_ptr) = child_ptr.as_ref().parent {
                if parent_ptr.as_ref().left == Some(child_ptr) {
                    return Some(parent_ptr);
                }
                child_ptr = parent_ptr;
            }
            None
        }
    }

    fn predecessor(node_ptr: NodePtr<K, P>) -> Link<K, P> {
        unsafe {
            if let Some(left_ptr) = node_ptr.as_ref().left {
                return Some(Self::rightmost(left_ptr));
            }
            let mut child_ptr = node_ptr;
            while let Some(parent_ptr) = child_ptr.as_ref().parent {
                if parent_ptr.as_ref().right == Some(child_ptr) {
                    return Some(parent_ptr);
                }
                child_ptr = parent_ptr;
            }
            None
        }
    }
}

impl<K, P, C> OccupiedEntry<'_, K, P, C> {
    pub(crate) fn payload_mut(&mut self) -> &mut P {
        unsafe { &mut self.node_ptr.as_mut().payload }
    }

    /// Splices the node out of the tree and returns its contents.
    pub(crate) fn remove(self) -> (K, P) {
        self.tree.remove_node(self.node_ptr)
    }
}

impl<'a, K, P, C> VacantEntry<'a, K, P, C> {
    /// Links a new node into the vacant slot and rebalances.
    /// The node is fully allocated before any existing link changes.
    pub(crate) fn insert(self, key: K, payload: P) -> Result<&'a mut P> {
        let mut node_ptr = Node::try_create(self.parent, key, payload)?;
        let tree = self.tree;
        match self.parent {
            None => tree.root = Some(node_ptr),
            Some(mut parent_ptr) => unsafe {
                parent_ptr.as_mut().set_child(self.side, Some(node_ptr));
            },
        }
        tree.num_nodes += 1;
        tree.insert_rebalance(node_ptr);
        Ok(unsafe { &mut node_ptr.as_mut().payload })
    }
}

impl<'a, K, P> Iterator for Iter<'a, K, P> {
    type Item = (&'a K, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node_ptr = self.front?;
        self.remaining -= 1;
        self.front = Node::successor(node_ptr);
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.payload))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, P> DoubleEndedIterator for Iter<'a, K, P> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node_ptr = self.back?;
        self.remaining -= 1;
        self.back = Node::predecessor(node_ptr);
        let node = unsafe { &*node_ptr.as_ptr() };
        Some((&node.key, &node.payload))
    }
}

impl<K, P> ExactSizeIterator for Iter<'_, K, P> {}

impl<K, P> FusedIterator for Iter<'_, K, P> {}

// Auto derived clone seems to have an invalid type bound of K: Clone
impl<K, P> Clone for Iter<'_, K, P> {
    fn clone(&self) -> Self {
        Self {
            front: self.front,
            back: self.back,
            remaining: self.remaining,
            marker: PhantomData,
        }
    }
}
