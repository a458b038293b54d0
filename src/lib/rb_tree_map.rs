//! A red-black tree map implementation.
#![warn(missing_docs)]

use std::borrow::Borrow;
use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use log::{debug, trace};

mod error;
mod rb_tree_dump;
mod rb_tree_iter;
mod rb_tree_node;

pub use error::InvariantViolation;
pub use rb_tree_dump::LevelDump;
pub use rb_tree_iter::{Iter, IterMut, Keys};

use rb_tree_iter::Order;
use rb_tree_node::{
    color_of, key_value, key_value_mut, maximum, minimum, set_color, side_of, swap_colors,
    swap_payload, Color, Node, NodeRef, Side,
};

/// An ordered map backed by a red-black tree.
///
/// Keys are unique. Lookups, insertions and removals take time proportional
/// to the height of the tree, which stays below `2 * log2(len + 1)`.
///
/// The map is single-threaded: it is neither `Send` nor `Sync`.
pub struct RbTreeMap<K, V> {
    root: Option<NodeRef<K, V>>,
    length: usize,
}

impl<K, V> RbTreeMap<K, V> {
    /// Creates a new empty RbTreeMap.
    pub fn new() -> Self {
        RbTreeMap {
            root: None,
            length: 0,
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.length
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        // Unlink iteratively so dropping never recurses through the tree.
        let mut stack: Vec<NodeRef<K, V>> = self.root.take().into_iter().collect();
        while let Some(node) = stack.pop() {
            let mut guard = node.borrow_mut();
            stack.extend(guard.left.take());
            stack.extend(guard.right.take());
        }
        self.length = 0;
    }

    /// Number of nodes on the longest root-to-leaf path; 0 for an empty map.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut level: Vec<NodeRef<K, V>> = self.root.iter().cloned().collect();
        while !level.is_empty() {
            height += 1;
            let mut next = Vec::with_capacity(level.len() * 2);
            for node in &level {
                let node = RefCell::borrow(node);
                next.extend(node.left.clone());
                next.extend(node.right.clone());
            }
            level = next;
        }
        height
    }

    /// Returns the entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let node = minimum(self.root.clone()?);
        unsafe { Some(key_value(&node)) }
    }

    /// Returns the entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let node = maximum(self.root.clone()?);
        unsafe { Some(key_value(&node)) }
    }

    /// Returns an iterator over the entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.clone(), Order::Ascending, self.length)
    }

    /// Returns an iterator over the entries in descending key order.
    pub fn iter_rev(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.clone(), Order::Descending, self.length)
    }

    /// Returns a mutable iterator over the entries in ascending key order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(self.root.clone(), Order::Ascending, self.length)
    }

    /// Returns an iterator over the keys in ascending order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter())
    }

    /// Returns an iterator over the keys in descending order.
    pub fn keys_rev(&self) -> Keys<'_, K, V> {
        Keys::new(self.iter_rev())
    }

    /// Returns a level-order rendering of the tree for tracing.
    pub fn dump(&self) -> LevelDump<'_, K, V> {
        LevelDump::new(self)
    }

    /// Rotates `node` down toward `dir`, promoting its child on the other
    /// side into its place. The in-order sequence is unchanged.
    fn rotate(&mut self, node: &NodeRef<K, V>, dir: Side) {
        let promoted_side = dir.opposite();
        let promoted = RefCell::borrow(node)
            .child(promoted_side)
            .expect("rotation needs a child to promote");
        let inner = RefCell::borrow(&promoted).child(dir);
        let parent = RefCell::borrow(node).parent();
        let side = side_of(node);
        trace!("rotate {dir}");

        // promoted's inner subtree moves across to node
        if let Some(inner) = &inner {
            inner.borrow_mut().parent = Some(Rc::downgrade(node));
        }
        *node.borrow_mut().child_slot(promoted_side) = inner;

        node.borrow_mut().parent = Some(Rc::downgrade(&promoted));
        *promoted.borrow_mut().child_slot(dir) = Some(node.clone());

        promoted.borrow_mut().parent = parent.as_ref().map(Rc::downgrade);
        match (parent, side) {
            (Some(parent), Some(side)) => {
                *parent.borrow_mut().child_slot(side) = Some(promoted);
            }
            _ => self.root = Some(promoted),
        }
    }

    fn debug_check_root(&self) {
        if let Some(root) = &self.root {
            let root = RefCell::borrow(root);
            debug_assert_eq!(root.color, Color::Black, "root must be black");
            debug_assert!(root.parent.is_none(), "root must not have a parent");
        }
    }
}

impl<K, V> Default for RbTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Drop for RbTreeMap<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<K, V> RbTreeMap<K, V>
where
    K: Ord,
{
    /// Returns a reference to the value corresponding to the key.
    pub fn get<Q: ?Sized + Ord>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
    {
        let node = self.search(key)?;
        unsafe { Some(key_value(&node).1) }
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q: ?Sized + Ord>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
    {
        let node = self.search(key)?;
        unsafe { Some(key_value_mut(&node).1) }
    }

    /// Returns true if the map contains the key.
    pub fn contains_key<Q: ?Sized + Ord>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
    {
        self.search(key).is_some()
    }

    fn search<Q: ?Sized + Ord>(&self, key: &Q) -> Option<NodeRef<K, V>>
    where
        K: Borrow<Q>,
    {
        let mut current = self.root.clone();
        while let Some(node_ref) = current {
            let node = RefCell::borrow(&node_ref);
            match node.find_slot(key) {
                Ok(()) => {
                    drop(node);
                    return Some(node_ref);
                }
                Err(side) => current = node.child(side),
            }
        }
        None
    }

    /// Inserts a key-value pair into the map.
    /// Returns the old value if the key was already present; in that case
    /// the tree shape and colors are left untouched.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let Some(mut current) = self.root.clone() else {
            let node = Node::new(key, value, None).into_ref();
            self.root = Some(node.clone());
            self.length = 1;
            self.rebalance_after_insert(node);
            self.debug_check_root();
            return None;
        };

        let inserted = loop {
            let slot = RefCell::borrow(&current).find_slot(&key);
            match slot {
                Ok(()) => {
                    let old = mem::replace(&mut current.borrow_mut().value, value);
                    return Some(old);
                }
                Err(side) => {
                    let child = RefCell::borrow(&current).child(side);
                    match child {
                        Some(child) => current = child,
                        None => {
                            trace!("attaching new node as {side} child");
                            let node = Node::new(key, value, Some(Rc::downgrade(&current)))
                                .into_ref();
                            *current.borrow_mut().child_slot(side) = Some(node.clone());
                            break node;
                        }
                    }
                }
            }
        };

        self.length += 1;
        self.rebalance_after_insert(inserted);
        self.debug_check_root();
        None
    }

    // Walks up from a freshly inserted red node, fixing red-red violations
    // by recoloring (red uncle) or by one or two rotations (black uncle).
    fn rebalance_after_insert(&mut self, mut node: NodeRef<K, V>) {
        loop {
            if RefCell::borrow(&node).color == Color::Black {
                break;
            }
            let parent = RefCell::borrow(&node).parent();
            let Some(parent) = parent else {
                set_color(&node, Color::Black);
                break;
            };
            if RefCell::borrow(&parent).color == Color::Black {
                break;
            }

            // A red parent is never the root, so the grandparent exists.
            let grand = RefCell::borrow(&parent)
                .parent()
                .expect("red node cannot be the root");
            let parent_side = side_of(&parent).expect("non-root node has a side");
            let uncle = RefCell::borrow(&grand).child(parent_side.opposite());

            if let Some(uncle) = uncle.filter(|u| RefCell::borrow(u).color == Color::Red) {
                debug!("re-color");
                set_color(&parent, Color::Black);
                set_color(&uncle, Color::Black);
                set_color(&grand, Color::Red);
                node = grand;
                continue;
            }

            let node_side = side_of(&node).expect("non-root node has a side");
            debug!("{parent_side}-{node_side}");
            if node_side == parent_side {
                self.rotate(&grand, parent_side.opposite());
                swap_colors(&grand, &parent);
                break;
            }
            // Rotate the parent so it becomes the outer child of the node,
            // then resolve the resulting straight line on the next pass.
            self.rotate(&parent, parent_side);
            node = parent;
        }
    }

    /// Removes a key from the map, returning the value if it was present.
    pub fn remove<Q: ?Sized + Ord>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
    {
        let mut node = self.search(key)?;

        let two_children = RefCell::borrow(&node).child_count() == 2;
        if two_children {
            // Take over the successor's payload; the successor has no left
            // child, so removing it is the one-child or leaf case.
            let right = RefCell::borrow(&node)
                .right
                .clone()
                .expect("node with two children has a right child");
            let successor = minimum(right);
            debug!("remove: swapping with successor");
            swap_payload(&node, &successor);
            node = successor;
        }

        let value = self.splice_out(node);
        self.length -= 1;
        self.debug_check_root();
        Some(value)
    }

    // Unlinks a node with at most one child, lifting the child into its
    // place, and repairs the black-height if a black node went away.
    fn splice_out(&mut self, node: NodeRef<K, V>) -> V {
        let side = side_of(&node);
        let (parent, child, color) = {
            let mut n = node.borrow_mut();
            debug_assert!(n.child_count() <= 1);
            let child = match n.left.take() {
                Some(left) => Some(left),
                None => n.right.take(),
            };
            let parent = n.parent.take().and_then(|p| p.upgrade());
            (parent, child, n.color)
        };
        debug!(
            "remove: splicing out {} node, {}",
            color,
            if child.is_some() { "lifting its child" } else { "leaf" }
        );

        if let Some(child) = &child {
            child.borrow_mut().parent = parent.as_ref().map(Rc::downgrade);
        }
        match (&parent, side) {
            (Some(parent), Some(side)) => *parent.borrow_mut().child_slot(side) = child.clone(),
            _ => self.root = child.clone(),
        }

        if color == Color::Black {
            match (child, parent, side) {
                (Some(child), _, _) if RefCell::borrow(&child).color == Color::Red => {
                    set_color(&child, Color::Black);
                }
                (child, Some(parent), Some(side)) => {
                    self.rebalance_after_remove(child, parent, side);
                }
                // the removed node was the root
                _ => {}
            }
        }

        let node = Rc::try_unwrap(node)
            .ok()
            .expect("unlinked node has no other owner");
        node.into_inner().value
    }

    // `node` (possibly a nil leaf) sits on `side` of `parent` and is one
    // black short of its sibling subtree. Push the deficit up or absorb it
    // with recoloring and at most three rotations.
    fn rebalance_after_remove(
        &mut self,
        mut node: Option<NodeRef<K, V>>,
        parent: NodeRef<K, V>,
        mut side: Side,
    ) {
        let mut parent = Some(parent);
        while let Some(p) = parent.clone() {
            if color_of(node.as_ref()) == Color::Red {
                break;
            }
            let far = side.opposite();
            let mut sibling = RefCell::borrow(&p)
                .child(far)
                .expect("a black-deficient subtree has a sibling");

            if RefCell::borrow(&sibling).color == Color::Red {
                debug!("remove fix-up: red sibling");
                set_color(&sibling, Color::Black);
                set_color(&p, Color::Red);
                self.rotate(&p, side);
                sibling = RefCell::borrow(&p)
                    .child(far)
                    .expect("a black-deficient subtree has a sibling");
            }

            let near_child = RefCell::borrow(&sibling).child(side);
            let far_child = RefCell::borrow(&sibling).child(far);
            if color_of(near_child.as_ref()) == Color::Black
                && color_of(far_child.as_ref()) == Color::Black
            {
                debug!("remove fix-up: re-color sibling, move up");
                set_color(&sibling, Color::Red);
                let grand = RefCell::borrow(&p).parent();
                if grand.is_some() {
                    side = side_of(&p).expect("non-root node has a side");
                }
                node = Some(p);
                parent = grand;
                continue;
            }

            if color_of(far_child.as_ref()) == Color::Black {
                debug!("remove fix-up: red near nephew, rotate sibling {far}");
                if let Some(near_child) = &near_child {
                    set_color(near_child, Color::Black);
                }
                set_color(&sibling, Color::Red);
                self.rotate(&sibling, far);
                sibling = RefCell::borrow(&p)
                    .child(far)
                    .expect("a black-deficient subtree has a sibling");
            }

            debug!("remove fix-up: rotate parent {side}");
            let parent_color = RefCell::borrow(&p).color;
            set_color(&sibling, parent_color);
            set_color(&p, Color::Black);
            let far_child = RefCell::borrow(&sibling).child(far);
            if let Some(far_child) = &far_child {
                set_color(far_child, Color::Black);
            }
            self.rotate(&p, side);
            return;
        }

        if let Some(node) = &node {
            set_color(node, Color::Black);
        }
    }
}

impl<K, V> RbTreeMap<K, V>
where
    K: Ord + fmt::Debug,
{
    /// Verifies every structural invariant and returns the black-height of
    /// the tree: the number of black nodes on each root-to-nil path.
    pub fn check_invariants(&self) -> Result<usize, InvariantViolation> {
        let Some(root) = &self.root else {
            if self.length != 0 {
                return Err(InvariantViolation::LengthMismatch {
                    counted: 0,
                    recorded: self.length,
                });
            }
            return Ok(0);
        };

        {
            let root = RefCell::borrow(root);
            if root.parent.is_some() {
                return Err(InvariantViolation::RootHasParent {
                    key: format!("{:?}", root.key),
                });
            }
            if root.color == Color::Red {
                return Err(InvariantViolation::RedRoot {
                    key: format!("{:?}", root.key),
                });
            }
        }

        let mut counted = 0;
        let black_height = check_subtree(root, &mut counted)?;
        if counted != self.length {
            return Err(InvariantViolation::LengthMismatch {
                counted,
                recorded: self.length,
            });
        }

        let mut prev: Option<&K> = None;
        for key in self.keys() {
            if let Some(prev) = prev {
                if prev >= key {
                    return Err(InvariantViolation::OutOfOrder {
                        prev: format!("{:?}", prev),
                        next: format!("{:?}", key),
                    });
                }
            }
            prev = Some(key);
        }

        Ok(black_height)
    }
}

// Returns the black-height of the subtree rooted at `node`, counting `node`.
fn check_subtree<K: fmt::Debug, V>(
    node: &NodeRef<K, V>,
    counted: &mut usize,
) -> Result<usize, InvariantViolation> {
    let n = RefCell::borrow(node);
    *counted += 1;

    let mut heights = [0usize; 2];
    for (height, child) in heights.iter_mut().zip([&n.left, &n.right]) {
        let Some(child) = child else {
            continue;
        };
        {
            let c = RefCell::borrow(child);
            let linked = c.parent().is_some_and(|p| Rc::ptr_eq(&p, node));
            if !linked {
                return Err(InvariantViolation::BrokenParentLink {
                    key: format!("{:?}", c.key),
                });
            }
            if n.color == Color::Red && c.color == Color::Red {
                return Err(InvariantViolation::RedRed {
                    parent: format!("{:?}", n.key),
                    child: format!("{:?}", c.key),
                });
            }
        }
        *height = check_subtree(child, counted)?;
    }

    if heights[0] != heights[1] {
        return Err(InvariantViolation::BlackHeight {
            key: format!("{:?}", n.key),
            left: heights[0],
            right: heights[1],
        });
    }
    Ok(heights[0] + usize::from(n.color == Color::Black))
}

impl<'a, K, V> IntoIterator for &'a RbTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut RbTreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RbTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = RbTreeMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for RbTreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RbTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
