use std::borrow::Borrow;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::mem;
use std::ptr;
use std::rc::{Rc, Weak};

pub(super) type NodeRef<K, V> = Rc<RefCell<Node<K, V>>>;
pub(super) type WeakNodeRef<K, V> = Weak<RefCell<Node<K, V>>>;

/// Node color. Absent children count as `Black`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Color {
    Red,
    Black,
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Color::Red => "RED",
            Color::Black => "BLACK",
        })
    }
}

/// Which child slot of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Side {
    Left,
    Right,
}

impl Side {
    pub(super) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Side::Left => "left",
            Side::Right => "right",
        })
    }
}

// Children are owned, the parent is only observed. A linked node has exactly
// one strong owner: its parent's child slot or the map's root.
pub(super) struct Node<K, V> {
    pub(super) key: K,
    pub(super) value: V,
    pub(super) color: Color,
    pub(super) parent: Option<WeakNodeRef<K, V>>,
    pub(super) left: Option<NodeRef<K, V>>,
    pub(super) right: Option<NodeRef<K, V>>,
}

impl<K, V> Node<K, V> {
    /// New nodes always start out red.
    pub(super) fn new(key: K, value: V, parent: Option<WeakNodeRef<K, V>>) -> Self {
        Node {
            key,
            value,
            color: Color::Red,
            parent,
            left: None,
            right: None,
        }
    }

    pub(super) fn into_ref(self) -> NodeRef<K, V> {
        Rc::new(RefCell::new(self))
    }

    pub(super) fn parent(&self) -> Option<NodeRef<K, V>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    pub(super) fn child(&self, side: Side) -> Option<NodeRef<K, V>> {
        match side {
            Side::Left => self.left.clone(),
            Side::Right => self.right.clone(),
        }
    }

    pub(super) fn child_slot(&mut self, side: Side) -> &mut Option<NodeRef<K, V>> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    pub(super) fn child_count(&self) -> usize {
        self.left.is_some() as usize + self.right.is_some() as usize
    }

    /// Compares `key` against this node. Returns Ok if it matches, Err(side)
    /// with the child slot to descend into otherwise.
    pub(super) fn find_slot<Q: ?Sized + Ord>(&self, key: &Q) -> Result<(), Side>
    where
        K: Borrow<Q>,
    {
        match key.cmp(self.key.borrow()) {
            Ordering::Less => Err(Side::Left),
            Ordering::Equal => Ok(()),
            Ordering::Greater => Err(Side::Right),
        }
    }
}

/// Color of an optional node; an absent node is a black nil leaf.
pub(super) fn color_of<K, V>(node: Option<&NodeRef<K, V>>) -> Color {
    node.map_or(Color::Black, |n| RefCell::borrow(n).color)
}

pub(super) fn set_color<K, V>(node: &NodeRef<K, V>, color: Color) {
    node.borrow_mut().color = color;
}

/// Exchanges the colors of two nodes. No-op when they already match.
pub(super) fn swap_colors<K, V>(a: &NodeRef<K, V>, b: &NodeRef<K, V>) {
    if Rc::ptr_eq(a, b) {
        return;
    }
    let mut a = a.borrow_mut();
    let mut b = b.borrow_mut();
    if a.color != b.color {
        mem::swap(&mut a.color, &mut b.color);
    }
}

/// Exchanges key and value between two nodes, leaving links and colors alone.
pub(super) fn swap_payload<K, V>(a: &NodeRef<K, V>, b: &NodeRef<K, V>) {
    if Rc::ptr_eq(a, b) {
        return;
    }
    let mut a = a.borrow_mut();
    let mut b = b.borrow_mut();
    mem::swap(&mut a.key, &mut b.key);
    mem::swap(&mut a.value, &mut b.value);
}

/// Which child of its parent `node` is, or None for a root.
pub(super) fn side_of<K, V>(node: &NodeRef<K, V>) -> Option<Side> {
    let parent = RefCell::borrow(node).parent()?;
    let is_left = RefCell::borrow(&parent)
        .left
        .as_ref()
        .is_some_and(|left| Rc::ptr_eq(left, node));
    Some(if is_left { Side::Left } else { Side::Right })
}

pub(super) fn minimum<K, V>(node: NodeRef<K, V>) -> NodeRef<K, V> {
    extreme(node, Side::Left)
}

pub(super) fn maximum<K, V>(node: NodeRef<K, V>) -> NodeRef<K, V> {
    extreme(node, Side::Right)
}

pub(super) fn successor<K, V>(node: &NodeRef<K, V>) -> Option<NodeRef<K, V>> {
    neighbor(node, Side::Right)
}

pub(super) fn predecessor<K, V>(node: &NodeRef<K, V>) -> Option<NodeRef<K, V>> {
    neighbor(node, Side::Left)
}

// Navigation reads links through raw field pointers, never through a whole
// `&Node`, so an `IterMut` can walk back through nodes whose values it has
// already lent out. No caller holds a `borrow_mut` guard while navigating.
fn child_link<K, V>(node: &NodeRef<K, V>, side: Side) -> Option<NodeRef<K, V>> {
    let node = node.as_ptr();
    unsafe {
        let slot = match side {
            Side::Left => ptr::addr_of!((*node).left),
            Side::Right => ptr::addr_of!((*node).right),
        };
        (*slot).clone()
    }
}

fn parent_link<K, V>(node: &NodeRef<K, V>) -> Option<NodeRef<K, V>> {
    let node = node.as_ptr();
    unsafe { (*ptr::addr_of!((*node).parent)).as_ref().and_then(Weak::upgrade) }
}

fn is_child_on<K, V>(node: &NodeRef<K, V>, side: Side) -> bool {
    parent_link(node)
        .and_then(|parent| child_link(&parent, side))
        .is_some_and(|child| Rc::ptr_eq(&child, node))
}

fn extreme<K, V>(mut node: NodeRef<K, V>, side: Side) -> NodeRef<K, V> {
    while let Some(next) = child_link(&node, side) {
        node = next;
    }
    node
}

// In-order neighbour toward `side`. With a subtree on that side it is the
// subtree's extreme on the opposite side; otherwise it is the parent of the
// first ancestor that is not itself a `side` child.
fn neighbor<K, V>(node: &NodeRef<K, V>, side: Side) -> Option<NodeRef<K, V>> {
    if let Some(child) = child_link(node, side) {
        return Some(extreme(child, side.opposite()));
    }

    let mut current = node.clone();
    while is_child_on(&current, side) {
        current = parent_link(&current)?;
    }
    parent_link(&current)
}

/// Borrows the payload of `node` for `'a` without holding a `RefCell` guard.
///
/// # Safety
///
/// `node` must stay linked into a tree that is borrowed for `'a`, and the
/// node must not be mutably borrowed during `'a`.
pub(super) unsafe fn key_value<'a, K, V>(node: &NodeRef<K, V>) -> (&'a K, &'a V) {
    let node = node.as_ptr();
    (&*ptr::addr_of!((*node).key), &*ptr::addr_of!((*node).value))
}

/// Mutable counterpart of [`key_value`]. The `&mut V` covers only the value
/// field, so links of the same node stay readable while it is alive.
///
/// # Safety
///
/// As for [`key_value`], and in addition the tree must be exclusively
/// borrowed for `'a` with no other reference to this value handed out.
pub(super) unsafe fn key_value_mut<'a, K, V>(node: &NodeRef<K, V>) -> (&'a K, &'a mut V) {
    let node = node.as_ptr();
    (&*ptr::addr_of!((*node).key), &mut *ptr::addr_of_mut!((*node).value))
}
