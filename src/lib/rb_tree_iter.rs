use crate::rb_tree_node::{key_value, key_value_mut, maximum, minimum, predecessor, successor, NodeRef};
use std::iter::FusedIterator;
use std::marker::PhantomData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Order {
    Ascending,
    Descending,
}

// Shared cursor: starts at the extreme node for `order` and steps through
// successors (or predecessors) until it runs off the tree.
struct Cursor<K, V> {
    next: Option<NodeRef<K, V>>,
    order: Order,
    remaining: usize,
}

impl<K, V> Cursor<K, V> {
    fn new(root: Option<NodeRef<K, V>>, order: Order, len: usize) -> Self {
        let next = root.map(|root| match order {
            Order::Ascending => minimum(root),
            Order::Descending => maximum(root),
        });
        Cursor {
            next,
            order,
            remaining: len,
        }
    }

    fn advance(&mut self) -> Option<NodeRef<K, V>> {
        let node = self.next.take()?;
        self.next = match self.order {
            Order::Ascending => successor(&node),
            Order::Descending => predecessor(&node),
        };
        self.remaining = self.remaining.saturating_sub(1);
        Some(node)
    }
}

/// An iterator over the entries of an `RbTreeMap`, in key order or in
/// reverse key order.
pub struct Iter<'a, K, V> {
    cursor: Cursor<K, V>,
    marker: PhantomData<(&'a K, &'a V)>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(root: Option<NodeRef<K, V>>, order: Order, len: usize) -> Self {
        Iter {
            cursor: Cursor::new(root, order, len),
            marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor.advance()?;
        // The map is borrowed for 'a, so the node stays linked and unchanged.
        unsafe { Some(key_value(&node)) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<'a, K: 'a, V: 'a> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K: 'a, V: 'a> FusedIterator for Iter<'a, K, V> {}

/// A mutable iterator over the entries of an `RbTreeMap`, in key order.
pub struct IterMut<'a, K, V> {
    cursor: Cursor<K, V>,
    marker: PhantomData<(&'a K, &'a mut V)>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(super) fn new(root: Option<NodeRef<K, V>>, order: Order, len: usize) -> Self {
        IterMut {
            cursor: Cursor::new(root, order, len),
            marker: PhantomData,
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor.advance()?;
        // Every node is yielded once, so the &mut V handed out never alias.
        unsafe { Some(key_value_mut(&node)) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<'a, K: 'a, V: 'a> ExactSizeIterator for IterMut<'a, K, V> {}

impl<'a, K: 'a, V: 'a> FusedIterator for IterMut<'a, K, V> {}

/// An iterator over the keys of an `RbTreeMap`.
pub struct Keys<'a, K, V> {
    inner: Iter<'a, K, V>,
}

impl<'a, K, V> Keys<'a, K, V> {
    pub(super) fn new(inner: Iter<'a, K, V>) -> Self {
        Keys { inner }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K: 'a, V: 'a> ExactSizeIterator for Keys<'a, K, V> {}

impl<'a, K: 'a, V: 'a> FusedIterator for Keys<'a, K, V> {}
