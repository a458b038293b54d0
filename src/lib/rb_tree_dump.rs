use crate::rb_tree_node::NodeRef;
use crate::RbTreeMap;
use std::cell::RefCell;
use std::fmt;

const SLOT_WIDTH: usize = 13;
const NIL: &str = "(nil)";

/// Level-order rendering of an `RbTreeMap`, for tracing only.
///
/// Each level goes on its own line. A node prints as `key->value(COLOR)` and
/// an absent child as `(nil)`, every slot padded to a fixed column width.
/// Trailing absent slots of a level are dropped, and output stops at the
/// first level without any node. The width of a level doubles with depth,
/// so this is meant for small trees.
pub struct LevelDump<'a, K, V> {
    map: &'a RbTreeMap<K, V>,
}

impl<'a, K, V> LevelDump<'a, K, V> {
    pub(super) fn new(map: &'a RbTreeMap<K, V>) -> Self {
        LevelDump { map }
    }
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for LevelDump<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut level: Vec<Option<NodeRef<K, V>>> = vec![self.map.root.clone()];
        while let Some(last) = level.iter().rposition(Option::is_some) {
            let mut next = Vec::with_capacity(2 * (last + 1));
            for slot in &level[..=last] {
                match slot {
                    Some(node) => {
                        let node = RefCell::borrow(node);
                        let entry = format!("{}->{}({})", node.key, node.value, node.color);
                        write!(f, "{:<width$} ", entry, width = SLOT_WIDTH)?;
                        next.push(node.left.clone());
                        next.push(node.right.clone());
                    }
                    None => {
                        write!(f, "{:<width$} ", NIL, width = SLOT_WIDTH)?;
                        next.push(None);
                        next.push(None);
                    }
                }
            }
            writeln!(f)?;
            level = next;
        }
        Ok(())
    }
}
