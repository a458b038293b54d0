use thiserror::Error;

/// A broken red-black or search-tree invariant, as reported by
/// `RbTreeMap::check_invariants`. Keys are rendered with `Debug`.
///
/// Seeing one of these means the tree code has a bug; none of them can be
/// caused by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    /// The root is red.
    #[error("root {key} is red")]
    RedRoot {
        /// Key stored at the root.
        key: String,
    },
    /// The root still carries a parent link.
    #[error("root {key} has a parent link")]
    RootHasParent {
        /// Key stored at the root.
        key: String,
    },
    /// A red node has a red child.
    #[error("red node {child} has red parent {parent}")]
    RedRed {
        /// Key of the red parent.
        parent: String,
        /// Key of the red child.
        child: String,
    },
    /// The two subtrees of a node disagree on their black-height.
    #[error("black-height differs under {key}: left {left}, right {right}")]
    BlackHeight {
        /// Key of the node whose subtrees disagree.
        key: String,
        /// Black-height of the left subtree.
        left: usize,
        /// Black-height of the right subtree.
        right: usize,
    },
    /// In-order traversal is not strictly increasing.
    #[error("keys out of order: {prev} is followed by {next}")]
    OutOfOrder {
        /// Earlier key in traversal order.
        prev: String,
        /// Later key in traversal order.
        next: String,
    },
    /// A child's parent link does not point at the node owning it.
    #[error("parent link of {key} does not point at its owner")]
    BrokenParentLink {
        /// Key of the child with the stale link.
        key: String,
    },
    /// The recorded length disagrees with the number of linked nodes.
    #[error("counted {counted} nodes but length is {recorded}")]
    LengthMismatch {
        /// Nodes reachable from the root.
        counted: usize,
        /// Value of `len()`.
        recorded: usize,
    },
}
