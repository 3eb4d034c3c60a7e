//! Validation and debugging utilities for [`RadixTree`].
//!
//! Structural invariant checking used by the test suites; cheap enough to
//! call after every commit in debugging sessions.

use crate::key::KeyElem;
use crate::node::Node;
use crate::tree::RadixTree;

impl<K: KeyElem, V> RadixTree<K, V> {
    /// Check if the tree maintains its structural invariants.
    /// Returns true if all invariants are satisfied.
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        self.check_invariants_detailed().is_ok()
    }

    /// Check invariants with detailed error reporting:
    ///
    /// - edge labels are unique and strictly ascending per node;
    /// - every non-root node has a nonempty prefix starting with the
    ///   label of the edge that reaches it;
    /// - every non-root leafless node has at least two edges;
    /// - every leaf's stored key equals the concatenation of prefixes
    ///   along its path;
    /// - the tree's size equals the number of reachable leaves.
    pub fn check_invariants_detailed(&self) -> Result<(), String> {
        let root = self.root();
        if !root.prefix.is_empty() {
            return Err("root node has a nonempty prefix".to_string());
        }

        let mut leaves = 0;
        let mut path = Vec::new();
        check_node(root, &mut path, true, &mut leaves)?;

        if leaves != self.len() {
            return Err(format!(
                "tree size {} does not match reachable leaf count {leaves}",
                self.len()
            ));
        }
        Ok(())
    }
}

fn check_node<K: KeyElem, V>(
    n: &Node<K, V>,
    path: &mut Vec<K>,
    is_root: bool,
    leaves: &mut usize,
) -> Result<(), String> {
    if !is_root {
        if n.prefix.is_empty() {
            return Err("non-root node has an empty prefix".to_string());
        }
        if n.leaf.is_none() && n.edges.len() < 2 {
            return Err(
                "non-root leafless node has fewer than two edges and was not merged".to_string(),
            );
        }
    }

    path.extend_from_slice(&n.prefix);

    if let Some(leaf) = &n.leaf {
        *leaves += 1;
        if leaf.key != *path {
            return Err("leaf key does not equal the concatenated path prefixes".to_string());
        }
    }

    for pair in n.edges.windows(2) {
        if pair[0].label >= pair[1].label {
            return Err("edge labels are not strictly ascending".to_string());
        }
    }

    for edge in &n.edges {
        if edge.node.prefix.first() != Some(&edge.label) {
            return Err("edge label does not match the first element of the child prefix"
                .to_string());
        }
        check_node(&edge.node, path, false, leaves)?;
    }

    path.truncate(path.len() - n.prefix.len());
    Ok(())
}
