//! Filepath: src/key.rs
//!
//! Key-element abstraction for [`RadixTree`](crate::RadixTree).
//!
//! Keys are finite sequences of elements; the tree compares keys
//! lexicographically on the element order. Elements must be cheap to copy
//! because node prefixes and edge labels store them by value.

/// Marker trait for radix-tree key elements.
///
/// Automatically implemented for every `Copy + Ord` type, so byte keys
/// (`&[u8]`), char keys, integer keys, and similar all work out of the box.
///
/// # Example
///
/// ```rust
/// use imradix::RadixTree;
///
/// let tree: RadixTree<u8, u32> = RadixTree::new();
/// let (tree, _) = tree.insert(b"key", 1);
/// assert_eq!(tree.get(b"key"), Some(&1));
/// ```
pub trait KeyElem: Copy + Ord {}

impl<T: Copy + Ord> KeyElem for T {}

/// Check whether `s` starts with `prefix`.
#[inline]
pub(crate) fn has_prefix<K: KeyElem>(s: &[K], prefix: &[K]) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()] == *prefix
}

/// Length of the longest common prefix of `a` and `b`.
#[inline]
pub(crate) fn common_prefix_len<K: KeyElem>(a: &[K], b: &[K]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}
