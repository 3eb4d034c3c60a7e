//! Filepath: src/tree.rs
//!
//! `RadixTree` and its copy-on-write transaction engine.
//!
//! A [`RadixTree`] is an immutable handle on a published root: once a
//! commit produces it, the node graph below it never changes and may be
//! read from any number of threads without coordination. All mutation
//! flows through a [`Txn`], which clones exactly the nodes on each
//! mutation path (structural sharing) and atomically publishes a new tree
//! on commit.
//!
//! # Mutation tracking
//!
//! With [`Txn::track_mutate`] enabled, a transaction accumulates the
//! invalidation signals of every node and leaf it replaces and fires them
//! all when [`Txn::notify`] runs (normally via [`Txn::commit`]). The
//! accumulated set is bounded by the tree's channel limit; overflowing it
//! switches notification to a full structural diff between the
//! transaction's snapshot root and its committed root.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::cache::{NodeId, WriteCache};
use crate::key::{self, KeyElem};
use crate::node::{Edge, Leaf, Node};
use crate::options::Options;
use crate::signal::Signal;
use crate::tracing_helpers::{debug_log, trace_log, warn_log};

// ============================================================================
//  RadixTree
// ============================================================================

/// An immutable radix tree mapping element sequences to values.
///
/// Cloning a tree is O(1): clones share the entire node graph. Mutating
/// operations return a *new* tree and leave the receiver untouched, so a
/// reader holding an old handle keeps seeing the old contents.
///
/// # Example
///
/// ```rust
/// use imradix::RadixTree;
///
/// let tree: RadixTree<u8, u32> = RadixTree::new();
/// let (tree, _) = tree.insert(b"foo", 1);
/// let (tree, _) = tree.insert(b"foobar", 2);
///
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree.get(b"foo"), Some(&1));
/// assert_eq!(
///     tree.root().longest_prefix(b"foozip").map(|(k, v)| (k.to_vec(), *v)),
///     Some((b"foo".to_vec(), 1)),
/// );
/// ```
pub struct RadixTree<K, V> {
    options: Options,
    root: Arc<Node<K, V>>,
    size: usize,
}

impl<K: KeyElem, V> RadixTree<K, V> {
    /// Create an empty tree with default [`Options`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    /// Create an empty tree with explicit options.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            root: Arc::new(Node::with_prefix(Vec::new())),
            size: 0,
        }
    }

    /// Number of entries in the tree.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check whether the tree holds no entries.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The root node, for richer read-only queries and iteration.
    #[must_use]
    #[inline]
    pub fn root(&self) -> &Node<K, V> {
        self.root.as_ref()
    }

    /// Look up `key`.
    #[must_use]
    pub fn get(&self, key: &[K]) -> Option<&V> {
        self.root.get(key)
    }

    /// Look up `key`, also returning the finest-grained invalidation
    /// signal on its lookup path. See [`Node::get_watch`].
    #[must_use]
    pub fn get_watch(&self, key: &[K]) -> (Signal, Option<&V>) {
        self.root.get_watch(key)
    }

    /// Start a transaction anchored on this tree.
    #[must_use]
    pub fn txn(&self) -> Txn<K, V> {
        Txn {
            options: self.options.clone(),
            root: Arc::clone(&self.root),
            snap: Arc::clone(&self.root),
            size: self.size,
            writable: None,
            retained: Vec::new(),
            tracked: HashSet::new(),
            track_overflow: false,
            track_mutate: false,
        }
    }

    /// Insert or update `key`, returning the new tree and the previous
    /// value if the key was already present.
    #[must_use]
    pub fn insert(&self, key: &[K], value: V) -> (Self, Option<V>)
    where
        V: Clone,
    {
        let mut txn = self.txn();
        let old = txn.insert(key, value);
        (txn.commit(), old)
    }

    /// Delete `key`, returning the new tree and the removed value if the
    /// key was present.
    #[must_use]
    pub fn delete(&self, key: &[K]) -> (Self, Option<V>)
    where
        V: Clone,
    {
        let mut txn = self.txn();
        let old = txn.delete(key);
        (txn.commit(), old)
    }

    /// Delete every entry under `prefix`, returning the new tree and
    /// whether anything was deleted.
    #[must_use]
    pub fn delete_prefix(&self, prefix: &[K]) -> (Self, bool) {
        let mut txn = self.txn();
        let deleted = txn.delete_prefix(prefix);
        (txn.commit(), deleted)
    }
}

impl<K: KeyElem, V> Clone for RadixTree<K, V> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            root: Arc::clone(&self.root),
            size: self.size,
        }
    }
}

impl<K: KeyElem, V> Default for RadixTree<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: KeyElem + fmt::Debug, V: fmt::Debug> fmt::Debug for RadixTree<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.root.iter()).finish()
    }
}

impl<K: KeyElem, V: Clone> FromIterator<(Vec<K>, V)> for RadixTree<K, V> {
    fn from_iter<I: IntoIterator<Item = (Vec<K>, V)>>(iter: I) -> Self {
        let mut txn = Self::new().txn();
        for (key, value) in iter {
            txn.insert(&key, value);
        }
        txn.commit()
    }
}

// ============================================================================
//  Txn
// ============================================================================

/// A copy-on-write transaction on a [`RadixTree`].
///
/// A transaction is single-owner: `&mut` receivers enforce exclusive
/// mutation, and the whole value may be moved to another thread. Use
/// [`clone_txn`](Self::clone_txn) to fork an independent transaction that
/// shares the work so far but diverges from here on.
///
/// Dropping an uncommitted transaction discards its changes.
pub struct Txn<K, V> {
    options: Options,

    /// Mutable root of this transaction's working tree.
    root: Arc<Node<K, V>>,

    /// Snapshot of the root at transaction start, kept for the slow
    /// notification diff.
    snap: Arc<Node<K, V>>,

    /// Entry count of the working tree.
    size: usize,

    /// Nodes cloned by this transaction, so a second write to one reuses
    /// its signal instead of allocating and tracking another.
    writable: Option<Box<dyn WriteCache>>,

    /// The cache keys on node addresses; retaining every registered node
    /// guarantees an address is never recycled while its entry is live.
    retained: Vec<Arc<Node<K, V>>>,

    /// Signals to fire on notify, identity-deduplicated.
    tracked: HashSet<Signal>,
    track_overflow: bool,
    track_mutate: bool,
}

impl<K: KeyElem, V> Txn<K, V> {
    /// Toggle mutation tracking. When enabled, committing fires the
    /// invalidation signals of every node and leaf the transaction
    /// replaced.
    pub fn track_mutate(&mut self, track: bool) {
        self.track_mutate = track;
    }

    /// Fork an independent transaction.
    ///
    /// The fork contains every uncommitted write made so far; further
    /// mutation of either transaction leaves the other untouched, and the
    /// two commit to distinct trees. The fork starts with mutation
    /// tracking off and an empty writable-node set; the originating
    /// transaction's writable set is dropped as well, since its nodes are
    /// now shared with the fork.
    #[must_use]
    pub fn clone_txn(&mut self) -> Txn<K, V> {
        if let Some(cache) = self.writable.as_mut() {
            cache.clear();
        }
        self.writable = None;
        self.retained.clear();

        Txn {
            options: self.options.clone(),
            root: Arc::clone(&self.root),
            snap: Arc::clone(&self.snap),
            size: self.size,
            writable: None,
            retained: Vec::new(),
            tracked: HashSet::new(),
            track_overflow: false,
            track_mutate: false,
        }
    }

    /// The working root, reflecting all uncommitted writes. Not stable
    /// across further mutation; re-fetch after each write.
    #[must_use]
    pub fn root(&self) -> &Node<K, V> {
        self.root.as_ref()
    }

    /// Look up `key` in the working tree (read-your-writes).
    #[must_use]
    pub fn get(&self, key: &[K]) -> Option<&V> {
        self.root.get(key)
    }

    /// Look up `key` in the working tree, also returning the
    /// finest-grained invalidation signal on its lookup path.
    #[must_use]
    pub fn get_watch(&self, key: &[K]) -> (Signal, Option<&V>) {
        self.root.get_watch(key)
    }

    // ========================================================================
    //  Mutation
    // ========================================================================

    /// Insert or update `key`, returning the previous value if the key
    /// was already present.
    pub fn insert(&mut self, key: &[K], value: V) -> Option<V>
    where
        V: Clone,
    {
        let root = Arc::clone(&self.root);
        let (new_root, old) = self.insert_rec(&root, key, key, value);
        self.root = new_root;
        if old.is_none() {
            self.size += 1;
        }
        old
    }

    /// Delete `key`, returning the removed value if the key was present.
    pub fn delete(&mut self, key: &[K]) -> Option<V>
    where
        V: Clone,
    {
        let root = Arc::clone(&self.root);
        let (new_root, leaf) = self.delete_rec(&root, key)?;
        self.root = new_root;
        self.size -= 1;
        Some(leaf.value.clone())
    }

    /// Delete every entry under `prefix`. Returns whether anything was
    /// deleted.
    pub fn delete_prefix(&mut self, prefix: &[K]) -> bool {
        let root = Arc::clone(&self.root);
        match self.delete_prefix_rec(&root, prefix) {
            Some((new_root, count)) => {
                trace_log!(count, "delete_prefix removed subtree");
                self.root = new_root;
                self.size -= count;
                count > 0
            }
            None => false,
        }
    }

    fn insert_rec(
        &mut self,
        n: &Arc<Node<K, V>>,
        key: &[K],
        search: &[K],
        value: V,
    ) -> (Arc<Node<K, V>>, Option<V>)
    where
        V: Clone,
    {
        // Search exhausted: this node holds the entry.
        if search.is_empty() {
            let old = n.leaf.as_ref().map(|leaf| leaf.value.clone());
            let mut nc = self.write_node(n, true);
            nc.leaf = Some(Arc::new(Leaf {
                signal: Signal::new(),
                key: key.to_vec(),
                value,
            }));
            return (self.seal(nc), old);
        }

        let Some((idx, child)) = n.get_edge(search[0]) else {
            // No edge: hang a fresh leaf node off this one.
            let leaf_node = Node::leaf_node(
                search.to_vec(),
                Arc::new(Leaf {
                    signal: Signal::new(),
                    key: key.to_vec(),
                    value,
                }),
            );
            let mut nc = self.write_node(n, false);
            nc.add_edge(Edge {
                label: search[0],
                node: Arc::new(leaf_node),
            });
            return (self.seal(nc), None);
        };
        let child = Arc::clone(child);

        let common = key::common_prefix_len(search, &child.prefix);
        if common == child.prefix.len() {
            // The child's whole prefix matches: descend.
            let (new_child, old) = self.insert_rec(&child, key, &search[common..], value);
            let mut nc = self.write_node(n, false);
            nc.edges[idx].node = new_child;
            return (self.seal(nc), old);
        }

        // Partial match: split the edge at the divergence point.
        let mut nc = self.write_node(n, false);
        let mut split = Node::with_prefix(search[..common].to_vec());

        // Re-hang the existing child below the split node with its prefix
        // shortened by the consumed part.
        let mut mod_child = self.write_node(&child, false);
        let child_label = mod_child.prefix[common];
        mod_child.prefix = mod_child.prefix[common..].to_vec();
        split.add_edge(Edge {
            label: child_label,
            node: self.seal(mod_child),
        });

        let leaf = Arc::new(Leaf {
            signal: Signal::new(),
            key: key.to_vec(),
            value,
        });
        let rest = &search[common..];
        if rest.is_empty() {
            // The new key ends exactly at the split point.
            split.leaf = Some(leaf);
        } else {
            split.add_edge(Edge {
                label: rest[0],
                node: Arc::new(Node::leaf_node(rest.to_vec(), leaf)),
            });
        }

        nc.replace_edge(search[0], Arc::new(split));
        (self.seal(nc), None)
    }

    fn delete_rec(
        &mut self,
        n: &Arc<Node<K, V>>,
        search: &[K],
    ) -> Option<(Arc<Node<K, V>>, Arc<Leaf<K, V>>)> {
        // Search exhausted: remove this node's leaf, if any.
        if search.is_empty() {
            let old_leaf = Arc::clone(n.leaf.as_ref()?);
            let mut nc = self.write_node(n, true);
            nc.leaf = None;

            // A non-root node left with a single edge and no entry must
            // be merged with its child.
            if !Arc::ptr_eq(n, &self.root) && nc.edges.len() == 1 {
                self.merge_child(&mut nc);
            }
            return Some((self.seal(nc), old_leaf));
        }

        let label = search[0];
        let (idx, child) = n.get_edge(label)?;
        if !key::has_prefix(search, &child.prefix) {
            return None;
        }
        let child = Arc::clone(child);

        let rest = &search[child.prefix.len()..];
        let (new_child, leaf) = self.delete_rec(&child, rest)?;

        let mut nc = self.write_node(n, false);
        if new_child.leaf.is_none() && new_child.edges.is_empty() {
            // The child emptied out entirely: drop its edge, then merge
            // if that leaves a single-edge leafless non-root node.
            nc.del_edge(label);
            if !Arc::ptr_eq(n, &self.root) && nc.edges.len() == 1 && !nc.is_leaf() {
                self.merge_child(&mut nc);
            }
        } else {
            nc.edges[idx].node = new_child;
        }
        Some((self.seal(nc), leaf))
    }

    fn delete_prefix_rec(
        &mut self,
        n: &Arc<Node<K, V>>,
        search: &[K],
    ) -> Option<(Arc<Node<K, V>>, usize)> {
        // Search exhausted: this whole subtree goes away.
        if search.is_empty() {
            let mut nc = self.write_node(n, true);
            nc.leaf = None;
            nc.edges.clear();
            let count = self.track_subtree_and_count(n);
            return Some((self.seal(nc), count));
        }

        let label = search[0];
        let (idx, child) = n.get_edge(label)?;
        // Match in either direction so a search longer than any stored
        // node can still land inside a subtree.
        if !key::has_prefix(&child.prefix, search) && !key::has_prefix(search, &child.prefix) {
            return None;
        }
        let child = Arc::clone(child);

        let rest: &[K] = if child.prefix.len() > search.len() {
            &[]
        } else {
            &search[child.prefix.len()..]
        };
        let (new_child, count) = self.delete_prefix_rec(&child, rest)?;

        let mut nc = self.write_node(n, false);
        if new_child.leaf.is_none() && new_child.edges.is_empty() {
            nc.del_edge(label);
            if !Arc::ptr_eq(n, &self.root) && nc.edges.len() == 1 && !nc.is_leaf() {
                self.merge_child(&mut nc);
            }
        } else {
            nc.edges[idx].node = new_child;
        }
        Some((self.seal(nc), count))
    }

    // ========================================================================
    //  Copy-on-write plumbing
    // ========================================================================

    /// Produce a mutable copy of `n` for this transaction.
    ///
    /// On a writable-set hit the copy keeps the node's existing signal and
    /// nothing new is tracked (the node already belongs to this
    /// transaction). On a miss the copy gets a fresh signal and, under
    /// tracking, the replaced node's signal is queued for firing. Pass
    /// `for_leaf_update` when the caller is about to replace the leaf, so
    /// the old leaf's signal is queued too.
    fn write_node(&mut self, n: &Arc<Node<K, V>>, for_leaf_update: bool) -> Node<K, V> {
        if self.writable.is_none() {
            self.writable = Some((self.options.cache_provider)());
        }
        let mut hit = false;
        if let Some(cache) = self.writable.as_mut() {
            hit = cache.contains(NodeId::of(n));
        }

        if hit {
            // The first write already tracked the node; a leaf update may
            // still need to track the leaf it replaces.
            if self.track_mutate && for_leaf_update {
                if let Some(leaf) = &n.leaf {
                    let signal = leaf.signal.clone();
                    self.track_signal(&signal);
                }
            }
            return Node {
                signal: n.signal.clone(),
                leaf: n.leaf.clone(),
                prefix: n.prefix.clone(),
                edges: n.edges.clone(),
            };
        }

        if self.track_mutate {
            let signal = n.signal.clone();
            self.track_signal(&signal);
            if for_leaf_update {
                if let Some(leaf) = &n.leaf {
                    let signal = leaf.signal.clone();
                    self.track_signal(&signal);
                }
            }
        }

        Node {
            signal: Signal::new(),
            leaf: n.leaf.clone(),
            prefix: n.prefix.clone(),
            edges: n.edges.clone(),
        }
    }

    /// Publish a node produced by [`write_node`](Self::write_node) into
    /// the working tree and register it as writable.
    fn seal(&mut self, n: Node<K, V>) -> Arc<Node<K, V>> {
        let arc = Arc::new(n);
        if let Some(cache) = self.writable.as_mut() {
            cache.insert(NodeId::of(&arc));
            self.retained.push(Arc::clone(&arc));
        }
        arc
    }

    /// Collapse `n` with its only child: the child's prefix, entry, and
    /// edges move up. The merged-away child counts as invalidated.
    fn merge_child(&mut self, n: &mut Node<K, V>) {
        let child = Arc::clone(&n.edges[0].node);
        if self.track_mutate {
            let signal = child.signal.clone();
            self.track_signal(&signal);
        }

        n.prefix.extend_from_slice(&child.prefix);
        n.leaf = child.leaf.clone();
        n.edges = child.edges.clone();
    }

    // ========================================================================
    //  Mutation tracking
    // ========================================================================

    /// Queue a signal for firing at notify, bounded by the channel limit.
    /// Exceeding the limit drops the whole set and flags overflow; the
    /// slow diff recomputes the exact set at notify time.
    fn track_signal(&mut self, signal: &Signal) {
        if self.track_overflow {
            return;
        }
        if self.tracked.len() >= self.options.channel_limit {
            warn_log!(
                limit = self.options.channel_limit,
                "mutation tracking overflowed; notify will run a full tree diff"
            );
            self.track_overflow = true;
            self.tracked = HashSet::new();
            return;
        }
        self.tracked.insert(signal.clone());
    }

    /// Queue every signal in the subtree under `n` and count its entries.
    fn track_subtree_and_count(&mut self, n: &Node<K, V>) -> usize {
        let mut leaves = 0;
        if let Some(leaf) = &n.leaf {
            leaves = 1;
            if self.track_mutate {
                let signal = leaf.signal.clone();
                self.track_signal(&signal);
            }
        }
        if self.track_mutate {
            let signal = n.signal.clone();
            self.track_signal(&signal);
        }
        for edge in &n.edges {
            leaves += self.track_subtree_and_count(&edge.node);
        }
        leaves
    }

    // ========================================================================
    //  Commit
    // ========================================================================

    /// Finalize the transaction and return the new tree, firing tracked
    /// notifications.
    #[must_use]
    pub fn commit(&mut self) -> RadixTree<K, V> {
        let tree = self.commit_only();
        if self.track_mutate {
            self.notify();
        }
        tree
    }

    /// Finalize the transaction and return the new tree without issuing
    /// notifications; call [`notify`](Self::notify) separately once the
    /// new tree is visible wherever it needs to be.
    #[must_use]
    pub fn commit_only(&mut self) -> RadixTree<K, V> {
        debug_log!(size = self.size, "commit");
        let tree = RadixTree {
            options: self.options.clone(),
            root: Arc::clone(&self.root),
            size: self.size,
        };
        if let Some(cache) = self.writable.as_mut() {
            cache.clear();
        }
        self.writable = None;
        self.retained.clear();
        tree
    }

    /// Fire the signals of everything this transaction invalidated.
    ///
    /// A no-op when tracking is off. Safe to call again after a commit:
    /// the tracked state is drained, so a repeat fires nothing.
    pub fn notify(&mut self) {
        if !self.track_mutate {
            return;
        }

        if self.track_overflow {
            trace_log!("notify: tracking overflowed, running slow diff");
            self.slow_notify();
        } else {
            trace_log!(count = self.tracked.len(), "notify: firing tracked signals");
            for signal in self.tracked.drain() {
                signal.fire();
            }
        }

        // Reset so a re-notify is a clean no-op.
        self.tracked = HashSet::new();
        self.track_overflow = false;
    }

    /// Full structural diff between the snapshot root and the committed
    /// root, firing the signal of every snapshot node or leaf that no
    /// longer exists at the same path with the same identity.
    fn slow_notify(&mut self) {
        let snap = Arc::clone(&self.snap);
        let root = Arc::clone(&self.root);
        let mut snap_iter = snap.raw_iter();
        let mut root_iter = root.raw_iter();

        while snap_iter.front().is_some() || root_iter.front().is_some() {
            // Snapshot exhausted: nothing left can have been invalidated.
            let Some(snap_elem) = snap_iter.front() else {
                return;
            };

            // Root exhausted: everything remaining in the snapshot was
            // removed.
            let Some(root_elem) = root_iter.front() else {
                snap_elem.signal.fire();
                if let Some(leaf) = &snap_elem.leaf {
                    leaf.signal.fire();
                }
                snap_iter.advance();
                continue;
            };

            match snap_iter.path().cmp(root_iter.path()) {
                // Snapshot is behind the root: this node was deleted.
                std::cmp::Ordering::Less => {
                    snap_elem.signal.fire();
                    if let Some(leaf) = &snap_elem.leaf {
                        leaf.signal.fire();
                    }
                    snap_iter.advance();
                }
                // Root is behind the snapshot: this node was added.
                std::cmp::Ordering::Greater => {
                    root_iter.advance();
                }
                // Same path: fire if the node (and possibly its leaf) was
                // replaced by a different object.
                std::cmp::Ordering::Equal => {
                    if !std::ptr::eq(snap_elem, root_elem) {
                        snap_elem.signal.fire();
                        if let Some(leaf) = &snap_elem.leaf {
                            let same_leaf = root_elem
                                .leaf
                                .as_ref()
                                .is_some_and(|root_leaf| Arc::ptr_eq(leaf, root_leaf));
                            if !same_leaf {
                                leaf.signal.fire();
                            }
                        }
                    }
                    snap_iter.advance();
                    root_iter.advance();
                }
            }
        }
    }
}

impl<K: KeyElem, V> fmt::Debug for Txn<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Txn")
            .field("size", &self.size)
            .field("track_mutate", &self.track_mutate)
            .field("track_overflow", &self.track_overflow)
            .finish_non_exhaustive()
    }
}
