//! # imradix
//!
//! An immutable (persistent) radix tree: an ordered dictionary from
//! element sequences to values with copy-on-write transactions,
//! prefix queries, ordered and range iteration, and watch-based
//! invalidation signals.
//!
//! ## Design
//!
//! - Trees are immutable handles on a published root. Reads never block
//!   and never coordinate; any number of threads may query a tree or any
//!   older snapshot of it.
//! - Mutation runs inside a [`Txn`], which clones only the nodes on each
//!   mutation path (structural sharing) and atomically publishes a new
//!   [`RadixTree`] on commit.
//! - Readers can ask for a [`Signal`] alongside any lookup; a committing
//!   transaction that tracks mutations fires the signals of everything it
//!   invalidated, either from a bounded tracked set or, past the channel
//!   limit, by diffing the snapshot against the committed root.
//!
//! ## Example
//!
//! ```rust
//! use imradix::RadixTree;
//!
//! let tree: RadixTree<u8, u32> = RadixTree::new();
//! let (tree, _) = tree.insert(b"foo", 1);
//! let (tree, _) = tree.insert(b"bar", 2);
//! let (tree, _) = tree.insert(b"foobar", 3);
//!
//! // Ordered iteration.
//! let keys: Vec<Vec<u8>> = tree.root().iter().map(|(k, _)| k.to_vec()).collect();
//! assert_eq!(keys, vec![b"bar".to_vec(), b"foo".to_vec(), b"foobar".to_vec()]);
//!
//! // Longest-prefix match.
//! let (k, v) = tree.root().longest_prefix(b"foozip").unwrap();
//! assert_eq!((k, *v), (&b"foo"[..], 1));
//!
//! // Watch a key, then invalidate it from a tracking transaction.
//! let (signal, _) = tree.get_watch(b"foo");
//! let mut txn = tree.txn();
//! txn.track_mutate(true);
//! txn.insert(b"foo", 10);
//! let _tree = txn.commit();
//! assert!(signal.has_fired());
//! ```

pub mod cache;
pub mod iter;
pub mod key;
pub mod node;
pub mod options;
pub mod signal;
pub mod tree;

mod tracing_helpers;
mod validation;

pub use cache::{NodeId, WriteCache, hash_cache, lru_cache, no_cache};
pub use iter::{Iter, PathIter, RevIter};
pub use key::KeyElem;
pub use node::Node;
pub use options::{CacheProvider, DEFAULT_CHANNEL_LIMIT, Options};
pub use signal::Signal;
pub use tree::{RadixTree, Txn};
