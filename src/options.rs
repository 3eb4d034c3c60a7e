//! Filepath: src/options.rs
//!
//! Tree construction options.
//!
//! Options are captured when a tree is created and are inherited by every
//! transaction and every tree derived from it.

use std::fmt;
use std::sync::Arc;

use crate::cache::{self, WriteCache};

/// Maximum number of signals held by fast-mode mutation tracking before a
/// transaction overflows to the full tree-diff notification algorithm.
pub const DEFAULT_CHANNEL_LIMIT: usize = 8192;

/// Initial capacity of the default writable-node-set backend.
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

/// Factory for writable-node-set backends.
///
/// Called once per transaction, on its first write.
pub type CacheProvider = Arc<dyn Fn() -> Box<dyn WriteCache> + Send + Sync>;

/// Configuration for [`RadixTree`](crate::RadixTree) construction.
///
/// # Example
///
/// ```rust
/// use imradix::{Options, RadixTree, cache};
///
/// let opts = Options::new()
///     .channel_limit(64)
///     .cache_provider(cache::lru_cache(32));
/// let tree: RadixTree<u8, u32> = RadixTree::with_options(opts);
/// ```
#[derive(Clone)]
pub struct Options {
    pub(crate) cache_provider: CacheProvider,
    pub(crate) channel_limit: usize,
}

impl Options {
    /// Default options: hash-set write cache, channel limit of
    /// [`DEFAULT_CHANNEL_LIMIT`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_provider: cache::hash_cache(DEFAULT_CACHE_CAPACITY),
            channel_limit: DEFAULT_CHANNEL_LIMIT,
        }
    }

    /// Select the writable-node-set backend.
    #[must_use]
    pub fn cache_provider(mut self, provider: CacheProvider) -> Self {
        self.cache_provider = provider;
        self
    }

    /// Set the fast-notify signal bound. A transaction that tracks more
    /// signals than this falls back to the slow tree-diff notification.
    #[must_use]
    pub fn channel_limit(mut self, limit: usize) -> Self {
        self.channel_limit = limit;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("channel_limit", &self.channel_limit)
            .finish_non_exhaustive()
    }
}
