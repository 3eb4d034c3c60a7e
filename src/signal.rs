//! Filepath: src/signal.rs
//!
//! One-shot invalidation signals.
//!
//! Every node and every leaf carries a [`Signal`]. Readers obtain one via
//! the `get_watch` family of operations; a committing transaction that
//! tracks mutations fires the signals of everything it invalidated.
//!
//! A signal has exactly two states, armed and fired, and the transition is
//! one-way: once fired it never re-arms. Firing is idempotent, which lets
//! a stray re-notify pass through harmlessly. Handles are cheap to clone
//! and many readers may hold handles to the same signal.
//!
//! There is deliberately no blocking wait: subscribers poll
//! [`Signal::has_fired`] with whatever cadence suits them.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Ordering for polling the fired flag. Pairs with the firing store.
const POLL_ORD: Ordering = Ordering::Acquire;

/// Ordering for the armed -> fired transition. Release publishes the
/// invalidation to pollers; Acquire lets the firing thread observe a
/// racing fire.
const FIRE_ORD: Ordering = Ordering::AcqRel;

/// A one-shot, edge-triggered invalidation token.
///
/// Equality and hashing are identity-based: two handles are equal iff they
/// refer to the same underlying signal. A transaction relies on this to
/// deduplicate the set of signals it will fire on commit.
pub struct Signal {
    fired: Arc<AtomicBool>,
}

impl Signal {
    /// Create a new armed signal.
    pub(crate) fn new() -> Self {
        Self {
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether the signal has fired.
    #[must_use]
    #[inline]
    pub fn has_fired(&self) -> bool {
        self.fired.load(POLL_ORD)
    }

    /// Fire the signal. Returns `true` if this call performed the
    /// armed -> fired transition, `false` if it had already fired.
    #[inline]
    pub(crate) fn fire(&self) -> bool {
        !self.fired.swap(true, FIRE_ORD)
    }

    /// Stable identity of the underlying signal.
    #[inline]
    fn id(&self) -> usize {
        Arc::as_ptr(&self.fired) as usize
    }
}

impl Clone for Signal {
    fn clone(&self) -> Self {
        Self {
            fired: Arc::clone(&self.fired),
        }
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fired, &other.fired)
    }
}

impl Eq for Signal {}

impl Hash for Signal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("fired", &self.has_fired())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Signal;
    use std::collections::HashSet;

    #[test]
    fn test_fire_once() {
        let s = Signal::new();
        assert!(!s.has_fired());
        assert!(s.fire());
        assert!(s.has_fired());
        assert!(!s.fire());
        assert!(s.has_fired());
    }

    #[test]
    fn test_clone_shares_state() {
        let s = Signal::new();
        let c = s.clone();
        s.fire();
        assert!(c.has_fired());
    }

    #[test]
    fn test_identity_dedup() {
        let a = Signal::new();
        let b = Signal::new();
        let mut set = HashSet::new();
        set.insert(a.clone());
        set.insert(a.clone());
        set.insert(b.clone());
        assert_eq!(set.len(), 2);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
