//! Benchmarks for `RadixTree` using Divan.
//!
//! Run with: `cargo bench --bench tree`

use divan::{Bencher, black_box};
use imradix::{Options, RadixTree};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    divan::main();
}

const KEY_COUNT: usize = 1_000;
const KEY_LEN: usize = 12;

fn random_keys() -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0xDECAF);
    (0..KEY_COUNT)
        .map(|_| (0..KEY_LEN).map(|_| rng.random_range(0..16u8)).collect())
        .collect()
}

fn populated(keys: &[Vec<u8>]) -> RadixTree<u8, u64> {
    let mut txn = RadixTree::new().txn();
    for (i, k) in keys.iter().enumerate() {
        txn.insert(k, i as u64);
    }
    txn.commit()
}

// =============================================================================
// Construction
// =============================================================================

#[divan::bench_group]
mod construction {
    use super::{RadixTree, black_box};

    #[divan::bench]
    fn new_tree() -> RadixTree<u8, u64> {
        black_box(RadixTree::new())
    }

    #[divan::bench]
    fn default_tree() -> RadixTree<u8, u64> {
        black_box(RadixTree::default())
    }
}

// =============================================================================
// Insert
// =============================================================================

#[divan::bench_group]
mod insert {
    use super::{Bencher, RadixTree, black_box, populated, random_keys};

    /// All keys in a single transaction; the writable-node set keeps the
    /// mutation path hot.
    #[divan::bench]
    fn batch_txn(bencher: Bencher) {
        let keys = random_keys();
        bencher.bench(|| {
            let mut txn = RadixTree::new().txn();
            for (i, k) in keys.iter().enumerate() {
                txn.insert(black_box(k), i as u64);
            }
            txn.commit()
        });
    }

    /// One commit per key: the structural-sharing worst case.
    #[divan::bench]
    fn commit_per_key(bencher: Bencher) {
        let keys = random_keys();
        bencher.bench(|| {
            let mut tree: RadixTree<u8, u64> = RadixTree::new();
            for (i, k) in keys.iter().enumerate() {
                (tree, _) = tree.insert(black_box(k), i as u64);
            }
            tree
        });
    }

    /// Update every key of an existing tree in one transaction.
    #[divan::bench]
    fn batch_update(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        bencher.bench(|| {
            let mut txn = tree.txn();
            for k in &keys {
                txn.insert(black_box(k), 0);
            }
            txn.commit()
        });
    }
}

// =============================================================================
// Lookup
// =============================================================================

#[divan::bench_group]
mod get {
    use super::{Bencher, black_box, populated, random_keys};

    #[divan::bench]
    fn hit(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        let mut i = 0;
        bencher.bench_local(move || {
            i = (i + 1) % keys.len();
            tree.get(black_box(&keys[i])).copied()
        });
    }

    #[divan::bench]
    fn miss(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        let absent = vec![0xFFu8; 8];
        bencher.bench(|| tree.get(black_box(&absent)).copied());
    }

    #[divan::bench]
    fn longest_prefix(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        let mut probe = keys[0].clone();
        probe.extend_from_slice(b"zip");
        bencher.bench(|| {
            tree.root()
                .longest_prefix(black_box(&probe))
                .map(|(_, v)| *v)
        });
    }
}

// =============================================================================
// Iteration
// =============================================================================

#[divan::bench_group]
mod iteration {
    use super::{Bencher, black_box, populated, random_keys};

    #[divan::bench]
    fn full_scan(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        bencher.bench(|| tree.root().iter().count());
    }

    #[divan::bench]
    fn reverse_scan(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        bencher.bench(|| tree.root().rev_iter().count());
    }

    #[divan::bench]
    fn seek_lower_bound(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        let mid = &keys[keys.len() / 2];
        bencher.bench(|| {
            let mut it = tree.root().iter();
            it.seek_lower_bound(black_box(mid));
            it.take(32).count()
        });
    }
}

// =============================================================================
// Delete
// =============================================================================

#[divan::bench_group]
mod delete {
    use super::{Bencher, black_box, populated, random_keys};

    #[divan::bench]
    fn batch_delete(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        bencher.bench(|| {
            let mut txn = tree.txn();
            for k in &keys {
                txn.delete(black_box(k));
            }
            txn.commit()
        });
    }

    #[divan::bench]
    fn delete_prefix(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        let prefix = &keys[0][..2];
        bencher.bench(|| tree.delete_prefix(black_box(prefix)));
    }
}

// =============================================================================
// Mutation tracking
// =============================================================================

#[divan::bench_group]
mod tracking {
    use super::{Bencher, Options, RadixTree, populated, random_keys};

    /// Tracked commit under the default limit: fast notify.
    #[divan::bench]
    fn tracked_commit_fast(bencher: Bencher) {
        let keys = random_keys();
        let tree = populated(&keys);
        bencher.bench(|| {
            let mut txn = tree.txn();
            txn.track_mutate(true);
            for k in keys.iter().take(64) {
                txn.insert(k, 1);
            }
            txn.commit()
        });
    }

    /// Tracked commit past a tiny limit: overflow into the tree diff.
    #[divan::bench]
    fn tracked_commit_slow(bencher: Bencher) {
        let keys = random_keys();
        let mut tree: RadixTree<u8, u64> =
            RadixTree::with_options(Options::new().channel_limit(8));
        {
            let mut txn = tree.txn();
            for (i, k) in keys.iter().enumerate() {
                txn.insert(k, i as u64);
            }
            tree = txn.commit();
        }
        bencher.bench(|| {
            let mut txn = tree.txn();
            txn.track_mutate(true);
            for k in keys.iter().take(64) {
                txn.insert(k, 1);
            }
            txn.commit()
        });
    }
}
