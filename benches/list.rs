//! Benchmarks for `WeakList` using Divan.
//!
//! Run with: `cargo bench --bench list`

use divan::{Bencher, black_box};
use std::sync::Arc;
use std::thread;
use weaklist::{Tracked, WeakList};

fn main() {
    divan::main();
}

fn filled(n: usize) -> (WeakList<u64>, Vec<Tracked<u64>>) {
    let list = WeakList::new();
    let values: Vec<_> = (0..n as u64).map(Tracked::new).collect();
    for v in &values {
        let _ = list.add_last(v);
    }
    (list, values)
}

// =============================================================================
// Construction
// =============================================================================

#[divan::bench_group]
mod construction {
    use super::WeakList;

    #[divan::bench]
    fn new_list() -> WeakList<u64> {
        WeakList::new()
    }

    #[divan::bench]
    fn default_list() -> WeakList<u64> {
        WeakList::default()
    }
}

// =============================================================================
// Insert Operations
// =============================================================================

#[divan::bench_group]
mod insert {
    use super::{Bencher, Tracked, black_box, filled};

    #[divan::bench(args = [100, 1000, 10000])]
    fn add_last(bencher: Bencher, n: usize) {
        let value = Tracked::new(42_u64);
        bencher.with_inputs(|| filled(n)).bench_local_values(|(list, values)| {
            let _ = list.add_last(black_box(&value));
            (list, values)
        });
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn add_first(bencher: Bencher, n: usize) {
        let value = Tracked::new(42_u64);
        bencher.with_inputs(|| filled(n)).bench_local_values(|(list, values)| {
            let _ = list.add_first(black_box(&value));
            (list, values)
        });
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn insert_at_middle(bencher: Bencher, n: usize) {
        let value = Tracked::new(42_u64);
        bencher.with_inputs(|| filled(n)).bench_local_values(|(list, values)| {
            let _ = list.insert_at(black_box(n / 2), &value);
            (list, values)
        });
    }

    #[divan::bench(args = [100, 1000])]
    fn add_after_removed_anchor(bencher: Bencher, n: usize) {
        let value = Tracked::new(42_u64);
        bencher
            .with_inputs(|| {
                let (list, values) = filled(n);
                let anchor = list.node_at(n / 2).ok();
                if let Some(anchor) = &anchor {
                    let _ = anchor.remove();
                }
                (list, values, anchor)
            })
            .bench_local_values(|(list, values, anchor)| {
                if let Some(anchor) = &anchor {
                    let _ = list.add_after(black_box(anchor), &value);
                }
                (list, values)
            });
    }
}

// =============================================================================
// Positional Queries
// =============================================================================

#[divan::bench_group]
mod position {
    use super::{Bencher, black_box, filled};

    #[divan::bench(args = [100, 1000, 10000])]
    fn node_at(bencher: Bencher, n: usize) {
        let (list, _values) = filled(n);
        let mut i = 0;
        bencher.bench_local(|| {
            i = (i + 7) % n;
            list.node_at(black_box(i))
        });
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn index_of(bencher: Bencher, n: usize) {
        let (list, _values) = filled(n);
        let nodes: Vec<_> = list.nodes().collect();
        let mut i = 0;
        bencher.bench_local(|| {
            i = (i + 7) % n;
            list.index_of(black_box(&nodes[i]))
        });
    }
}

// =============================================================================
// Iteration
// =============================================================================

#[divan::bench_group]
mod iteration {
    use super::{Bencher, black_box, filled};

    #[divan::bench(args = [100, 1000, 10000])]
    fn nodes_forward(bencher: Bencher, n: usize) {
        let (list, _values) = filled(n);
        bencher.bench_local(|| black_box(list.nodes().count()));
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn values_forward(bencher: Bencher, n: usize) {
        let (list, _values) = filled(n);
        bencher.bench_local(|| list.iter().map(|v| *v).sum::<u64>());
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn values_reverse(bencher: Bencher, n: usize) {
        let (list, _values) = filled(n);
        bencher.bench_local(|| list.iter_rev().map(|v| *v).sum::<u64>());
    }

    #[divan::bench(args = [100, 1000])]
    fn to_vec(bencher: Bencher, n: usize) {
        let (list, _values) = filled(n);
        bencher.bench_local(|| list.to_vec());
    }
}

// =============================================================================
// Removal
// =============================================================================

#[divan::bench_group]
mod removal {
    use super::{Bencher, Tracked, WeakList, black_box, filled};

    #[divan::bench(args = [100, 1000, 10000])]
    fn remove_middle(bencher: Bencher, n: usize) {
        bencher
            .with_inputs(|| {
                let (list, values) = filled(n);
                let node = list.node_at(n / 2).ok();
                (list, values, node)
            })
            .bench_local_values(|(list, values, node)| {
                if let Some(node) = &node {
                    let _ = list.remove(black_box(node));
                }
                (list, values)
            });
    }

    // Every node bound to one value: each removal cancels one of n hooks.
    #[divan::bench(args = [100, 1000, 10000])]
    fn remove_all_shared_value(bencher: Bencher, n: usize) {
        bencher
            .with_inputs(|| {
                let list = WeakList::new();
                let shared = Tracked::new(0_u64);
                let nodes: Vec<_> = (0..n).filter_map(|_| list.add_last(&shared).ok()).collect();
                (list, shared, nodes)
            })
            .bench_local_values(|(list, shared, nodes)| {
                for node in &nodes {
                    let _ = list.remove(black_box(node));
                }
                (list, shared)
            });
    }

    #[divan::bench(args = [100, 1000, 10000])]
    fn value_drop_reclaims(bencher: Bencher, n: usize) {
        bencher
            .with_inputs(|| filled(n))
            .bench_local_values(|(list, mut values)| {
                drop(black_box(values.swap_remove(n / 2)));
                (list, values)
            });
    }

    #[divan::bench(args = [100, 1000])]
    fn clear(bencher: Bencher, n: usize) {
        bencher
            .with_inputs(|| filled(n))
            .bench_local_values(|(list, values)| {
                let _ = list.clear();
                (list, values)
            });
    }
}

// =============================================================================
// Concurrent
// =============================================================================

#[divan::bench_group]
mod concurrent {
    use super::{Arc, Bencher, Tracked, WeakList, thread};

    const PER_THREAD: usize = 1000;

    #[divan::bench(args = [1, 2, 4, 8])]
    fn parallel_add_last(bencher: Bencher, threads: usize) {
        bencher.with_inputs(|| Arc::new(WeakList::<u64>::new())).bench_local_values(|list| {
            thread::scope(|s| {
                for t in 0..threads {
                    let list = &list;
                    s.spawn(move || {
                        let values: Vec<_> =
                            (0..PER_THREAD as u64).map(|i| Tracked::new(t as u64 * 10_000 + i)).collect();
                        for v in &values {
                            let _ = list.add_last(v);
                        }
                        values
                    });
                }
            });
            list
        });
    }
}
