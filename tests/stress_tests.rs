//! Multi-threaded stress tests for `WeakList`.
//!
//! These tests try to expose races between:
//! - positional inserts from many threads
//! - explicit removal racing reclaim hooks for the same node
//! - cursors walking while nodes are inserted and removed around them
//! - dispose racing every other operation
//!
//! Run with:
//! ```bash
//! cargo nextest run --test stress_tests --release
//! RUST_LOG=weaklist=trace cargo test --features tracing --test stress_tests
//! ```

#![expect(clippy::unwrap_used, reason = "fail fast in tests")]

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use weaklist::{ListError, Tracked, WeakList};

const THREADS: usize = 8;

#[test]
fn concurrent_appends_keep_every_value() {
    common::init_tracing();
    const PER_THREAD: u32 = 500;

    let list = Arc::new(WeakList::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS as u32)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let values: Vec<_> = (0..PER_THREAD).map(|i| Tracked::new(t * PER_THREAD + i)).collect();
                for v in &values {
                    list.add_last(v).unwrap();
                }
                values
            })
        })
        .collect();

    let kept: Vec<Tracked<u32>> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

    assert_eq!(list.count().unwrap(), kept.len());
    list.validate().unwrap();

    // Each thread's values appear in its own insertion order.
    let seen: Vec<u32> = list.iter().map(|v| *v).collect();
    for t in 0..THREADS as u32 {
        let own: Vec<u32> = seen.iter().copied().filter(|v| v / PER_THREAD == t).collect();
        assert!(own.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(own.len(), PER_THREAD as usize);
    }
}

#[test]
fn removal_races_value_drop() {
    const ROUNDS: usize = 2_000;

    let list = Arc::new(WeakList::new());
    let wins = Arc::new(AtomicUsize::new(0));

    for _ in 0..ROUNDS {
        let value = Tracked::new(0_u64);
        let node = list.add_last(&value).unwrap();
        let barrier = Arc::new(Barrier::new(2));

        let remover = {
            let barrier = Arc::clone(&barrier);
            let wins = Arc::clone(&wins);
            thread::spawn(move || {
                barrier.wait();
                if node.remove().unwrap() {
                    wins.fetch_add(1, Ordering::SeqCst);
                }
                node
            })
        };

        barrier.wait();
        drop(value);

        let node = remover.join().unwrap();
        assert!(node.is_removed());
    }

    assert_eq!(list.count(), Ok(0));
    list.validate().unwrap();
    // At most one winner per round.
    assert!(wins.load(Ordering::SeqCst) <= ROUNDS);
}

#[test]
fn mixed_workload_stays_consistent() {
    const OPS: usize = 3_000;

    let list = Arc::new(WeakList::new());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let list = Arc::clone(&list);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut held: Vec<Tracked<usize>> = Vec::new();
                let mut state = t as u64 + 1;

                for i in 0..OPS {
                    // xorshift
                    state ^= state << 13;
                    state ^= state >> 7;
                    state ^= state << 17;

                    match state % 6 {
                        0 | 1 => {
                            let v = Tracked::new(t * OPS + i);
                            list.add_last(&v).unwrap();
                            held.push(v);
                        }
                        2 => {
                            let v = Tracked::new(t * OPS + i);
                            let len = list.count().unwrap();
                            // Another thread may shrink the list in between.
                            match list.insert_at((state as usize) % (len + 1), &v) {
                                Ok(_) | Err(ListError::OutOfRange { .. }) => held.push(v),
                                Err(e) => panic!("insert_at failed: {e}"),
                            }
                        }
                        3 if !held.is_empty() => {
                            // Drop a value: its node reclaims itself.
                            held.swap_remove((state as usize) % held.len());
                        }
                        4 => {
                            if let Ok(node) = list.node_at(0) {
                                let _ = node.remove().unwrap();
                            }
                        }
                        _ => {
                            let mut prev = None;
                            for node in list.nodes().take(16) {
                                assert!(prev.as_ref() != Some(&node));
                                prev = Some(node);
                            }
                        }
                    }
                }
                held
            })
        })
        .collect();

    let held: Vec<_> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();

    list.validate().unwrap();
    let live: HashSet<usize> = list.iter().map(|v| *v).collect();
    assert!(live.len() <= held.len());
    for value in list.iter() {
        assert!(held.iter().any(|h| Tracked::ptr_eq(h, &value)));
    }
}

#[test]
fn cursors_never_repeat_under_churn() {
    const WALKS: usize = 200;

    let list = Arc::new(WeakList::new());
    let seed: Vec<_> = (0..256_u64).map(Tracked::new).collect();
    for v in &seed {
        list.add_last(v).unwrap();
    }

    let stop = Arc::new(AtomicBool::new(false));
    let churn = {
        let list = Arc::clone(&list);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut n = 1_000_u64;
            while !stop.load(Ordering::Relaxed) {
                let v = Tracked::new(n);
                let node = list.add_first(&v).unwrap();
                let _ = list.node_at(1).map(|x| x.remove());
                node.remove().unwrap();
                n += 1;
            }
        })
    };

    for _ in 0..WALKS {
        let mut seen = HashSet::new();
        for node in list.nodes() {
            assert!(seen.insert(node.clone()), "node yielded twice");
        }
        let mut seen = HashSet::new();
        for node in list.nodes_rev() {
            assert!(seen.insert(node), "node yielded twice in reverse");
        }
    }

    stop.store(true, Ordering::Relaxed);
    churn.join().unwrap();
    list.validate().unwrap();
}

#[test]
fn dispose_races_writers() {
    for _ in 0..50 {
        let list = Arc::new(WeakList::new());
        let barrier = Arc::new(Barrier::new(THREADS + 1));

        let writers: Vec<_> = (0..THREADS)
            .map(|_| {
                let list = Arc::clone(&list);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let mut held = Vec::new();
                    for i in 0..200_u32 {
                        let v = Tracked::new(i);
                        match list.add_last(&v) {
                            Ok(_) => held.push(v),
                            Err(ListError::Disposed) => break,
                            Err(e) => panic!("unexpected error: {e}"),
                        }
                    }
                    held
                })
            })
            .collect();

        barrier.wait();
        list.dispose();

        for w in writers {
            let held = w.join().unwrap();
            assert!(held.iter().all(|v| Tracked::pending_hooks(v) == 0));
        }
        assert_eq!(list.count(), Err(ListError::Disposed));
    }
}
