//! Shuttle tests for the removal-claim protocol.
//!
//! Shuttle explores randomized thread schedules. The model below mirrors the
//! list's removal path with shuttle primitives:
//! - a per-node claim flag won by compare-and-swap
//! - a list lock guarding the attached set and the disposed flag
//! - dispose burying every attached node regardless of claims
//!
//! Run with: `cargo test --lib list::shuttle_tests`

use shuttle::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use shuttle::sync::{Arc, Mutex};
use shuttle::thread;

// ============================================================================
//  Model
// ============================================================================

struct ModelNode {
    claimed: AtomicBool,
    removed: AtomicBool,
    /// How many triggers detached this node. Must end at most 1.
    detaches: AtomicUsize,
}

impl ModelNode {
    fn new() -> Self {
        Self {
            claimed: AtomicBool::new(false),
            removed: AtomicBool::new(false),
            detaches: AtomicUsize::new(0),
        }
    }
}

struct ModelState {
    attached: Vec<usize>,
    disposed: bool,
}

struct ModelList {
    nodes: Vec<ModelNode>,
    state: Mutex<ModelState>,
}

impl ModelList {
    fn new(len: usize) -> Self {
        Self {
            nodes: (0..len).map(|_| ModelNode::new()).collect(),
            state: Mutex::new(ModelState {
                attached: (0..len).collect(),
                disposed: false,
            }),
        }
    }

    /// Explicit removal and reclaim share this path.
    fn remove(&self, id: usize) -> Result<bool, ()> {
        let node = &self.nodes[id];
        if node.removed.load(Ordering::Acquire) {
            return Ok(false);
        }
        if node
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        let mut state = self.state.lock().unwrap();
        if state.disposed {
            return Err(());
        }
        let pos = state.attached.iter().position(|&n| n == id).unwrap();
        state.attached.remove(pos);
        node.detaches.fetch_add(1, Ordering::SeqCst);
        node.removed.store(true, Ordering::Release);
        Ok(true)
    }

    fn dispose(&self) {
        let mut state = self.state.lock().unwrap();
        if state.disposed {
            return;
        }
        state.disposed = true;
        for id in std::mem::take(&mut state.attached) {
            let node = &self.nodes[id];
            node.claimed.store(true, Ordering::Release);
            node.detaches.fetch_add(1, Ordering::SeqCst);
            node.removed.store(true, Ordering::Release);
        }
    }
}

// ============================================================================
//  Tests
// ============================================================================

#[test]
fn shuttle_explicit_and_reclaim_race() {
    shuttle::check_random(
        || {
            let list = Arc::new(ModelList::new(1));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let list = Arc::clone(&list);
                    thread::spawn(move || list.remove(0))
                })
                .collect();

            let wins = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|r| *r == Ok(true))
                .count();

            assert_eq!(wins, 1, "exactly one trigger removes the node");
            assert_eq!(list.nodes[0].detaches.load(Ordering::SeqCst), 1);
            assert!(list.state.lock().unwrap().attached.is_empty());
        },
        1000,
    );
}

#[test]
fn shuttle_dispose_overrides_claims() {
    shuttle::check_random(
        || {
            let list = Arc::new(ModelList::new(3));

            let remover = {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    let _ = list.remove(1);
                    let _ = list.remove(2);
                })
            };
            let disposer = {
                let list = Arc::clone(&list);
                thread::spawn(move || list.dispose())
            };

            remover.join().unwrap();
            disposer.join().unwrap();

            for node in &list.nodes {
                assert!(node.removed.load(Ordering::Acquire));
                assert_eq!(node.detaches.load(Ordering::SeqCst), 1);
            }
        },
        1000,
    );
}

#[test]
fn shuttle_remove_many_concurrently() {
    const NODES: usize = 4;

    shuttle::check_random(
        || {
            let list = Arc::new(ModelList::new(NODES));
            let handles: Vec<_> = (0..3)
                .map(|t| {
                    let list = Arc::clone(&list);
                    thread::spawn(move || {
                        (0..NODES)
                            .map(|i| (i + t) % NODES)
                            .filter(|&id| list.remove(id) == Ok(true))
                            .count()
                    })
                })
                .collect();

            let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
            assert_eq!(total, NODES);
            assert!(list.state.lock().unwrap().attached.is_empty());
        },
        500,
    );
}
