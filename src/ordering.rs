//! Standard memory orderings for list and node state.
//!
//! Every atomic in the crate goes through one of these names so the pairing
//! between a writer under the lock and a lock-free reader stays visible at
//! each access point.

use std::sync::atomic::Ordering;

/// Ordering for lock-free reads of fields published under the lock.
/// Pairs with [`WRITE_ORD`].
pub const READ_ORD: Ordering = Ordering::Acquire;

/// Ordering for stores made while holding the list lock.
/// Pairs with [`READ_ORD`].
pub const WRITE_ORD: Ordering = Ordering::Release;

/// Ordering for a successful compare-and-swap (lock acquire, removal claim).
pub const CAS_SUCCESS: Ordering = Ordering::AcqRel;

/// Ordering for a failed compare-and-swap. Only the current value is needed.
pub const CAS_FAILURE: Ordering = Ordering::Acquire;

/// Ordering for loads inside the locked region.
/// The lock itself provides synchronization.
pub const RELAXED: Ordering = Ordering::Relaxed;

/// Full fence issued before the lock-free `count`/`version` reads.
pub const FENCE_ORD: Ordering = Ordering::SeqCst;
