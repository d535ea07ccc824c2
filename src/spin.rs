//! Spin lock guarding a list's tree.
//!
//! [`SpinLock`] packs the lock state and the one-way disposed flag into a
//! single `u32`. Critical sections are always `O(log n)`, so waiters spin
//! (and eventually yield) instead of parking on the OS.
//!
//! # Type-State Pattern
//! The data is reachable only through a [`SpinGuard`], which proves the lock
//! is held. The guard releases the lock on drop (panic-safe). Disposal is
//! requested on the guard and becomes visible with the releasing store, after
//! which every acquire attempt fails fast.
//!
//! ```rust,ignore
//! let mut guard = lock.lock(spin_limit)?;
//! guard.tree.insert_at(rank, make)?;
//! // Lock released when guard drops
//! ```

use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::AtomicU32;

use crate::error::ListError;
use crate::ordering::{CAS_FAILURE, CAS_SUCCESS, READ_ORD, RELAXED, WRITE_ORD};


// ============================================================================
//  Bit Constants
// ============================================================================

/// Lock bit: a thread holds the list.
const LOCK_BIT: u32 = 1 << 0;

/// Disposed bit: the list is gone. Never cleared once set.
const DISPOSED_BIT: u32 = 1 << 1;

// ============================================================================
//  SpinLock
// ============================================================================

/// A spin lock with a terminal disposed state.
///
/// # Layout
/// Bit 1: `disposed` | Bit 0: `locked`
pub struct SpinLock<D> {
    word: AtomicU32,
    data: UnsafeCell<D>,
}

// SAFETY: access to `data` is serialized by the lock word; the guard hands out
// references only while LOCK_BIT is held by its owner.
unsafe impl<D: Send> Send for SpinLock<D> {}
// SAFETY: see above. `D` only ever moves between threads, never aliases.
unsafe impl<D: Send> Sync for SpinLock<D> {}

impl<D> std::fmt::Debug for SpinLock<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinLock")
            .field("locked", &self.is_locked())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  SpinGuard (Type-State Pattern)
// ============================================================================

/// Proof that the lock is held. Releases on drop.
///
/// `!Send` and `!Sync` via `PhantomData<*mut ()>`: the lock must be released
/// by the thread that took it.
#[must_use = "releasing a lock without using the guard is a logic error"]
pub struct SpinGuard<'a, D> {
    lock: &'a SpinLock<D>,
    release_value: u32,
    _marker: PhantomData<*mut ()>,
}

impl<D> Drop for SpinGuard<'_, D> {
    fn drop(&mut self) {
        // Clears LOCK_BIT; keeps DISPOSED_BIT if dispose() was requested.
        self.lock.word.store(self.release_value, WRITE_ORD);
    }
}

impl<D> SpinGuard<'_, D> {
    /// Make the release permanent: after this guard drops, the lock can never
    /// be acquired again.
    pub fn dispose(&mut self) {
        self.release_value = DISPOSED_BIT;
    }
}

impl<D> Deref for SpinGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        // SAFETY: the guard's existence proves LOCK_BIT is held by us.
        unsafe { &*self.lock.data.get() }
    }
}

impl<D> DerefMut for SpinGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        // SAFETY: the guard's existence proves LOCK_BIT is held by us, and
        // `&mut self` prevents a second borrow through this guard.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<D> SpinLock<D> {
    /// Create an unlocked, live lock.
    pub const fn new(data: D) -> Self {
        Self {
            word: AtomicU32::new(0),
            data: UnsafeCell::new(data),
        }
    }

    /// Check whether the lock was permanently released.
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        (self.word.load(READ_ORD) & DISPOSED_BIT) != 0
    }

    /// Check whether some thread holds the lock right now.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        (self.word.load(RELAXED) & LOCK_BIT) != 0
    }

    /// One acquire attempt.
    ///
    /// # Errors
    /// [`ListError::Disposed`] if the lock was disposed.
    ///
    /// Returns `Ok(None)` when another thread holds the lock.
    pub fn try_lock(&self) -> Result<Option<SpinGuard<'_, D>>, ListError> {
        let value: u32 = self.word.load(RELAXED);

        if value & DISPOSED_BIT != 0 {
            return Err(ListError::Disposed);
        }
        if value & LOCK_BIT != 0 {
            return Ok(None);
        }

        match self
            .word
            .compare_exchange(value, value | LOCK_BIT, CAS_SUCCESS, CAS_FAILURE)
        {
            Ok(_) => Ok(Some(SpinGuard {
                lock: self,
                release_value: 0,
                _marker: PhantomData,
            })),

            Err(current) if current & DISPOSED_BIT != 0 => Err(ListError::Disposed),

            Err(_) => Ok(None),
        }
    }

    /// Acquire the lock, spinning `spin_limit` times before yielding between
    /// attempts.
    ///
    /// # Errors
    /// [`ListError::Disposed`] if the lock is, or becomes, disposed while
    /// waiting.
    pub fn lock(&self, spin_limit: u32) -> Result<SpinGuard<'_, D>, ListError> {
        let mut spins: u32 = 0;

        loop {
            if let Some(guard) = self.try_lock()? {
                return Ok(guard);
            }

            if spins < spin_limit {
                spins += 1;
                std::hint::spin_loop();
            } else {
                std::thread::yield_now();
            }
        }
    }
}
