//! Weak liveness primitive.
//!
//! A [`Tracked<T>`] owns a value; a [`Binding<T>`] refers to it without keeping
//! it alive. Hooks registered through a binding run when the last `Tracked`
//! clone drops, on whichever thread drops it.
//!
//! The hook registry is owned by the value, not by the binding. A live value
//! therefore keeps its hooks (and whatever they capture) reachable, while a
//! binding holding only weak references never extends the value's life.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use weaklist::{Binding, Tracked};
//!
//! let value = Tracked::new(String::from("payload"));
//! let binding = Binding::bind(&value);
//!
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = Arc::clone(&fired);
//! binding.on_reclaim(Box::new(move || flag.store(true, Ordering::SeqCst)));
//!
//! assert_eq!(binding.read().as_deref().map(String::as_str), Some("payload"));
//! drop(value);
//! assert!(binding.read().is_none());
//! assert!(fired.load(Ordering::SeqCst));
//! ```

use std::collections::HashMap;
use std::fmt as StdFmt;
use std::ops::Deref;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::tracing_helpers::warn_log;

/// Callback run once the bound value is gone.
pub type ReclaimHook = Box<dyn FnOnce() + Send + 'static>;

/// Identifies a registered hook so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookKey(u64);

// ============================================================================
//  HookRegistry
// ============================================================================

/// Keyed by `HookKey` so that a value bound by many nodes still cancels each
/// hook in O(1) under the list lock.
#[derive(Default)]
struct HookState {
    next_key: u64,
    hooks: HashMap<HookKey, ReclaimHook>,
    fired: bool,
}

/// Pending reclaim hooks of one value.
#[derive(Default)]
struct HookRegistry {
    state: Mutex<HookState>,
}

impl HookRegistry {
    fn register(&self, hook: ReclaimHook) -> Result<HookKey, ReclaimHook> {
        let mut state = self.state.lock();
        if state.fired {
            return Err(hook);
        }

        let key = HookKey(state.next_key);
        state.next_key += 1;
        state.hooks.insert(key, hook);
        Ok(key)
    }

    fn cancel(&self, key: HookKey) -> Option<ReclaimHook> {
        self.state.lock().hooks.remove(&key)
    }

    /// Take every pending hook and refuse new ones.
    fn drain(&self) -> HashMap<HookKey, ReclaimHook> {
        let mut state = self.state.lock();
        state.fired = true;
        std::mem::take(&mut state.hooks)
    }

    fn pending(&self) -> usize {
        self.state.lock().hooks.len()
    }
}

// ============================================================================
//  Tracked<T>
// ============================================================================

struct TrackedInner<T> {
    value: T,
    registry: Arc<HookRegistry>,
}

impl<T> Drop for TrackedInner<T> {
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn drop(&mut self) {
        // Strong count is already zero, so every binding reads `None` by now.
        // Hooks run outside the registry mutex; they may take other locks.
        for (key, hook) in self.registry.drain() {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                warn_log!(hook = ?key, "reclaim hook panicked");
            }
        }
    }
}

/// Strong, cloneable owner of a value that can be weakly bound.
///
/// The value dies when the last clone drops. At that point every pending
/// reclaim hook runs on the dropping thread.
pub struct Tracked<T> {
    inner: Arc<TrackedInner<T>>,
}

impl<T> Tracked<T> {
    /// Wrap a value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(TrackedInner {
                value,
                registry: Arc::new(HookRegistry::default()),
            }),
        }
    }

    /// True if both handles own the same value.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Arc::ptr_eq(&this.inner, &other.inner)
    }

    /// Number of live `Tracked` clones of this value.
    #[must_use]
    pub fn strong_count(this: &Self) -> usize {
        Arc::strong_count(&this.inner)
    }

    /// Number of reclaim hooks still waiting for this value to die.
    #[must_use]
    pub fn pending_hooks(this: &Self) -> usize {
        this.inner.registry.pending()
    }
}

impl<T> Clone for Tracked<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner.value
    }
}

impl<T> AsRef<T> for Tracked<T> {
    fn as_ref(&self) -> &T {
        &self.inner.value
    }
}

impl<T: StdFmt::Debug> StdFmt::Debug for Tracked<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_tuple("Tracked").field(&self.inner.value).finish()
    }
}

impl<T> From<T> for Tracked<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

// ============================================================================
//  Binding<T>
// ============================================================================

/// Weak token for a [`Tracked`] value.
pub struct Binding<T> {
    value: Weak<TrackedInner<T>>,
    registry: Weak<HookRegistry>,
}

impl<T> Binding<T> {
    /// Bind to a live value without keeping it alive.
    #[must_use]
    pub fn bind(value: &Tracked<T>) -> Self {
        Self {
            value: Arc::downgrade(&value.inner),
            registry: Arc::downgrade(&value.inner.registry),
        }
    }

    /// A binding that was never attached to a value. Always reads `None`.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            value: Weak::new(),
            registry: Weak::new(),
        }
    }

    /// Upgrade to a strong handle if the value is still alive.
    ///
    /// If the returned handle turns out to be the last one, dropping it runs
    /// the value's reclaim hooks on the dropping thread.
    #[must_use]
    pub fn read(&self) -> Option<Tracked<T>> {
        self.value.upgrade().map(|inner| Tracked { inner })
    }

    /// Check liveness without creating a strong handle.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.value.strong_count() > 0
    }

    /// True if this binding refers to `value`.
    #[must_use]
    pub fn refers_to(&self, value: &Tracked<T>) -> bool {
        std::ptr::eq(self.value.as_ptr(), Arc::as_ptr(&value.inner))
    }

    /// Register a hook to run when the value dies.
    ///
    /// Returns `None` (and drops the hook unrun) if the value is already dead.
    pub fn on_reclaim(&self, hook: ReclaimHook) -> Option<HookKey> {
        let registry = self.registry.upgrade()?;
        registry.register(hook).ok()
    }

    /// Withdraw a pending hook. Returns it so the caller controls where it is
    /// dropped; `None` if it already ran or the value is gone.
    pub fn cancel(&self, key: HookKey) -> Option<ReclaimHook> {
        self.registry.upgrade()?.cancel(key)
    }
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            value: Weak::clone(&self.value),
            registry: Weak::clone(&self.registry),
        }
    }
}

impl<T> StdFmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Binding")
            .field("alive", &self.is_alive())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_hook(counter: &Arc<AtomicUsize>) -> ReclaimHook {
        let counter = Arc::clone(counter);
        Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_read_follows_value_lifetime() {
        let value = Tracked::new(7_u32);
        let binding = Binding::bind(&value);

        assert!(binding.is_alive());
        assert_eq!(binding.read().map(|v| *v), Some(7));

        let clone = value.clone();
        drop(value);
        assert!(binding.is_alive());

        drop(clone);
        assert!(!binding.is_alive());
        assert!(binding.read().is_none());
    }

    #[test]
    fn test_binding_does_not_keep_value_alive() {
        let value = Tracked::new(vec![1, 2, 3]);
        let bindings: Vec<_> = (0..4).map(|_| Binding::bind(&value)).collect();

        assert_eq!(Tracked::strong_count(&value), 1);
        drop(value);
        assert!(bindings.iter().all(|b| b.read().is_none()));
    }

    #[test]
    fn test_hooks_fire_once_on_last_drop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = Tracked::new("v");
        let binding = Binding::bind(&value);

        binding.on_reclaim(counting_hook(&counter)).unwrap();
        binding.on_reclaim(counting_hook(&counter)).unwrap();
        assert_eq!(Tracked::pending_hooks(&value), 2);

        let clone = value.clone();
        drop(value);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        drop(clone);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancelled_hook_never_fires() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = Tracked::new(1_i64);
        let binding = Binding::bind(&value);

        let key = binding.on_reclaim(counting_hook(&counter)).unwrap();
        assert!(binding.cancel(key).is_some());
        assert!(binding.cancel(key).is_none());

        drop(value);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_any_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = Tracked::new(0_u32);
        let binding = Binding::bind(&value);

        let keys: Vec<_> = (0..1_000)
            .map(|_| binding.on_reclaim(counting_hook(&counter)).unwrap())
            .collect();

        // Cancel every third key, newest first.
        for key in keys.iter().rev().step_by(3) {
            assert!(binding.cancel(*key).is_some());
        }
        assert_eq!(Tracked::pending_hooks(&value), 1_000 - 334);

        drop(value);
        assert_eq!(counter.load(Ordering::SeqCst), 1_000 - 334);
    }

    #[test]
    fn test_register_after_death_is_refused() {
        let value = Tracked::new(());
        let binding = Binding::bind(&value);
        drop(value);

        assert!(binding.on_reclaim(Box::new(|| {})).is_none());
    }

    #[test]
    fn test_panicking_hook_is_contained() {
        let counter = Arc::new(AtomicUsize::new(0));
        let value = Tracked::new(0_u8);
        let binding = Binding::bind(&value);

        binding
            .on_reclaim(Box::new(|| panic!("hook failure")))
            .unwrap();
        binding.on_reclaim(counting_hook(&counter)).unwrap();

        drop(value);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_binding() {
        let binding: Binding<u32> = Binding::empty();
        assert!(!binding.is_alive());
        assert!(binding.read().is_none());
        assert!(binding.on_reclaim(Box::new(|| {})).is_none());
    }

    #[test]
    fn test_refers_to() {
        let a = Tracked::new(1);
        let b = Tracked::new(1);
        let binding = Binding::bind(&a);

        assert!(binding.refers_to(&a));
        assert!(!binding.refers_to(&b));
    }
}
