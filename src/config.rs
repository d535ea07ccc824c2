//! Tuning knobs for a [`WeakList`](crate::WeakList).

/// Smallest accepted walk bound. A red-black tree over a 64-bit address
/// space cannot be deeper than this.
pub const MIN_MAX_DEPTH: usize = 64;

/// Default walk bound.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default number of busy spins before a waiting thread starts yielding.
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

/// Default number of non-blocking lock attempts made by a reclaim hook.
pub const DEFAULT_RECLAIM_ATTEMPTS: u32 = 16;

/// Configuration for a list instance.
///
/// ```rust
/// use weaklist::{ListConfig, WeakList};
///
/// let config = ListConfig::default().with_spin_limit(16).with_reclaim_attempts(4);
/// let list: WeakList<u32> = WeakList::with_config(config);
/// assert_eq!(list.count(), Ok(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListConfig {
    /// Busy spins (`std::hint::spin_loop`) before yielding the thread while
    /// waiting for the list lock.
    pub spin_limit: u32,

    /// `try_lock` attempts a reclaim hook makes before it blocks on the lock.
    pub reclaim_attempts: u32,

    /// Iteration bound for every structural walk. Exceeding it is treated as
    /// corruption.
    pub max_depth: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            spin_limit: DEFAULT_SPIN_LIMIT,
            reclaim_attempts: DEFAULT_RECLAIM_ATTEMPTS,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ListConfig {
    /// Set the spin count before yielding.
    #[must_use]
    pub const fn with_spin_limit(mut self, spin_limit: u32) -> Self {
        self.spin_limit = spin_limit;
        self
    }

    /// Set the reclaim hook's non-blocking attempt count.
    #[must_use]
    pub const fn with_reclaim_attempts(mut self, attempts: u32) -> Self {
        self.reclaim_attempts = attempts;
        self
    }

    /// Set the structural walk bound. Values below [`MIN_MAX_DEPTH`] are
    /// raised to it when the list is built.
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Clamp fields into their usable ranges.
    #[must_use]
    pub const fn normalized(mut self) -> Self {
        if self.max_depth < MIN_MAX_DEPTH {
            self.max_depth = MIN_MAX_DEPTH;
        }
        self
    }
}
