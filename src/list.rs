//! The concurrent weak list.
//!
//! [`WeakList`] is a thin owner of [`ListShared`], which every [`Node`] and
//! cursor also references. All structural state lives in one [`OsTree`]
//! behind a [`SpinLock`]; `count` and `version` are mirrored into atomics so
//! they can be read without the lock.
//!
//! # Removal triggers
//!
//! A node can leave the list three ways: an explicit [`WeakList::remove`], a
//! reclaim hook fired by its value's last drop, or [`WeakList::dispose`].
//! The first two race for the node's claim flag; only the winner touches the
//! tree. Dispose overrides both.
//!
//! # Lock discipline
//!
//! - The list lock is taken before a value's hook registry, never after.
//! - Nothing that can drop a [`Tracked`] runs while the lock is held. Hooks
//!   withdrawn under the lock are returned and dropped after release.
//! - Corruption detected under the lock disposes the list before the lock is
//!   released; the detecting call gets [`ListError::Corruption`], everyone
//!   after it gets [`ListError::Disposed`].

use std::fmt as StdFmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, fence};

use crate::config::ListConfig;
use crate::cursor::{NodeCursor, Position, Snapshot, ValueCursor};
use crate::error::{ListError, TreeError};
use crate::liveness::{Binding, HookKey, ReclaimHook, Tracked};
use crate::node::{Node, NodeShared, Tombstone, chase};
use crate::ordering::{FENCE_ORD, READ_ORD, RELAXED, WRITE_ORD};
use crate::spin::{SpinGuard, SpinLock};
use crate::tracing_helpers::{debug_log, error_log, trace_log};
use crate::tree::{OsTree, SlotId};

mod search;

#[cfg(test)]
mod shuttle_tests;

// ============================================================================
//  Locked state
// ============================================================================

/// Tree payload: the node plus the key of the hook registered on its value.
pub(crate) struct Entry<T> {
    node: Arc<NodeShared<T>>,
    hook: Option<HookKey>,
}

/// Everything guarded by the list lock.
pub(crate) struct ListState<T> {
    tree: OsTree<Entry<T>>,
}

impl<T> ListState<T> {
    fn node_in(&self, slot: SlotId) -> Result<Arc<NodeShared<T>>, TreeError> {
        self.tree
            .payload(slot)
            .map(|entry| Arc::clone(&entry.node))
            .ok_or(TreeError::Corrupted("link to empty slot"))
    }

    /// Slot of an attached node, checked against the arena.
    fn slot_of(&self, node: &Arc<NodeShared<T>>) -> Result<SlotId, TreeError> {
        let slot = node.slot();
        match self.tree.payload(slot) {
            Some(entry) if Arc::ptr_eq(&entry.node, node) => Ok(slot),
            _ => Err(TreeError::Corrupted("attached node missing from its slot")),
        }
    }

    fn neighbor(&self, slot: SlotId, forward: bool) -> Result<Option<Arc<NodeShared<T>>>, TreeError> {
        let next = if forward {
            self.tree.next(slot)?
        } else {
            self.tree.prev(slot)?
        };
        next.map(|s| self.node_in(s)).transpose()
    }
}

type Guard<'a, T> = SpinGuard<'a, ListState<T>>;

/// Where a new node goes.
enum Placement<T> {
    Front,
    Back,
    At(usize),
    After(Arc<NodeShared<T>>),
    Before(Arc<NodeShared<T>>),
}

/// Result of one cursor step taken under the lock.
pub(crate) enum Step<T> {
    /// The neighbor in the requested direction, `None` at a boundary.
    Moved(Option<Arc<NodeShared<T>>>),
    /// The origin node was removed before the lock was taken.
    Stale,
}

// ============================================================================
//  ListShared
// ============================================================================

/// State shared by a list, its nodes, its cursors, and its reclaim hooks.
pub(crate) struct ListShared<T> {
    lock: SpinLock<ListState<T>>,
    count: AtomicUsize,
    version: AtomicU64,
    config: ListConfig,
}

impl<T> ListShared<T> {
    fn new(config: ListConfig) -> Self {
        let config = config.normalized();
        let pseudo = Entry {
            node: Arc::new(NodeShared::pseudo(SlotId::PSEUDO)),
            hook: None,
        };

        Self {
            lock: SpinLock::new(ListState {
                tree: OsTree::new(pseudo, config.max_depth),
            }),
            count: AtomicUsize::new(0),
            version: AtomicU64::new(0),
            config,
        }
    }

    #[inline]
    pub(crate) fn is_disposed(&self) -> bool {
        self.lock.is_disposed()
    }

    /// Version without the disposed check. Cursors capture it at creation.
    #[inline]
    pub(crate) fn version_snapshot(&self) -> u64 {
        self.version.load(READ_ORD)
    }

    fn count(&self) -> Result<usize, ListError> {
        if self.is_disposed() {
            return Err(ListError::Disposed);
        }
        fence(FENCE_ORD);
        Ok(self.count.load(READ_ORD))
    }

    fn version(&self) -> Result<u64, ListError> {
        if self.is_disposed() {
            return Err(ListError::Disposed);
        }
        fence(FENCE_ORD);
        Ok(self.version.load(READ_ORD))
    }

    fn acquire(&self) -> Result<Guard<'_, T>, ListError> {
        self.lock.lock(self.config.spin_limit)
    }

    /// Reclaim hooks run on whichever thread dropped the value; prefer short
    /// non-blocking attempts before joining the waiters.
    fn acquire_for_reclaim(&self) -> Result<Guard<'_, T>, ListError> {
        for _ in 0..self.config.reclaim_attempts {
            if let Some(guard) = self.lock.try_lock()? {
                return Ok(guard);
            }
            std::hint::spin_loop();
        }
        self.acquire()
    }

    /// Run `op` under `guard`, disposing the list if it reports corruption.
    fn run<R>(
        &self,
        mut guard: Guard<'_, T>,
        op: impl FnOnce(&mut ListState<T>) -> Result<R, ListError>,
    ) -> Result<R, ListError> {
        let result = op(&mut guard);

        if matches!(result, Err(ListError::Corruption { .. })) {
            error_log!(error = ?result.as_ref().err(), "list corrupted; disposing");
            guard.dispose();
            let hooks = self.teardown(&mut guard);
            drop(guard);
            drop(hooks);
        }

        result
    }

    fn locked<R>(
        &self,
        op: impl FnOnce(&mut ListState<T>) -> Result<R, ListError>,
    ) -> Result<R, ListError> {
        let guard = self.acquire()?;
        self.run(guard, op)
    }

    /// Detach every node. Returns the withdrawn hooks; drop them after the
    /// lock is released.
    fn teardown(&self, state: &mut ListState<T>) -> Vec<ReclaimHook> {
        let mut hooks = Vec::new();

        for entry in state.tree.drain() {
            entry.node.force_claim();
            entry.node.bury(Tombstone::detached());
            if let Some(key) = entry.hook
                && let Some(hook) = entry.node.binding().cancel(key)
            {
                hooks.push(hook);
            }
        }

        self.count.store(0, WRITE_ORD);
        hooks
    }

    pub(crate) fn dispose(&self) {
        // Already disposed (or torn down by corruption).
        let Ok(mut guard) = self.acquire() else {
            return;
        };

        guard.dispose();
        let hooks = self.teardown(&mut guard);
        drop(guard);

        debug_log!(cancelled_hooks = hooks.len(), "list disposed");
        drop(hooks);
    }

    // ========================================================================
    //  Insertion
    // ========================================================================

    /// Insert under the lock. `Ok(None)` means the anchor was removed before
    /// the lock was taken.
    fn insert(
        self: &Arc<Self>,
        value: &Tracked<T>,
        placement: Placement<T>,
    ) -> Result<Option<Arc<NodeShared<T>>>, ListError>
    where
        T: Send + Sync + 'static,
    {
        let binding = Binding::bind(value);

        let inserted = self.locked(|state| {
            let version = self.version.load(RELAXED) + 1;
            let make = |slot| Entry {
                node: Arc::new(NodeShared::new(slot, version, binding)),
                hook: None,
            };

            let slot = match placement {
                Placement::Front => {
                    let pseudo = state.tree.pseudo();
                    state.tree.insert_after(pseudo, make)?
                }
                Placement::Back => state.tree.push_back(make)?,
                Placement::At(index) => {
                    let len = state.tree.len();
                    if index > len {
                        return Err(ListError::OutOfRange { index, len });
                    }
                    state.tree.insert_at(index, make)?
                }
                Placement::After(anchor) => {
                    if anchor.is_removed() {
                        return Ok(None);
                    }
                    let at = state.slot_of(&anchor)?;
                    state.tree.insert_after(at, make)?
                }
                Placement::Before(anchor) => {
                    if anchor.is_removed() {
                        return Ok(None);
                    }
                    let at = state.slot_of(&anchor)?;
                    state.tree.insert_before(at, make)?
                }
            };

            let len = state.tree.len();
            let entry = state
                .tree
                .payload_mut(slot)
                .ok_or(TreeError::Corrupted("inserted slot is empty"))?;
            let node = Arc::clone(&entry.node);

            let hook_list = Arc::clone(self);
            let hook_node = Arc::clone(&node);
            entry.hook = node
                .binding()
                .on_reclaim(Box::new(move || hook_list.reclaim(&hook_node)));

            self.version.store(version, WRITE_ORD);
            self.count.store(len, WRITE_ORD);
            Ok(Some(node))
        })?;

        if let Some(node) = &inserted {
            trace_log!(version = node.version(), "node inserted");
        }
        Ok(inserted)
    }

    /// Insert next to `anchor`. With `follow`, a removed anchor is replaced
    /// by its nearest attached neighbor along its frozen links, and the new
    /// node goes on the near side of that neighbor.
    fn insert_near(
        self: &Arc<Self>,
        anchor: &Arc<NodeShared<T>>,
        value: &Tracked<T>,
        after: bool,
        follow: bool,
    ) -> Result<Option<Arc<NodeShared<T>>>, ListError>
    where
        T: Send + Sync + 'static,
    {
        loop {
            let placement = if !anchor.is_removed() {
                if after {
                    Placement::After(Arc::clone(anchor))
                } else {
                    Placement::Before(Arc::clone(anchor))
                }
            } else if !follow {
                return Ok(None);
            } else {
                match (chase(anchor, after), after) {
                    (Some(live), true) => Placement::Before(live),
                    (Some(live), false) => Placement::After(live),
                    (None, true) => Placement::Back,
                    (None, false) => Placement::Front,
                }
            };

            // `None` means the chosen anchor vanished before the lock; retry.
            if let Some(node) = self.insert(value, placement)? {
                return Ok(Some(node));
            }
        }
    }

    // ========================================================================
    //  Removal
    // ========================================================================

    /// Unlink an attached node and bury it with its current neighbors.
    fn detach(
        &self,
        state: &mut ListState<T>,
        node: &Arc<NodeShared<T>>,
    ) -> Result<Option<ReclaimHook>, ListError> {
        if node.is_removed() {
            return Ok(None);
        }

        let slot = state.slot_of(node)?;
        let prev = state.neighbor(slot, false)?;
        let next = state.neighbor(slot, true)?;
        let entry = state.tree.remove(slot)?;

        node.bury(Tombstone::new(prev, next));
        self.count.store(state.tree.len(), WRITE_ORD);

        Ok(entry.hook.and_then(|key| node.binding().cancel(key)))
    }

    pub(crate) fn remove_node(&self, node: &Arc<NodeShared<T>>) -> Result<bool, ListError> {
        if self.is_disposed() {
            return Err(ListError::Disposed);
        }
        if node.is_removed() || !node.try_claim() {
            return Ok(false);
        }

        let hook = self.locked(|state| self.detach(state, node))?;
        drop(hook);

        trace_log!(version = node.version(), "node removed");
        Ok(true)
    }

    /// Reclaim hook body: remove `node` because its value died.
    fn reclaim(&self, node: &Arc<NodeShared<T>>) {
        if node.is_removed() || !node.try_claim() {
            return;
        }

        // Disposed: dispose buries the node itself.
        let Ok(guard) = self.acquire_for_reclaim() else {
            return;
        };

        // Errors here are either disposal or corruption, which `run` has
        // already contained.
        if self.run(guard, |state| self.detach(state, node)).is_ok() {
            trace_log!(version = node.version(), "node reclaimed");
        }
    }

    // ========================================================================
    //  Lookup
    // ========================================================================

    pub(crate) fn index_of_node(&self, node: &Arc<NodeShared<T>>) -> Result<Option<usize>, ListError> {
        if self.is_disposed() {
            return Err(ListError::Disposed);
        }
        if node.is_removed() {
            return Ok(None);
        }

        self.locked(|state| {
            if node.is_removed() {
                return Ok(None);
            }
            let slot = state.slot_of(node)?;
            Ok(Some(state.tree.rank(slot)?))
        })
    }

    fn node_at(&self, index: usize) -> Result<Arc<NodeShared<T>>, ListError> {
        self.locked(|state| {
            let len = state.tree.len();
            if index >= len {
                return Err(ListError::OutOfRange { index, len });
            }
            let slot = state.tree.select(index)?;
            Ok(state.node_in(slot)?)
        })
    }

    /// First (`forward`) or last live node.
    pub(crate) fn boundary(&self, forward: bool) -> Result<Option<Arc<NodeShared<T>>>, ListError> {
        self.locked(|state| {
            let slot = if forward {
                state.tree.first()?
            } else {
                state.tree.last()?
            };
            Ok(slot.map(|s| state.node_in(s)).transpose()?)
        })
    }

    pub(crate) fn step_from(&self, node: &Arc<NodeShared<T>>, forward: bool) -> Result<Step<T>, ListError> {
        self.locked(|state| {
            if node.is_removed() {
                return Ok(Step::Stale);
            }
            let slot = state.slot_of(node)?;
            Ok(Step::Moved(state.neighbor(slot, forward)?))
        })
    }

    /// Full structural check. Does not dispose on failure.
    fn validate(&self) -> Result<(), ListError> {
        let guard = self.acquire()?;
        guard.tree.validate()?;

        let mut seen = 0_usize;
        let mut cur = guard.tree.first()?;
        while let Some(slot) = cur {
            let node = guard.node_in(slot)?;
            if node.slot() != slot || node.is_pseudo() || node.is_removed() {
                return Err(TreeError::Corrupted("entry does not match its slot").into());
            }
            seen += 1;
            cur = guard.tree.next(slot)?;
        }

        if seen != guard.tree.len() || seen != self.count.load(RELAXED) {
            return Err(TreeError::Corrupted("count out of sync with tree").into());
        }
        Ok(())
    }

    /// Shrink the walk bound so the next multi-step walk reports corruption.
    #[cfg(test)]
    pub(crate) fn corrupt_for_test(&self) -> Result<(), ListError> {
        let mut guard = self.acquire()?;
        guard.tree.set_max_depth(1);
        Ok(())
    }
}

// ============================================================================
//  WeakList
// ============================================================================

/// A thread-safe ordered list whose nodes hold their values weakly.
///
/// Values are passed in as [`Tracked`] handles. The list never keeps a value
/// alive: once the last `Tracked` clone drops, the node that held it removes
/// itself. Positional operations (`insert_at`, `node_at`, `index_of`) are
/// `O(log n)`.
///
/// Dropping the list disposes it. Nodes and cursors that outlive the list keep
/// working as far as their own state goes (`is_removed` is `true`), and list
/// operations reached through them report [`ListError::Disposed`].
///
/// ```rust
/// use weaklist::{Tracked, WeakList};
///
/// let list = WeakList::new();
/// let a = Tracked::new("a");
/// let b = Tracked::new("b");
///
/// list.add_last(&a)?;
/// let node_b = list.add_last(&b)?;
/// assert_eq!(list.count()?, 2);
///
/// drop(b);
/// assert!(node_b.is_removed());
/// assert_eq!(list.to_vec()?.iter().map(|v| **v).collect::<Vec<_>>(), ["a"]);
/// # Ok::<(), weaklist::ListError>(())
/// ```
pub struct WeakList<T> {
    shared: Arc<ListShared<T>>,
}

impl<T> WeakList<T> {
    /// Create an empty list with default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ListConfig::default())
    }

    /// Create an empty list.
    #[must_use]
    pub fn with_config(config: ListConfig) -> Self {
        Self {
            shared: Arc::new(ListShared::new(config)),
        }
    }

    /// Effective configuration (after normalization).
    #[must_use]
    pub fn config(&self) -> ListConfig {
        self.shared.config
    }

    /// Number of attached nodes, read without the lock.
    ///
    /// # Errors
    /// [`ListError::Disposed`].
    pub fn count(&self) -> Result<usize, ListError> {
        self.shared.count()
    }

    /// `count() == 0`.
    ///
    /// # Errors
    /// [`ListError::Disposed`].
    pub fn is_empty(&self) -> Result<bool, ListError> {
        Ok(self.count()? == 0)
    }

    /// Insert counter. Grows by one per insert; removals leave it unchanged.
    ///
    /// # Errors
    /// [`ListError::Disposed`].
    pub fn version(&self) -> Result<u64, ListError> {
        self.shared.version()
    }

    /// True once the list was disposed, explicitly or by corruption.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Detach every node and refuse further operations. Idempotent.
    pub fn dispose(&self) {
        self.shared.dispose();
    }

    fn check_owner(&self, node: &Node<T>) -> Result<(), ListError> {
        if node.belongs_to(&self.shared) {
            Ok(())
        } else {
            Err(ListError::ForeignNode)
        }
    }

    fn wrap(&self, shared: Arc<NodeShared<T>>) -> Node<T> {
        Node::from_parts(shared, Arc::clone(&self.shared))
    }

    /// Remove `node`. Returns `true` if this call removed it, `false` if it
    /// was already removed or another trigger is removing it.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`], [`ListError::Disposed`], or
    /// [`ListError::Corruption`].
    pub fn remove(&self, node: &Node<T>) -> Result<bool, ListError> {
        self.check_owner(node)?;
        self.shared.remove_node(&node.shared)
    }

    /// Node at `index`.
    ///
    /// # Errors
    /// [`ListError::OutOfRange`] if `index >= count`, [`ListError::Disposed`],
    /// or [`ListError::Corruption`].
    pub fn node_at(&self, index: usize) -> Result<Node<T>, ListError> {
        self.shared.node_at(index).map(|n| self.wrap(n))
    }

    /// Position of `node`, or `None` if it was removed.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`], [`ListError::Disposed`], or
    /// [`ListError::Corruption`].
    pub fn index_of(&self, node: &Node<T>) -> Result<Option<usize>, ListError> {
        self.check_owner(node)?;
        self.shared.index_of_node(&node.shared)
    }

    /// First attached node.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn first(&self) -> Result<Option<Node<T>>, ListError> {
        Ok(self.shared.boundary(true)?.map(|n| self.wrap(n)))
    }

    /// Last attached node.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn last(&self) -> Result<Option<Node<T>>, ListError> {
        Ok(self.shared.boundary(false)?.map(|n| self.wrap(n)))
    }

    /// Remove every node, one at a time. Nodes added concurrently may survive.
    /// Returns how many nodes this call removed.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn clear(&self) -> Result<usize, ListError> {
        let mut removed = 0;
        let mut cursor = self.nodes();
        while cursor.advance()? {
            if let Some(node) = cursor.current()
                && node.remove()?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Remove nodes whose values are dead but whose reclaim has not run yet.
    /// Returns how many nodes this call removed.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn prune(&self) -> Result<usize, ListError> {
        let mut removed = 0;
        let mut cursor = self.nodes();
        while cursor.advance()? {
            if let Some(node) = cursor.current()
                && !node.shared.binding().is_alive()
                && node.remove()?
            {
                removed += 1;
            }
        }
        debug_log!(removed, "prune finished");
        Ok(removed)
    }

    /// Strong handles to every live value, in order.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn to_vec(&self) -> Result<Vec<Tracked<T>>, ListError> {
        let mut out = Vec::new();
        let mut cursor = self.iter();
        while cursor.advance()? {
            if let Some(value) = cursor.current() {
                out.push(value.clone());
            }
        }
        Ok(out)
    }

    /// Check every structural invariant. Unlike other operations, a failure
    /// here does not dispose the list.
    ///
    /// # Errors
    /// [`ListError::Corruption`] naming the first violation, or
    /// [`ListError::Disposed`].
    pub fn validate(&self) -> Result<(), ListError> {
        self.shared.validate()
    }

    // ========================================================================
    //  Cursors
    // ========================================================================

    /// Forward node cursor from before the first node.
    #[must_use]
    pub fn nodes(&self) -> NodeCursor<T> {
        NodeCursor::new(Arc::clone(&self.shared), Position::Start, false, false)
    }

    /// Backward node cursor from after the last node.
    #[must_use]
    pub fn nodes_rev(&self) -> NodeCursor<T> {
        NodeCursor::new(Arc::clone(&self.shared), Position::End, true, false)
    }

    /// Forward value cursor. Dead values are skipped.
    #[must_use]
    pub fn iter(&self) -> ValueCursor<T> {
        ValueCursor::new(self.nodes())
    }

    /// Backward value cursor. Dead values are skipped.
    #[must_use]
    pub fn iter_rev(&self) -> ValueCursor<T> {
        ValueCursor::new(self.nodes_rev())
    }

    /// Forward node cursor positioned on `node`; the first step yields the
    /// node after it.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`].
    pub fn cursor_after(&self, node: &Node<T>) -> Result<NodeCursor<T>, ListError> {
        self.check_owner(node)?;
        Ok(NodeCursor::new(
            Arc::clone(&self.shared),
            Position::At(Arc::clone(&node.shared)),
            false,
            false,
        ))
    }

    /// Backward node cursor positioned on `node`; the first step yields the
    /// node before it.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`].
    pub fn cursor_before(&self, node: &Node<T>) -> Result<NodeCursor<T>, ListError> {
        self.check_owner(node)?;
        Ok(NodeCursor::new(
            Arc::clone(&self.shared),
            Position::At(Arc::clone(&node.shared)),
            true,
            false,
        ))
    }

    /// Restartable value sequence over the whole list. With `skip_new_nodes`,
    /// nodes inserted after this call are never yielded.
    #[must_use]
    pub fn as_enumerable(&self, reversed: bool, skip_new_nodes: bool) -> Snapshot<T> {
        let origin = if reversed { Position::End } else { Position::Start };
        Snapshot::new(Arc::clone(&self.shared), origin, reversed, skip_new_nodes)
    }
}

impl<T: Send + Sync + 'static> WeakList<T> {
    /// Insert at the front.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn add_first(&self, value: &Tracked<T>) -> Result<Node<T>, ListError> {
        self.place(value, Placement::Front)
    }

    /// Insert at the back.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn add_last(&self, value: &Tracked<T>) -> Result<Node<T>, ListError> {
        self.place(value, Placement::Back)
    }

    /// Insert so the new node lands at `index` (`0..=count`).
    ///
    /// # Errors
    /// [`ListError::OutOfRange`] if `index > count`, [`ListError::Disposed`],
    /// or [`ListError::Corruption`].
    pub fn insert_at(&self, index: usize, value: &Tracked<T>) -> Result<Node<T>, ListError> {
        self.place(value, Placement::At(index))
    }

    fn place(&self, value: &Tracked<T>, placement: Placement<T>) -> Result<Node<T>, ListError> {
        self.shared
            .insert(value, placement)?
            .map(|n| self.wrap(n))
            .ok_or(TreeError::Corrupted("unanchored insert reported a missing anchor").into())
    }

    fn place_near(
        &self,
        anchor: &Node<T>,
        value: &Tracked<T>,
        after: bool,
        follow: bool,
    ) -> Result<Option<Node<T>>, ListError> {
        self.check_owner(anchor)?;
        Ok(self
            .shared
            .insert_near(&anchor.shared, value, after, follow)?
            .map(|n| self.wrap(n)))
    }

    /// Insert directly after `anchor`.
    ///
    /// If `anchor` was already removed, the new node goes before the first
    /// node that followed `anchor` and is still attached, or at the back if
    /// there is none.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`], [`ListError::Disposed`], or
    /// [`ListError::Corruption`].
    pub fn add_after(&self, anchor: &Node<T>, value: &Tracked<T>) -> Result<Node<T>, ListError> {
        self.place_near(anchor, value, true, true)?
            .ok_or(TreeError::Corrupted("anchor chase returned no placement").into())
    }

    /// Insert directly before `anchor`.
    ///
    /// If `anchor` was already removed, the new node goes after the last node
    /// that preceded `anchor` and is still attached, or at the front if there
    /// is none.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`], [`ListError::Disposed`], or
    /// [`ListError::Corruption`].
    pub fn add_before(&self, anchor: &Node<T>, value: &Tracked<T>) -> Result<Node<T>, ListError> {
        self.place_near(anchor, value, false, true)?
            .ok_or(TreeError::Corrupted("anchor chase returned no placement").into())
    }

    /// Like [`add_after`](Self::add_after), but returns `None` instead of
    /// relocating when `anchor` has been removed.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`], [`ListError::Disposed`], or
    /// [`ListError::Corruption`].
    pub fn add_after_live(&self, anchor: &Node<T>, value: &Tracked<T>) -> Result<Option<Node<T>>, ListError> {
        self.place_near(anchor, value, true, false)
    }

    /// Like [`add_before`](Self::add_before), but returns `None` instead of
    /// relocating when `anchor` has been removed.
    ///
    /// # Errors
    /// [`ListError::ForeignNode`], [`ListError::Disposed`], or
    /// [`ListError::Corruption`].
    pub fn add_before_live(&self, anchor: &Node<T>, value: &Tracked<T>) -> Result<Option<Node<T>>, ListError> {
        self.place_near(anchor, value, false, false)
    }
}

impl<T> Default for WeakList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for WeakList<T> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl<T> StdFmt::Debug for WeakList<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("WeakList")
            .field("count", &self.shared.count.load(READ_ORD))
            .field("version", &self.shared.version.load(READ_ORD))
            .field("disposed", &self.shared.is_disposed())
            .finish_non_exhaustive()
    }
}
