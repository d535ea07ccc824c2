//! Node lifecycle: attached, claimed, removed.
//!
//! A [`NodeShared`] is allocated once per insert and never changes identity.
//! Its tree links live in the list's arena (see [`crate::tree`]); this struct
//! holds only what must be readable without the list lock:
//!
//! - the removal claim (`claimed`), won by exactly one removal trigger
//! - the tombstone (`tomb`), published once when the node leaves the tree
//! - the weak binding to the stored value
//!
//! # Tombstones
//!
//! When a node is removed its predecessor and successor at that instant are
//! frozen into the tombstone. A cursor parked on the node follows these links
//! to keep moving. A tombstone only ever points at nodes that were still
//! attached when it was written, so tombstone chains are acyclic and plain
//! reference counting reclaims them.

use std::fmt as StdFmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, OnceLock};

use crate::error::ListError;
use crate::list::ListShared;
use crate::liveness::{Binding, Tracked};
use crate::ordering::{CAS_FAILURE, CAS_SUCCESS, WRITE_ORD};
use crate::tree::SlotId;

// ============================================================================
//  Tombstone
// ============================================================================

/// Neighbors of a node at the moment it was removed.
pub(crate) struct Tombstone<T> {
    prev: Option<Arc<NodeShared<T>>>,
    next: Option<Arc<NodeShared<T>>>,
}

impl<T> Tombstone<T> {
    pub(crate) const fn new(
        prev: Option<Arc<NodeShared<T>>>,
        next: Option<Arc<NodeShared<T>>>,
    ) -> Self {
        Self { prev, next }
    }

    /// A tombstone without neighbors. Cursors parked on it end.
    pub(crate) const fn detached() -> Self {
        Self {
            prev: None,
            next: None,
        }
    }

    fn link(&self, forward: bool) -> Option<&Arc<NodeShared<T>>> {
        if forward {
            self.next.as_ref()
        } else {
            self.prev.as_ref()
        }
    }

    fn into_links(self) -> impl Iterator<Item = Arc<NodeShared<T>>> {
        self.prev.into_iter().chain(self.next)
    }
}

// ============================================================================
//  NodeShared
// ============================================================================

/// Lock-free visible state of one list slot.
pub(crate) struct NodeShared<T> {
    /// Arena slot while attached. Stale once `tomb` is set.
    slot: SlotId,
    /// List version assigned at insertion.
    version: u64,
    pseudo: bool,
    claimed: AtomicBool,
    tomb: OnceLock<Tombstone<T>>,
    binding: Binding<T>,
}

impl<T> NodeShared<T> {
    pub(crate) fn new(slot: SlotId, version: u64, binding: Binding<T>) -> Self {
        Self {
            slot,
            version,
            pseudo: false,
            claimed: AtomicBool::new(false),
            tomb: OnceLock::new(),
            binding,
        }
    }

    pub(crate) fn pseudo(slot: SlotId) -> Self {
        Self {
            slot,
            version: 0,
            pseudo: true,
            claimed: AtomicBool::new(true),
            tomb: OnceLock::new(),
            binding: Binding::empty(),
        }
    }

    #[inline]
    pub(crate) const fn slot(&self) -> SlotId {
        self.slot
    }

    #[inline]
    pub(crate) const fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub(crate) const fn is_pseudo(&self) -> bool {
        self.pseudo
    }

    #[inline]
    pub(crate) const fn binding(&self) -> &Binding<T> {
        &self.binding
    }

    /// True once the node has left the tree. Valid without the list lock:
    /// `OnceLock` publishes the tombstone with release/acquire semantics.
    #[inline]
    pub(crate) fn is_removed(&self) -> bool {
        self.tomb.get().is_some()
    }

    /// Try to become the single removal trigger for this node.
    pub(crate) fn try_claim(&self) -> bool {
        self.claimed
            .compare_exchange(false, true, CAS_SUCCESS, CAS_FAILURE)
            .is_ok()
    }

    /// Force the claim. Used by dispose, which overrides every trigger.
    pub(crate) fn force_claim(&self) {
        self.claimed.store(true, WRITE_ORD);
    }

    /// Publish the tombstone. Returns `false` if one was already published.
    pub(crate) fn bury(&self, tomb: Tombstone<T>) -> bool {
        self.tomb.set(tomb).is_ok()
    }

    /// Frozen neighbor in the given direction. `None` while attached or at a
    /// list boundary.
    pub(crate) fn tomb_link(&self, forward: bool) -> Option<&Arc<NodeShared<T>>> {
        self.tomb.get()?.link(forward)
    }
}

impl<T> Drop for NodeShared<T> {
    fn drop(&mut self) {
        // Unroll tombstone chains iteratively; a long chain would otherwise
        // recurse once per link.
        let mut pending: Vec<Arc<Self>> = match self.tomb.take() {
            Some(tomb) => tomb.into_links().collect(),
            None => return,
        };

        while let Some(node) = pending.pop() {
            if let Some(mut inner) = Arc::into_inner(node)
                && let Some(tomb) = inner.tomb.take()
            {
                pending.extend(tomb.into_links());
            }
        }
    }
}

/// Follow frozen links from a removed node to the first attached node in the
/// given direction.
pub(crate) fn chase<T>(from: &Arc<NodeShared<T>>, forward: bool) -> Option<Arc<NodeShared<T>>> {
    let mut cur = from.tomb_link(forward).cloned();
    while let Some(node) = cur {
        if !node.is_removed() {
            return Some(node);
        }
        cur = node.tomb_link(forward).cloned();
    }
    None
}

// ============================================================================
//  Node (public handle)
// ============================================================================

/// Handle to one element slot of a [`WeakList`](crate::WeakList).
///
/// A node keeps its list reachable but not its value. Equality and hashing
/// are by identity: two nodes holding the same value are still different
/// nodes.
pub struct Node<T> {
    pub(crate) shared: Arc<NodeShared<T>>,
    pub(crate) list: Arc<ListShared<T>>,
}

impl<T> Node<T> {
    pub(crate) const fn from_parts(shared: Arc<NodeShared<T>>, list: Arc<ListShared<T>>) -> Self {
        Self { shared, list }
    }

    /// True once the node has been removed, by any trigger. Never reverts.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.shared.is_removed()
    }

    /// The stored value, or `None` if the node was removed or the value died.
    #[must_use]
    pub fn value(&self) -> Option<Tracked<T>> {
        if self.shared.is_removed() {
            return None;
        }
        self.shared.binding().read()
    }

    /// True while the node is attached and its value alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        !self.shared.is_removed() && self.shared.binding().is_alive()
    }

    /// List version assigned when this node was inserted.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.version()
    }

    /// Remove this node from its list. See [`WeakList::remove`](crate::WeakList::remove).
    ///
    /// # Errors
    /// [`ListError::Disposed`] if the list was disposed before the node was
    /// removed; [`ListError::Corruption`] if the removal found the tree broken.
    pub fn remove(&self) -> Result<bool, ListError> {
        self.list.remove_node(&self.shared)
    }

    /// Current position, or `None` if removed.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn index(&self) -> Result<Option<usize>, ListError> {
        self.list.index_of_node(&self.shared)
    }

    pub(crate) fn belongs_to(&self, list: &Arc<ListShared<T>>) -> bool {
        Arc::ptr_eq(&self.list, list)
    }
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            list: Arc::clone(&self.list),
        }
    }
}

impl<T> PartialEq for Node<T> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl<T> Eq for Node<T> {}

impl<T> Hash for Node<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.shared).hash(state);
    }
}

impl<T> StdFmt::Debug for Node<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Node")
            .field("version", &self.shared.version())
            .field("removed", &self.shared.is_removed())
            .field("alive", &self.shared.binding().is_alive())
            .finish_non_exhaustive()
    }
}
