//! Cursors over a [`WeakList`](crate::WeakList).
//!
//! A cursor holds its current node strongly, so the node's tombstone stays
//! readable after a concurrent removal. Each step:
//!
//! 1. fails with [`ListError::Disposed`] if the list is gone (lock-free check)
//! 2. if the current node was removed, follows its frozen links to the first
//!    attached node, without the lock
//! 3. otherwise takes the lock for one `O(log n)` tree step
//! 4. if the node found under the lock was removed before we look at it,
//!    chases from it as in step 2
//!
//! A cursor never yields a node that was removed before the cursor reached
//! it, and never yields a node twice unless the node is reinserted (which
//! cannot happen: a removed node stays removed).
//!
//! With `skip_new_nodes` the cursor also ignores nodes inserted after it was
//! created, by comparing insert versions.

use std::fmt as StdFmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::error::ListError;
use crate::list::{ListShared, Step};
use crate::liveness::Tracked;
use crate::node::{Node, NodeShared, chase};

// ============================================================================
//  Position
// ============================================================================

/// Where a cursor sits.
pub(crate) enum Position<T> {
    /// Before the first node.
    Start,
    /// On a node (attached or removed).
    At(Arc<NodeShared<T>>),
    /// After the last node.
    End,
}

impl<T> Clone for Position<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Start => Self::Start,
            Self::At(node) => Self::At(Arc::clone(node)),
            Self::End => Self::End,
        }
    }
}

// ============================================================================
//  NodeCursor
// ============================================================================

/// Bidirectional cursor yielding [`Node`] handles.
///
/// As an [`Iterator`] it walks in its own direction (forward unless created
/// reversed) and simply ends if the list is disposed; the `move_*` methods
/// report that as an error instead.
pub struct NodeCursor<T> {
    list: Arc<ListShared<T>>,
    origin: Position<T>,
    position: Position<T>,
    start_version: u64,
    reversed: bool,
    skip_new: bool,
}

impl<T> NodeCursor<T> {
    pub(crate) fn new(list: Arc<ListShared<T>>, origin: Position<T>, reversed: bool, skip_new: bool) -> Self {
        let start_version = list.version_snapshot();
        Self::with_version(list, origin, reversed, skip_new, start_version)
    }

    pub(crate) fn with_version(
        list: Arc<ListShared<T>>,
        origin: Position<T>,
        reversed: bool,
        skip_new: bool,
        start_version: u64,
    ) -> Self {
        Self {
            list,
            position: origin.clone(),
            origin,
            start_version,
            reversed,
            skip_new,
        }
    }

    /// Step towards the back.
    ///
    /// Returns `false` (and parks after the last node) when there is no next
    /// node.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn move_next(&mut self) -> Result<bool, ListError> {
        self.step(true)
    }

    /// Step towards the front.
    ///
    /// Returns `false` (and parks before the first node) when there is no
    /// previous node.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn move_prev(&mut self) -> Result<bool, ListError> {
        self.step(false)
    }

    /// Step in this cursor's own direction.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn advance(&mut self) -> Result<bool, ListError> {
        self.step(!self.reversed)
    }

    fn step(&mut self, forward: bool) -> Result<bool, ListError> {
        if self.list.is_disposed() {
            return Err(ListError::Disposed);
        }

        loop {
            let found = match &self.position {
                Position::Start if !forward => return Ok(false),
                Position::End if forward => return Ok(false),
                Position::Start | Position::End => self.list.boundary(forward)?,
                Position::At(node) if node.is_removed() => chase(node, forward),
                Position::At(node) => match self.list.step_from(node, forward)? {
                    Step::Moved(next) => next,
                    Step::Stale => chase(node, forward),
                },
            };

            // Removed between the locked step and now.
            let found = match found {
                Some(node) if node.is_removed() => chase(&node, forward),
                other => other,
            };

            let Some(node) = found else {
                self.position = if forward { Position::End } else { Position::Start };
                return Ok(false);
            };

            let skip = self.skip_new && node.version() > self.start_version;
            self.position = Position::At(node);
            if !skip {
                return Ok(true);
            }
        }
    }

    /// The node under the cursor, `None` at either end.
    #[must_use]
    pub fn current(&self) -> Option<Node<T>> {
        self.current_shared()
            .map(|n| Node::from_parts(Arc::clone(n), Arc::clone(&self.list)))
    }

    pub(crate) const fn current_shared(&self) -> Option<&Arc<NodeShared<T>>> {
        match &self.position {
            Position::At(node) => Some(node),
            Position::Start | Position::End => None,
        }
    }

    /// Return to where the cursor was created and take a fresh start version.
    pub fn reset(&mut self) {
        self.position = self.origin.clone();
        self.start_version = self.list.version_snapshot();
    }

    /// Insert version the cursor compares against when skipping new nodes.
    #[must_use]
    pub const fn start_version(&self) -> u64 {
        self.start_version
    }

    /// True if this cursor iterates back to front.
    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversed
    }

    /// True if nodes inserted after creation are skipped.
    #[must_use]
    pub const fn skips_new_nodes(&self) -> bool {
        self.skip_new
    }

    /// Restartable value sequence starting from the current position. The
    /// node under the cursor is not part of it.
    #[must_use]
    pub fn as_enumerable(&self, reversed: bool, skip_new_nodes: bool) -> Snapshot<T> {
        Snapshot {
            list: Arc::clone(&self.list),
            origin: self.position.clone(),
            start_version: self.start_version,
            reversed,
            skip_new: skip_new_nodes,
        }
    }

    /// Turn into a cursor over live values.
    #[must_use]
    pub fn values(self) -> ValueCursor<T> {
        ValueCursor::new(self)
    }
}

impl<T> Iterator for NodeCursor<T> {
    type Item = Node<T>;

    fn next(&mut self) -> Option<Node<T>> {
        match self.advance() {
            Ok(true) => self.current(),
            Ok(false) | Err(_) => None,
        }
    }
}

impl<T> FusedIterator for NodeCursor<T> {}

impl<T> StdFmt::Debug for NodeCursor<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        let at = match &self.position {
            Position::Start => "start",
            Position::At(node) if node.is_removed() => "removed node",
            Position::At(_) => "node",
            Position::End => "end",
        };
        f.debug_struct("NodeCursor")
            .field("at", &at)
            .field("start_version", &self.start_version)
            .field("reversed", &self.reversed)
            .field("skip_new", &self.skip_new)
            .finish_non_exhaustive()
    }
}

// ============================================================================
//  ValueCursor
// ============================================================================

/// Cursor yielding strong handles to live values.
///
/// Nodes whose values died are stepped over; their own reclaim hooks remove
/// them. The handle under the cursor keeps that value alive until the cursor
/// moves.
pub struct ValueCursor<T> {
    nodes: NodeCursor<T>,
    current: Option<Tracked<T>>,
}

impl<T> ValueCursor<T> {
    pub(crate) const fn new(nodes: NodeCursor<T>) -> Self {
        Self {
            nodes,
            current: None,
        }
    }

    fn step(&mut self, forward: bool) -> Result<bool, ListError> {
        // Drop the previous value outside the lock; its hooks may remove nodes.
        self.current = None;

        while self.nodes.step(forward)? {
            if let Some(value) = self
                .nodes
                .current_shared()
                .and_then(|n| n.binding().read())
            {
                self.current = Some(value);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Step towards the back, skipping dead values.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn move_next(&mut self) -> Result<bool, ListError> {
        self.step(true)
    }

    /// Step towards the front, skipping dead values.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn move_prev(&mut self) -> Result<bool, ListError> {
        self.step(false)
    }

    /// Step in this cursor's own direction.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn advance(&mut self) -> Result<bool, ListError> {
        self.step(!self.nodes.reversed)
    }

    /// The value under the cursor.
    #[must_use]
    pub const fn current(&self) -> Option<&Tracked<T>> {
        self.current.as_ref()
    }

    /// The node holding the current value.
    #[must_use]
    pub fn current_node(&self) -> Option<Node<T>> {
        self.current.as_ref().and_then(|_| self.nodes.current())
    }

    /// Return to where the cursor was created.
    pub fn reset(&mut self) {
        self.current = None;
        self.nodes.reset();
    }

    /// Restartable value sequence starting from the current position.
    #[must_use]
    pub fn as_enumerable(&self, reversed: bool, skip_new_nodes: bool) -> Snapshot<T> {
        self.nodes.as_enumerable(reversed, skip_new_nodes)
    }
}

impl<T> Iterator for ValueCursor<T> {
    type Item = Tracked<T>;

    fn next(&mut self) -> Option<Tracked<T>> {
        match self.advance() {
            Ok(true) => self.current.clone(),
            Ok(false) | Err(_) => None,
        }
    }
}

impl<T> FusedIterator for ValueCursor<T> {}

impl<T> StdFmt::Debug for ValueCursor<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("ValueCursor")
            .field("nodes", &self.nodes)
            .field("has_value", &self.current.is_some())
            .finish()
    }
}

// ============================================================================
//  Snapshot
// ============================================================================

/// A cold, restartable value sequence.
///
/// Every call to [`iter`](Self::iter) starts over from the captured position
/// and compares against the captured start version, so with
/// `skip_new_nodes` a snapshot keeps ignoring nodes inserted after it was
/// taken however many times it is iterated.
pub struct Snapshot<T> {
    list: Arc<ListShared<T>>,
    origin: Position<T>,
    start_version: u64,
    reversed: bool,
    skip_new: bool,
}

impl<T> Snapshot<T> {
    pub(crate) fn new(list: Arc<ListShared<T>>, origin: Position<T>, reversed: bool, skip_new: bool) -> Self {
        let start_version = list.version_snapshot();
        Self {
            list,
            origin,
            start_version,
            reversed,
            skip_new,
        }
    }

    /// Fresh node cursor from the captured position.
    #[must_use]
    pub fn nodes(&self) -> NodeCursor<T> {
        NodeCursor::with_version(
            Arc::clone(&self.list),
            self.origin.clone(),
            self.reversed,
            self.skip_new,
            self.start_version,
        )
    }

    /// Fresh value cursor from the captured position.
    #[must_use]
    pub fn iter(&self) -> ValueCursor<T> {
        ValueCursor::new(self.nodes())
    }

    /// Version captured when the snapshot was taken.
    #[must_use]
    pub const fn start_version(&self) -> u64 {
        self.start_version
    }
}

impl<T> IntoIterator for &Snapshot<T> {
    type Item = Tracked<T>;
    type IntoIter = ValueCursor<T>;

    fn into_iter(self) -> ValueCursor<T> {
        self.iter()
    }
}

impl<T> StdFmt::Debug for Snapshot<T> {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        f.debug_struct("Snapshot")
            .field("start_version", &self.start_version)
            .field("reversed", &self.reversed)
            .field("skip_new", &self.skip_new)
            .finish_non_exhaustive()
    }
}
