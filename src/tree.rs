//! Order-statistics red-black tree.
//!
//! [`OsTree`] stores payloads in in-order sequence (there are no keys; the
//! order is purely positional). Every node caches its subtree size, which
//! gives `O(log n)` insert-at-rank, remove, rank-of-node, and node-at-rank.
//!
//! # Arena
//!
//! Nodes live in a `Vec` arena and are addressed by [`SlotId`]. Freed slots are
//! recycled through a free list, and free slots at the end of the arena are
//! popped so the arena shrinks back after mass removal. A `SlotId` is only meaningful while the slot
//! is allocated; callers must not keep using an id after removing it.
//!
//! # Pseudo-node
//!
//! The tree is never empty: a permanent pseudo-node sits at overall rank 0.
//! Public positions ("live indices") are offset by one, so live index `i` is
//! overall rank `i + 1`. Boundary logic (insert at front, predecessor of the
//! first element) never has to special-case an empty tree.
//!
//! # Bounded walks
//!
//! Every loop that follows links counts its steps against `max_depth`. A tree
//! that satisfies the red-black invariants can never hit the bound, so hitting
//! it is reported as [`TreeError::Corrupted`] instead of looping forever.

use crate::error::TreeError;

mod integrity;

/// Arena capacity below which `remove` never shrinks the allocation.
const MIN_ARENA_CAPACITY: usize = 64;

/// Index into the node arena. `u32` supports up to ~4 billion nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(u32);

impl SlotId {
    /// Slot of the pseudo-node in every tree.
    pub const PSEUDO: Self = Self(0);

    /// Arena index.
    #[inline(always)]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
struct Slot<P> {
    parent: Option<SlotId>,
    left: Option<SlotId>,
    right: Option<SlotId>,
    red: bool,
    size: usize,
    // None while the slot sits on the free list. Free slots reuse `left` and
    // `right` as the previous and next free-list links.
    payload: Option<P>,
}

impl<P> Slot<P> {
    const fn new(payload: P) -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            red: true,
            size: 1,
            payload: Some(payload),
        }
    }
}

/// Positional red-black tree with a permanent leading pseudo-node.
#[derive(Debug)]
pub struct OsTree<P> {
    slots: Vec<Slot<P>>,
    free_head: Option<SlotId>,
    free_len: usize,
    root: Option<SlotId>,
    pseudo: SlotId,
    max_depth: usize,
}

/// Which empty child link a new node is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl<P> OsTree<P> {
    /// Create a tree holding only the pseudo-node.
    pub fn new(pseudo: P, max_depth: usize) -> Self {
        let mut root = Slot::new(pseudo);
        root.red = false;

        Self {
            slots: vec![root],
            free_head: None,
            free_len: 0,
            root: Some(SlotId::PSEUDO),
            pseudo: SlotId::PSEUDO,
            max_depth,
        }
    }

    // ========================================================================
    //  Accessors
    // ========================================================================

    /// Number of live (non-pseudo) nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.map_or(0, |r| self.size(r).saturating_sub(1))
    }

    /// True when only the pseudo-node remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The pseudo-node's slot.
    #[must_use]
    pub const fn pseudo(&self) -> SlotId {
        self.pseudo
    }

    /// Override the walk bound. A bound below the real depth makes walks
    /// fail, which is how tests provoke corruption handling.
    #[cfg(test)]
    pub(crate) const fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Payload of an allocated slot.
    #[must_use]
    pub fn payload(&self, id: SlotId) -> Option<&P> {
        self.slots.get(id.index())?.payload.as_ref()
    }

    /// Mutable payload of an allocated slot.
    pub fn payload_mut(&mut self, id: SlotId) -> Option<&mut P> {
        self.slots.get_mut(id.index())?.payload.as_mut()
    }

    #[inline(always)]
    fn slot(&self, id: SlotId) -> &Slot<P> {
        debug_assert!(self.slots[id.index()].payload.is_some());
        &self.slots[id.index()]
    }

    #[inline(always)]
    fn slot_mut(&mut self, id: SlotId) -> &mut Slot<P> {
        debug_assert!(self.slots[id.index()].payload.is_some());
        &mut self.slots[id.index()]
    }

    #[inline(always)]
    fn parent(&self, id: SlotId) -> Option<SlotId> {
        self.slot(id).parent
    }

    #[inline(always)]
    fn left(&self, id: SlotId) -> Option<SlotId> {
        self.slot(id).left
    }

    #[inline(always)]
    fn right(&self, id: SlotId) -> Option<SlotId> {
        self.slot(id).right
    }

    #[inline(always)]
    fn is_red(&self, id: SlotId) -> bool {
        self.slot(id).red
    }

    #[inline(always)]
    fn size(&self, id: SlotId) -> usize {
        self.slot(id).size
    }

    fn size_of(&self, id: Option<SlotId>) -> usize {
        id.map_or(0, |n| self.size(n))
    }

    fn null_safe_is_red(&self, id: Option<SlotId>) -> bool {
        id.is_some_and(|n| self.is_red(n))
    }

    fn null_safe_is_black(&self, id: Option<SlotId>) -> bool {
        !self.null_safe_is_red(id)
    }

    fn recompute_size(&mut self, id: SlotId) {
        let size = 1 + self.size_of(self.left(id)) + self.size_of(self.right(id));
        self.slot_mut(id).size = size;
    }

    /// Count one step of a structural walk against the depth bound.
    #[inline]
    fn step(&self, steps: &mut usize, what: &'static str) -> Result<(), TreeError> {
        *steps += 1;
        if *steps > self.max_depth {
            return Err(TreeError::Corrupted(what));
        }
        Ok(())
    }

    fn root_id(&self) -> Result<SlotId, TreeError> {
        self.root.ok_or(TreeError::Corrupted("missing root"))
    }

    // ========================================================================
    //  Arena
    // ========================================================================

    fn alloc(&mut self, make: impl FnOnce(SlotId) -> P) -> SlotId {
        if let Some(id) = self.free_head {
            self.unlink_free(id.index());
            self.slots[id.index()] = Slot::new(make(id));
            id
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "u32::MAX live nodes exhaust memory long before the index wraps"
            )]
            let id = SlotId(self.slots.len() as u32);
            self.slots.push(Slot::new(make(id)));
            id
        }
    }

    fn free_slot(&mut self, id: SlotId) -> Option<P> {
        let slot = &mut self.slots[id.index()];
        slot.parent = None;
        slot.left = None;
        slot.right = None;
        slot.red = false;
        slot.size = 0;
        let payload = slot.payload.take();
        self.link_free(id);
        self.trim_arena();
        payload
    }

    fn link_free(&mut self, id: SlotId) {
        let head = self.free_head;
        let slot = &mut self.slots[id.index()];
        slot.left = None;
        slot.right = head;
        if let Some(head) = head {
            self.slots[head.index()].left = Some(id);
        }
        self.free_head = Some(id);
        self.free_len += 1;
    }

    /// Take the free slot at `idx` off the free list in O(1).
    fn unlink_free(&mut self, idx: usize) {
        let slot = &mut self.slots[idx];
        let (prev, next) = (slot.left.take(), slot.right.take());

        match prev {
            Some(prev) => self.slots[prev.index()].right = next,
            None => self.free_head = next,
        }
        if let Some(next) = next {
            self.slots[next.index()].left = prev;
        }
        self.free_len -= 1;
    }

    /// Pop free slots off the end of the arena. Each slot is popped at most
    /// once per free, so the cost is amortized into `remove`.
    fn trim_arena(&mut self) {
        while self.slots.len() > 1 && self.slots.last().is_some_and(|s| s.payload.is_none()) {
            self.unlink_free(self.slots.len() - 1);
            self.slots.pop();
        }

        let len = self.slots.len().max(MIN_ARENA_CAPACITY);
        if self.slots.capacity() > len * 4 {
            self.slots.shrink_to(len * 2);
        }
    }

    // ========================================================================
    //  Navigation
    // ========================================================================

    fn leftmost(&self, mut id: SlotId) -> Result<SlotId, TreeError> {
        let mut steps = 0;
        while let Some(left) = self.left(id) {
            self.step(&mut steps, "leftmost walk exceeded bound")?;
            id = left;
        }
        Ok(id)
    }

    fn rightmost(&self, mut id: SlotId) -> Result<SlotId, TreeError> {
        let mut steps = 0;
        while let Some(right) = self.right(id) {
            self.step(&mut steps, "rightmost walk exceeded bound")?;
            id = right;
        }
        Ok(id)
    }

    /// In-order successor, `None` past the last node.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if the walk exceeds its bound.
    pub fn next(&self, id: SlotId) -> Result<Option<SlotId>, TreeError> {
        if let Some(right) = self.right(id) {
            return self.leftmost(right).map(Some);
        }

        let mut steps = 0;
        let mut cur = id;
        while let Some(parent) = self.parent(cur) {
            self.step(&mut steps, "successor walk exceeded bound")?;
            if self.left(parent) == Some(cur) {
                return Ok(Some(parent));
            }
            cur = parent;
        }
        Ok(None)
    }

    /// In-order predecessor, `None` before the first live node (the pseudo-node
    /// is never returned).
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if the walk exceeds its bound.
    pub fn prev(&self, id: SlotId) -> Result<Option<SlotId>, TreeError> {
        let found = if let Some(left) = self.left(id) {
            Some(self.rightmost(left)?)
        } else {
            let mut steps = 0;
            let mut cur = id;
            let mut found = None;
            while let Some(parent) = self.parent(cur) {
                self.step(&mut steps, "predecessor walk exceeded bound")?;
                if self.right(parent) == Some(cur) {
                    found = Some(parent);
                    break;
                }
                cur = parent;
            }
            found
        };

        Ok(found.filter(|&n| n != self.pseudo))
    }

    /// First live node.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if the walk exceeds its bound.
    pub fn first(&self) -> Result<Option<SlotId>, TreeError> {
        self.next(self.pseudo)
    }

    /// Last live node.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if the walk exceeds its bound.
    pub fn last(&self) -> Result<Option<SlotId>, TreeError> {
        let last = self.rightmost(self.root_id()?)?;
        Ok((last != self.pseudo).then_some(last))
    }

    // ========================================================================
    //  Order statistics
    // ========================================================================

    /// Live index of an attached node.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if the walk exceeds its bound or `id` is the
    /// pseudo-node.
    pub fn rank(&self, id: SlotId) -> Result<usize, TreeError> {
        let mut rank = self.size_of(self.left(id));
        let mut steps = 0;
        let mut cur = id;

        while let Some(parent) = self.parent(cur) {
            self.step(&mut steps, "rank walk exceeded bound")?;
            if self.right(parent) == Some(cur) {
                rank += self.size_of(self.left(parent)) + 1;
            }
            cur = parent;
        }

        if Some(cur) != self.root {
            return Err(TreeError::Corrupted("rank walk did not reach root"));
        }

        rank.checked_sub(1)
            .ok_or(TreeError::Corrupted("rank of pseudo-node requested"))
    }

    /// Node at a live index. `index` must be `< len()`.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if sizes are inconsistent or the walk exceeds
    /// its bound.
    pub fn select(&self, index: usize) -> Result<SlotId, TreeError> {
        debug_assert!(index < self.len());

        let mut rank = index + 1;
        let mut cur = self.root_id()?;
        let mut steps = 0;

        loop {
            self.step(&mut steps, "select walk exceeded bound")?;
            let left_size = self.size_of(self.left(cur));

            if rank < left_size {
                cur = self
                    .left(cur)
                    .ok_or(TreeError::Corrupted("select: missing left child"))?;
            } else if rank == left_size {
                return Ok(cur);
            } else {
                rank -= left_size + 1;
                cur = self
                    .right(cur)
                    .ok_or(TreeError::Corrupted("select: missing right child"))?;
            }
        }
    }

    // ========================================================================
    //  Rotations
    // ========================================================================

    fn replace_in_parent(&mut self, old: SlotId, new: Option<SlotId>, parent: Option<SlotId>) {
        match parent {
            None => self.root = new,
            Some(p) => {
                if self.left(p) == Some(old) {
                    self.slot_mut(p).left = new;
                } else {
                    self.slot_mut(p).right = new;
                }
            }
        }
    }

    fn rotate_left(&mut self, node: SlotId) {
        let Some(right) = self.right(node) else {
            debug_assert!(false, "rotate_left without right child");
            return;
        };
        let node_size = self.size(node);

        let right_left = self.left(right);
        self.slot_mut(node).right = right_left;
        if let Some(rl) = right_left {
            self.slot_mut(rl).parent = Some(node);
        }

        let node_parent = self.parent(node);
        self.slot_mut(right).parent = node_parent;
        self.replace_in_parent(node, Some(right), node_parent);

        self.slot_mut(right).left = Some(node);
        self.slot_mut(node).parent = Some(right);

        // The rotated pair covers the same subtree as before.
        self.slot_mut(right).size = node_size;
        self.recompute_size(node);
    }

    fn rotate_right(&mut self, node: SlotId) {
        let Some(left) = self.left(node) else {
            debug_assert!(false, "rotate_right without left child");
            return;
        };
        let node_size = self.size(node);

        let left_right = self.right(left);
        self.slot_mut(node).left = left_right;
        if let Some(lr) = left_right {
            self.slot_mut(lr).parent = Some(node);
        }

        let node_parent = self.parent(node);
        self.slot_mut(left).parent = node_parent;
        self.replace_in_parent(node, Some(left), node_parent);

        self.slot_mut(left).right = Some(node);
        self.slot_mut(node).parent = Some(left);

        self.slot_mut(left).size = node_size;
        self.recompute_size(node);
    }

    // ========================================================================
    //  Insert
    // ========================================================================

    /// Grow or shrink by one the size of `start` and every ancestor.
    fn adjust_sizes(&mut self, start: Option<SlotId>, grow: bool) -> Result<(), TreeError> {
        let mut steps = 0;
        let mut cur = start;
        while let Some(id) = cur {
            self.step(&mut steps, "size propagation exceeded bound")?;
            let slot = self.slot_mut(id);
            if grow {
                slot.size += 1;
            } else {
                slot.size = slot
                    .size
                    .checked_sub(1)
                    .ok_or(TreeError::Corrupted("subtree size underflow"))?;
            }
            cur = slot.parent;
        }
        Ok(())
    }

    fn attach(
        &mut self,
        parent: SlotId,
        side: Side,
        make: impl FnOnce(SlotId) -> P,
    ) -> Result<SlotId, TreeError> {
        let id = self.alloc(make);
        self.slot_mut(id).parent = Some(parent);
        match side {
            Side::Left => self.slot_mut(parent).left = Some(id),
            Side::Right => self.slot_mut(parent).right = Some(id),
        }

        self.adjust_sizes(Some(parent), true)?;
        self.insert_fix(id)?;
        Ok(id)
    }

    fn insert_fix(&mut self, mut node: SlotId) -> Result<(), TreeError> {
        let mut steps = 0;

        while self.null_safe_is_red(self.parent(node)) {
            self.step(&mut steps, "insert fix-up exceeded bound")?;
            let Some(parent) = self.parent(node) else {
                break;
            };
            let Some(grandparent) = self.parent(parent) else {
                break;
            };

            if Some(parent) == self.left(grandparent) {
                let uncle = self.right(grandparent);

                if self.null_safe_is_red(uncle) {
                    self.slot_mut(parent).red = false;
                    if let Some(u) = uncle {
                        self.slot_mut(u).red = false;
                    }
                    self.slot_mut(grandparent).red = true;
                    node = grandparent;
                } else {
                    if Some(node) == self.right(parent) {
                        node = parent;
                        self.rotate_left(node);
                    }
                    if let Some(parent) = self.parent(node)
                        && let Some(grandparent) = self.parent(parent)
                    {
                        self.slot_mut(parent).red = false;
                        self.slot_mut(grandparent).red = true;
                        self.rotate_right(grandparent);
                    }
                }
            } else {
                let uncle = self.left(grandparent);

                if self.null_safe_is_red(uncle) {
                    self.slot_mut(parent).red = false;
                    if let Some(u) = uncle {
                        self.slot_mut(u).red = false;
                    }
                    self.slot_mut(grandparent).red = true;
                    node = grandparent;
                } else {
                    if Some(node) == self.left(parent) {
                        node = parent;
                        self.rotate_right(node);
                    }
                    if let Some(parent) = self.parent(node)
                        && let Some(grandparent) = self.parent(parent)
                    {
                        self.slot_mut(parent).red = false;
                        self.slot_mut(grandparent).red = true;
                        self.rotate_left(grandparent);
                    }
                }
            }
        }

        let root = self.root_id()?;
        self.slot_mut(root).red = false;
        Ok(())
    }

    /// Insert so the new node ends up at live index `index` (`<= len()`).
    ///
    /// `make` receives the new node's slot id and builds its payload.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if sizes are inconsistent or a walk exceeds
    /// its bound.
    pub fn insert_at(
        &mut self,
        index: usize,
        make: impl FnOnce(SlotId) -> P,
    ) -> Result<SlotId, TreeError> {
        debug_assert!(index <= self.len());

        // Overall rank of the new node; the pseudo-node keeps rank 0.
        let mut rank = index + 1;
        let mut cur = self.root_id()?;
        let mut steps = 0;

        loop {
            self.step(&mut steps, "insert descent exceeded bound")?;
            let left_size = self.size_of(self.left(cur));

            if rank <= left_size {
                match self.left(cur) {
                    Some(left) => cur = left,
                    None => return self.attach(cur, Side::Left, make),
                }
            } else {
                rank -= left_size + 1;
                match self.right(cur) {
                    Some(right) => cur = right,
                    None => return self.attach(cur, Side::Right, make),
                }
            }
        }
    }

    /// Append after the last node.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if a walk exceeds its bound.
    pub fn push_back(&mut self, make: impl FnOnce(SlotId) -> P) -> Result<SlotId, TreeError> {
        let last = self.rightmost(self.root_id()?)?;
        self.attach(last, Side::Right, make)
    }

    /// Insert immediately after `anchor` (which may be the pseudo-node).
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if a walk exceeds its bound.
    pub fn insert_after(
        &mut self,
        anchor: SlotId,
        make: impl FnOnce(SlotId) -> P,
    ) -> Result<SlotId, TreeError> {
        match self.right(anchor) {
            None => self.attach(anchor, Side::Right, make),
            Some(right) => {
                let target = self.leftmost(right)?;
                self.attach(target, Side::Left, make)
            }
        }
    }

    /// Insert immediately before `anchor`. Must not be the pseudo-node.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if `anchor` is the pseudo-node or a walk
    /// exceeds its bound.
    pub fn insert_before(
        &mut self,
        anchor: SlotId,
        make: impl FnOnce(SlotId) -> P,
    ) -> Result<SlotId, TreeError> {
        if anchor == self.pseudo {
            return Err(TreeError::Corrupted("insert before pseudo-node"));
        }

        match self.left(anchor) {
            None => self.attach(anchor, Side::Left, make),
            Some(left) => {
                let target = self.rightmost(left)?;
                self.attach(target, Side::Right, make)
            }
        }
    }

    // ========================================================================
    //  Remove
    // ========================================================================

    /// Move `source` into `dest`'s structural position: links, color, size.
    fn transplant(&mut self, source: SlotId, dest: SlotId) {
        let dest_parent = self.parent(dest);
        self.replace_in_parent(dest, Some(source), dest_parent);
        self.slot_mut(source).parent = dest_parent;

        let dest_left = self.left(dest);
        let dest_right = self.right(dest);
        let dest_red = self.is_red(dest);
        let dest_size = self.size(dest);

        self.slot_mut(source).left = dest_left;
        if let Some(l) = dest_left {
            self.slot_mut(l).parent = Some(source);
        }
        self.slot_mut(source).right = dest_right;
        if let Some(r) = dest_right {
            self.slot_mut(r).parent = Some(source);
        }
        self.slot_mut(source).red = dest_red;
        self.slot_mut(source).size = dest_size;
    }

    fn remove_fix(
        &mut self,
        mut node: Option<SlotId>,
        mut parent: Option<SlotId>,
    ) -> Result<(), TreeError> {
        let mut steps = 0;

        while let Some(p) = parent {
            if !self.null_safe_is_black(node) {
                break;
            }
            self.step(&mut steps, "remove fix-up exceeded bound")?;

            if node == self.left(p) {
                let mut sibling = self
                    .right(p)
                    .ok_or(TreeError::Corrupted("remove fix-up: missing sibling"))?;

                if self.is_red(sibling) {
                    self.slot_mut(sibling).red = false;
                    self.slot_mut(p).red = true;
                    self.rotate_left(p);
                    sibling = self
                        .right(p)
                        .ok_or(TreeError::Corrupted("remove fix-up: missing sibling"))?;
                }

                if self.null_safe_is_black(self.left(sibling))
                    && self.null_safe_is_black(self.right(sibling))
                {
                    self.slot_mut(sibling).red = true;
                    node = Some(p);
                    parent = self.parent(p);
                } else {
                    if self.null_safe_is_black(self.right(sibling)) {
                        if let Some(near) = self.left(sibling) {
                            self.slot_mut(near).red = false;
                        }
                        self.slot_mut(sibling).red = true;
                        self.rotate_right(sibling);
                        sibling = self
                            .right(p)
                            .ok_or(TreeError::Corrupted("remove fix-up: missing sibling"))?;
                    }
                    let p_red = self.is_red(p);
                    self.slot_mut(sibling).red = p_red;
                    self.slot_mut(p).red = false;
                    if let Some(far) = self.right(sibling) {
                        self.slot_mut(far).red = false;
                    }
                    self.rotate_left(p);
                    node = self.root;
                    parent = None;
                }
            } else {
                let mut sibling = self
                    .left(p)
                    .ok_or(TreeError::Corrupted("remove fix-up: missing sibling"))?;

                if self.is_red(sibling) {
                    self.slot_mut(sibling).red = false;
                    self.slot_mut(p).red = true;
                    self.rotate_right(p);
                    sibling = self
                        .left(p)
                        .ok_or(TreeError::Corrupted("remove fix-up: missing sibling"))?;
                }

                if self.null_safe_is_black(self.right(sibling))
                    && self.null_safe_is_black(self.left(sibling))
                {
                    self.slot_mut(sibling).red = true;
                    node = Some(p);
                    parent = self.parent(p);
                } else {
                    if self.null_safe_is_black(self.left(sibling)) {
                        if let Some(near) = self.right(sibling) {
                            self.slot_mut(near).red = false;
                        }
                        self.slot_mut(sibling).red = true;
                        self.rotate_left(sibling);
                        sibling = self
                            .left(p)
                            .ok_or(TreeError::Corrupted("remove fix-up: missing sibling"))?;
                    }
                    let p_red = self.is_red(p);
                    self.slot_mut(sibling).red = p_red;
                    self.slot_mut(p).red = false;
                    if let Some(far) = self.left(sibling) {
                        self.slot_mut(far).red = false;
                    }
                    self.rotate_right(p);
                    node = self.root;
                    parent = None;
                }
            }
        }

        if let Some(n) = node {
            self.slot_mut(n).red = false;
        }
        Ok(())
    }

    /// Unlink a live node and free its slot, returning the payload.
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] if `id` is the pseudo-node or free, or a walk
    /// exceeds its bound.
    pub fn remove(&mut self, id: SlotId) -> Result<P, TreeError> {
        if id == self.pseudo {
            return Err(TreeError::Corrupted("removal of pseudo-node"));
        }
        if self.payload(id).is_none() {
            return Err(TreeError::Corrupted("removal of free slot"));
        }

        // The node physically spliced out has at most one child.
        let splice = match (self.left(id), self.right(id)) {
            (Some(_), Some(right)) => self.leftmost(right)?,
            _ => id,
        };
        let child = self.left(splice).or(self.right(splice));
        let splice_parent = self.parent(splice);
        let child_parent = if splice_parent == Some(id) {
            Some(splice)
        } else {
            splice_parent
        };

        // Every ancestor of the splice point loses one descendant.
        self.adjust_sizes(splice_parent, false)?;

        self.replace_in_parent(splice, child, splice_parent);
        if let Some(c) = child {
            self.slot_mut(c).parent = splice_parent;
        }
        let removed_black = !self.is_red(splice);

        if splice != id {
            self.transplant(splice, id);
        }

        if removed_black {
            self.remove_fix(child, child_parent)?;
        }

        self.free_slot(id)
            .ok_or(TreeError::Corrupted("removed slot had no payload"))
    }

    /// Remove every live node, returning their payloads in arena order. The
    /// pseudo-node stays.
    pub fn drain(&mut self) -> Vec<P> {
        let mut out = Vec::with_capacity(self.len());

        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if idx == self.pseudo.index() {
                continue;
            }
            if let Some(payload) = slot.payload.take() {
                out.push(payload);
            }
        }

        self.slots.truncate(1);
        self.slots.shrink_to(MIN_ARENA_CAPACITY);
        self.free_head = None;
        self.free_len = 0;
        let pseudo = &mut self.slots[0];
        pseudo.parent = None;
        pseudo.left = None;
        pseudo.right = None;
        pseudo.red = false;
        pseudo.size = 1;
        self.root = Some(self.pseudo);

        out
    }
}
