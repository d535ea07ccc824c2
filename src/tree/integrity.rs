//! Integrity oracle for [`OsTree`].
//!
//! Checks every structural invariant in one pass. Intended for tests and
//! debugging; nothing on the operational path depends on it.

use super::{OsTree, SlotId};
use crate::error::TreeError;

impl<P> OsTree<P> {
    /// Verify the red-black and order-statistics invariants.
    ///
    /// - the root is black and has no parent
    /// - a red node has no red child
    /// - every root-to-leaf path has the same black height
    /// - every child's parent link points back at its parent
    /// - `size == 1 + left.size + right.size` everywhere
    /// - the pseudo-node is the leftmost node
    /// - every allocated slot is reachable from the root exactly once
    ///
    /// # Errors
    /// [`TreeError::Corrupted`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), TreeError> {
        let root = self.root_id()?;

        if self.parent(root).is_some() {
            return Err(TreeError::Corrupted("root has a parent"));
        }
        if self.is_red(root) {
            return Err(TreeError::Corrupted("root is red"));
        }
        if self.leftmost(root)? != self.pseudo {
            return Err(TreeError::Corrupted("pseudo-node is not leftmost"));
        }

        let mut visited = 0_usize;
        self.check_subtree(root, 1, &mut visited)?;

        let allocated = self.slots.iter().filter(|s| s.payload.is_some()).count();
        if visited != allocated {
            return Err(TreeError::Corrupted("unreachable or duplicated slots"));
        }
        if allocated + self.free_len != self.slots.len() {
            return Err(TreeError::Corrupted("free list out of sync with arena"));
        }
        self.check_free_list()?;

        Ok(())
    }

    /// Every free-list entry is an empty slot, back links match, and the
    /// list holds exactly `free_len` slots.
    fn check_free_list(&self) -> Result<(), TreeError> {
        let mut seen = 0_usize;
        let mut prev: Option<SlotId> = None;
        let mut cur = self.free_head;

        while let Some(id) = cur {
            let Some(slot) = self.slots.get(id.index()) else {
                return Err(TreeError::Corrupted("free list points past the arena"));
            };
            if slot.payload.is_some() {
                return Err(TreeError::Corrupted("occupied slot on the free list"));
            }
            if slot.left != prev {
                return Err(TreeError::Corrupted("free list back link mismatch"));
            }
            seen += 1;
            if seen > self.free_len {
                return Err(TreeError::Corrupted("free list longer than its count"));
            }
            prev = cur;
            cur = slot.right;
        }

        if seen == self.free_len {
            Ok(())
        } else {
            Err(TreeError::Corrupted("free list shorter than its count"))
        }
    }

    /// Returns the black height of the subtree rooted at `id`.
    fn check_subtree(
        &self,
        id: SlotId,
        depth: usize,
        visited: &mut usize,
    ) -> Result<usize, TreeError> {
        if depth > self.max_depth {
            return Err(TreeError::Corrupted("tree deeper than walk bound"));
        }
        if self.slots.get(id.index()).is_none_or(|s| s.payload.is_none()) {
            return Err(TreeError::Corrupted("link to free slot"));
        }
        *visited += 1;

        let left = self.left(id);
        let right = self.right(id);

        for child in [left, right].into_iter().flatten() {
            if self.slots.get(child.index()).is_none_or(|s| s.payload.is_none()) {
                return Err(TreeError::Corrupted("link to free slot"));
            }
            if self.parent(child) != Some(id) {
                return Err(TreeError::Corrupted("parent link mismatch"));
            }
            if self.is_red(id) && self.is_red(child) {
                return Err(TreeError::Corrupted("red node with red child"));
            }
        }

        let left_height = match left {
            Some(l) => self.check_subtree(l, depth + 1, visited)?,
            None => 0,
        };
        let right_height = match right {
            Some(r) => self.check_subtree(r, depth + 1, visited)?,
            None => 0,
        };

        if left_height != right_height {
            return Err(TreeError::Corrupted("black height mismatch"));
        }
        if self.size(id) != 1 + self.size_of(left) + self.size_of(right) {
            return Err(TreeError::Corrupted("subtree size mismatch"));
        }

        Ok(left_height + usize::from(!self.is_red(id)))
    }
}
