//! Value searches.
//!
//! Each search walks a value cursor, so the lock is held only for single
//! steps and predicates run unlocked. A search therefore sees some valid
//! interleaving of concurrent edits, not a frozen snapshot. Removal by value
//! re-checks the matched node under the lock; if another trigger got there
//! first, the scan moves on.

use super::WeakList;
use crate::comparer::{Comparer, DefaultComparer};
use crate::cursor::ValueCursor;
use crate::error::ListError;
use crate::node::Node;

impl<T> WeakList<T> {
    fn scan(
        mut cursor: ValueCursor<T>,
        mut pred: impl FnMut(&T) -> bool,
    ) -> Result<Option<Node<T>>, ListError> {
        while cursor.advance()? {
            if cursor.current().is_some_and(|v| pred(v.as_ref())) {
                return Ok(cursor.current_node());
            }
        }
        Ok(None)
    }

    /// First node, front to back, whose live value satisfies `pred`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn find(&self, pred: impl FnMut(&T) -> bool) -> Result<Option<Node<T>>, ListError> {
        Self::scan(self.iter(), pred)
    }

    /// Last node whose live value satisfies `pred`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn find_last(&self, pred: impl FnMut(&T) -> bool) -> Result<Option<Node<T>>, ListError> {
        Self::scan(self.iter_rev(), pred)
    }

    /// First node holding a value equal to `value`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn find_value(&self, value: &T) -> Result<Option<Node<T>>, ListError>
    where
        T: PartialEq,
    {
        self.find_value_with(value, &DefaultComparer)
    }

    /// First node holding a value `comparer` considers equal to `value`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn find_value_with<C>(&self, value: &T, comparer: &C) -> Result<Option<Node<T>>, ListError>
    where
        C: Comparer<T> + ?Sized,
    {
        self.find(|v| comparer.equals(v, value))
    }

    /// True if some live value equals `value`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn contains(&self, value: &T) -> Result<bool, ListError>
    where
        T: PartialEq,
    {
        self.contains_with(value, &DefaultComparer)
    }

    /// True if `comparer` matches some live value against `value`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn contains_with<C>(&self, value: &T, comparer: &C) -> Result<bool, ListError>
    where
        C: Comparer<T> + ?Sized,
    {
        Ok(self.find_value_with(value, comparer)?.is_some())
    }

    /// Remove the first node holding a value equal to `value`.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn remove_value(&self, value: &T) -> Result<bool, ListError>
    where
        T: PartialEq,
    {
        self.remove_value_with(value, &DefaultComparer)
    }

    /// Remove the first node holding a value `comparer` considers equal to
    /// `value`. Returns `false` if no match was removed by this call.
    ///
    /// # Errors
    /// [`ListError::Disposed`] or [`ListError::Corruption`].
    pub fn remove_value_with<C>(&self, value: &T, comparer: &C) -> Result<bool, ListError>
    where
        C: Comparer<T> + ?Sized,
    {
        let mut cursor = self.iter();
        while cursor.advance()? {
            if !cursor.current().is_some_and(|v| comparer.equals(v.as_ref(), value)) {
                continue;
            }
            if let Some(node) = cursor.current_node()
                && node.remove()?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
