//! Value equality used by the search operations.
//!
//! [`DefaultComparer`] defers to `PartialEq`. Any `Fn(&T, &T) -> bool` is a
//! comparer too, so ad hoc equality needs no wrapper type:
//!
//! ```rust
//! use weaklist::{Tracked, WeakList};
//!
//! let list = WeakList::new();
//! let word = Tracked::new(String::from("Hello"));
//! list.add_last(&word)?;
//!
//! let ignore_case = |a: &String, b: &String| a.eq_ignore_ascii_case(b);
//! assert!(list.contains_with(&String::from("HELLO"), &ignore_case)?);
//! assert!(!list.contains(&String::from("HELLO"))?);
//! # Ok::<(), weaklist::ListError>(())
//! ```

/// Equality predicate over stored values.
pub trait Comparer<T: ?Sized> {
    /// True if `a` and `b` are considered the same value.
    fn equals(&self, a: &T, b: &T) -> bool;
}

/// Equality through `PartialEq`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultComparer;

impl<T: PartialEq + ?Sized> Comparer<T> for DefaultComparer {
    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

impl<T: ?Sized, F> Comparer<T> for F
where
    F: Fn(&T, &T) -> bool,
{
    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        self(a, b)
    }
}
