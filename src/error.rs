//! Error types surfaced by [`WeakList`](crate::WeakList) operations.

use std::fmt as StdFmt;

// ============================================================================
//  ListError
// ============================================================================

/// Errors returned by list, node, and cursor operations.
///
/// Usage errors (`OutOfRange`, `ForeignNode`) are reported synchronously and
/// leave the list untouched. `Disposed` is terminal for the list instance.
/// `Corruption` is returned once, to the operation that detected a broken
/// internal invariant; that operation has already disposed the list, so every
/// later operation sees `Disposed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    /// Positional argument outside the valid range.
    OutOfRange {
        /// The index that was requested.
        index: usize,
        /// Number of live elements at the time of the call.
        len: usize,
    },

    /// The node handle belongs to a different list instance.
    ForeignNode,

    /// The list was disposed; no further operations are possible.
    Disposed,

    /// An internal invariant was violated. The list has been disposed.
    Corruption {
        /// Which walk or invariant failed.
        detail: &'static str,
    },
}

impl ListError {
    /// True for errors caused by the caller's arguments.
    #[must_use]
    pub const fn is_usage_error(&self) -> bool {
        matches!(self, Self::OutOfRange { .. } | Self::ForeignNode)
    }
}

impl StdFmt::Display for ListError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "index {index} out of range for list of length {len}")
            }

            Self::ForeignNode => write!(f, "node belongs to a different list"),

            Self::Disposed => write!(f, "list has been disposed"),

            Self::Corruption { detail } => {
                write!(f, "list corrupted ({detail}); list disposed")
            }
        }
    }
}

impl std::error::Error for ListError {}

// ============================================================================
//  TreeError
// ============================================================================

/// Failure inside the order-statistics tree.
///
/// The tree never returns partial results; any error means a structural walk
/// exceeded its bound or met a link that cannot exist in a valid tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeError {
    /// Structural invariant violated.
    Corrupted(&'static str),
}

impl StdFmt::Display for TreeError {
    fn fmt(&self, f: &mut StdFmt::Formatter<'_>) -> StdFmt::Result {
        match self {
            Self::Corrupted(detail) => write!(f, "tree corrupted: {detail}"),
        }
    }
}

impl std::error::Error for TreeError {}

impl From<TreeError> for ListError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Corrupted(detail) => Self::Corruption { detail },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_classification() {
        assert!(ListError::OutOfRange { index: 3, len: 2 }.is_usage_error());
        assert!(ListError::ForeignNode.is_usage_error());
        assert!(!ListError::Disposed.is_usage_error());
        assert!(!ListError::Corruption { detail: "x" }.is_usage_error());
    }

    #[test]
    fn test_tree_error_converts_to_corruption() {
        let err: ListError = TreeError::Corrupted("walk bound").into();
        assert_eq!(err, ListError::Corruption { detail: "walk bound" });
        assert_eq!(err.to_string(), "list corrupted (walk bound); list disposed");
    }

    #[test]
    fn test_display_out_of_range() {
        let err = ListError::OutOfRange { index: 7, len: 4 };
        assert_eq!(err.to_string(), "index 7 out of range for list of length 4");
    }
}
