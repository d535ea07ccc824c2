//! # `WeakList`
//!
//! A concurrent ordered list whose nodes refer to their values weakly.
//!
//! Values enter the list as [`Tracked`] handles. The list only binds to them:
//! when the last `Tracked` clone of a value drops, the node that held it
//! removes itself, on the dropping thread. Nothing in the list ever keeps a
//! value alive.
//!
//! ## Structure
//!
//! - Order is kept by an order-statistics red-black tree ([`tree::OsTree`]),
//!   so positional insert, lookup, and rank are `O(log n)`.
//! - One [`spin::SpinLock`] guards the tree. Every critical section is a
//!   single bounded tree operation; `count` and `version` are readable
//!   without the lock.
//! - Removed nodes become tombstones that remember their neighbors at the
//!   time of removal. Cursors parked on a removed node follow those links, so
//!   iteration survives any interleaving of concurrent edits.
//!
//! ## Thread Safety
//!
//! `WeakList<T>` is `Send + Sync` when `T: Send + Sync`. Inserting requires
//! `T: Send + Sync + 'static` because the reclaim hook may run on any thread.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//! use weaklist::{Tracked, WeakList};
//!
//! let list = Arc::new(WeakList::new());
//! let keep: Vec<_> = (0..4).map(Tracked::new).collect();
//!
//! thread::scope(|s| {
//!     for v in &keep {
//!         let list = Arc::clone(&list);
//!         s.spawn(move || list.add_last(v).map(|_| ()));
//!     }
//! });
//!
//! assert_eq!(list.count()?, 4);
//! drop(keep);
//! assert_eq!(list.count()?, 0);
//! # Ok::<(), weaklist::ListError>(())
//! ```
//!
//! ## Errors
//!
//! Misuse (bad index, node from another list) is a [`ListError`] usage
//! error. A broken internal invariant disposes the list and is reported once
//! as [`ListError::Corruption`]; afterwards every operation reports
//! [`ListError::Disposed`].
//!
//! ## Logging
//!
//! With the `tracing` feature the crate emits `tracing` events (node
//! lifecycle at `trace`, dispose at `debug`, corruption at `error`). Without
//! it the logging macros compile to nothing.

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::inline_always)]

pub mod comparer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod liveness;
pub mod ordering;
pub mod spin;
pub mod tree;

mod list;
mod node;
mod tracing_helpers;

// Re-export main types for convenience
pub use comparer::{Comparer, DefaultComparer};
pub use config::ListConfig;
pub use cursor::{NodeCursor, Snapshot, ValueCursor};
pub use error::ListError;
pub use list::WeakList;
pub use liveness::{Binding, HookKey, ReclaimHook, Tracked};
pub use node::Node;
