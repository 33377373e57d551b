#![forbid(unsafe_code)]

//! Reentrancy-safe update batching.
//!
//! Many nested mutations should collapse into one refresh: a widget that
//! changes five fields inside one event handler wants a single repaint, not
//! five. This crate provides the primitive for that pattern:
//!
//! - [`Batcher`]: a nesting counter bound to a notification callback. The
//!   callback fires exactly once, when the outermost open region closes.
//! - [`Region`]: RAII guard that opens a region on creation and closes it on
//!   drop, so the close runs on every exit path (normal return, early return,
//!   panic).
//!
//! # Architecture
//!
//! `Batcher<C>` uses `Rc<..>` with a `Cell` counter for single-threaded
//! shared ownership. Handles are cheap to clone; all clones share one
//! counter. Reentrancy is structural: code running inside [`Batcher::run`]
//! may call `begin`, `end`, or `run` on the same batcher, and the nesting
//! depth is exactly the counter value.
//!
//! The context value `C` is the fixed receiver for the notification: it is
//! stored once at construction and passed to the callback as `&C` on every
//! invocation, however the notification is triggered.
//!
//! # Invariants
//!
//! 1. After any balanced top-level call sequence, the depth is 0.
//! 2. During nested execution, the depth is at least 1.
//! 3. The notification runs synchronously and completes before the
//!    triggering `end`/`run` call returns.
//! 4. A panic inside a batched closure never skips the close: the depth is
//!    corrected and the notification fires if due, then the panic resumes.
//! 5. Unbalanced `end` calls drive the depth negative without panicking;
//!    any decrement that lands at or below zero fires the notification.
//!    Use [`Batcher::try_end`] when strict pairing should be enforced.
//!
//! # Example
//!
//! ```
//! use coalesce::Batcher;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let repaints = Rc::new(Cell::new(0));
//! let r = Rc::clone(&repaints);
//! let batcher = Batcher::detached(move || r.set(r.get() + 1));
//!
//! batcher.run(|_| {
//!     batcher.run(|_| { /* nested mutation */ });
//!     batcher.pulse();
//! });
//!
//! assert_eq!(repaints.get(), 1);
//! ```

pub mod batcher;
pub mod region;

pub use batcher::{Batcher, ImbalanceError};
pub use region::Region;
