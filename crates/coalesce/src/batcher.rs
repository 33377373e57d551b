#![forbid(unsafe_code)]

//! The [`Batcher`] nesting counter and its notification callback.
//!
//! A batcher coalesces nested change regions into one notification: every
//! `begin` increments the depth, every `end` decrements it, and the callback
//! fires on the decrement that brings the depth to zero or below. Nested
//! regions therefore never notify; only the outermost exit does.
//!
//! # Invariants
//!
//! 1. The notification fires on every depth transition to `<= 0`, and only
//!    on those transitions.
//! 2. [`Batcher::run`] decrements and maybe-notifies on every exit path out
//!    of the supplied closure, including unwinding.
//! 3. The callback always receives the context captured at construction,
//!    regardless of which operation triggered it.
//! 4. Clones share one counter; depth observed through any handle is the
//!    same.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Over-decrement via `end` | unpaired call | depth goes negative, notification still fires |
//! | Over-decrement via `try_end` | unpaired call | `Err(ImbalanceError)`, depth untouched |
//! | Panic in `run` closure | caller bug | close runs first, panic then resumes |
//! | Panic in the notification | callback bug | propagates; aborts if already unwinding |

use std::cell::Cell;
use std::rc::Rc;

use crate::region::Region;

pub(crate) struct Inner<C> {
    context: C,
    depth: Cell<i64>,
    notify: Box<dyn Fn(&C)>,
}

/// A nesting counter that coalesces nested update regions into a single
/// notification, fired when the outermost region closes.
///
/// Cloning produces another handle to the same counter (shared state, like
/// an `Rc`). The type is single-threaded by construction: all calls are
/// synchronous and nested, never parallel.
pub struct Batcher<C = ()> {
    inner: Rc<Inner<C>>,
}

impl<C> Clone for Batcher<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<C> std::fmt::Debug for Batcher<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batcher")
            .field("depth", &self.inner.depth.get())
            .finish_non_exhaustive()
    }
}

impl<C: 'static> Batcher<C> {
    /// Create a batcher bound to `context`.
    ///
    /// `notify` is invoked with `&context` every time the depth returns to
    /// zero or below. The context is fixed for the batcher's lifetime.
    pub fn new(context: C, notify: impl Fn(&C) + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                context,
                depth: Cell::new(0),
                notify: Box::new(notify),
            }),
        }
    }
}

impl Batcher<()> {
    /// Create a batcher with no context value.
    pub fn detached(notify: impl Fn() + 'static) -> Self {
        Self::new((), move |()| notify())
    }
}

impl<C> Batcher<C> {
    /// Open a region: increment the depth and return the new value.
    ///
    /// Every `begin` must be paired with exactly one [`end`](Self::end) on
    /// all exit paths. Prefer [`region`](Self::region) or
    /// [`run`](Self::run), which pair the calls automatically.
    pub fn begin(&self) -> i64 {
        let depth = self.inner.depth.get() + 1;
        self.inner.depth.set(depth);
        depth
    }

    /// Close a region: decrement the depth and notify if this was the
    /// outermost one.
    ///
    /// Returns `true` iff this call fired the notification. The arithmetic
    /// is tolerant: an unpaired `end` drives the depth negative and still
    /// notifies on any transition to zero or below. See
    /// [`try_end`](Self::try_end) for the checked variant.
    pub fn end(&self) -> bool {
        let depth = self.inner.depth.get() - 1;
        self.inner.depth.set(depth);
        if depth <= 0 {
            #[cfg(feature = "tracing")]
            tracing::trace!(depth, "outermost region closed, notifying");
            (self.inner.notify)(&self.inner.context);
            true
        } else {
            false
        }
    }

    /// Close a region, refusing to decrement an idle batcher.
    ///
    /// Behaves like [`end`](Self::end) when at least one region is open.
    ///
    /// # Errors
    ///
    /// Returns [`ImbalanceError`] if the depth is already zero or below;
    /// the depth is left untouched and nothing is notified.
    pub fn try_end(&self) -> Result<bool, ImbalanceError> {
        let depth = self.inner.depth.get();
        if depth <= 0 {
            return Err(ImbalanceError { depth });
        }
        Ok(self.end())
    }

    /// Execute `func` as one batched region.
    ///
    /// Increments the depth, invokes `func` with the bound context, then
    /// decrements and maybe-notifies. The close step runs on every exit
    /// path: a panic from `func` propagates only after the depth has been
    /// corrected and the notification has fired if due.
    ///
    /// Returns `true` iff the depth is exactly 0 afterwards. This is a
    /// stricter check than the `<= 0` notify threshold on purpose: a
    /// negative depth means pairing went wrong somewhere, and `run` does
    /// not report such a close as clean.
    pub fn run(&self, func: impl FnOnce(&C)) -> bool {
        let region = self.region();
        func(&self.inner.context);
        region.end();
        self.inner.depth.get() == 0
    }

    /// Open and immediately close an empty region.
    ///
    /// Called while idle, this fires the notification once and returns
    /// `true`. Called inside an open region, it is a no-op (the outer
    /// region still owns the notification) and returns `false`.
    pub fn pulse(&self) -> bool {
        self.run(|_| {})
    }

    /// Open a region guarded by RAII: the matching close runs when the
    /// returned [`Region`] is dropped or explicitly ended.
    pub fn region(&self) -> Region<C> {
        Region::open(self.clone())
    }

    /// Current nesting depth. Zero when idle; negative after unpaired
    /// `end` calls.
    #[must_use]
    pub fn depth(&self) -> i64 {
        self.inner.depth.get()
    }

    /// Whether at least one region is currently open.
    #[must_use]
    pub fn is_batching(&self) -> bool {
        self.inner.depth.get() >= 1
    }

    /// The context value the notification is bound to.
    #[must_use]
    pub fn context(&self) -> &C {
        &self.inner.context
    }
}

/// Error from [`Batcher::try_end`]: no region was open to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImbalanceError {
    /// Depth observed at the failed call (zero or below).
    pub depth: i64,
}

impl std::fmt::Display for ImbalanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "end called with no open region (depth {})",
            self.depth
        )
    }
}

impl std::error::Error for ImbalanceError {}
