#![forbid(unsafe_code)]

//! RAII pairing of `begin`/`end` via the [`Region`] guard.
//!
//! Manual `begin`/`end` pairs break under early returns and panics: the
//! `end` is skipped, the depth stays above zero, and the notification never
//! fires. `Region` makes the close structural — opening a region returns a
//! guard, and dropping the guard closes it, on every exit path.
//!
//! # Invariants
//!
//! 1. One `Region` performs exactly one close, whether by drop or by
//!    [`Region::end`].
//! 2. The close runs during unwinding too; a panic crossing a live guard
//!    still corrects the depth and notifies if due.
//! 3. The guard holds a handle to its batcher, so the batcher outlives
//!    every open region.

use crate::batcher::Batcher;

/// Guard for one open batch region.
///
/// Created by [`Batcher::region`]. Dropping the guard closes the region
/// (decrement, then notify if the depth reached zero or below). Call
/// [`end`](Self::end) instead of dropping when the caller needs to know
/// whether the notification fired.
#[must_use = "dropping a Region immediately closes it"]
pub struct Region<C = ()> {
    batcher: Batcher<C>,
    open: bool,
}

impl<C> Region<C> {
    pub(crate) fn open(batcher: Batcher<C>) -> Self {
        batcher.begin();
        Self {
            batcher,
            open: true,
        }
    }

    /// Close the region now, reporting whether the notification fired.
    pub fn end(mut self) -> bool {
        self.open = false;
        self.batcher.end()
    }

    /// Nesting depth as seen through this region's batcher.
    #[must_use]
    pub fn depth(&self) -> i64 {
        self.batcher.depth()
    }
}

impl<C> Drop for Region<C> {
    fn drop(&mut self) {
        if self.open {
            self.batcher.end();
        }
    }
}

impl<C> std::fmt::Debug for Region<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("open", &self.open)
            .field("depth", &self.batcher.depth())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_batcher() -> (Batcher, Rc<Cell<u32>>) {
        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        (Batcher::detached(move || f.set(f.get() + 1)), fired)
    }

    #[test]
    fn drop_closes_region() {
        let (batcher, fired) = counting_batcher();
        {
            let _region = batcher.region();
            assert_eq!(batcher.depth(), 1);
            assert_eq!(fired.get(), 0);
        }
        assert_eq!(batcher.depth(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn explicit_end_reports_notification() {
        let (batcher, fired) = counting_batcher();
        let outer = batcher.region();
        let inner = batcher.region();
        assert!(!inner.end(), "inner close must not notify");
        assert!(outer.end(), "outer close must notify");
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn explicit_end_does_not_double_close() {
        let (batcher, fired) = counting_batcher();
        let region = batcher.region();
        region.end();
        // The guard was consumed; its drop must not decrement again.
        assert_eq!(batcher.depth(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn early_return_closes_region() {
        fn bail_out(batcher: &Batcher, early: bool) -> u32 {
            let _region = batcher.region();
            if early {
                return 1;
            }
            2
        }
        let (batcher, fired) = counting_batcher();
        assert_eq!(bail_out(&batcher, true), 1);
        assert_eq!(batcher.depth(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn panic_across_guard_closes_region() {
        let (batcher, fired) = counting_batcher();
        let b = batcher.clone();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _region = b.region();
            panic!("boom");
        }));
        assert!(result.is_err());
        assert_eq!(batcher.depth(), 0);
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn region_outlives_original_handle() {
        let (batcher, fired) = counting_batcher();
        let region = batcher.region();
        drop(batcher);
        assert!(region.end());
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn debug_format() {
        let (batcher, _) = counting_batcher();
        let region = batcher.region();
        let debug = format!("{region:?}");
        assert!(debug.contains("open: true"), "got: {debug}");
        assert!(debug.contains("depth: 1"), "got: {debug}");
    }
}
