// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-thread slot holding the current snapshot.
//!
//! Each thread owns exactly one slot. Only this crate's flow operations write
//! it, always on behalf of code running on that thread, so it is never locked.

use std::cell::RefCell;

use super::snapshot::{SnapshotInner, SnapshotRef};

thread_local! {
    static SLOT: RefCell<SnapshotRef> = const { RefCell::new(None) };
}

/// The snapshot currently installed on this thread.
#[inline]
pub(crate) fn current() -> SnapshotRef {
    SLOT.with(|slot| slot.borrow().clone())
}

/// Borrows the current snapshot.
///
/// `f` must not write the slot.
#[inline]
pub(crate) fn with_current<R>(f: impl FnOnce(Option<&SnapshotInner>) -> R) -> R {
    SLOT.with(|slot| f(slot.borrow().as_deref()))
}

/// Installs `next` without firing notifications, returning what was there.
#[inline]
pub(crate) fn install(next: SnapshotRef) -> SnapshotRef {
    SLOT.with(|slot| slot.replace(next))
}
