// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing, running under, and restoring snapshots.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use super::notifier::on_values_changed;
use super::slot;
use super::snapshot::{Snapshot, SnapshotRef, has_notifications, is_suppressed, same, shallow_clone};
use super::suppression::FlowSuppression;
use crate::error::FlowError;

/// Installs `next` on this thread, notifying keys if either side asked for it.
///
/// `current` must be what the slot holds and must differ from `next`.
pub(crate) fn switch_to(next: SnapshotRef, current: &SnapshotRef) {
    debug_assert!(!same(&next, current));
    slot::install(next.clone());
    if has_notifications(current) || has_notifications(&next) {
        on_values_changed(current.as_deref(), next.as_deref());
    }
}

impl Snapshot {
    /// Captures the snapshot current on this thread so it can flow elsewhere.
    ///
    /// Returns `None` when flow is suppressed; a suppressed snapshot cannot be
    /// handed to another logical thread. A thread with no ambient values
    /// returns `Some(Snapshot::default())`.
    ///
    /// ```rust
    /// use ambient::context::Snapshot;
    ///
    /// assert_eq!(Snapshot::capture(), Some(Snapshot::default()));
    /// let suppression = Snapshot::suppress_flow();
    /// assert_eq!(Snapshot::capture(), None);
    /// drop(suppression);
    /// ```
    pub fn capture() -> Option<Snapshot> {
        let current = slot::current();
        if is_suppressed(&current) {
            None
        } else {
            Some(Snapshot::from_ref(current))
        }
    }

    /// Captures the current snapshot verbatim, even when flow is suppressed.
    ///
    /// This is for saving and later restoring state on the *same* thread around
    /// a region that may itself suppress or resume flow. Do not send the result
    /// to another thread; use [`capture`](Self::capture) for that.
    pub fn capture_for_restore() -> Snapshot {
        Snapshot::from_ref(slot::current())
    }

    /// Runs `f` with `snapshot` installed on this thread.
    ///
    /// Whatever was installed before is put back when `f` returns, including
    /// when `f` panics: the panic is caught, the previous snapshot is restored,
    /// and the panic resumes. Any nested `run`, suppression, or restore that `f`
    /// performs is unwound as well.
    ///
    /// # Errors
    ///
    /// [`FlowError::NullSnapshot`] if `snapshot` is `None`, which is what
    /// [`capture`](Self::capture) returns while flow is suppressed.
    ///
    /// ```rust
    /// use ambient::AmbientKey;
    /// use ambient::context::Snapshot;
    ///
    /// let key = AmbientKey::new();
    /// key.set(1);
    /// let one = Snapshot::capture();
    /// key.set(2);
    ///
    /// let seen = Snapshot::run(one, || *key.get().unwrap()).unwrap();
    /// assert_eq!(seen, 1);
    /// assert_eq!(*key.get().unwrap(), 2);
    /// ```
    pub fn run<R>(snapshot: Option<Snapshot>, f: impl FnOnce() -> R) -> Result<R, FlowError> {
        match snapshot {
            None => Err(FlowError::NullSnapshot),
            some => Ok(Snapshot::run_internal(some, f)),
        }
    }

    /// Like [`run`](Self::run), but treats `None` as the default snapshot.
    pub(crate) fn run_internal<R>(snapshot: Option<Snapshot>, f: impl FnOnce() -> R) -> R {
        let next = snapshot.and_then(|s| s.inner);
        let previous = slot::current();
        if !same(&previous, &next) {
            switch_to(next, &previous);
        }

        let result = catch_unwind(AssertUnwindSafe(f));

        let current = slot::current();
        if !same(&current, &previous) {
            switch_to(previous, &current);
        }
        match result {
            Ok(r) => r,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Installs `snapshot` on this thread without reverting it later.
    ///
    /// To undo this, capture with [`capture_for_restore`](Self::capture_for_restore)
    /// beforehand and restore that.
    ///
    /// # Errors
    ///
    /// [`FlowError::NullSnapshot`] if `snapshot` is `None`.
    pub fn restore(snapshot: Option<Snapshot>) -> Result<(), FlowError> {
        match snapshot {
            None => Err(FlowError::NullSnapshot),
            some => {
                Snapshot::restore_internal(some);
                Ok(())
            }
        }
    }

    pub(crate) fn restore_internal(snapshot: Option<Snapshot>) {
        let next = snapshot.and_then(|s| s.inner);
        let current = slot::current();
        if !same(&current, &next) {
            switch_to(next, &current);
        }
    }

    /// Stops the current snapshot from flowing to other logical threads.
    ///
    /// While suppressed, [`capture`](Self::capture) returns `None`. Ambient
    /// values can still be read and set on this thread.
    ///
    /// The returned token resumes flow when it is undone or dropped. If flow is
    /// already suppressed, nothing changes and the token is inert.
    pub fn suppress_flow() -> FlowSuppression {
        let current = slot::current();
        if is_suppressed(&current) {
            return FlowSuppression::inert();
        }
        slot::install(shallow_clone(&current, true));
        logwise::debuginternal_sync!("Suppressed ambient flow");
        FlowSuppression::armed()
    }

    /// Resumes flow on this thread.
    ///
    /// Prefer undoing the [`FlowSuppression`] returned by
    /// [`suppress_flow`](Self::suppress_flow).
    ///
    /// # Errors
    ///
    /// [`FlowError::RestoreUnsuppressedFlow`] if flow is not suppressed.
    pub fn resume_flow() -> Result<(), FlowError> {
        let current = slot::current();
        if !is_suppressed(&current) {
            return Err(FlowError::RestoreUnsuppressedFlow);
        }
        slot::install(shallow_clone(&current, false));
        logwise::debuginternal_sync!("Resumed ambient flow");
        Ok(())
    }

    /// Whether flow is suppressed on this thread.
    #[inline]
    pub fn currently_suppressed() -> bool {
        slot::with_current(|c| c.is_some_and(|c| c.suppressed))
    }

    /// Binds `f` to the snapshot current now, for running later on any thread.
    ///
    /// This is the capture-before-handoff step a scheduler performs when it
    /// queues work. If flow is suppressed, `f` runs under the default snapshot.
    ///
    /// ```rust
    /// use ambient::AmbientKey;
    /// use ambient::context::Snapshot;
    /// use std::sync::{Arc, LazyLock};
    ///
    /// static USER: LazyLock<AmbientKey<&'static str>> = LazyLock::new(AmbientKey::new);
    ///
    /// USER.set("alice");
    /// let job = Snapshot::bind(|| USER.get().map(|u| *u));
    /// USER.clear();
    /// let seen = std::thread::spawn(job).join().unwrap();
    /// assert_eq!(seen, Some("alice"));
    /// ```
    pub fn bind<R>(f: impl FnOnce() -> R) -> impl FnOnce() -> R {
        let captured = Snapshot::capture();
        move || Snapshot::run_internal(captured, f)
    }

    /// Runs a work item from a worker's dispatch loop.
    ///
    /// The worker must be on the default snapshot with flow not suppressed when
    /// this is called; that is checked only in debug builds. `snapshot` is
    /// installed without saving the previous state, and afterwards the worker is
    /// reset to the default snapshot regardless of what `f` left behind, so
    /// nothing leaks between unrelated work items. A panic in `f` resumes after
    /// the reset.
    pub fn run_from_dispatch_loop<R>(snapshot: Option<Snapshot>, f: impl FnOnce() -> R) -> R {
        debug_assert!(slot::current().is_none(), "worker is not on the default snapshot");
        if let Some(inner) = snapshot.and_then(|s| s.inner) {
            switch_to(Some(inner), &None);
        }

        let result = catch_unwind(AssertUnwindSafe(f));

        let current = slot::current();
        if current.is_some() {
            switch_to(None, &current);
        }
        match result {
            Ok(r) => r,
            Err(payload) => resume_unwind(payload),
        }
    }

    /// Installs a non-default `snapshot` on a worker and runs `f`.
    ///
    /// Nothing is restored afterwards, and panics are not intercepted; the
    /// dispatch loop must call [`reset_worker`](Self::reset_worker) before the
    /// next work item. The worker must be on the default snapshot when this is
    /// called; that is checked only in debug builds.
    pub fn run_on_worker<R>(snapshot: Snapshot, f: impl FnOnce() -> R) -> R {
        debug_assert!(slot::current().is_none(), "worker is not on the default snapshot");
        debug_assert!(!snapshot.is_default(), "run_on_worker with the default snapshot");
        let next = snapshot.inner;
        slot::install(next.clone());
        if has_notifications(&next) {
            on_values_changed(None, next.as_deref());
        }
        f()
    }

    /// Returns a worker to the default snapshot.
    ///
    /// Keys are notified that their values went away. The slot is cleared
    /// again afterwards in case a handler installed something.
    pub fn reset_worker() {
        let current = slot::install(None);
        if has_notifications(&current) {
            on_values_changed(current.as_deref(), None);
            slot::install(None);
        }
    }
}
