// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ambient flow across `.await` points.

use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use super::snapshot::Snapshot;

/// A [`Future`] wrapper that carries a snapshot across suspension points.
///
/// Executors poll futures on whatever thread is free, so thread-local state does
/// not follow a future by itself. `ApplySnapshot` does the scheduler's half of
/// the bargain:
///
/// 1. Before each poll it installs the snapshot the future last suspended under
///    (initially the one it was created with).
/// 2. It polls the inner future.
/// 3. It records the snapshot current at the moment the future returned, which
///    is where the next poll resumes.
/// 4. It restores whatever the polling thread had installed.
///
/// Values the future sets therefore survive its own `.await`s but never leak
/// into the executor thread.
///
/// If the wrapper was created while flow was suppressed there is nothing to
/// carry, and the first poll starts from the polling thread's snapshot. Later
/// polls resume where the future suspended, as above.
///
/// If the inner future panics, the polling thread's snapshot is still restored
/// and the wrapper keeps the snapshot it was polled under.
///
/// ```rust
/// use ambient::AmbientKey;
/// use ambient::context::ApplySnapshot;
/// use std::sync::LazyLock;
///
/// static TENANT: LazyLock<AmbientKey<&'static str>> = LazyLock::new(AmbientKey::new);
///
/// TENANT.set("acme");
/// let future = ApplySnapshot::capture(async { TENANT.get().map(|t| *t) });
/// TENANT.clear();
///
/// let seen = std::thread::spawn(move || test_executors::spin_on(future)).join().unwrap();
/// assert_eq!(seen, Some("acme"));
/// ```
#[derive(Debug)]
pub struct ApplySnapshot<F> {
    snapshot: Option<Snapshot>,
    future: F,
}

impl<F> ApplySnapshot<F> {
    /// Wraps `future` so that it runs under `snapshot`.
    pub fn new(snapshot: Option<Snapshot>, future: F) -> Self {
        Self { snapshot, future }
    }

    /// Wraps `future` so that it runs under the snapshot current now.
    pub fn capture(future: F) -> Self {
        Self::new(Snapshot::capture(), future)
    }

    /// The snapshot the next poll will run under.
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }
}

impl<F> Future for ApplySnapshot<F>
where
    F: Future,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        // safety: `future` is never moved out of `self`; `snapshot` is not pinned
        let (snapshot, fut) = unsafe {
            let d = self.get_unchecked_mut();
            (&mut d.snapshot, Pin::new_unchecked(&mut d.future))
        };
        let resume_under = match snapshot {
            Some(resume_under) => resume_under.clone(),
            // created while flow was suppressed; start from the poller's snapshot
            None => Snapshot::capture_for_restore(),
        };
        let (r, suspended_under) = Snapshot::run_internal(Some(resume_under), || {
            let r = fut.poll(cx);
            (r, Snapshot::capture_for_restore())
        });
        *snapshot = Some(suspended_under);
        r
    }
}
