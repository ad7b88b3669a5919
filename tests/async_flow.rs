// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ambient values across `.await` points.

logwise::declare_logging_domain!();

use ambient::AmbientKey;
use ambient::context::{ApplySnapshot, Snapshot};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::sync::LazyLock;
use std::task::{Context, Poll, Waker};

static TENANT: LazyLock<AmbientKey<&'static str>> = LazyLock::new(AmbientKey::new);

fn tenant() -> Option<&'static str> {
    TENANT.get().map(|t| *t)
}

/// Returns pending once, then ready.
#[derive(Default)]
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

#[test]
fn values_survive_awaits_but_not_the_poller() {
    TENANT.set("outer");
    let mut future = Box::pin(ApplySnapshot::capture(async {
        assert_eq!(tenant(), Some("outer"));
        TENANT.set("inner");
        YieldOnce::default().await;
        tenant()
    }));
    let mut cx = Context::from_waker(Waker::noop());

    assert!(future.as_mut().poll(&mut cx).is_pending());
    assert_eq!(tenant(), Some("outer"));

    TENANT.set("poller moved on");
    assert_eq!(future.as_mut().poll(&mut cx), Poll::Ready(Some("inner")));
    assert_eq!(tenant(), Some("poller moved on"));
}

#[test]
fn polls_resume_on_another_thread() {
    TENANT.set("request");
    let mut future = Box::pin(ApplySnapshot::capture(async {
        YieldOnce::default().await;
        let before = tenant();
        TENANT.set("updated");
        YieldOnce::default().await;
        (before, tenant())
    }));
    TENANT.clear();

    let mut cx = Context::from_waker(Waker::noop());
    assert!(future.as_mut().poll(&mut cx).is_pending());

    let result = std::thread::spawn(move || {
        let mut cx = Context::from_waker(Waker::noop());
        assert!(future.as_mut().poll(&mut cx).is_pending());
        assert_eq!(tenant(), None);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(r) => r,
            Poll::Pending => panic!("expected completion"),
        }
    })
    .join()
    .unwrap();

    assert_eq!(result, (Some("request"), Some("updated")));
    assert_eq!(tenant(), None);
}

#[test]
fn suppressed_capture_uses_the_poller_snapshot() {
    TENANT.set("hidden");
    let suppression = Snapshot::suppress_flow();
    let future = ApplySnapshot::capture(async { tenant() });
    drop(suppression);
    assert!(future.snapshot().is_none());

    let seen = std::thread::spawn(move || {
        TENANT.set("worker");
        test_executors::spin_on(future)
    })
    .join()
    .unwrap();
    assert_eq!(seen, Some("worker"));
}

#[test]
fn suppressed_capture_does_not_leak_into_the_poller() {
    let suppression = Snapshot::suppress_flow();
    let future = ApplySnapshot::capture(async {
        TENANT.set("set by future");
        YieldOnce::default().await;
        tenant()
    });
    drop(suppression);

    let (seen, poller) = std::thread::spawn(move || {
        TENANT.set("poller");
        let seen = test_executors::spin_on(future);
        (seen, tenant())
    })
    .join()
    .unwrap();
    assert_eq!(seen, Some("set by future"));
    assert_eq!(poller, Some("poller"));
}

#[test]
fn panicking_poll_restores_the_poller() {
    TENANT.set("poller");
    let mut future = Box::pin(ApplySnapshot::new(Some(Snapshot::default()), async {
        TENANT.set("doomed");
        if tenant().is_some() {
            panic!("poll failed");
        }
    }));
    let mut cx = Context::from_waker(Waker::noop());
    let result = catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));
    assert!(result.is_err());
    assert_eq!(tenant(), Some("poller"));
    assert!(future.snapshot().is_some_and(|s| s.is_default()));
}

#[test_executors::async_test]
async fn nested_wrappers_see_their_own_values() {
    TENANT.set("outer");
    let outer = ApplySnapshot::capture(async {
        let inner = ApplySnapshot::new(Snapshot::capture(), async {
            TENANT.set("inner");
            YieldOnce::default().await;
            tenant()
        });
        let from_inner = inner.await;
        (from_inner, tenant())
    });
    let (from_inner, from_outer) = outer.await;
    assert_eq!(from_inner, Some("inner"));
    assert_eq!(from_outer, Some("outer"));
}
