// SPDX-License-Identifier: MIT OR Apache-2.0

//! A change handler that panics during a snapshot switch takes the process
//! down; one that panics during a set unwinds like any other call.

#![cfg(not(target_arch = "wasm32"))]

logwise::declare_logging_domain!();

use ambient::AmbientKey;
use ambient::context::Snapshot;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::process::Command;

const CHILD_ENV: &str = "AMBIENT_FATAL_HANDLER_CHILD";

fn panics_on_switch() -> AmbientKey<&'static str> {
    AmbientKey::with_notifications(|change| {
        if change.context_changed {
            panic!("handler failed during a switch");
        }
    })
}

/// Runs in a child process only; see `switch_panic_aborts`.
#[test]
fn switch_panic_child() {
    if std::env::var_os(CHILD_ENV).is_none() {
        return;
    }
    let key = panics_on_switch();
    key.set("x");
    let _ = catch_unwind(|| Snapshot::run(Some(Snapshot::default()), || {}));
    // only reached if the panic unwound
    std::process::exit(0);
}

#[test]
fn switch_panic_aborts() {
    let exe = std::env::current_exe().unwrap();
    let output = Command::new(exe)
        .args(["switch_panic_child", "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .unwrap();
    let status = output.status;
    assert!(!status.success(), "child exited cleanly: {status:?}");
    // 101 is a test failure from an ordinary unwind
    assert_ne!(status.code(), Some(101), "child unwound: {status:?}");
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(6), "expected SIGABRT: {status:?}");
    }
}

#[test]
fn set_panic_unwinds_to_the_caller() {
    let key = AmbientKey::<u8>::with_notifications(|change| {
        if !change.context_changed {
            panic!("handler failed during a set");
        }
    });
    let result = catch_unwind(AssertUnwindSafe(|| key.set(1)));
    assert!(result.is_err());
    // the value was installed before the handler ran
    assert_eq!(key.get().as_deref(), Some(&1));
}

#[test]
fn set_does_not_trip_the_switch_handler() {
    let key = panics_on_switch();
    key.set("y");
    assert_eq!(key.get().as_deref(), Some(&"y"));
    key.clear();
}
