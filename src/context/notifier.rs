// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fires change notifications when a thread switches snapshots.

use std::panic::{AssertUnwindSafe, catch_unwind};

use super::snapshot::SnapshotInner;
use crate::value_map::same_value;

/// Notifies every key whose value differs between `previous` and `next`.
///
/// At least one side must carry a notification list. Each key is notified at
/// most once. A panicking handler aborts the process: the slot already holds
/// `next` and some handlers may have run, so there is nothing to unwind to.
pub(crate) fn on_values_changed(previous: Option<&SnapshotInner>, next: Option<&SnapshotInner>) {
    debug_assert!(
        previous.is_some_and(|p| p.notifications.is_some()) || next.is_some_and(|n| n.notifications.is_some()),
        "snapshot switch without notifications"
    );
    if catch_unwind(AssertUnwindSafe(|| fire(previous, next))).is_err() {
        logwise::error_sync!(
            "An ambient value change handler panicked during a snapshot switch; ambient state cannot be recovered, aborting"
        );
        std::process::abort();
    }
}

fn fire(previous: Option<&SnapshotInner>, next: Option<&SnapshotInner>) {
    let previous_keys = previous.and_then(|p| p.notifications.as_ref());
    let next_keys = next.and_then(|n| n.notifications.as_ref());

    match (previous, previous_keys, next, next_keys) {
        (Some(previous), Some(previous_keys), Some(next), Some(next_keys)) => {
            for key in previous_keys.iter() {
                let before = previous.values.value(key.id);
                let after = next.values.value(key.id);
                if !same_value(before, after) {
                    key.notify(before, after, true);
                }
            }
            if !std::sync::Arc::ptr_eq(previous_keys, next_keys) {
                // keys first bound in `next`; a key bound in `previous` (even to
                // None) was handled above
                for key in next_keys.iter() {
                    if previous.values.get(key.id).is_none() {
                        let after = next.values.value(key.id);
                        if after.is_some() {
                            key.notify(None, after, true);
                        }
                    }
                }
            }
        }
        (Some(previous), Some(previous_keys), _, _) => {
            for key in previous_keys.iter() {
                let before = previous.values.value(key.id);
                if before.is_some() {
                    key.notify(before, None, true);
                }
            }
        }
        (_, _, Some(next), Some(next_keys)) => {
            for key in next_keys.iter() {
                let after = next.values.value(key.id);
                if after.is_some() {
                    key.notify(None, after, true);
                }
            }
        }
        _ => {}
    }
}
