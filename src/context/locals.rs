// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading and writing single ambient values on the current thread.

use std::sync::Arc;

use super::slot;
use super::snapshot::SnapshotInner;
use crate::key::RawKey;
use crate::value_map::{AmbientValue, ValueMap, same_value};

pub(crate) fn get_local_value(key: &RawKey) -> Option<AmbientValue> {
    slot::with_current(|current| current.and_then(|c| c.values.value(key.id)).cloned())
}

/// Binds `key` to `value` on this thread by installing a new snapshot.
///
/// Keys that want notifications keep an explicit `None` binding once touched, so
/// a later snapshot switch can tell "never bound here" from "bound to `None`".
/// Their handler is called in-line with `context_changed == false`.
pub(crate) fn set_local_value(key: &Arc<RawKey>, value: Option<AmbientValue>) {
    let wants_notifications = key.wants_notifications();
    let current = slot::current();

    let (previous, had_previous) = match current.as_ref().and_then(|c| c.values.get(key.id)) {
        Some(bound) => (bound.clone(), true),
        None => (None, false),
    };
    if same_value(previous.as_ref(), value.as_ref()) {
        return;
    }

    let treat_none_as_absent = !wants_notifications;
    let (values, mut notifications, suppressed) = match current.as_deref() {
        Some(c) => (
            c.values.set(key.id, value.clone(), treat_none_as_absent),
            c.notifications.clone(),
            c.suppressed,
        ),
        None => (ValueMap::create(key.id, value.clone(), treat_none_as_absent), None, false),
    };

    if wants_notifications && !had_previous {
        notifications = Some(match notifications {
            None => Arc::from(vec![key.clone()]),
            Some(existing) => existing.iter().cloned().chain(std::iter::once(key.clone())).collect(),
        });
    }
    debug_assert!(
        !wants_notifications
            || notifications
                .as_ref()
                .is_some_and(|n| n.iter().any(|k| k.id == key.id))
    );

    let next = if !suppressed && values.is_empty() {
        // back to the default snapshot
        None
    } else {
        Some(Arc::new(SnapshotInner {
            values,
            notifications,
            suppressed,
        }))
    };
    slot::install(next);

    if wants_notifications {
        key.notify(previous.as_ref(), value.as_ref(), false);
    }
}
