// SPDX-License-Identifier: MIT OR Apache-2.0

//! The immutable snapshot type.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use crate::key::{AmbientKey, RawKey, downcast};
use crate::value_map::ValueMap;

/// The shared contents of a non-default snapshot.
#[derive(Debug)]
pub(crate) struct SnapshotInner {
    pub(crate) values: ValueMap,
    /// Keys that asked for change notifications, in the order they were first bound.
    pub(crate) notifications: Option<Arc<[Arc<RawKey>]>>,
    pub(crate) suppressed: bool,
}

/// What a thread's slot holds. `None` is the default snapshot.
pub(crate) type SnapshotRef = Option<Arc<SnapshotInner>>;

static SUPPRESSED_DEFAULT: OnceLock<Arc<SnapshotInner>> = OnceLock::new();

/// The cached empty, flow-suppressed snapshot.
pub(crate) fn suppressed_default() -> Arc<SnapshotInner> {
    SUPPRESSED_DEFAULT
        .get_or_init(|| {
            Arc::new(SnapshotInner {
                values: ValueMap::Empty,
                notifications: None,
                suppressed: true,
            })
        })
        .clone()
}

/// Identity comparison of two slot values.
#[inline]
pub(crate) fn same(a: &SnapshotRef, b: &SnapshotRef) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

#[inline]
pub(crate) fn has_notifications(snapshot: &SnapshotRef) -> bool {
    snapshot.as_ref().is_some_and(|s| s.notifications.is_some())
}

#[inline]
pub(crate) fn is_suppressed(snapshot: &SnapshotRef) -> bool {
    snapshot.as_ref().is_some_and(|s| s.suppressed)
}

/// Copies `current` with the suppression flag set to `suppressed`.
///
/// Snapshots without values become the cached suppressed default, or the
/// default snapshot when flow is resumed.
pub(crate) fn shallow_clone(current: &SnapshotRef, suppressed: bool) -> SnapshotRef {
    match current {
        Some(inner) if !inner.values.is_empty() => Some(Arc::new(SnapshotInner {
            values: inner.values.clone(),
            notifications: inner.notifications.clone(),
            suppressed,
        })),
        _ if suppressed => Some(suppressed_default()),
        _ => None,
    }
}

/// An immutable bundle of ambient values, plus whether flow is suppressed.
///
/// A `Snapshot` is what flows from one logical thread of control to another.
/// Capture one with [`Snapshot::capture`] and run code under it with
/// [`Snapshot::run`], on the same thread or a different one. Snapshots are
/// cheap to clone and compare by identity.
///
/// [`Snapshot::default()`] is the default snapshot: no ambient values, flow not
/// suppressed. A thread that has never set a value is running under it.
///
/// ```rust
/// use ambient::AmbientKey;
/// use ambient::context::Snapshot;
///
/// let key = AmbientKey::new();
/// key.set("before");
/// let before = Snapshot::capture().unwrap();
/// key.set("after");
///
/// assert_eq!(before.get(&key).as_deref(), Some(&"before"));
/// Snapshot::run(Some(before), || {
///     assert_eq!(key.get().as_deref(), Some(&"before"));
/// }).unwrap();
/// assert_eq!(key.get().as_deref(), Some(&"after"));
/// ```
#[derive(Clone, Default)]
pub struct Snapshot {
    pub(crate) inner: SnapshotRef,
}

impl Snapshot {
    pub(crate) fn from_ref(inner: SnapshotRef) -> Snapshot {
        Snapshot { inner }
    }

    /// Whether this is the default snapshot.
    #[inline]
    pub fn is_default(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether flow was suppressed when this snapshot was current.
    ///
    /// Only [`Snapshot::capture_for_restore`] can return such a snapshot.
    #[inline]
    pub fn is_flow_suppressed(&self) -> bool {
        is_suppressed(&self.inner)
    }

    /// Reads the value bound to `key` in this snapshot without installing it.
    pub fn get<T: Send + Sync + 'static>(&self, key: &AmbientKey<T>) -> Option<Arc<T>> {
        self.inner
            .as_ref()
            .and_then(|inner| inner.values.value(key.raw().id))
            .and_then(downcast::<T>)
    }

    /// The number of bindings in this snapshot, including bindings to `None`
    /// retained for keys that request notifications.
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.values.len())
    }

    /// Whether this snapshot binds no keys at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        same(&self.inner, &other.inner)
    }
}

impl Eq for Snapshot {}

impl Hash for Snapshot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.as_ref().map(Arc::as_ptr).hash(state);
    }
}

impl Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            None => f.write_str("Snapshot(default)"),
            Some(inner) => f
                .debug_struct("Snapshot")
                .field("values", &inner.values)
                .field("notifications", &inner.notifications.as_ref().map_or(0, |n| n.len()))
                .field("suppressed", &inner.suppressed)
                .finish(),
        }
    }
}

/*
Boilerplate notes for Snapshot:

- Clone: derived, clones an Arc.
- Default: derived, the default snapshot.
- PartialEq/Eq/Hash: identity.  Two snapshots with equal
  values captured at different times are different snapshots.
- Ord: no meaningful ordering.
- Send/Sync: automatic; values are Send + Sync and snapshots are immutable.
*/
