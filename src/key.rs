// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keys under which ambient values are registered.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::locals;
use crate::value_map::{AmbientValue, KeyId};

static KEY_ID: AtomicU64 = AtomicU64::new(0);

type ChangeHandler = Box<dyn Fn(Option<&AmbientValue>, Option<&AmbientValue>, bool) + Send + Sync>;

/// The type-erased half of an [`AmbientKey`].
///
/// Snapshots hold these (by `Arc`) in their notification lists, which keeps a
/// key alive for as long as any snapshot refers to it.
pub(crate) struct RawKey {
    pub(crate) id: KeyId,
    handler: Option<ChangeHandler>,
}

impl RawKey {
    fn new(handler: Option<ChangeHandler>) -> RawKey {
        RawKey {
            id: KeyId(KEY_ID.fetch_add(1, Ordering::Relaxed)),
            handler,
        }
    }

    #[inline]
    pub(crate) fn wants_notifications(&self) -> bool {
        self.handler.is_some()
    }

    pub(crate) fn notify(&self, previous: Option<&AmbientValue>, current: Option<&AmbientValue>, context_changed: bool) {
        if let Some(handler) = &self.handler {
            handler(previous, current, context_changed);
        }
    }
}

impl Debug for RawKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawKey")
            .field("id", &self.id.0)
            .field("notifies", &self.wants_notifications())
            .finish()
    }
}

/// Arguments passed to a change handler registered with
/// [`AmbientKey::with_notifications`].
#[derive(Debug)]
pub struct ValueChanged<T> {
    /// The value before the change, or `None` if there was none.
    pub previous: Option<Arc<T>>,
    /// The value after the change, or `None` if there is none.
    pub current: Option<Arc<T>>,
    /// `true` when the value changed because a different snapshot was installed
    /// on this thread; `false` when the key itself was set.
    pub context_changed: bool,
}

/// A key for one ambient value.
///
/// A key is an identity token: two keys never compare equal, even when they hold
/// the same type. Values set through a key are visible to code running on the
/// same logical thread of control, and to any thread or future that later runs
/// under a [`Snapshot`](crate::context::Snapshot) captured afterwards.
///
/// Keys are typically declared once, as a `static`:
///
/// ```rust
/// use ambient::AmbientKey;
/// use std::sync::LazyLock;
///
/// static REQUEST_ID: LazyLock<AmbientKey<u64>> = LazyLock::new(AmbientKey::new);
///
/// REQUEST_ID.set(42);
/// assert_eq!(REQUEST_ID.get().as_deref(), Some(&42));
/// REQUEST_ID.clear();
/// assert!(REQUEST_ID.get().is_none());
/// ```
pub struct AmbientKey<T> {
    raw: Arc<RawKey>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> AmbientKey<T> {
    /// Creates a key that does not request change notifications.
    pub fn new() -> Self {
        AmbientKey {
            raw: Arc::new(RawKey::new(None)),
            _marker: PhantomData,
        }
    }

    /// Creates a key whose `handler` runs whenever the value seen on a thread changes.
    ///
    /// The handler runs synchronously on the affected thread, both when the key
    /// is set directly and when a snapshot switch changes the value it holds.
    ///
    /// A handler must not panic while a snapshot is being switched. Ambient state
    /// is half-transitioned at that point and the process is aborted.
    ///
    /// ```rust
    /// use ambient::AmbientKey;
    /// use ambient::context::Snapshot;
    /// use std::sync::{Arc, Mutex};
    ///
    /// let seen = Arc::new(Mutex::new(Vec::new()));
    /// let sink = seen.clone();
    /// let key = AmbientKey::<&'static str>::with_notifications(move |change| {
    ///     sink.lock().unwrap().push((change.current.map(|v| *v), change.context_changed));
    /// });
    ///
    /// key.set("x");
    /// Snapshot::run(Some(Snapshot::default()), || {}).unwrap();
    /// assert_eq!(*seen.lock().unwrap(), vec![(Some("x"), false), (None, true), (Some("x"), true)]);
    /// ```
    pub fn with_notifications<H>(handler: H) -> Self
    where
        H: Fn(ValueChanged<T>) + Send + Sync + 'static,
    {
        let erased: ChangeHandler = Box::new(move |previous, current, context_changed| {
            handler(ValueChanged {
                previous: previous.and_then(downcast::<T>),
                current: current.and_then(downcast::<T>),
                context_changed,
            })
        });
        AmbientKey {
            raw: Arc::new(RawKey::new(Some(erased))),
            _marker: PhantomData,
        }
    }

    /// Returns the value visible on this thread, if any.
    pub fn get(&self) -> Option<Arc<T>> {
        locals::get_local_value(&self.raw).as_ref().and_then(downcast::<T>)
    }

    /// Sets the value for this thread.
    ///
    /// Snapshots captured earlier are not affected.
    pub fn set(&self, value: T) {
        self.set_arc(Some(Arc::new(value)));
    }

    /// Sets the value for this thread, sharing an existing allocation.
    ///
    /// Setting the allocation that is already current does nothing.
    pub fn set_arc(&self, value: Option<Arc<T>>) {
        locals::set_local_value(&self.raw, value.map(|v| v as AmbientValue));
    }

    /// Removes the value for this thread.
    pub fn clear(&self) {
        self.set_arc(None);
    }

    /// Whether this key was created with [`with_notifications`](Self::with_notifications).
    pub fn wants_notifications(&self) -> bool {
        self.raw.wants_notifications()
    }

    pub(crate) fn raw(&self) -> &Arc<RawKey> {
        &self.raw
    }
}

impl<T: Send + Sync + 'static> Default for AmbientKey<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for AmbientKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmbientKey")
            .field("id", &self.raw.id.0)
            .field("type", &std::any::type_name::<T>())
            .field("notifies", &self.raw.wants_notifications())
            .finish()
    }
}

pub(crate) fn downcast<T: Send + Sync + 'static>(value: &AmbientValue) -> Option<Arc<T>> {
    Arc::clone(value).downcast::<T>().ok()
}

/*
Boilerplate notes for AmbientKey:

- Clone/Copy: not implemented; a key is an identity, share it by reference or in a static.
- PartialEq/Eq/Hash: not implemented; two handles to the same key cannot exist without Clone.
- Default: implemented, same as `new`.
- Send/Sync: automatic, the handler is required to be Send + Sync.
*/
