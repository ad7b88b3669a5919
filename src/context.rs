// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread-local snapshot management and flow control.
//!
//! This module is the core of ambient: it decides which [`Snapshot`] is current
//! on each logical thread of control and moves snapshots between threads.
//!
//! # Overview
//!
//! - [`Snapshot`]: an immutable bundle of ambient values. Capture it on one
//!   thread, run code under it on another.
//! - [`FlowSuppression`]: returned by [`Snapshot::suppress_flow`]; while it is
//!   armed, snapshots captured on this thread do not flow anywhere.
//! - [`ApplySnapshot`]: a [`Future`](std::future::Future) wrapper that carries a
//!   snapshot across `.await` points and executor threads.
//!
//! # The slot
//!
//! Each thread owns exactly one slot holding its current snapshot. An empty slot
//! means the default snapshot. The slot is private to this module; it changes
//! only through the operations below, always on the thread that owns it.
//!
//! | Operation | Effect on the slot |
//! |-----------|--------------------|
//! | [`AmbientKey::set`](crate::AmbientKey::set) | replaced by a copy with one binding changed |
//! | [`Snapshot::run`] | replaced for the duration of a closure, then put back |
//! | [`Snapshot::restore`] | replaced, not put back |
//! | [`Snapshot::suppress_flow`] / [`Snapshot::resume_flow`] | replaced by a copy with the flag flipped |
//! | [`Snapshot::run_from_dispatch_loop`] | replaced, then reset to default |
//!
//! # Running under a snapshot
//!
//! ```rust
//! use ambient::AmbientKey;
//! use ambient::context::Snapshot;
//!
//! let key = AmbientKey::new();
//! key.set("outer");
//! let outer = Snapshot::capture();
//!
//! let inner = Snapshot::run(Some(Snapshot::default()), || {
//!     key.set("inner");
//!     Snapshot::capture()
//! }).unwrap();
//!
//! // the closure's change did not escape
//! assert_eq!(Snapshot::capture(), outer);
//! assert_eq!(*key.get().unwrap(), "outer");
//! assert_eq!(*inner.unwrap().get(&key).unwrap(), "inner");
//! ```
//!
//! # Crossing threads
//!
//! ```rust
//! use ambient::AmbientKey;
//! use ambient::context::Snapshot;
//! use std::sync::LazyLock;
//!
//! static TRACE: LazyLock<AmbientKey<u32>> = LazyLock::new(AmbientKey::new);
//!
//! TRACE.set(7);
//! let snapshot = Snapshot::capture();
//! std::thread::spawn(move || {
//!     assert!(TRACE.get().is_none());
//!     Snapshot::run(snapshot, || assert_eq!(*TRACE.get().unwrap(), 7)).unwrap();
//!     assert!(TRACE.get().is_none());
//! }).join().unwrap();
//! ```
//!
//! # Suspension points
//!
//! Anything that suspends work and resumes it later, possibly elsewhere, must
//! capture before suspending and run under the capture when resuming.
//! [`ApplySnapshot`] does this for futures and [`Snapshot::bind`] does it for
//! closures; a custom scheduler should call one of them at every hand-off.

mod apply_snapshot;
mod flow;
pub(crate) mod locals;
mod notifier;
mod slot;
mod snapshot;
mod suppression;


pub use apply_snapshot::ApplySnapshot;
pub use snapshot::Snapshot;
pub use suppression::FlowSuppression;
