// SPDX-License-Identifier: MIT OR Apache-2.0

//! Spawning threads that inherit the caller's ambient values.

use std::thread::JoinHandle;

use crate::context::Snapshot;

/// Spawns a thread that runs `f` under the snapshot current on the calling thread.
///
/// This is [`std::thread::spawn`] plus [`Snapshot::bind`]. If flow is
/// suppressed on the calling thread, `f` runs under the default snapshot.
///
/// ```rust
/// use ambient::AmbientKey;
/// use std::sync::LazyLock;
///
/// static JOB: LazyLock<AmbientKey<u32>> = LazyLock::new(AmbientKey::new);
///
/// JOB.set(12);
/// let seen = ambient::thread::spawn(|| JOB.get().map(|j| *j)).join().unwrap();
/// assert_eq!(seen, Some(12));
/// ```
pub fn spawn<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::spawn(Snapshot::bind(f))
}

/// Like [`spawn`], but configures the thread with a [`std::thread::Builder`].
///
/// # Errors
///
/// Whatever [`std::thread::Builder::spawn`] returns.
pub fn spawn_with<F, T>(builder: std::thread::Builder, f: F) -> std::io::Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    builder.spawn(Snapshot::bind(f))
}
