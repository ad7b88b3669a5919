//SPDX-License-Identifier: MIT OR Apache-2.0
/*!
# ambient

ambient keeps a bundle of "current" values that follows a logical computation
around: across ordinary calls, across threads it hands work to, and across
`.await` points, without anyone passing it as an argument.

# The problem

A request id, a trace id, a deadline, a tenant.  Every function that logs or
makes a downstream call wants one of these, and threading them through every
signature is miserable.  A `thread_local!` works until the work moves to
another thread, which in an async program is every time it awaits.

# The model

* An [AmbientKey] names one value.  Keys are identity tokens; declare them once.
* A [context::Snapshot] is an immutable bundle of values, cheap to clone and
  safe to share between threads.
* Every thread has exactly one *current* snapshot.  Setting a value through a
  key installs a new snapshot with one binding changed; snapshots that were
  already captured are unaffected.
* Capturing a snapshot and running code under it, on the same thread or another
  one, is how values flow.  [context::Snapshot::run] always puts back whatever
  was current before, even if the code panics.

```rust
use ambient::AmbientKey;
use ambient::context::Snapshot;
use std::sync::LazyLock;

static REQUEST: LazyLock<AmbientKey<u64>> = LazyLock::new(AmbientKey::new);

REQUEST.set(17);
let snapshot = Snapshot::capture();
let seen = std::thread::spawn(move || {
    Snapshot::run(snapshot, || *REQUEST.get().unwrap()).unwrap()
}).join().unwrap();
assert_eq!(seen, 17);
```

# Suppressing flow

[context::Snapshot::suppress_flow] stops values from flowing to work handed off
from this thread until the returned token is undone or dropped.

# Change notifications

A key created with [AmbientKey::with_notifications] is told whenever the value a
thread sees for it changes, whether because the key was set or because a
different snapshot was installed.  This is how state that mirrors an ambient
value (a thread name, a logging prefix) stays in sync.

# Async

Executors poll futures on whatever thread is free.  Wrap futures in
[context::ApplySnapshot] so they see the values that were current where they
were created, and keep the ones they set across their own `.await`s.

# Logging

[CorrelatedLogger] is a `logwise` logger that appends the ambient
[correlation::Correlation] (trace and span ids) to every record.
*/

mod correlated_logger;
pub mod context;
pub mod correlation;
mod error;
mod key;
#[cfg(not(target_arch = "wasm32"))]
pub mod thread;
mod value_map;

logwise::declare_logging_domain!();

pub use correlated_logger::{CorrelatedLogger, install_correlated_loggers};
pub use error::FlowError;
pub use key::{AmbientKey, ValueChanged};
