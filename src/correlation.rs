// SPDX-License-Identifier: MIT OR Apache-2.0

//! Correlation identifiers carried as an ambient value.
//!
//! A [`Correlation`] ties log records to the distributed operation that produced
//! them. It is stored under a process-wide [`AmbientKey`], so it follows work
//! across threads and futures like any other ambient value, and
//! [`CorrelatedLogger`](crate::CorrelatedLogger) reads it when formatting records.
//!
//! ```rust
//! use ambient::correlation::{Correlation, SpanId, TraceId};
//!
//! let request = Correlation::new(TraceId(0x4bf92f3577b34da6a3ce929d0e0e4736), SpanId(0x00f067aa0ba902b7));
//! request.scope(|| {
//!     let current = Correlation::current().unwrap();
//!     assert_eq!(current.trace_id.to_string(), "4bf92f3577b34da6a3ce929d0e0e4736");
//!     assert_eq!(current.span_id.to_string(), "00f067aa0ba902b7");
//! });
//! assert!(Correlation::current().is_none());
//! ```

use std::fmt::Display;
use std::sync::LazyLock;

use crate::AmbientKey;
use crate::context::Snapshot;

static CORRELATION: LazyLock<AmbientKey<Correlation>> = LazyLock::new(AmbientKey::new);

/// A 16-byte trace identifier. Displays as 32 lowercase hex digits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TraceId(pub u128);

impl Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// An 8-byte span identifier. Displays as 16 lowercase hex digits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub u64);

impl Display for SpanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Trace flags. Displays as 2 lowercase hex digits.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TraceFlags(pub u8);

impl TraceFlags {
    pub const NONE: TraceFlags = TraceFlags(0);
    pub const SAMPLED: TraceFlags = TraceFlags(1);

    pub fn is_sampled(&self) -> bool {
        self.0 & Self::SAMPLED.0 != 0
    }
}

impl Display for TraceFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}", self.0)
    }
}

/// The trace and span a piece of work belongs to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Correlation {
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub flags: TraceFlags,
}

impl Correlation {
    pub fn new(trace_id: TraceId, span_id: SpanId) -> Correlation {
        Correlation {
            trace_id,
            span_id,
            flags: TraceFlags::NONE,
        }
    }

    pub fn with_flags(self, flags: TraceFlags) -> Correlation {
        Correlation { flags, ..self }
    }

    /// A new span in the same trace.
    pub fn child(&self, span_id: SpanId) -> Correlation {
        Correlation { span_id, ..*self }
    }

    /// The correlation visible on this thread, if any.
    pub fn current() -> Option<Correlation> {
        CORRELATION.get().map(|c| *c)
    }

    /// Sets or clears the correlation for this thread.
    pub fn set_current(correlation: Option<Correlation>) {
        match correlation {
            Some(c) => CORRELATION.set(c),
            None => CORRELATION.clear(),
        }
    }

    /// Runs `f` with this correlation current, then puts back whatever was
    /// current before, including when `f` panics.
    pub fn scope<R>(self, f: impl FnOnce() -> R) -> R {
        Snapshot::run_internal(Some(Snapshot::capture_for_restore()), || {
            CORRELATION.set(self);
            f()
        })
    }
}
