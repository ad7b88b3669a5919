// SPDX-License-Identifier: MIT OR Apache-2.0

//! The token returned by [`Snapshot::suppress_flow`].

use std::thread::ThreadId;

use super::snapshot::Snapshot;
use crate::error::FlowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Flow was already suppressed when the token was created.
    Inert,
    Armed(ThreadId),
    Undone,
}

/// Resumes ambient flow when undone or dropped.
///
/// Returned by [`Snapshot::suppress_flow`]. The token belongs to the thread that
/// created it and can only be undone there.
///
/// ```rust
/// use ambient::context::Snapshot;
///
/// let mut suppression = Snapshot::suppress_flow();
/// assert!(Snapshot::currently_suppressed());
///
/// // suppressing again is a no-op
/// let mut nested = Snapshot::suppress_flow();
/// nested.undo().unwrap();
/// assert!(Snapshot::currently_suppressed());
///
/// suppression.undo().unwrap();
/// assert!(!Snapshot::currently_suppressed());
/// assert!(suppression.undo().is_err());
/// ```
#[must_use = "dropping the token resumes flow immediately"]
#[derive(Debug)]
pub struct FlowSuppression {
    state: State,
}

impl FlowSuppression {
    pub(crate) fn inert() -> FlowSuppression {
        FlowSuppression { state: State::Inert }
    }

    pub(crate) fn armed() -> FlowSuppression {
        FlowSuppression {
            state: State::Armed(std::thread::current().id()),
        }
    }

    /// Whether undoing this token would resume flow.
    pub fn is_armed(&self) -> bool {
        matches!(self.state, State::Armed(_))
    }

    /// Resumes flow on the thread that suppressed it.
    ///
    /// Undoing an inert token does nothing.
    ///
    /// # Errors
    ///
    /// - [`FlowError::SuppressionOtherThread`] when called from another thread.
    /// - [`FlowError::SuppressionAlreadyUndone`] when called a second time.
    /// - [`FlowError::SuppressionContextMismatch`] when a snapshot that is not
    ///   suppressed has been installed since flow was suppressed. The token is
    ///   spent afterwards: it no longer resumes flow, and dropping it is silent.
    pub fn undo(&mut self) -> Result<(), FlowError> {
        match self.state {
            State::Inert => Ok(()),
            State::Undone => Err(FlowError::SuppressionAlreadyUndone),
            State::Armed(thread) => {
                if std::thread::current().id() != thread {
                    return Err(FlowError::SuppressionOtherThread);
                }
                if !Snapshot::currently_suppressed() {
                    // nothing left for this token to resume
                    self.state = State::Undone;
                    return Err(FlowError::SuppressionContextMismatch);
                }
                self.state = State::Undone;
                Snapshot::resume_flow()
            }
        }
    }

    fn thread(&self) -> Option<ThreadId> {
        match self.state {
            State::Armed(thread) => Some(thread),
            State::Inert | State::Undone => None,
        }
    }
}

impl Drop for FlowSuppression {
    fn drop(&mut self) {
        if self.is_armed() {
            if let Err(e) = self.undo() {
                logwise::warn_sync!(
                    "Dropped a flow suppression that could not be undone: {error}",
                    error = e.to_string()
                );
            }
        }
    }
}

/// Tokens are equal when they would resume flow on the same thread.
impl PartialEq for FlowSuppression {
    fn eq(&self, other: &Self) -> bool {
        self.thread() == other.thread()
    }
}

impl Eq for FlowSuppression {}

impl std::hash::Hash for FlowSuppression {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.thread().hash(state);
    }
}
