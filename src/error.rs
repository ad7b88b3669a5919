// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors returned by the flow controller.

/// Errors produced by the [`Snapshot`](crate::context::Snapshot) flow operations
/// and by [`FlowSuppression`](crate::context::FlowSuppression) tokens.
///
/// Errors fall into two groups, which can be distinguished with
/// [`is_invalid_argument`](FlowError::is_invalid_argument) and
/// [`is_invalid_operation`](FlowError::is_invalid_operation).
///
/// Panics raised from a change-notification handler during a context switch
/// are not represented here; they abort the process.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum FlowError {
    /// A snapshot was required but `None` was passed.
    ///
    /// This usually means the snapshot came from [`Snapshot::capture`](crate::context::Snapshot::capture)
    /// while flow was suppressed.
    #[error("cannot apply a null snapshot; flow was likely suppressed when it was captured")]
    NullSnapshot,
    /// Flow was resumed on a thread whose current snapshot is not suppressed.
    #[error("cannot resume flow that is not suppressed")]
    RestoreUnsuppressedFlow,
    /// A suppression token was undone on a thread other than the one that created it.
    #[error("flow suppression can only be undone on the thread that created it")]
    SuppressionOtherThread,
    /// A suppression token was undone a second time.
    #[error("flow suppression was already undone")]
    SuppressionAlreadyUndone,
    /// A different, non-suppressed snapshot was applied after flow was suppressed.
    #[error("flow suppression cannot be undone after a different snapshot was applied")]
    SuppressionContextMismatch,
}

impl FlowError {
    /// The caller passed an argument the operation cannot accept.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, FlowError::NullSnapshot)
    }

    /// The operation is not valid for the current thread's ambient state.
    pub fn is_invalid_operation(&self) -> bool {
        !self.is_invalid_argument()
    }
}
