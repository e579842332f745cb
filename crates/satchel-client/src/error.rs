//! Client-side error taxonomy.
//!
//! Each boundary gets its own error type so callers can route failures the
//! way the UI expects: validation errors render inline, submission and
//! dispatch errors become toasts, poll and push errors are logged and
//! retried without disturbing the rendered state.  A task-level `Failed`
//! status is *data*, not an error — it lives on the task record and is
//! rendered, never thrown.

use thiserror::Error;

use satchel_types::{ArtifactKind, TaskId};
pub use satchel_types::ValidationError;

/// Errors from the REST surface.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a well-formed HTTP exchange.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server rejected the request ({status}): {message}")]
    Status { status: u16, message: String },

    /// The response arrived but its body did not decode.
    #[error("malformed response body: {0}")]
    Decode(String),
}

/// Pre-flight or creation failure in the submission gate.
///
/// The gate never retries on its own; a retry is a user-initiated
/// re-submission.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("submission failed: {0}")]
    Rejected(#[source] ApiError),

    /// The owning view already released its tracker.
    #[error("tracker is closed")]
    TrackerClosed,
}

/// Subscription or connection failure on the push channel.
///
/// Never fatal: the tracker degrades to poll-only operation until the
/// channel reconnects.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("push channel address is invalid: {0}")]
    BadAddress(String),

    #[error("push channel connect failed: {0}")]
    Connect(String),

    #[error("malformed push frame: {0}")]
    Decode(String),
}

/// Outcome classification for [`dispatch`].
///
/// [`dispatch`]: crate::tracker::WorkspaceTracker::dispatch
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("task {0} is not known to this workspace view")]
    UnknownTask(TaskId),

    /// The task has not reached `Done`; the call is a no-op.
    #[error("task {0} has not finished yet")]
    NotReady(TaskId),

    /// The task failed; carries the stored error message for rendering.
    #[error("task {id} failed: {message}")]
    Unavailable { id: TaskId, message: String },

    /// The fetched detail payload does not match the task's kind.
    #[error("unsupported content for {kind} task {id}")]
    Unsupported { id: TaskId, kind: ArtifactKind },

    #[error("detail fetch failed: {0}")]
    Detail(#[from] ApiError),
}

/// Umbrella error for callers that do not care which boundary failed.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The owning view already released its tracker.
    #[error("tracker is closed")]
    TrackerClosed,

    #[error("timed out waiting for task {0} to finish")]
    WaitTimeout(TaskId),
}
