//! Submission gate: validate a generation request and hand it to the
//! server.

use satchel_types::{FileId, GenerationParams, TaskId};

use crate::error::SubmitError;
use crate::rest::StudioApi;
use crate::tracker::WorkspaceTracker;

/// Fluent front of the submission gate; produced by
/// [`WorkspaceTracker::generate`].
///
/// Validation runs before any network traffic: an empty file selection or
/// out-of-bounds parameters fail locally with a
/// [`SubmitError::Validation`]. On success the task is registered as
/// `queued` under the server-assigned id, which is returned so a viewer or
/// tracking subscription can attach immediately.
///
/// There is no idempotency key: re-submitting while an identical request
/// is still in flight creates a second, independent task.
#[must_use = "nothing is sent until .submit() is awaited"]
pub struct GenerateBuilder<'a, A: StudioApi> {
    tracker: &'a WorkspaceTracker<A>,
    params: GenerationParams,
    files: Vec<FileId>,
}

impl<'a, A: StudioApi> GenerateBuilder<'a, A> {
    pub(crate) fn new(tracker: &'a WorkspaceTracker<A>, params: GenerationParams) -> Self {
        Self {
            tracker,
            params,
            files: Vec::new(),
        }
    }

    /// Add one source file to the selection.
    pub fn file(mut self, id: impl Into<FileId>) -> Self {
        self.files.push(id.into());
        self
    }

    /// Add several source files to the selection.
    pub fn files<I, F>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FileId>,
    {
        self.files.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Validate and submit; registers the task as `queued` on success.
    ///
    /// The gate never retries on its own — a retry is a user-initiated
    /// re-submission.
    pub async fn submit(self) -> Result<TaskId, SubmitError> {
        self.tracker.submit_inner(self.params, self.files).await
    }
}
