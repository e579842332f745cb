//! The task record and the partial observations that mutate it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FileId, ResultRef, TaskId};
use crate::kind::ArtifactKind;
use crate::status::TaskStatus;

/// One requested unit of AI-generated content, tracked through its
/// lifecycle.
///
/// Invariants upheld by the client:
/// - `id` is unique within a workspace and never reused;
/// - `error_message` is `Some` if and only if `status` is `Failed`;
/// - `source_file_ids` is non-empty at submission time;
/// - mutation happens only through the registry's merge, never in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: ArtifactKind,
    pub status: TaskStatus,
    /// 0–100, meaningful only while `Processing`.
    pub progress_percent: Option<u8>,
    pub progress_message: Option<String>,
    pub error_message: Option<String>,
    pub source_file_ids: Vec<FileId>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Pointer the result dispatcher uses once `status` is `Done`.
    pub result_ref: Option<ResultRef>,
}

impl Task {
    /// Fresh record registered by the submission gate.
    pub fn queued(
        id: TaskId,
        kind: ArtifactKind,
        source_file_ids: Vec<FileId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        debug_assert!(!source_file_ids.is_empty(), "submission gate validates selection");
        Self {
            id,
            kind,
            status: TaskStatus::Queued,
            progress_percent: None,
            progress_message: None,
            error_message: None,
            source_file_ids,
            created_at,
            finished_at: None,
            result_ref: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// View of this record as a partial observation, used when a full
    /// snapshot has to merge against an already-known entry.
    pub fn as_delta(&self) -> TaskDelta {
        TaskDelta {
            status: self.status,
            progress_percent: self.progress_percent,
            progress_message: self.progress_message.clone(),
            error_message: self.error_message.clone(),
            finished_at: self.finished_at,
            result_ref: self.result_ref.clone(),
        }
    }
}

/// A partial observation of a single task, from either signal source
/// (poll snapshot entry or push delta).
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDelta {
    pub status: TaskStatus,
    pub progress_percent: Option<u8>,
    pub progress_message: Option<String>,
    pub error_message: Option<String>,
    pub finished_at: Option<DateTime<Utc>>,
    pub result_ref: Option<ResultRef>,
}

impl TaskDelta {
    /// Observation carrying nothing but a status change.
    pub fn status_only(status: TaskStatus) -> Self {
        Self {
            status,
            progress_percent: None,
            progress_message: None,
            error_message: None,
            finished_at: None,
            result_ref: None,
        }
    }
}
