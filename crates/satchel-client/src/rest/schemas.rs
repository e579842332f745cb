//! Wire schemas for the task REST surface.
//!
//! These mirror the server's JSON shapes and stay separate from the domain
//! types in `satchel-types`; conversion happens at the boundary and is the
//! single place where unknown kind/status strings can surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use satchel_types::{ArtifactKind, FileId, ResultRef, Task, TaskId, TaskStatus};

/// A wire value the client does not recognize.
///
/// Raised only during wire→domain conversion; callers log and skip the
/// offending record rather than failing the whole refresh.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized {field} value: {value:?}")]
pub struct UnrecognizedField {
    pub field: &'static str,
    pub value: String,
}

/// Response to a creation `POST`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResponse {
    pub task_id: String,
}

/// One entry of the poll snapshot (and the single-task refresh response).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    pub set_type: String,
    pub status: String,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub progress_message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub source_file_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result_ref: Option<String>,
}

impl TaskSummary {
    /// Convert into the domain task.
    ///
    /// Fails on kind or status strings outside the closed sets; progress is
    /// clamped to 100.
    pub fn into_task(self) -> Result<Task, UnrecognizedField> {
        let kind: ArtifactKind = self.set_type.parse().map_err(|_| UnrecognizedField {
            field: "setType",
            value: self.set_type.clone(),
        })?;
        let status: TaskStatus = self.status.parse().map_err(|_| UnrecognizedField {
            field: "status",
            value: self.status.clone(),
        })?;
        Ok(Task {
            id: TaskId::new(self.id),
            kind,
            status,
            progress_percent: self.progress_percent.map(|p| p.min(100)),
            progress_message: self.progress_message,
            error_message: self.error_message,
            source_file_ids: self.source_file_ids.into_iter().map(FileId::new).collect(),
            created_at: self.created_at,
            finished_at: self.finished_at,
            result_ref: self.result_ref.map(ResultRef::new),
        })
    }
}

// ── detail payloads ──────────────────────────────────────────────────────────

/// Kind-specific result payload of a finished task.
///
/// The closed enum pairs each artifact kind with exactly one payload shape;
/// the dispatcher checks that pairing before handing the payload to a
/// viewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TaskDetail {
    Quiz { questions: Vec<QuizQuestion> },
    Flashcards { cards: Vec<Flashcard> },
    Podcast {
        audio_url: String,
        duration_secs: u32,
        #[serde(default)]
        transcript: Option<String>,
    },
    Video {
        video_url: String,
        duration_secs: u32,
    },
    Mindmap { root: MindmapNode },
    Summary { markdown: String },
    Discussion { prompts: Vec<String> },
    Timeline { events: Vec<TimelineEvent> },
    CodeExercise {
        files: Vec<ExerciseFile>,
        tests: Vec<ExerciseFile>,
    },
}

impl TaskDetail {
    /// The artifact kind this payload belongs to.
    pub fn kind(&self) -> ArtifactKind {
        match self {
            TaskDetail::Quiz { .. } => ArtifactKind::Quiz,
            TaskDetail::Flashcards { .. } => ArtifactKind::Flashcards,
            TaskDetail::Podcast { .. } => ArtifactKind::Podcast,
            TaskDetail::Video { .. } => ArtifactKind::Video,
            TaskDetail::Mindmap { .. } => ArtifactKind::Mindmap,
            TaskDetail::Summary { .. } => ArtifactKind::Summary,
            TaskDetail::Discussion { .. } => ArtifactKind::Discussion,
            TaskDetail::Timeline { .. } => ArtifactKind::Timeline,
            TaskDetail::CodeExercise { .. } => ArtifactKind::CodeExercise,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer_index: u32,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MindmapNode {
    pub label: String,
    #[serde(default)]
    pub children: Vec<MindmapNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub when: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseFile {
    pub path: String,
    pub contents: String,
}
