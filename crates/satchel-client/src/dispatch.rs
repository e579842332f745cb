//! Result dispatcher: route a finished task to the matching viewer.

use tracing::debug;

use satchel_types::{ArtifactKind, TaskId, TaskStatus, WorkspaceId};

use crate::error::DispatchError;
use crate::rest::schemas::TaskDetail;
use crate::rest::StudioApi;
use crate::tracker::TaskRegistry;

/// Viewer surfaces the UI shell can open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerModality {
    QuizPlayer,
    DeckBrowser,
    AudioPlayer,
    VideoPlayer,
    MindmapCanvas,
    MarkdownPane,
    TimelineBoard,
    ExerciseWorkbench,
}

/// Map each artifact kind to its viewer.
///
/// Exhaustive on purpose: adding a kind does not compile until it is
/// routed here.
pub fn modality_for(kind: ArtifactKind) -> ViewerModality {
    match kind {
        ArtifactKind::Quiz => ViewerModality::QuizPlayer,
        ArtifactKind::Flashcards => ViewerModality::DeckBrowser,
        ArtifactKind::Podcast => ViewerModality::AudioPlayer,
        ArtifactKind::Video => ViewerModality::VideoPlayer,
        ArtifactKind::Mindmap => ViewerModality::MindmapCanvas,
        ArtifactKind::Summary | ArtifactKind::Discussion => ViewerModality::MarkdownPane,
        ArtifactKind::Timeline => ViewerModality::TimelineBoard,
        ArtifactKind::CodeExercise => ViewerModality::ExerciseWorkbench,
    }
}

/// What a viewer needs to render a finished task.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerPayload {
    pub modality: ViewerModality,
    pub detail: TaskDetail,
}

/// Fetch the detail payload for a `Done` task and resolve its viewer.
///
/// Gating: a non-terminal task is a no-op (`NotReady`); a failed task
/// signals `Unavailable` with the stored error message. Otherwise the
/// kind-specific detail is fetched — once per call — and handed back with
/// the mapped modality. A payload that does not match the task's kind
/// surfaces as `Unsupported` rather than crashing the view.
pub(crate) async fn dispatch<A: StudioApi>(
    api: &A,
    workspace: &WorkspaceId,
    registry: &TaskRegistry,
    id: &TaskId,
) -> Result<ViewerPayload, DispatchError> {
    let task = registry
        .get(id)
        .await
        .ok_or_else(|| DispatchError::UnknownTask(id.clone()))?;
    match task.status {
        TaskStatus::Queued | TaskStatus::Processing => Err(DispatchError::NotReady(id.clone())),
        TaskStatus::Failed => Err(DispatchError::Unavailable {
            id: id.clone(),
            message: task
                .error_message
                .unwrap_or_else(|| "generation failed".to_owned()),
        }),
        TaskStatus::Done => {
            let detail = api.task_detail(workspace, id, task.kind).await?;
            if detail.kind() != task.kind {
                return Err(DispatchError::Unsupported {
                    id: id.clone(),
                    kind: task.kind,
                });
            }
            debug!(task_id = %id, kind = %task.kind, "opening viewer");
            Ok(ViewerPayload {
                modality: modality_for(task.kind),
                detail,
            })
        }
    }
}
