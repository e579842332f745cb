//! Events the tracker broadcasts to the owning view.

use satchel_types::{ArtifactKind, Task, TaskId};

/// Connection state of the workspace push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    /// Live; deltas arrive between polls.
    Connected,
    /// Dropped; the tracker runs poll-only until the channel reconnects.
    Down,
}

/// What a workspace member did to a shared task set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Created,
    Finished,
    Deleted,
}

/// User-facing notifications emitted by the tracker.
///
/// Terminal notifications ([`Finished`]/[`Failed`]) are emitted exactly
/// once per transition, no matter how often — or over which channel — the
/// terminal state is re-observed.
///
/// [`Finished`]: TrackerEvent::Finished
/// [`Failed`]: TrackerEvent::Failed
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    /// A tracked task produced a usable result.
    Finished { task: Task },
    /// A tracked task failed; the message is on the task record.
    Failed { task: Task },
    /// Attribution notice from the workspace lifecycle feed
    /// ("X just generated Y").
    Activity {
        action: ActivityKind,
        task_id: TaskId,
        kind: Option<ArtifactKind>,
        actor: Option<String>,
    },
    /// Push channel state change.
    Push(PushState),
}
