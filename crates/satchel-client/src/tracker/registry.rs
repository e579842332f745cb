//! In-memory task registry for one workspace view.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use satchel_types::{Task, TaskDelta, TaskId};

use super::reconcile;

/// Result of a merge, reported so the engine can notify exactly once per
/// terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// First observation of this id; stored as given.
    Inserted,
    /// Existing entry replaced with newer or richer data.
    Updated {
        /// This call moved the task into a terminal state.
        newly_terminal: bool,
    },
    /// Incoming data was stale or carried nothing new.
    Unchanged,
    /// A delta referenced an id this registry does not hold.
    Unknown,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Ids in insertion order, for stable rendering.
    order: Vec<TaskId>,
    tasks: HashMap<TaskId, Task>,
}

/// Single source of truth for all known tasks in the current workspace
/// view.
///
/// Holds exactly one entry per task id. [`upsert`] and [`apply`] are the
/// only mutation entry points — both funnel through the reconciliation
/// rule, and callers never mutate a [`Task`] in place. Cheap to clone; all
/// clones share state.
///
/// [`upsert`]: TaskRegistry::upsert
/// [`apply`]: TaskRegistry::apply
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a full snapshot, or merge it into the existing entry.
    pub async fn upsert(&self, task: Task) -> MergeOutcome {
        let mut guard = self.inner.write().await;
        let Some(current) = guard.tasks.get(&task.id).cloned() else {
            guard.order.push(task.id.clone());
            guard.tasks.insert(task.id.clone(), task);
            return MergeOutcome::Inserted;
        };
        match reconcile::merge(&current, &task.as_delta()) {
            None => MergeOutcome::Unchanged,
            Some(next) => {
                let newly_terminal = next.is_terminal() && !current.is_terminal();
                guard.tasks.insert(next.id.clone(), next);
                MergeOutcome::Updated { newly_terminal }
            }
        }
    }

    /// Merge a partial observation into an existing entry.
    ///
    /// Unlike [`upsert`] this never inserts: a delta for an id this view
    /// has not seen is reported as [`MergeOutcome::Unknown`].
    ///
    /// [`upsert`]: TaskRegistry::upsert
    pub async fn apply(&self, id: &TaskId, delta: &TaskDelta) -> MergeOutcome {
        let mut guard = self.inner.write().await;
        let Some(current) = guard.tasks.get(id).cloned() else {
            return MergeOutcome::Unknown;
        };
        match reconcile::merge(&current, delta) {
            None => MergeOutcome::Unchanged,
            Some(next) => {
                let newly_terminal = next.is_terminal() && !current.is_terminal();
                guard.tasks.insert(id.clone(), next);
                MergeOutcome::Updated { newly_terminal }
            }
        }
    }

    /// Remove an entry; a silent no-op when the id is absent.
    pub async fn remove(&self, id: &TaskId) -> Option<Task> {
        let mut guard = self.inner.write().await;
        let removed = guard.tasks.remove(id);
        if removed.is_some() {
            guard.order.retain(|known| known != id);
        }
        removed
    }

    pub async fn get(&self, id: &TaskId) -> Option<Task> {
        self.inner.read().await.tasks.get(id).cloned()
    }

    /// All tasks, in insertion order.
    pub async fn list(&self) -> Vec<Task> {
        let guard = self.inner.read().await;
        guard
            .order
            .iter()
            .filter_map(|id| guard.tasks.get(id).cloned())
            .collect()
    }

    /// `true` while any task is still `queued` or `processing`.
    pub async fn has_active(&self) -> bool {
        self.inner
            .read()
            .await
            .tasks
            .values()
            .any(|t| !t.is_terminal())
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.tasks.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.tasks.is_empty()
    }
}
