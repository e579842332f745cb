//! Task status lifecycle.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle state of a generation task.
///
/// Transitions run `queued → processing → done`, with `failed` reachable
/// from either non-terminal state.  No edge leaves a terminal state; the
/// reconciliation rule in the client enforces this regardless of the order
/// in which poll and push observations arrive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Processing,
    Done,
    Failed,
}

impl TaskStatus {
    /// Position in the forward order `queued(0) < processing(1) < done(2)`.
    ///
    /// `Failed` shares the top rank but is compared out of band: the merge
    /// rule applies it from any non-terminal state and never lets it
    /// override a recorded `Done`.
    pub fn rank(self) -> u8 {
        match self {
            TaskStatus::Queued => 0,
            TaskStatus::Processing => 1,
            TaskStatus::Done | TaskStatus::Failed => 2,
        }
    }

    /// Returns `true` once no further transition is valid.
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }
}
