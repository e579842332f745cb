//! The merge rule applied to every incoming task observation.
//!
//! Both signal sources go through [`merge`], which makes the effective
//! registry state order-independent with respect to staleness: whichever
//! of poll and push arrives first, the stored state converges to the
//! highest-observed progress.

use std::cmp::Ordering;

use satchel_types::{Task, TaskDelta, TaskStatus};

/// Message stored on a failed task when the server sent none.
const FALLBACK_FAILURE_MESSAGE: &str = "generation failed";

/// Merge an incoming observation into the stored task.
///
/// Returns `Some(updated)` when the observation carries newer or richer
/// data, `None` when it is stale and must be discarded. Rules, in order:
///
/// 1. a stored terminal state never changes — in particular, a late
///    `failed` must not override a recorded `done`;
/// 2. an incoming `failed` applies from any non-terminal state, capturing
///    the error message (or a fallback, so the message is always present
///    on failed tasks);
/// 3. a strictly higher status rank applies wholesale;
/// 4. at equal rank, only informationally richer data applies: higher
///    progress, or a non-empty message where none was known.
pub(crate) fn merge(current: &Task, incoming: &TaskDelta) -> Option<Task> {
    if current.status.is_terminal() {
        if incoming.status == current.status {
            return enrich(current, incoming);
        }
        return None;
    }

    if incoming.status == TaskStatus::Failed {
        let mut next = current.clone();
        next.status = TaskStatus::Failed;
        next.error_message = incoming
            .error_message
            .clone()
            .filter(|m| !m.is_empty())
            .or_else(|| Some(FALLBACK_FAILURE_MESSAGE.to_owned()));
        if let Some(p) = incoming.progress_percent {
            next.progress_percent = Some(p.min(100));
        }
        if incoming.progress_message.is_some() {
            next.progress_message = incoming.progress_message.clone();
        }
        next.finished_at = incoming.finished_at.or(next.finished_at);
        return Some(next);
    }

    match incoming.status.rank().cmp(&current.status.rank()) {
        Ordering::Greater => {
            let mut next = current.clone();
            next.status = incoming.status;
            if let Some(p) = incoming.progress_percent {
                next.progress_percent = Some(p.min(100));
            }
            if incoming.progress_message.is_some() {
                next.progress_message = incoming.progress_message.clone();
            }
            next.finished_at = incoming.finished_at.or(next.finished_at);
            if incoming.result_ref.is_some() {
                next.result_ref = incoming.result_ref.clone();
            }
            next.error_message = None;
            Some(next)
        }
        Ordering::Equal => enrich(current, incoming),
        Ordering::Less => None,
    }
}

/// Equal-rank merge: apply only informationally richer data.
fn enrich(current: &Task, incoming: &TaskDelta) -> Option<Task> {
    let mut next = current.clone();
    let mut changed = false;

    let progressed = match (current.progress_percent, incoming.progress_percent) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(cur), Some(new)) => new > cur,
    };
    if progressed {
        next.progress_percent = incoming.progress_percent.map(|p| p.min(100));
        // A newer progress figure brings its own message along.
        if incoming.progress_message.is_some() {
            next.progress_message = incoming.progress_message.clone();
        }
        changed = true;
    } else if non_empty(&incoming.progress_message) && !non_empty(&current.progress_message) {
        next.progress_message = incoming.progress_message.clone();
        changed = true;
    }

    if incoming.finished_at.is_some() && current.finished_at.is_none() {
        next.finished_at = incoming.finished_at;
        changed = true;
    }
    if incoming.result_ref.is_some() && current.result_ref.is_none() {
        next.result_ref = incoming.result_ref.clone();
        changed = true;
    }
    if current.status == TaskStatus::Failed
        && non_empty(&incoming.error_message)
        && !non_empty(&current.error_message)
    {
        next.error_message = incoming.error_message.clone();
        changed = true;
    }

    changed.then_some(next)
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}
