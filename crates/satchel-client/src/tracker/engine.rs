//! The workspace tracker: owns the registry, the poll schedule, and the
//! push subscription for one workspace view.
//!
//! All registry mutation funnels through a single command loop, so poll
//! snapshots, push deltas, and lifecycle notices are applied in arrival
//! order while the reconciliation rule keeps the result independent of
//! which channel reported a transition first.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use satchel_types::{
    ArtifactKind, FileId, GenerationParams, Task, TaskDelta, TaskId, TaskStatus, ValidationError,
    WorkspaceId,
};

use crate::config::ClientConfig;
use crate::dispatch::{self, ViewerPayload};
use crate::error::{ClientError, DispatchError, PushError, SubmitError};
use crate::push::{self, LifecycleKind, LifecycleNotice, ProgressDelta, PushMessage};
use crate::rest::StudioApi;
use crate::submit::GenerateBuilder;
use crate::tracker::events::{ActivityKind, TrackerEvent};
use crate::tracker::registry::{MergeOutcome, TaskRegistry};

/// How often `wait_terminal` re-checks the registry.
const WAIT_CHECK_INTERVAL: Duration = Duration::from_millis(25);

/// Commands accepted by the tracker loop.
#[derive(Debug)]
pub(crate) enum Command {
    /// Run a poll snapshot now instead of waiting for the next tick.
    Refresh,
    /// Re-evaluate the poll schedule (sent after submissions and removals).
    Wake,
}

struct Shared<A> {
    api: Arc<A>,
    config: ClientConfig,
    registry: TaskRegistry,
    cmd_tx: mpsc::Sender<Command>,
    push_tx: mpsc::Sender<PushMessage>,
    events_tx: broadcast::Sender<TrackerEvent>,
    closed_tx: watch::Sender<bool>,
    /// Abort handles of the loop and push reader tasks.
    handles: std::sync::Mutex<Vec<AbortHandle>>,
}

impl<A> Drop for Shared<A> {
    fn drop(&mut self) {
        // Last handle gone without an explicit close: release the timer and
        // subscription anyway so nothing dangles past the owning view.
        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}

/// Tracks the lifecycle of every generation task in one workspace view.
///
/// Created when the view mounts, [`close`]d when it unmounts. Handles are
/// cheap clones sharing one loop; re-opening a view means starting a fresh
/// tracker — timers and subscriptions never resume across mount cycles.
///
/// [`close`]: WorkspaceTracker::close
pub struct WorkspaceTracker<A: StudioApi> {
    shared: Arc<Shared<A>>,
}

impl<A: StudioApi> Clone for WorkspaceTracker<A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<A: StudioApi> WorkspaceTracker<A> {
    /// Start the tracker loop for one workspace view.
    pub fn start(api: Arc<A>, config: ClientConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (push_tx, push_rx) = mpsc::channel(64);
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (closed_tx, closed_rx) = watch::channel(false);
        let registry = TaskRegistry::new();

        let engine = Engine {
            api: Arc::clone(&api),
            workspace: config.workspace.clone(),
            registry: registry.clone(),
            events_tx: events_tx.clone(),
            poll_interval: config.poll_interval,
        };
        let loop_handle = tokio::spawn(engine.run(cmd_rx, push_rx, closed_rx)).abort_handle();

        Self {
            shared: Arc::new(Shared {
                api,
                config,
                registry,
                cmd_tx,
                push_tx,
                events_tx,
                closed_tx,
                handles: std::sync::Mutex::new(vec![loop_handle]),
            }),
        }
    }

    /// Attach the workspace push channel.
    ///
    /// The reader reconnects with doubling backoff until the tracker
    /// closes; while it is down the tracker keeps working from poll
    /// snapshots alone.
    pub fn attach_push(&self) -> Result<(), PushError> {
        let handle = push::spawn(
            self.shared.config.clone(),
            self.shared.push_tx.clone(),
            self.shared.events_tx.clone(),
            self.shared.closed_tx.subscribe(),
        )?;
        if let Ok(mut handles) = self.shared.handles.lock() {
            handles.push(handle);
        }
        Ok(())
    }

    /// Feed one push message into the reconciliation loop.
    ///
    /// The built-in WebSocket reader uses this path; an embedding shell
    /// with its own transport can inject decoded messages directly.
    pub async fn apply_push(&self, message: PushMessage) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::TrackerClosed);
        }
        self.shared
            .push_tx
            .send(message)
            .await
            .map_err(|_| ClientError::TrackerClosed)
    }

    /// Begin a generation request for this workspace.
    pub fn generate(&self, params: GenerationParams) -> GenerateBuilder<'_, A> {
        GenerateBuilder::new(self, params)
    }

    pub(crate) async fn submit_inner(
        &self,
        params: GenerationParams,
        files: Vec<FileId>,
    ) -> Result<TaskId, SubmitError> {
        if self.is_closed() {
            return Err(SubmitError::TrackerClosed);
        }
        params.validate()?;
        if files.is_empty() {
            return Err(ValidationError::EmptySourceSelection.into());
        }

        let response = self
            .shared
            .api
            .create_task(&self.shared.config.workspace, &params, &files)
            .await
            .map_err(SubmitError::Rejected)?;

        let id = TaskId::new(response.task_id);
        let task = Task::queued(id.clone(), params.kind(), files, Utc::now());
        self.shared.registry.upsert(task).await;
        // Wake the loop so the poll schedule starts covering the new task.
        let _ = self.shared.cmd_tx.send(Command::Wake).await;
        info!(task_id = %id, kind = %params.kind(), "task submitted");
        Ok(id)
    }

    /// Open the viewer payload for a finished task.
    ///
    /// Idempotent: every call re-fetches the detail and re-resolves the
    /// viewer, with no side effects on the registry.
    pub async fn dispatch(&self, id: &TaskId) -> Result<ViewerPayload, DispatchError> {
        dispatch::dispatch(
            self.shared.api.as_ref(),
            &self.shared.config.workspace,
            &self.shared.registry,
            id,
        )
        .await
    }

    /// Delete a task.
    ///
    /// The registry entry is removed regardless of the server outcome; a
    /// server-side failure is returned only so the view can surface it.
    pub async fn delete(&self, id: &TaskId) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::TrackerClosed);
        }
        self.shared.registry.remove(id).await;
        let _ = self.shared.cmd_tx.send(Command::Wake).await;
        match self
            .shared
            .api
            .delete_task(&self.shared.config.workspace, id)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(task_id = %id, error = %e, "server-side deletion failed");
                Err(ClientError::Api(e))
            }
        }
    }

    /// Force an immediate poll snapshot.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        if self.is_closed() {
            return Err(ClientError::TrackerClosed);
        }
        self.shared
            .cmd_tx
            .send(Command::Refresh)
            .await
            .map_err(|_| ClientError::TrackerClosed)
    }

    /// Subscribe to tracker notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.shared.events_tx.subscribe()
    }

    /// Snapshot of all tasks in insertion order.
    pub async fn tasks(&self) -> Vec<Task> {
        self.shared.registry.list().await
    }

    /// Look up one task.
    pub async fn task(&self, id: &TaskId) -> Option<Task> {
        self.shared.registry.get(id).await
    }

    /// Block until the task reaches a terminal state or `timeout` elapses.
    pub async fn wait_terminal(&self, id: &TaskId, timeout: Duration) -> Result<Task, ClientError> {
        tokio::time::timeout(timeout, async {
            loop {
                if let Some(task) = self.shared.registry.get(id).await {
                    if task.is_terminal() {
                        return task;
                    }
                }
                tokio::time::sleep(WAIT_CHECK_INTERVAL).await;
            }
        })
        .await
        .map_err(|_| ClientError::WaitTimeout(id.clone()))
    }

    /// `true` once [`close`] has run.
    ///
    /// [`close`]: WorkspaceTracker::close
    pub fn is_closed(&self) -> bool {
        *self.shared.closed_tx.borrow()
    }

    /// Release the poll timer and the push subscription.
    ///
    /// Idempotent and synchronous: once this returns, neither channel can
    /// mutate the registry again. Late-arriving poll results or push
    /// frames are dropped on the floor.
    pub fn close(&self) {
        if self.shared.closed_tx.send_replace(true) {
            return;
        }
        if let Ok(mut handles) = self.shared.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
        debug!(workspace = %self.shared.config.workspace, "tracker closed");
    }
}

// ── the loop ─────────────────────────────────────────────────────────────────

struct Engine<A> {
    api: Arc<A>,
    workspace: WorkspaceId,
    registry: TaskRegistry,
    events_tx: broadcast::Sender<TrackerEvent>,
    poll_interval: Duration,
}

impl<A: StudioApi> Engine<A> {
    async fn run(
        self,
        mut cmd_rx: mpsc::Receiver<Command>,
        mut push_rx: mpsc::Receiver<PushMessage>,
        mut closed_rx: watch::Receiver<bool>,
    ) {
        debug!(workspace = %self.workspace, "tracker loop started");
        loop {
            // The poll arm is armed only while something is in flight; the
            // schedule stops by itself once every task is terminal.
            let poll_armed = self.registry.has_active().await;
            tokio::select! {
                // Shutdown first: a queued signal must never be applied
                // after the owning view released the tracker.
                biased;

                _ = closed_rx.changed() => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Refresh) => self.poll_once().await,
                    Some(Command::Wake) => {}
                    None => break,
                },
                message = push_rx.recv() => match message {
                    Some(m) => self.handle_push(m).await,
                    None => break,
                },
                _ = tokio::time::sleep(self.poll_interval), if poll_armed => {
                    self.poll_once().await;
                }
            }
        }
        debug!(workspace = %self.workspace, "tracker loop stopped");
    }

    /// Fetch one poll snapshot and merge every entry.
    async fn poll_once(&self) {
        let summaries = match self.api.list_tasks(&self.workspace).await {
            Ok(s) => s,
            Err(e) => {
                // Transient: keep last-known-good state, retry next tick.
                warn!(workspace = %self.workspace, error = %e, "poll failed");
                return;
            }
        };
        for summary in summaries {
            let task = match summary.into_task() {
                Ok(t) => t,
                Err(e) => {
                    warn!(workspace = %self.workspace, error = %e, "skipping unrecognized task record");
                    continue;
                }
            };
            let id = task.id.clone();
            if let MergeOutcome::Updated {
                newly_terminal: true,
            } = self.registry.upsert(task).await
            {
                self.notify_terminal(&id).await;
            }
        }
    }

    async fn handle_push(&self, message: PushMessage) {
        match message {
            PushMessage::Progress(delta) => self.on_progress(delta).await,
            PushMessage::Lifecycle(notice) => self.on_lifecycle(notice).await,
        }
    }

    async fn on_progress(&self, delta: ProgressDelta) {
        let id = TaskId::new(delta.task_id.clone());
        let Ok(status) = delta.status.parse::<TaskStatus>() else {
            warn!(task_id = %id, status = %delta.status, "push delta with unrecognized status");
            return;
        };
        let observed = TaskDelta {
            status,
            progress_percent: delta.progress_percent.map(|p| p.min(100)),
            progress_message: delta.progress_message,
            error_message: delta.error_message,
            finished_at: None,
            result_ref: None,
        };
        match self.registry.apply(&id, &observed).await {
            MergeOutcome::Unknown => {
                debug!(task_id = %id, "push delta for untracked task ignored");
            }
            MergeOutcome::Updated {
                newly_terminal: true,
            } => {
                // Refresh the full record before notifying so the result
                // dispatcher sees a stable payload, not just the delta.
                self.refresh_task(&id).await;
                self.notify_terminal(&id).await;
            }
            _ => {}
        }
    }

    async fn on_lifecycle(&self, notice: LifecycleNotice) {
        let id = TaskId::new(notice.task_id.clone());
        let kind = notice
            .set_type
            .as_deref()
            .and_then(|s| s.parse::<ArtifactKind>().ok());
        match notice.kind {
            LifecycleKind::Created => {
                if let Some(MergeOutcome::Inserted) = self.refresh_task(&id).await {
                    self.emit_activity(ActivityKind::Created, &id, kind, notice.actor);
                }
            }
            LifecycleKind::Done => match self.refresh_task(&id).await {
                Some(MergeOutcome::Updated {
                    newly_terminal: true,
                }) => {
                    self.notify_terminal(&id).await;
                    self.emit_activity(ActivityKind::Finished, &id, kind, notice.actor);
                }
                Some(MergeOutcome::Inserted) => {
                    // Someone else's task, first seen already finished.
                    self.emit_activity(ActivityKind::Finished, &id, kind, notice.actor);
                }
                // Already known terminal: the first observation notified.
                _ => {}
            },
            LifecycleKind::Deleted => {
                if self.registry.remove(&id).await.is_some() {
                    self.emit_activity(ActivityKind::Deleted, &id, kind, notice.actor);
                }
            }
        }
    }

    /// One-shot re-fetch of a single task's full summary.
    async fn refresh_task(&self, id: &TaskId) -> Option<MergeOutcome> {
        match self.api.get_task(&self.workspace, id).await {
            Ok(summary) => match summary.into_task() {
                Ok(task) => Some(self.registry.upsert(task).await),
                Err(e) => {
                    warn!(task_id = %id, error = %e, "refresh returned unrecognized record");
                    None
                }
            },
            Err(e) => {
                warn!(task_id = %id, error = %e, "task refresh failed");
                None
            }
        }
    }

    /// Emit the one-shot terminal notification for a task.
    async fn notify_terminal(&self, id: &TaskId) {
        let Some(task) = self.registry.get(id).await else {
            return;
        };
        let event = match task.status {
            TaskStatus::Done => TrackerEvent::Finished { task },
            TaskStatus::Failed => TrackerEvent::Failed { task },
            _ => return,
        };
        let _ = self.events_tx.send(event);
    }

    fn emit_activity(
        &self,
        action: ActivityKind,
        id: &TaskId,
        kind: Option<ArtifactKind>,
        actor: Option<String>,
    ) {
        let _ = self.events_tx.send(TrackerEvent::Activity {
            action,
            task_id: id.clone(),
            kind,
            actor,
        });
    }
}
