//! The per-workspace push channel.
//!
//! Two message shapes arrive on the workspace topic: single-task progress
//! deltas for in-flight work, and workspace-wide lifecycle notifications
//! used as refresh triggers and for attribution ("X just generated Y").
//! The reader reconnects with doubling backoff; while it is down the
//! tracker keeps working from poll snapshots alone.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::AbortHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::PushError;
use crate::tracker::{PushState, TrackerEvent};

/// Progress delta for one in-flight task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub task_id: String,
    pub status: String,
    #[serde(default)]
    pub progress_percent: Option<u8>,
    #[serde(default)]
    pub progress_message: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Lifecycle action broadcast to every workspace member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleKind {
    Created,
    Done,
    Deleted,
}

/// Workspace-wide lifecycle notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleNotice {
    #[serde(rename = "type")]
    pub kind: LifecycleKind,
    pub task_id: String,
    #[serde(default)]
    pub set_type: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

/// Any frame the workspace topic delivers.
///
/// Untagged on purpose: lifecycle notices carry a `type` field, progress
/// deltas a `status` field, so the shapes never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PushMessage {
    Lifecycle(LifecycleNotice),
    Progress(ProgressDelta),
}

pub(crate) fn decode(text: &str) -> Result<PushMessage, PushError> {
    serde_json::from_str(text).map_err(|e| PushError::Decode(e.to_string()))
}

fn next_backoff(current: Duration, max: Duration) -> Duration {
    (current * 2).min(max)
}

/// Spawn the reconnecting reader for the workspace topic.
///
/// Decoded messages are fed into the tracker loop; the task exits when
/// the tracker closes or drops.
pub(crate) fn spawn(
    config: ClientConfig,
    feed: mpsc::Sender<PushMessage>,
    events_tx: broadcast::Sender<TrackerEvent>,
    closed_rx: watch::Receiver<bool>,
) -> Result<AbortHandle, PushError> {
    let url = Url::parse(&config.push_url).map_err(|e| PushError::BadAddress(e.to_string()))?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(PushError::BadAddress(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }
    Ok(tokio::spawn(reader_loop(url, config, feed, events_tx, closed_rx)).abort_handle())
}

async fn reader_loop(
    url: Url,
    config: ClientConfig,
    feed: mpsc::Sender<PushMessage>,
    events_tx: broadcast::Sender<TrackerEvent>,
    mut closed_rx: watch::Receiver<bool>,
) {
    let mut backoff = config.push_backoff_initial;
    loop {
        if *closed_rx.borrow() {
            return;
        }
        let (mut ws, _) = match connect_async(url.as_str()).await {
            Ok(connection) => connection,
            Err(e) => {
                warn!(url = %url, error = %e, "push channel connect failed");
                tokio::select! {
                    _ = closed_rx.changed() => return,
                    _ = tokio::time::sleep(backoff) => {}
                }
                backoff = next_backoff(backoff, config.push_backoff_max);
                continue;
            }
        };
        backoff = config.push_backoff_initial;

        // Announce which workspace topic this subscriber wants.
        let hello = serde_json::json!({ "subscribe": config.workspace.as_str() }).to_string();
        if ws.send(Message::Text(hello.into())).await.is_err() {
            let _ = ws.close(None).await;
            continue;
        }
        info!(workspace = %config.workspace, "push channel connected");
        let _ = events_tx.send(TrackerEvent::Push(PushState::Connected));

        loop {
            tokio::select! {
                _ = closed_rx.changed() => {
                    let _ = ws.close(None).await;
                    return;
                }
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => match decode(text.as_str()) {
                        Ok(message) => {
                            if feed.send(message).await.is_err() {
                                // Tracker gone; nothing left to feed.
                                let _ = ws.close(None).await;
                                return;
                            }
                        }
                        Err(e) => debug!(error = %e, "ignoring undecodable push frame"),
                    },
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "push channel errored; falling back to poll-only");
                        break;
                    }
                    None => {
                        warn!("push channel closed by server; falling back to poll-only");
                        break;
                    }
                }
            }
        }
        let _ = events_tx.send(TrackerEvent::Push(PushState::Down));
        let _ = ws.close(None).await;
    }
}
