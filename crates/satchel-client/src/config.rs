//! Client configuration, loaded from environment variables or built in code.

use std::time::Duration;

use satchel_types::WorkspaceId;

/// Runtime configuration for one workspace tracker.
///
/// Every field has a sensible default so the client works out-of-the-box
/// against a local development server without any environment variables
/// set.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST surface (default: `"http://127.0.0.1:8080/api"`).
    pub base_url: String,

    /// WebSocket URL of the per-workspace push channel
    /// (default: `"ws://127.0.0.1:8080/ws"`).
    pub push_url: String,

    /// Workspace whose tasks this tracker owns.
    pub workspace: WorkspaceId,

    /// Interval between poll snapshots while any task is non-terminal
    /// (default: 2 s).
    pub poll_interval: Duration,

    /// Per-request timeout for the REST client (default: 10 s).
    pub request_timeout: Duration,

    /// First reconnect delay after the push channel drops (default: 1 s).
    pub push_backoff_initial: Duration,

    /// Reconnect delay ceiling; the delay doubles up to this (default: 30 s).
    pub push_backoff_max: Duration,

    /// Capacity of the tracker's event broadcast channel (default: 64).
    pub event_capacity: usize,
}

impl ClientConfig {
    /// Build [`ClientConfig`] from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("SATCHEL_API_URL", "http://127.0.0.1:8080/api"),
            push_url: env_or("SATCHEL_PUSH_URL", "ws://127.0.0.1:8080/ws"),
            workspace: WorkspaceId::new(env_or("SATCHEL_WORKSPACE", "default")),
            poll_interval: Duration::from_millis(parse_env("SATCHEL_POLL_INTERVAL_MS", 2_000)),
            request_timeout: Duration::from_millis(parse_env("SATCHEL_REQUEST_TIMEOUT_MS", 10_000)),
            push_backoff_initial: Duration::from_millis(parse_env(
                "SATCHEL_PUSH_BACKOFF_INITIAL_MS",
                1_000,
            )),
            push_backoff_max: Duration::from_millis(parse_env("SATCHEL_PUSH_BACKOFF_MAX_MS", 30_000)),
            event_capacity: parse_env("SATCHEL_EVENT_CAPACITY", 64),
        }
    }

    /// Same defaults as [`from_env`], bound to an explicit workspace.
    ///
    /// [`from_env`]: ClientConfig::from_env
    pub fn for_workspace(workspace: impl Into<WorkspaceId>) -> Self {
        Self {
            workspace: workspace.into(),
            ..Self::from_env()
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
