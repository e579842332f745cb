//! Task-lifecycle client for the satchel notebook workspace.
//!
//! The workspace view of the satchel UI owns one [`WorkspaceTracker`]: it
//! submits generation requests, keeps an in-memory registry of every known
//! task, reconciles the two status feeds (periodic poll snapshots and push
//! deltas over the workspace channel) without ever regressing a task's
//! state, and dispatches finished tasks to typed viewer payloads.
//!
//! # Quick-start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use satchel_client::rest::HttpStudioApi;
//! use satchel_client::{ClientConfig, WorkspaceTracker};
//! use satchel_types::GenerationParams;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), satchel_client::ClientError> {
//! let config = ClientConfig::from_env();
//! let api = Arc::new(HttpStudioApi::new(&config)?);
//!
//! // 1. Start the tracker and attach the push channel.
//! let tracker = WorkspaceTracker::start(api, config);
//! tracker.attach_push()?;
//!
//! // 2. Submit a generation request.
//! let task_id = tracker
//!     .generate(GenerationParams::Quiz {
//!         question_count: 10,
//!         difficulty: Default::default(),
//!         language: None,
//!         guidance: None,
//!     })
//!     .file("file-1")
//!     .file("file-2")
//!     .submit()
//!     .await?;
//!
//! // 3. Wait for it to finish and open the matching viewer.
//! tracker.wait_terminal(&task_id, Duration::from_secs(300)).await?;
//! let payload = tracker.dispatch(&task_id).await?;
//! println!("open {:?}", payload.modality);
//!
//! // 4. Release the poll timer and push subscription with the view.
//! tracker.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod push;
pub mod rest;
pub mod tracker;

mod submit;

pub use config::ClientConfig;
pub use dispatch::{ViewerModality, ViewerPayload};
pub use error::{ApiError, ClientError, DispatchError, PushError, SubmitError, ValidationError};
pub use submit::GenerateBuilder;
pub use tracker::{
    ActivityKind, MergeOutcome, PushState, TaskRegistry, TrackerEvent, WorkspaceTracker,
};
