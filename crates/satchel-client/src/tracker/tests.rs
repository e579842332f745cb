#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use chrono::Utc;

    use satchel_types::{
        ArtifactKind, DifficultyMix, FileId, GenerationParams, TaskId, TaskStatus, ValidationError,
        WorkspaceId,
    };

    use crate::config::ClientConfig;
    use crate::dispatch::ViewerModality;
    use crate::error::{ApiError, ClientError, DispatchError, SubmitError};
    use crate::push::{LifecycleKind, LifecycleNotice, ProgressDelta, PushMessage};
    use crate::rest::schemas::{CreateTaskResponse, Flashcard, QuizQuestion, TaskDetail, TaskSummary};
    use crate::rest::StudioApi;
    use crate::tracker::{ActivityKind, TrackerEvent, WorkspaceTracker};

    const POLL: Duration = Duration::from_secs(2);

    // ── mock backend ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct ServerState {
        order: Vec<String>,
        tasks: HashMap<String, TaskSummary>,
        details: HashMap<String, TaskDetail>,
    }

    /// Scripted stand-in for the REST surface: behaves like a tiny server
    /// whose state the test mutates between polls.
    #[derive(Default)]
    struct MockApi {
        server: Mutex<ServerState>,
        next_id: AtomicUsize,
        create_calls: AtomicUsize,
        list_calls: AtomicUsize,
        detail_calls: AtomicUsize,
        delete_calls: AtomicUsize,
        /// Number of upcoming list calls that should fail.
        fail_lists: AtomicUsize,
        fail_delete: AtomicBool,
    }

    impl MockApi {
        fn summary(id: &str, kind: ArtifactKind, status: &str) -> TaskSummary {
            TaskSummary {
                id: id.to_owned(),
                set_type: kind.to_string(),
                status: status.to_owned(),
                progress_percent: None,
                progress_message: None,
                error_message: None,
                source_file_ids: vec!["f1".to_owned()],
                created_at: Utc::now(),
                finished_at: None,
                result_ref: None,
            }
        }

        fn set_status(&self, id: &str, status: &str, progress: Option<u8>, message: Option<&str>) {
            let mut server = self.server.lock().unwrap();
            let task = server.tasks.get_mut(id).expect("task exists on server");
            task.status = status.to_owned();
            task.progress_percent = progress;
            task.progress_message = message.map(str::to_owned);
            if status == "failed" && task.error_message.is_none() {
                task.error_message = Some("worker crashed".to_owned());
            }
        }

        fn set_done(&self, id: &str, detail: TaskDetail) {
            {
                let mut server = self.server.lock().unwrap();
                let task = server.tasks.get_mut(id).expect("task exists on server");
                task.status = "done".to_owned();
                task.progress_percent = Some(100);
                task.finished_at = Some(Utc::now());
                task.result_ref = Some(format!("result-{id}"));
            }
            self.set_detail(id, detail);
        }

        fn set_detail(&self, id: &str, detail: TaskDetail) {
            self.server
                .lock()
                .unwrap()
                .details
                .insert(id.to_owned(), detail);
        }

        /// A task created outside this client (another workspace member).
        fn insert_remote_task(&self, summary: TaskSummary) {
            let mut server = self.server.lock().unwrap();
            server.order.push(summary.id.clone());
            server.tasks.insert(summary.id.clone(), summary);
        }

        fn list_count(&self) -> usize {
            self.list_calls.load(Ordering::SeqCst)
        }

        fn detail_count(&self) -> usize {
            self.detail_calls.load(Ordering::SeqCst)
        }
    }

    impl StudioApi for MockApi {
        async fn create_task(
            &self,
            _workspace: &WorkspaceId,
            params: &GenerationParams,
            files: &[FileId],
        ) -> Result<CreateTaskResponse, ApiError> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            let id = format!("task-{n}");
            let mut summary = Self::summary(&id, params.kind(), "queued");
            summary.source_file_ids = files.iter().map(|f| f.to_string()).collect();
            let mut server = self.server.lock().unwrap();
            server.order.push(id.clone());
            server.tasks.insert(id.clone(), summary);
            Ok(CreateTaskResponse { task_id: id })
        }

        async fn list_tasks(&self, _workspace: &WorkspaceId) -> Result<Vec<TaskSummary>, ApiError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_lists
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(ApiError::Status {
                    status: 503,
                    message: "unavailable".to_owned(),
                });
            }
            let server = self.server.lock().unwrap();
            Ok(server
                .order
                .iter()
                .filter_map(|id| server.tasks.get(id).cloned())
                .collect())
        }

        async fn get_task(
            &self,
            _workspace: &WorkspaceId,
            id: &TaskId,
        ) -> Result<TaskSummary, ApiError> {
            self.server
                .lock()
                .unwrap()
                .tasks
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    message: format!("task {id} not found"),
                })
        }

        async fn task_detail(
            &self,
            _workspace: &WorkspaceId,
            id: &TaskId,
            _kind: ArtifactKind,
        ) -> Result<TaskDetail, ApiError> {
            self.detail_calls.fetch_add(1, Ordering::SeqCst);
            self.server
                .lock()
                .unwrap()
                .details
                .get(id.as_str())
                .cloned()
                .ok_or_else(|| ApiError::Status {
                    status: 404,
                    message: format!("no detail for task {id}"),
                })
        }

        async fn delete_task(&self, _workspace: &WorkspaceId, id: &TaskId) -> Result<(), ApiError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(ApiError::Status {
                    status: 500,
                    message: "deletion failed".to_owned(),
                });
            }
            let mut server = self.server.lock().unwrap();
            server.tasks.remove(id.as_str());
            server.order.retain(|known| known != id.as_str());
            Ok(())
        }
    }

    // ── helpers ───────────────────────────────────────────────────────────────

    fn config() -> ClientConfig {
        ClientConfig {
            base_url: "http://127.0.0.1:9/api".to_owned(),
            push_url: "ws://127.0.0.1:9/ws".to_owned(),
            workspace: WorkspaceId::new("ws-1"),
            poll_interval: POLL,
            request_timeout: Duration::from_secs(1),
            push_backoff_initial: Duration::from_millis(100),
            push_backoff_max: Duration::from_secs(5),
            event_capacity: 64,
        }
    }

    fn start() -> (Arc<MockApi>, WorkspaceTracker<MockApi>) {
        let api = Arc::new(MockApi::default());
        let tracker = WorkspaceTracker::start(Arc::clone(&api), config());
        (api, tracker)
    }

    fn quiz_params() -> GenerationParams {
        GenerationParams::Quiz {
            question_count: 10,
            difficulty: DifficultyMix::default(),
            language: None,
            guidance: None,
        }
    }

    fn podcast_params() -> GenerationParams {
        GenerationParams::Podcast {
            voice: None,
            language: None,
            guidance: None,
        }
    }

    fn quiz_detail() -> TaskDetail {
        TaskDetail::Quiz {
            questions: vec![QuizQuestion {
                prompt: "what is ownership?".to_owned(),
                choices: vec!["a".to_owned(), "b".to_owned()],
                answer_index: 0,
                explanation: None,
            }],
        }
    }

    /// Let the tracker loop drain everything already queued, without
    /// reaching the next poll tick.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(5)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    /// Advance past one poll tick and let the loop settle.
    async fn tick() {
        tokio::time::sleep(POLL + Duration::from_millis(100)).await;
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    fn progress(id: &str, status: &str, percent: Option<u8>, message: Option<&str>) -> PushMessage {
        PushMessage::Progress(ProgressDelta {
            task_id: id.to_owned(),
            status: status.to_owned(),
            progress_percent: percent,
            progress_message: message.map(str::to_owned),
            error_message: None,
        })
    }

    fn drain(rx: &mut tokio::sync::broadcast::Receiver<TrackerEvent>) -> Vec<TrackerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    // ── submission gate ───────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn empty_file_selection_fails_before_any_network_call() {
        let (api, tracker) = start();

        let err = tracker.generate(quiz_params()).submit().await.unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Validation(ValidationError::EmptySourceSelection)
        ));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        assert!(tracker.tasks().await.is_empty());
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_bounds_parameters_fail_before_any_network_call() {
        let (api, tracker) = start();

        let params = GenerationParams::Flashcards {
            card_count: 500,
            language: None,
            guidance: None,
        };
        let err = tracker
            .generate(params)
            .file("f1")
            .submit()
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Validation(_)));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_submissions_produce_independent_tasks() {
        let (_api, tracker) = start();

        let quiz = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        let podcast = tracker
            .generate(podcast_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        assert_ne!(quiz, podcast);
        assert_eq!(tracker.tasks().await.len(), 2);
        tracker.close();
    }

    // ── scenario: poll and push interleave ────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn quiz_lifecycle_from_submission_to_viewer() {
        let (api, tracker) = start();

        let id = tracker
            .generate(quiz_params())
            .files(["f1", "f2"])
            .submit()
            .await
            .unwrap();

        // Registered immediately as queued.
        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Queued);
        assert_eq!(
            task.source_file_ids,
            vec![FileId::from("f1"), FileId::from("f2")]
        );

        // First poll reports processing at 40%.
        api.set_status(id.as_str(), "processing", Some(40), None);
        tick().await;
        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.progress_percent, Some(40));

        // A push delta advances to 70%.
        tracker
            .apply_push(progress(id.as_str(), "processing", Some(70), Some("writing questions")))
            .await
            .unwrap();
        settle().await;
        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.progress_percent, Some(70));
        assert_eq!(task.progress_message.as_deref(), Some("writing questions"));

        // The next poll still reports 40% — stale, discarded.
        tick().await;
        assert_eq!(tracker.task(&id).await.unwrap().progress_percent, Some(70));

        // The server finishes the task.
        api.set_done(id.as_str(), quiz_detail());
        tick().await;
        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.result_ref.is_some());

        // Polling stops once nothing is in flight.
        let polls = api.list_count();
        tokio::time::sleep(POLL * 10).await;
        assert_eq!(api.list_count(), polls);

        // Dispatch opens the quiz viewer after one detail fetch per call.
        let payload = tracker.dispatch(&id).await.unwrap();
        assert_eq!(payload.modality, ViewerModality::QuizPlayer);
        assert_eq!(api.detail_count(), 1);
        let again = tracker.dispatch(&id).await.unwrap();
        assert_eq!(again, payload);
        assert_eq!(api.detail_count(), 2);

        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn success_is_sticky_against_late_failure() {
        let (api, tracker) = start();
        let mut events = tracker.subscribe();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        api.set_done(id.as_str(), quiz_detail());
        tick().await;
        assert_eq!(tracker.task(&id).await.unwrap().status, TaskStatus::Done);

        // A late failure push must not override the recorded success.
        tracker
            .apply_push(progress(id.as_str(), "failed", None, None))
            .await
            .unwrap();
        settle().await;
        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.error_message, None);

        let events = drain(&mut events);
        assert!(
            events
                .iter()
                .all(|e| !matches!(e, TrackerEvent::Failed { .. })),
            "late failure must not produce a failure notification"
        );
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn polling_continues_while_any_task_is_in_flight() {
        let (api, tracker) = start();

        let quiz = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        let podcast = tracker
            .generate(podcast_params())
            .file("f1")
            .submit()
            .await
            .unwrap();

        api.set_done(quiz.as_str(), quiz_detail());
        api.set_status(podcast.as_str(), "processing", Some(10), None);
        tick().await;
        assert_eq!(tracker.task(&quiz).await.unwrap().status, TaskStatus::Done);
        assert_eq!(
            tracker.task(&podcast).await.unwrap().status,
            TaskStatus::Processing
        );

        // One task is still in flight, so the schedule keeps running.
        let polls = api.list_count();
        tick().await;
        tick().await;
        assert!(api.list_count() > polls);

        // Dispatch gating: the finished task opens, the in-flight one is a
        // no-op.
        assert!(tracker.dispatch(&quiz).await.is_ok());
        assert!(matches!(
            tracker.dispatch(&podcast).await.unwrap_err(),
            DispatchError::NotReady(_)
        ));

        tracker.close();
    }

    // ── reconciliation details ────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn failed_task_surfaces_its_message_through_dispatch() {
        let (api, tracker) = start();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        api.set_status(id.as_str(), "failed", None, None);
        tick().await;

        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("worker crashed"));

        match tracker.dispatch(&id).await.unwrap_err() {
            DispatchError::Unavailable { message, .. } => {
                assert_eq!(message, "worker crashed");
            }
            other => panic!("expected Unavailable, got {other:?}"),
        }
        // No detail fetch for a failed task.
        assert_eq!(api.detail_count(), 0);
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_notification_is_emitted_exactly_once() {
        let (api, tracker) = start();
        let mut events = tracker.subscribe();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        api.set_done(id.as_str(), quiz_detail());

        // The terminal push is delivered twice, and a forced poll reports
        // the same state a third time.
        tracker
            .apply_push(progress(id.as_str(), "done", Some(100), None))
            .await
            .unwrap();
        settle().await;
        tracker
            .apply_push(progress(id.as_str(), "done", Some(100), None))
            .await
            .unwrap();
        settle().await;
        tracker.refresh().await.unwrap();
        settle().await;

        let finished = drain(&mut events)
            .into_iter()
            .filter(|e| matches!(e, TrackerEvent::Finished { .. }))
            .count();
        assert_eq!(finished, 1, "dedup on the transition, not the message");
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failure_keeps_last_known_good_state() {
        let (api, tracker) = start();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        api.set_status(id.as_str(), "processing", Some(40), Some("reading sources"));
        tick().await;
        assert_eq!(tracker.task(&id).await.unwrap().progress_percent, Some(40));

        // Two failing polls in a row: state is retained, ticks keep coming.
        api.fail_lists.store(2, Ordering::SeqCst);
        tick().await;
        tick().await;
        let task = tracker.task(&id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.progress_percent, Some(40));
        assert_eq!(task.progress_message.as_deref(), Some("reading sources"));

        // The next successful tick catches up.
        api.set_done(id.as_str(), quiz_detail());
        tick().await;
        assert_eq!(tracker.task(&id).await.unwrap().status, TaskStatus::Done);
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    #[tracing_test::traced_test]
    async fn unrecognized_task_kinds_are_skipped_not_fatal() {
        let (api, tracker) = start();

        api.insert_remote_task(MockApi::summary("t-odd", ArtifactKind::Quiz, "queued"));
        api.server
            .lock()
            .unwrap()
            .tasks
            .get_mut("t-odd")
            .unwrap()
            .set_type = "hologram".to_owned();
        api.insert_remote_task(MockApi::summary("t-ok", ArtifactKind::Summary, "processing"));

        tracker.refresh().await.unwrap();
        settle().await;

        let tasks = tracker.tasks().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, TaskId::new("t-ok"));
        assert!(logs_contain("skipping unrecognized task record"));
        tracker.close();
    }

    // ── lifecycle notices ─────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn peer_completion_inserts_and_attributes() {
        let (api, tracker) = start();
        let mut events = tracker.subscribe();

        let mut summary = MockApi::summary("t-peer", ArtifactKind::Quiz, "done");
        summary.result_ref = Some("result-t-peer".to_owned());
        api.insert_remote_task(summary);

        tracker
            .apply_push(PushMessage::Lifecycle(LifecycleNotice {
                kind: LifecycleKind::Done,
                task_id: "t-peer".to_owned(),
                set_type: Some("quiz".to_owned()),
                actor: Some("ada".to_owned()),
            }))
            .await
            .unwrap();
        settle().await;

        let task = tracker.task(&TaskId::new("t-peer")).await.unwrap();
        assert_eq!(task.status, TaskStatus::Done);

        let events = drain(&mut events);
        let activity: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TrackerEvent::Activity {
                    action,
                    actor,
                    kind,
                    ..
                } => Some((*action, actor.clone(), *kind)),
                _ => None,
            })
            .collect();
        assert_eq!(
            activity,
            vec![(
                ActivityKind::Finished,
                Some("ada".to_owned()),
                Some(ArtifactKind::Quiz)
            )]
        );
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn peer_deletion_removes_and_notifies_once() {
        let (_api, tracker) = start();
        let mut events = tracker.subscribe();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();

        let deleted = PushMessage::Lifecycle(LifecycleNotice {
            kind: LifecycleKind::Deleted,
            task_id: id.to_string(),
            set_type: Some("quiz".to_owned()),
            actor: Some("ada".to_owned()),
        });
        tracker.apply_push(deleted.clone()).await.unwrap();
        settle().await;
        assert!(tracker.task(&id).await.is_none());

        // Re-delivery of the same notice is inert.
        tracker.apply_push(deleted).await.unwrap();
        settle().await;

        let deletions = drain(&mut events)
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    TrackerEvent::Activity {
                        action: ActivityKind::Deleted,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(deletions, 1);
        tracker.close();
    }

    // ── deletion ──────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn delete_removes_locally_even_when_the_server_fails() {
        let (api, tracker) = start();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        api.fail_delete.store(true, Ordering::SeqCst);

        let result = tracker.delete(&id).await;
        assert!(matches!(result, Err(ClientError::Api(_))));
        // The registry entry is gone regardless; the error is surface-only.
        assert!(tracker.task(&id).await.is_none());
        assert_eq!(api.delete_calls.load(Ordering::SeqCst), 1);
        tracker.close();
    }

    // ── cleanup on unmount ────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn no_mutation_after_close() {
        let (api, tracker) = start();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        tracker.close();
        assert!(tracker.is_closed());

        // Late-arriving push: rejected, registry untouched.
        let err = tracker
            .apply_push(progress(id.as_str(), "done", Some(100), None))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::TrackerClosed));

        // Server state changes and time passes: no polls run after close.
        api.set_done(id.as_str(), quiz_detail());
        let polls = api.list_count();
        tokio::time::sleep(POLL * 5).await;
        assert_eq!(api.list_count(), polls);
        assert_eq!(tracker.task(&id).await.unwrap().status, TaskStatus::Queued);

        // The gate refuses new work too.
        let err = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::TrackerClosed));
        assert!(matches!(
            tracker.delete(&id).await.unwrap_err(),
            ClientError::TrackerClosed
        ));

        // close() is idempotent.
        tracker.close();
    }

    // ── dispatch details ──────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn dispatch_rejects_unknown_ids_and_mismatched_payloads() {
        let (api, tracker) = start();

        assert!(matches!(
            tracker.dispatch(&TaskId::new("ghost")).await.unwrap_err(),
            DispatchError::UnknownTask(_)
        ));

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        // The server finishes the task but serves a payload of the wrong
        // kind; the dispatcher surfaces "unsupported" instead of opening a
        // mismatched viewer.
        api.set_done(
            id.as_str(),
            TaskDetail::Flashcards {
                cards: vec![Flashcard {
                    front: "q".to_owned(),
                    back: "a".to_owned(),
                }],
            },
        );
        tick().await;
        assert!(matches!(
            tracker.dispatch(&id).await.unwrap_err(),
            DispatchError::Unsupported {
                kind: ArtifactKind::Quiz,
                ..
            }
        ));
        tracker.close();
    }

    #[tokio::test(start_paused = true)]
    async fn wait_terminal_returns_the_finished_task() {
        let (api, tracker) = start();

        let id = tracker
            .generate(quiz_params())
            .file("f1")
            .submit()
            .await
            .unwrap();
        api.set_done(id.as_str(), quiz_detail());

        let task = tracker
            .wait_terminal(&id, Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Done);

        // Waiting on an id that never finishes times out cleanly.
        let ghost = TaskId::new("ghost");
        let err = tracker
            .wait_terminal(&ghost, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::WaitTimeout(_)));
        tracker.close();
    }
}
