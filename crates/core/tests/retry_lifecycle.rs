//! Retry cycle integration tests.
//!
//! "Container died" is the single retryable failure class: it arms a
//! countdown budget, each tick resubmits the same job, and an exhausted
//! budget fails the job exactly once.

use std::sync::Arc;
use std::time::Duration;

use uplift_core::{
    testing::{fixtures, MockStatusConnector, MockUploadClient, ScriptedUpload},
    Config, JobState, JournalLog, RetryConfig, StatusConnector, UploadClient, UploadOrchestrator,
    WorkflowEvent,
};

struct TestHarness {
    client: Arc<MockUploadClient>,
    connector: Arc<MockStatusConnector>,
    orchestrator: Arc<UploadOrchestrator>,
    log: JournalLog,
}

impl TestHarness {
    async fn with_retry(retry: RetryConfig) -> Self {
        let (journal, recorder, log) = uplift_core::create_journal(256);
        tokio::spawn(recorder.run());

        let client = Arc::new(MockUploadClient::new());
        let connector = Arc::new(MockStatusConnector::new());
        let orchestrator = UploadOrchestrator::new(
            Config::default().endpoints,
            retry,
            Arc::clone(&client) as Arc<dyn UploadClient>,
            Arc::clone(&connector) as Arc<dyn StatusConnector>,
            journal,
            log.clone(),
            None,
        );
        orchestrator.start().await;

        Self {
            client,
            connector,
            orchestrator,
            log,
        }
    }

    async fn wait_for_state(&self, expected: JobState, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.orchestrator.snapshot().await.state == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    async fn wait_for_uploads(&self, count: usize, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.client.upload_count().await >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    async fn count_events(&self, pred: impl Fn(&WorkflowEvent) -> bool) -> usize {
        self.log
            .entries()
            .await
            .iter()
            .filter(|e| pred(&e.event))
            .count()
    }
}

#[tokio::test]
async fn test_container_death_resubmits_the_same_job() {
    let harness = TestHarness::with_retry(RetryConfig::default()).await;
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v1".to_string(),
            status_url: None,
        })
        .await;
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v1".to_string(),
            status_url: None,
        })
        .await;

    harness.orchestrator.upload(fixtures::payload("clip.mp4")).await;
    let connection = harness.connector.connection(0).await.unwrap();
    connection.push_text(fixtures::meta_frame(4));
    connection.push_text(fixtures::progress_frame(2));
    connection.push_text(fixtures::failed_frame("container died"));

    assert!(
        harness
            .wait_for_state(JobState::RetryPending, Duration::from_secs(1))
            .await
    );
    assert!(
        harness
            .count_events(|e| matches!(
                e,
                WorkflowEvent::RetryScheduled { job_id, budget: 10, .. } if job_id == "v1"
            ))
            .await
            == 1
    );

    // The first tick fires the resubmission with the original identifier.
    assert!(
        harness.wait_for_uploads(2, Duration::from_secs(3)).await,
        "Retry attempt should fire on the countdown tick"
    );
    let uploads = harness.client.uploads().await;
    assert_eq!(uploads[1].retry_of.as_deref(), Some("v1"));
    assert_eq!(uploads[1].file_name, "clip.mp4");

    // A fresh session was opened; progress restarted from zero.
    assert!(
        harness
            .wait_for_state(JobState::Streaming, Duration::from_secs(1))
            .await
    );
    assert_eq!(harness.connector.connection_count().await, 2);
    let snapshot = harness.orchestrator.snapshot().await;
    assert_eq!(snapshot.progress.completed(), 0);

    // Completing the second attempt cancels the cycle.
    let connection = harness.connector.connection(1).await.unwrap();
    connection.push_text(fixtures::meta_frame(2));
    connection.push_text(fixtures::progress_frame(2));
    assert!(
        harness
            .wait_for_state(JobState::Completed, Duration::from_secs(1))
            .await
    );

    // No further attempts fire after success.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(harness.client.upload_count().await, 2);
}

#[tokio::test]
async fn test_exhausted_budget_fails_exactly_once() {
    let harness = TestHarness::with_retry(RetryConfig {
        budget_ticks: 2,
        tick_secs: 1,
    })
    .await;
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v1".to_string(),
            status_url: None,
        })
        .await;
    // The resubmission attempt during the cycle keeps failing.
    harness
        .client
        .push_response(ScriptedUpload::Transport("connection refused".to_string()))
        .await;
    harness
        .client
        .push_response(ScriptedUpload::Transport("connection refused".to_string()))
        .await;

    harness.orchestrator.upload(fixtures::payload("clip.mp4")).await;
    let connection = harness.connector.connection(0).await.unwrap();
    connection.push_text(fixtures::failed_frame("container died"));

    assert!(
        harness
            .wait_for_state(JobState::Failed, Duration::from_secs(5))
            .await,
        "Exhausted budget should fail the job"
    );
    assert_eq!(
        harness
            .count_events(|e| matches!(e, WorkflowEvent::RetryExhausted { .. }))
            .await,
        1
    );

    // No resurrection after the terminal state.
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(harness.orchestrator.snapshot().await.state, JobState::Failed);
}

#[tokio::test]
async fn test_retryable_failure_mid_cycle_does_not_rearm_budget() {
    let harness = TestHarness::with_retry(RetryConfig {
        budget_ticks: 6,
        tick_secs: 1,
    })
    .await;
    for _ in 0..3 {
        harness
            .client
            .push_response(ScriptedUpload::Accept {
                job_id: "v1".to_string(),
                status_url: None,
            })
            .await;
    }

    harness.orchestrator.upload(fixtures::payload("clip.mp4")).await;
    harness
        .connector
        .connection(0)
        .await
        .unwrap()
        .push_text(fixtures::failed_frame("container died"));

    // First resubmission connects, then dies again mid-cycle.
    assert!(harness.wait_for_uploads(2, Duration::from_secs(3)).await);
    assert!(
        harness
            .wait_for_state(JobState::Streaming, Duration::from_secs(1))
            .await
    );
    harness
        .connector
        .connection(1)
        .await
        .unwrap()
        .push_text(fixtures::failed_frame("container dying"));

    // The running cycle keeps firing without re-arming the budget.
    assert!(harness.wait_for_uploads(3, Duration::from_secs(3)).await);
    assert_eq!(
        harness
            .count_events(|e| matches!(e, WorkflowEvent::RetryScheduled { .. }))
            .await,
        1,
        "A second retryable failure mid-cycle must not arm a new budget"
    );
}

#[tokio::test]
async fn test_frames_from_superseded_channel_do_not_affect_state() {
    let harness = TestHarness::with_retry(RetryConfig::default()).await;
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v1".to_string(),
            status_url: None,
        })
        .await;
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v1".to_string(),
            status_url: None,
        })
        .await;

    harness.orchestrator.upload(fixtures::payload("clip.mp4")).await;
    let first = harness.connector.connection(0).await.unwrap();
    first.push_text(fixtures::meta_frame(4));
    first.push_text(fixtures::failed_frame("container died"));

    // Wait for the resubmission to open its own channel.
    assert!(harness.wait_for_uploads(2, Duration::from_secs(3)).await);
    assert!(
        harness
            .wait_for_state(JobState::Streaming, Duration::from_secs(1))
            .await
    );

    // The old channel is dead: nothing pushed there reaches the job.
    first.push_text(fixtures::failed_frame("disk full"));
    first.push_text(fixtures::progress_frame(4));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = harness.orchestrator.snapshot().await;
    assert_eq!(snapshot.state, JobState::Streaming);
    assert_eq!(snapshot.progress.completed(), 0);
}

#[tokio::test]
async fn test_fresh_upload_cancels_pending_retry_cycle() {
    let harness = TestHarness::with_retry(RetryConfig {
        budget_ticks: 10,
        tick_secs: 1,
    })
    .await;
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v1".to_string(),
            status_url: None,
        })
        .await;

    harness.orchestrator.upload(fixtures::payload("a.mp4")).await;
    harness
        .connector
        .connection(0)
        .await
        .unwrap()
        .push_text(fixtures::failed_frame("container died"));
    assert!(
        harness
            .wait_for_state(JobState::RetryPending, Duration::from_secs(1))
            .await
    );

    // The user starts over with a different file before the cycle fires.
    harness
        .client
        .push_response(ScriptedUpload::Accept {
            job_id: "v2".to_string(),
            status_url: None,
        })
        .await;
    assert!(harness.orchestrator.upload(fixtures::payload("b.mp4")).await);

    let snapshot = harness.orchestrator.snapshot().await;
    assert_eq!(snapshot.job_id.as_deref(), Some("v2"));

    // No resubmission of the abandoned job ever fires.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let uploads = harness.client.uploads().await;
    assert_eq!(uploads.len(), 2);
    assert!(uploads.iter().all(|u| u.retry_of.is_none()));
}
