//! The upload workflow state machine.
//!
//! One orchestrator drives one job slot: it posts the upload, opens the
//! status channel, folds inbound messages into progress, arms the retry
//! cycle on retryable failures, and publishes a single user-visible status
//! line. All mutation funnels through here; collaborators only see events
//! and cloned snapshots.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::EndpointsConfig;
use crate::journal::{JournalHandle, JournalLog, WorkflowEvent};
use crate::ready::ReadyListView;
use crate::retry::{RetryConfig, RetryEvent, RetryScheduler};
use crate::status::{
    classify_failure_reason, FailureClass, SessionEvent, SessionEventKind, StatusConnector,
    StatusMessage, StatusSession,
};

use super::traits::UploadClient;
use super::types::{JobSlot, JobState, StatusLine, UploadError, UploadPayload};

pub struct UploadOrchestrator {
    endpoints: EndpointsConfig,
    client: Arc<dyn UploadClient>,
    connector: Arc<dyn StatusConnector>,
    retry_config: RetryConfig,
    retry: RetryScheduler,
    journal: JournalHandle,
    log: JournalLog,
    slot: RwLock<JobSlot>,
    status_tx: watch::Sender<StatusLine>,
    /// Token of the current status session. Events tagged with any other
    /// value are stale and dropped; this is the sole cancellation mechanism
    /// for superseded sessions.
    session_seq: AtomicU64,
    session: Mutex<Option<StatusSession>>,
    session_tx: mpsc::Sender<SessionEvent>,
    /// Receivers handed to the event loop on `start`.
    loop_rx: Mutex<Option<(mpsc::Receiver<SessionEvent>, mpsc::Receiver<RetryEvent>)>>,
    /// Payload of the last attempt, re-sent on retry.
    last_payload: RwLock<Option<UploadPayload>>,
    last_status_url: RwLock<Option<String>>,
    shutdown_tx: broadcast::Sender<()>,
    ready: Option<Arc<ReadyListView>>,
}

impl UploadOrchestrator {
    pub fn new(
        endpoints: EndpointsConfig,
        retry_config: RetryConfig,
        client: Arc<dyn UploadClient>,
        connector: Arc<dyn StatusConnector>,
        journal: JournalHandle,
        log: JournalLog,
        ready: Option<Arc<ReadyListView>>,
    ) -> Arc<Self> {
        let (session_tx, session_rx) = mpsc::channel(64);
        let (retry_tx, retry_rx) = mpsc::channel(16);
        let (status_tx, _) = watch::channel(StatusLine::Idle);
        let (shutdown_tx, _) = broadcast::channel(1);

        Arc::new(Self {
            endpoints,
            client,
            connector,
            retry: RetryScheduler::new(retry_config.clone(), retry_tx),
            retry_config,
            journal,
            log,
            slot: RwLock::new(JobSlot::default()),
            status_tx,
            session_seq: AtomicU64::new(0),
            session: Mutex::new(None),
            session_tx,
            loop_rx: Mutex::new(Some((session_rx, retry_rx))),
            last_payload: RwLock::new(None),
            last_status_url: RwLock::new(None),
            shutdown_tx,
            ready,
        })
    }

    /// Start the event loop. Call once; subsequent calls are no-ops.
    pub async fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let Some((mut session_rx, mut retry_rx)) = self.loop_rx.lock().await.take() else {
            warn!("orchestrator event loop already started");
            return None;
        };

        let this = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        Some(tokio::spawn(async move {
            info!("upload orchestrator started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        debug!("orchestrator shutting down");
                        break;
                    }
                    Some(event) = session_rx.recv() => {
                        this.handle_session_event(event).await;
                    }
                    Some(event) = retry_rx.recv() => {
                        this.handle_retry_event(event).await;
                    }
                    else => break,
                }
            }
        }))
    }

    /// Stop the event loop and tear down the current session.
    pub async fn stop(&self) {
        self.retry.cancel();
        if let Some(session) = self.session.lock().await.take() {
            session.close();
        }
        let _ = self.shutdown_tx.send(());
    }

    /// Start a brand-new upload. Refused while an attempt is in flight.
    ///
    /// Cancels any pending retry cycle, clears the journal log, and resets
    /// the slot before the first attempt.
    pub async fn upload(&self, payload: UploadPayload) -> bool {
        // Check-and-claim under a single lock acquisition: two concurrent
        // callers must never both pass the gate.
        {
            let mut slot = self.slot.write().await;
            if slot.in_flight {
                warn!("upload refused, an attempt is already in flight");
                return false;
            }
            *slot = JobSlot::default();
            slot.in_flight = true;
        }

        self.retry.cancel();
        self.log.clear().await;
        *self.last_status_url.write().await = None;
        let _ = self.status_tx.send(StatusLine::Uploading);

        self.begin_attempt(payload, None, false).await;
        true
    }

    /// Observable snapshot of the job slot.
    pub async fn snapshot(&self) -> JobSlot {
        self.slot.read().await.clone()
    }

    /// Subscribe to the user-visible status line.
    pub fn status_line(&self) -> watch::Receiver<StatusLine> {
        self.status_tx.subscribe()
    }

    /// Run one upload attempt: POST, then subscribe to the status channel.
    /// The caller has already claimed the in-flight flag.
    async fn begin_attempt(&self, payload: UploadPayload, retry_of: Option<String>, retry: bool) {
        {
            let mut slot = self.slot.write().await;
            slot.progress.reset();
        }
        self.set_state(JobState::Uploading, None).await;
        let _ = self.status_tx.send(StatusLine::Uploading);

        self.journal
            .emit(WorkflowEvent::UploadStarted {
                job_id: retry_of.clone(),
                file_name: payload.file_name.clone(),
                retry,
            })
            .await;
        *self.last_payload.write().await = Some(payload.clone());

        match self.client.upload(&payload, retry_of.as_deref()).await {
            Ok(accepted) => {
                info!(job_id = accepted.job_id, "upload accepted");
                self.journal
                    .emit(WorkflowEvent::UploadAccepted {
                        job_id: accepted.job_id.clone(),
                        status_url: accepted.status_url.clone(),
                    })
                    .await;

                {
                    let mut slot = self.slot.write().await;
                    slot.job_id = Some(accepted.job_id.clone());
                }
                *self.last_status_url.write().await = accepted.status_url.clone();
                self.set_state(JobState::AwaitingSubscription, None).await;

                self.subscribe(&accepted.job_id, accepted.status_url.as_deref())
                    .await;
            }
            Err(UploadError::MissingJobId) => {
                // A 202 without an identifier leaves nothing to track or
                // retry against.
                self.fail(UploadError::MissingJobId.to_string()).await;
            }
            Err(e) => {
                error!("upload attempt failed: {}", e);
                if retry && self.retry.is_active() {
                    // The cycle keeps ticking; the next tick fires again.
                    {
                        let mut slot = self.slot.write().await;
                        slot.in_flight = false;
                    }
                    self.set_state(JobState::RetryPending, Some(e.to_string()))
                        .await;
                } else {
                    self.fail(e.to_string()).await;
                }
            }
        }
    }

    /// Probe readiness, then open a fresh status session superseding any
    /// previous one.
    async fn subscribe(&self, job_id: &str, status_url: Option<&str>) {
        match self.client.fetch_upload_info(job_id, status_url).await {
            Ok(info) => {
                self.journal
                    .emit(WorkflowEvent::ProbeCompleted {
                        job_id: job_id.to_string(),
                        total_segments: info.total_segments,
                    })
                    .await;
                if let Some(total) = info.total_segments {
                    let mut slot = self.slot.write().await;
                    slot.progress.set_total(total);
                }
            }
            Err(e) => {
                // Best-effort: the meta message carries the total anyway.
                self.journal
                    .emit(WorkflowEvent::ProbeFailed {
                        job_id: job_id.to_string(),
                        reason: e.to_string(),
                    })
                    .await;
            }
        }

        let url = match status_url {
            Some(url) => url.to_string(),
            None => self.endpoints.derive_status_url(job_id),
        };
        let token = self.session_seq.fetch_add(1, Ordering::SeqCst) + 1;

        // Supersede: events still queued from the old session fail the
        // token check.
        if let Some(previous) = self.session.lock().await.take() {
            debug!(token = previous.token(), "superseding status session");
            previous.close();
        }

        match StatusSession::open(
            self.connector.as_ref(),
            &url,
            job_id,
            token,
            self.session_tx.clone(),
        )
        .await
        {
            Ok(session) => {
                *self.session.lock().await = Some(session);
                self.journal
                    .emit(WorkflowEvent::ChannelConnected {
                        token,
                        url: url.clone(),
                    })
                    .await;
                self.set_state(JobState::Streaming, None).await;
                self.publish_progress().await;
            }
            Err(e) => {
                error!(url, "status channel connect failed: {}", e);
                self.handle_disconnect(e.to_string()).await;
            }
        }
    }

    async fn handle_session_event(&self, event: SessionEvent) {
        let current = self.session_seq.load(Ordering::SeqCst);
        if event.token != current {
            debug!(token = event.token, current, "dropping stale session event");
            self.journal
                .emit(WorkflowEvent::StaleEventDropped {
                    token: event.token,
                    current,
                })
                .await;
            return;
        }

        match event.kind {
            SessionEventKind::Message { raw, message } => {
                self.journal
                    .emit(WorkflowEvent::ChannelMessage {
                        token: event.token,
                        raw,
                    })
                    .await;
                self.handle_status_message(message).await;
            }
            SessionEventKind::Closed => {
                self.journal
                    .emit(WorkflowEvent::ChannelClosed { token: event.token })
                    .await;
                self.handle_disconnect("status channel closed".to_string())
                    .await;
            }
            SessionEventKind::Error(reason) => {
                self.journal
                    .emit(WorkflowEvent::ChannelError {
                        token: event.token,
                        reason: reason.clone(),
                    })
                    .await;
                self.handle_disconnect(reason).await;
            }
        }
    }

    async fn handle_status_message(&self, message: StatusMessage) {
        if self.slot.read().await.state.is_terminal() {
            // The job already settled; nothing a late frame says can
            // reopen it.
            debug!("status message after settlement, ignoring");
            return;
        }
        match message {
            StatusMessage::Meta { total_segments } => {
                {
                    let mut slot = self.slot.write().await;
                    slot.progress.set_total(total_segments);
                }
                self.publish_progress().await;
                self.maybe_complete().await;
            }
            StatusMessage::Progress { completed_segments } => {
                {
                    let mut slot = self.slot.write().await;
                    slot.progress.record_snapshot(completed_segments);
                }
                self.publish_progress().await;
                self.maybe_complete().await;
            }
            StatusMessage::TaskDone { task_id } => {
                debug!(task_id, "task completed");
                {
                    let mut slot = self.slot.write().await;
                    slot.progress.record_task_done();
                }
                self.publish_progress().await;
                self.maybe_complete().await;
            }
            StatusMessage::Failed { reason } => match classify_failure_reason(&reason) {
                FailureClass::Retryable => self.enter_retry(reason).await,
                FailureClass::Terminal => self.fail(reason).await,
            },
            StatusMessage::Unrecognized => {
                debug!("unrecognized status message, ignoring");
            }
        }
    }

    /// Channel closure or error. Benign after the attempt already settled,
    /// terminal mid-stream.
    async fn handle_disconnect(&self, reason: String) {
        let state = self.slot.read().await.state;
        match state {
            JobState::Completed | JobState::Failed | JobState::RetryPending => {
                debug!(state = state.as_str(), "channel ended after settlement");
            }
            _ => self.fail(reason).await,
        }
    }

    async fn handle_retry_event(&self, event: RetryEvent) {
        match event {
            RetryEvent::Tick { remaining } => {
                let Some(payload) = self.last_payload.read().await.clone() else {
                    return;
                };
                let job_id = {
                    let mut slot = self.slot.write().await;
                    if slot.state != JobState::RetryPending || slot.in_flight {
                        // A resubmitted attempt is running; the cycle keeps
                        // ticking silently in case it fails again.
                        debug!(remaining, "retry tick while not pending");
                        return;
                    }
                    let Some(job_id) = slot.job_id.clone() else {
                        return;
                    };
                    slot.in_flight = true;
                    job_id
                };

                self.journal
                    .emit(WorkflowEvent::RetryCountdown {
                        remaining,
                        display: format!("retrying in {remaining}s"),
                    })
                    .await;
                let _ = self.status_tx.send(StatusLine::Retrying { remaining });

                self.journal
                    .emit(WorkflowEvent::RetryAttempt {
                        job_id: job_id.clone(),
                    })
                    .await;
                self.begin_attempt(payload, Some(job_id), true).await;
            }
            RetryEvent::Exhausted => {
                let (terminal, job_id) = {
                    let slot = self.slot.read().await;
                    (slot.state.is_terminal(), slot.job_id.clone())
                };
                if terminal {
                    return;
                }
                self.journal
                    .emit(WorkflowEvent::RetryExhausted { job_id })
                    .await;
                self.fail("retry budget exhausted".to_string()).await;
            }
        }
    }

    /// Enter the retry-pending state and arm the countdown if no cycle is
    /// already running.
    async fn enter_retry(&self, reason: String) {
        {
            let mut slot = self.slot.write().await;
            slot.in_flight = false;
        }
        self.set_state(JobState::RetryPending, Some(reason.clone()))
            .await;

        if self.retry.schedule(&reason) {
            let job_id = self.slot.read().await.job_id.clone().unwrap_or_default();
            self.journal
                .emit(WorkflowEvent::RetryScheduled {
                    job_id,
                    reason,
                    budget: self.retry_config.budget_ticks,
                })
                .await;
        }
    }

    async fn maybe_complete(&self) {
        let done = {
            let slot = self.slot.read().await;
            slot.state == JobState::Streaming && slot.progress.is_complete()
        };
        if done {
            self.complete().await;
        }
    }

    /// Tear down the current status session, if any. Terminal states hold
    /// no live channel.
    async fn close_session(&self) {
        if let Some(session) = self.session.lock().await.take() {
            debug!(token = session.token(), "closing status session");
            session.close();
        }
    }

    async fn complete(&self) {
        self.retry.cancel();
        self.close_session().await;
        let job_id = {
            let mut slot = self.slot.write().await;
            slot.in_flight = false;
            slot.job_id.clone().unwrap_or_default()
        };
        self.set_state(JobState::Completed, None).await;

        info!(job_id, "job completed");
        self.journal
            .emit(WorkflowEvent::JobCompleted {
                job_id: job_id.clone(),
            })
            .await;
        let _ = self.status_tx.send(StatusLine::Completed);

        if let Some(ready) = &self.ready {
            ready.refresh(Some(&job_id)).await;
        }
    }

    async fn fail(&self, reason: String) {
        self.retry.cancel();
        self.close_session().await;
        {
            let mut slot = self.slot.write().await;
            slot.in_flight = false;
        }
        self.set_state(JobState::Failed, Some(reason.clone())).await;
        let _ = self.status_tx.send(StatusLine::Failed { reason });
    }

    async fn set_state(&self, to: JobState, reason: Option<String>) {
        let (from, job_id) = {
            let mut slot = self.slot.write().await;
            let from = slot.state;
            if from == to {
                return;
            }
            slot.state = to;
            (from, slot.job_id.clone())
        };
        debug!(from = from.as_str(), to = to.as_str(), "job state changed");
        self.journal
            .emit(WorkflowEvent::JobStateChanged {
                job_id,
                from_state: from.as_str().to_string(),
                to_state: to.as_str().to_string(),
                reason,
            })
            .await;
    }

    async fn publish_progress(&self) {
        let (completed, total, display, streaming) = {
            let slot = self.slot.read().await;
            (
                slot.progress.completed(),
                slot.progress.total(),
                slot.progress.display(),
                slot.state == JobState::Streaming,
            )
        };
        self.journal
            .emit(WorkflowEvent::ProcessingProgress {
                completed,
                total,
                display: display.clone(),
            })
            .await;
        if streaming {
            let _ = self.status_tx.send(StatusLine::Processing { display });
        }
    }
}
