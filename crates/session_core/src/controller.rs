//! Sleep session state machine.
//!
//! A [`SessionController`] spawns one worker task that owns the tracker state.
//! Callers enqueue operations over a bounded channel; the worker applies them
//! strictly in arrival order. State changes only once an operation's write has
//! succeeded; the follow-up reload of the store may fail without discarding
//! that write. Each applied operation publishes a [`SessionSnapshot`].
//! Dropping or shutting down the controller cancels the worker's token, which
//! abandons any store call still in flight.

use std::{future::Future, sync::Arc};

use serde::Serialize;
use shared::{
    domain::Session,
    error::{StoreError, StoreResult},
};
use thiserror::Error;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    clock::{Clock, SystemClock},
    format::{HistoryFormatter, PlainHistoryFormatter},
    store::SessionStore,
};

const DEFAULT_COMMAND_CAPACITY: usize = 64;
const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub command_capacity: usize,
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("session store failure: {0}")]
    Store(#[from] StoreError),
    #[error("operation cancelled by controller teardown")]
    Cancelled,
    #[error("controller command queue is full; retry")]
    QueueFull,
    #[error("controller worker is not running")]
    Closed,
}

pub type ControllerResult<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Refresh,
    Start,
    Stop,
    Clear,
    AcknowledgeNavigation,
    AcknowledgeNotice,
    Snapshot,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Refresh => "refresh",
            Self::Start => "start_session",
            Self::Stop => "stop_session",
            Self::Clear => "clear_history",
            Self::AcknowledgeNavigation => "acknowledge_navigation",
            Self::AcknowledgeNotice => "acknowledge_notice",
            Self::Snapshot => "snapshot",
        }
    }
}

/// Everything a presentation layer needs to render the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub current: Option<Session>,
    pub has_history: bool,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub clear_enabled: bool,
    pub history_text: String,
    /// Just-closed session waiting for the rating step. Stays set until
    /// [`SessionController::acknowledge_navigation`] is called.
    pub pending_navigation: Option<Session>,
    /// Set after a clear. Stays set until
    /// [`SessionController::acknowledge_notice`] is called.
    pub pending_notice: bool,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionSnapshot),
    OperationFailed {
        operation: Operation,
        message: String,
    },
}

#[derive(Debug, Default)]
struct ControllerState {
    current: Option<Session>,
    history: Vec<Session>,
    /// Rendered `history`; rebuilt only when `history` changes.
    history_text: String,
    pending_navigation: Option<Session>,
    pending_notice: bool,
}

impl ControllerState {
    fn has_history(&self) -> bool {
        self.history.iter().any(|session| !session.is_open())
    }

    fn snapshot(&self) -> SessionSnapshot {
        let has_history = self.has_history();
        SessionSnapshot {
            current: self.current.clone(),
            has_history,
            start_enabled: self.current.is_none(),
            stop_enabled: self.current.is_some(),
            clear_enabled: has_history,
            history_text: self.history_text.clone(),
            pending_navigation: self.pending_navigation.clone(),
            pending_notice: self.pending_notice,
        }
    }
}

/// Only an open most-recent session is carried forward as `current`.
fn reconcile(latest: Option<Session>) -> Option<Session> {
    latest.filter(Session::is_open)
}

struct ControllerRequest {
    operation: Operation,
    reply: oneshot::Sender<ControllerResult<SessionSnapshot>>,
}

pub struct SessionController {
    commands: mpsc::Sender<ControllerRequest>,
    events: broadcast::Sender<SessionEvent>,
    cancel_token: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl SessionController {
    /// Spawns the worker on the current tokio runtime and starts reconciling
    /// against `store`.
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self::new_with_dependencies(
            store,
            Arc::new(PlainHistoryFormatter::local()),
            Arc::new(SystemClock),
            ControllerConfig::default(),
        )
    }

    pub fn new_with_dependencies(
        store: Arc<dyn SessionStore>,
        formatter: Arc<dyn HistoryFormatter>,
        clock: Arc<dyn Clock>,
        config: ControllerConfig,
    ) -> Self {
        let (commands, requests) = mpsc::channel(config.command_capacity.max(1));
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let cancel = CancellationToken::new();

        let worker = ControllerWorker {
            store,
            formatter,
            clock,
            state: ControllerState::default(),
            events: events.clone(),
            cancel: cancel.clone(),
        };
        let worker = tokio::spawn(worker.run(requests));

        Self {
            commands,
            events,
            cancel_token: cancel,
            worker: Some(worker),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn start_session(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::Start).await
    }

    /// No-op when no session is open.
    pub async fn stop_session(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::Stop).await
    }

    pub async fn clear_history(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::Clear).await
    }

    pub async fn acknowledge_navigation(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::AcknowledgeNavigation).await
    }

    pub async fn acknowledge_notice(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::AcknowledgeNotice).await
    }

    /// Re-runs reconciliation, picking up changes made through other handles
    /// to the same store.
    pub async fn refresh(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::Refresh).await
    }

    pub async fn snapshot(&self) -> ControllerResult<SessionSnapshot> {
        self.request(Operation::Snapshot).await
    }

    pub fn is_running(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    /// Abandons any in-flight store call and stops the worker without waiting
    /// for it. Later operations fail with [`ControllerError::Closed`].
    pub fn cancel(&self) {
        if !self.cancel_token.is_cancelled() {
            self.cancel_token.cancel();
        }
    }

    /// Cancels in-flight store calls and waits for the worker to exit.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "session controller worker ended abnormally");
            }
        }
    }

    async fn request(&self, operation: Operation) -> ControllerResult<SessionSnapshot> {
        let (reply, response) = oneshot::channel();
        match self
            .commands
            .try_send(ControllerRequest { operation, reply })
        {
            Ok(()) => debug!(command = operation.as_str(), "queued controller command"),
            Err(TrySendError::Full(_)) => return Err(ControllerError::QueueFull),
            Err(TrySendError::Closed(_)) => return Err(ControllerError::Closed),
        }

        response.await.map_err(|_| ControllerError::Closed)?
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.cancel();
    }
}

struct ControllerWorker {
    store: Arc<dyn SessionStore>,
    formatter: Arc<dyn HistoryFormatter>,
    clock: Arc<dyn Clock>,
    state: ControllerState,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl ControllerWorker {
    async fn run(mut self, mut requests: mpsc::Receiver<ControllerRequest>) {
        if let Err(err) = self.refresh().await {
            self.report_failure(Operation::Refresh, &err);
        }

        loop {
            let request = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };

            let operation = request.operation;
            let result = self.apply(operation).await;
            if let Err(err) = &result {
                self.report_failure(operation, err);
            }
            let _ = request.reply.send(result);
        }

        debug!("session controller worker stopped");
    }

    async fn apply(&mut self, operation: Operation) -> ControllerResult<SessionSnapshot> {
        match operation {
            Operation::Refresh => self.refresh().await?,
            Operation::Start => self.start_session().await?,
            Operation::Stop => self.stop_session().await?,
            Operation::Clear => self.clear_history().await?,
            Operation::AcknowledgeNavigation => {
                if self.state.pending_navigation.take().is_some() {
                    self.publish();
                }
            }
            Operation::AcknowledgeNotice => {
                if std::mem::take(&mut self.state.pending_notice) {
                    self.publish();
                }
            }
            Operation::Snapshot => {}
        }
        Ok(self.snapshot())
    }

    async fn refresh(&mut self) -> ControllerResult<()> {
        let (current, history) = self.load().await?;
        self.state.current = current;
        self.set_history(history);
        self.publish();
        Ok(())
    }

    async fn start_session(&mut self) -> ControllerResult<()> {
        if let Some(open) = &self.state.current {
            warn!(
                session_id = %open.id,
                "starting a new session while another is still open"
            );
        }

        let draft = Session::open_at(self.clock.now_millis());
        let session_id = self.guarded(self.store.create(&draft)).await?;
        let created = Session {
            id: session_id,
            ..draft.clone()
        };

        self.state.current = Some(created.clone());
        self.remember(created);
        info!(
            session_id = %session_id,
            start_time_millis = draft.start_time_millis,
            "sleep session started"
        );
        self.reload_after_write().await?;
        self.publish();
        Ok(())
    }

    async fn stop_session(&mut self) -> ControllerResult<()> {
        let Some(mut session) = self.state.current.clone() else {
            debug!("stop ignored; no open session");
            return Ok(());
        };

        session.close_at(self.clock.now_millis());
        self.guarded(self.store.update(&session)).await?;

        self.state.current = None;
        self.state.pending_navigation = Some(session.clone());
        info!(
            session_id = %session.id,
            duration_millis = session.duration_millis(),
            "sleep session stopped"
        );
        self.remember(session);
        self.reload_after_write().await?;
        self.publish();
        Ok(())
    }

    async fn clear_history(&mut self) -> ControllerResult<()> {
        self.guarded(self.store.delete_all()).await?;

        self.state.current = None;
        self.set_history(Vec::new());
        self.state.pending_notice = true;
        info!("sleep history cleared");
        self.publish();
        Ok(())
    }

    /// Re-reads the store after a successful write. The write already
    /// happened, so a failed read is reported without undoing its effect.
    async fn reload_after_write(&mut self) -> ControllerResult<()> {
        match self.load().await {
            Ok((current, history)) => {
                self.state.current = current;
                self.set_history(history);
                Ok(())
            }
            Err(ControllerError::Cancelled) => Err(ControllerError::Cancelled),
            Err(err) => {
                self.report_failure(Operation::Refresh, &err);
                Ok(())
            }
        }
    }

    fn set_history(&mut self, history: Vec<Session>) {
        self.state.history_text = self.formatter.format_history(&history);
        self.state.history = history;
    }

    /// Inserts or replaces `session` in the cached history, newest first.
    fn remember(&mut self, session: Session) {
        let mut history = std::mem::take(&mut self.state.history);
        history.retain(|known| known.id != session.id);
        history.push(session);
        history.sort_by_key(|s| std::cmp::Reverse((s.start_time_millis, s.id)));
        self.set_history(history);
    }

    async fn load(&self) -> ControllerResult<(Option<Session>, Vec<Session>)> {
        let latest = self.guarded(self.store.most_recent()).await?;
        let history = self.guarded(self.store.all()).await?;
        Ok((reconcile(latest), history))
    }

    async fn guarded<T>(
        &self,
        call: impl Future<Output = StoreResult<T>>,
    ) -> ControllerResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ControllerError::Cancelled),
            result = call => result.map_err(ControllerError::from),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    fn publish(&self) {
        let _ = self.events.send(SessionEvent::StateChanged(self.snapshot()));
    }

    fn report_failure(&self, operation: Operation, err: &ControllerError) {
        if matches!(err, ControllerError::Cancelled) {
            debug!(operation = operation.as_str(), "operation abandoned at teardown");
            return;
        }

        warn!(
            operation = operation.as_str(),
            error = %err,
            "session controller operation failed"
        );
        let _ = self.events.send(SessionEvent::OperationFailed {
            operation,
            message: err.to_string(),
        });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
