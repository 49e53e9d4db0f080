use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use shared::{
    domain::{Session, SessionId},
    error::{StoreError, StoreResult},
};
use tokio::sync::{Mutex, Notify};

use crate::store::SessionStore;

pub(crate) struct TestSessionStore {
    sessions: Mutex<Vec<Session>>,
    next_id: Mutex<i64>,
    fail_with: Mutex<Option<String>>,
    fail_reads_armed: Mutex<Option<String>>,
    fail_reads: Mutex<Option<String>>,
    hang_on_create: bool,
    create_entered: Arc<Notify>,
    mutations: AtomicUsize,
}

impl TestSessionStore {
    pub(crate) fn empty() -> Self {
        Self::with_sessions(Vec::new())
    }

    pub(crate) fn with_sessions(sessions: Vec<Session>) -> Self {
        let next_id = sessions.iter().map(|s| s.id.0).max().unwrap_or(0) + 1;
        Self {
            sessions: Mutex::new(sessions),
            next_id: Mutex::new(next_id),
            fail_with: Mutex::new(None),
            fail_reads_armed: Mutex::new(None),
            fail_reads: Mutex::new(None),
            hang_on_create: false,
            create_entered: Arc::new(Notify::new()),
            mutations: AtomicUsize::new(0),
        }
    }

    /// `create` never completes; `create_entered` fires when it is reached.
    pub(crate) fn hanging_on_create(mut self) -> Self {
        self.hang_on_create = true;
        self
    }

    pub(crate) fn create_entered(&self) -> Arc<Notify> {
        self.create_entered.clone()
    }

    pub(crate) async fn fail_with(&self, err: impl Into<String>) {
        *self.fail_with.lock().await = Some(err.into());
    }

    /// Reads start failing once the next write has succeeded.
    pub(crate) async fn fail_reads_after_next_write(&self, err: impl Into<String>) {
        *self.fail_reads_armed.lock().await = Some(err.into());
    }

    pub(crate) async fn recover(&self) {
        *self.fail_with.lock().await = None;
        *self.fail_reads_armed.lock().await = None;
        *self.fail_reads.lock().await = None;
    }

    pub(crate) async fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().await.clone()
    }

    pub(crate) fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    async fn check(&self) -> StoreResult<()> {
        match self.fail_with.lock().await.as_ref() {
            Some(err) => Err(StoreError::io(err.clone())),
            None => Ok(()),
        }
    }

    async fn check_read(&self) -> StoreResult<()> {
        self.check().await?;
        match self.fail_reads.lock().await.as_ref() {
            Some(err) => Err(StoreError::io(err.clone())),
            None => Ok(()),
        }
    }

    async fn record_write(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_reads_armed.lock().await.take() {
            *self.fail_reads.lock().await = Some(err);
        }
    }
}

pub(crate) fn session(id: i64, start: i64, end: i64, quality: i32) -> Session {
    Session {
        id: SessionId(id),
        start_time_millis: start,
        end_time_millis: end,
        quality,
    }
}

#[async_trait]
impl SessionStore for TestSessionStore {
    async fn create(&self, session: &Session) -> StoreResult<SessionId> {
        self.create_entered.notify_one();
        if self.hang_on_create {
            std::future::pending::<()>().await;
        }
        self.check().await?;

        let mut next_id = self.next_id.lock().await;
        let id = SessionId(*next_id);
        *next_id += 1;
        self.sessions.lock().await.push(Session {
            id,
            ..session.clone()
        });
        drop(next_id);
        self.record_write().await;
        Ok(id)
    }

    async fn most_recent(&self) -> StoreResult<Option<Session>> {
        self.check_read().await?;
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .max_by_key(|s| (s.start_time_millis, s.id))
            .cloned())
    }

    async fn update(&self, session: &Session) -> StoreResult<()> {
        self.check().await?;
        let mut sessions = self.sessions.lock().await;
        let stored = sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| StoreError::missing(session.id))?;
        *stored = session.clone();
        drop(sessions);
        self.record_write().await;
        Ok(())
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.check().await?;
        self.sessions.lock().await.clear();
        self.record_write().await;
        Ok(())
    }

    async fn all(&self) -> StoreResult<Vec<Session>> {
        self.check_read().await?;
        let mut sessions = self.sessions.lock().await.clone();
        sessions.sort_by_key(|s| std::cmp::Reverse((s.start_time_millis, s.id)));
        Ok(sessions)
    }

    async fn get(&self, session_id: SessionId) -> StoreResult<Option<Session>> {
        self.check_read().await?;
        Ok(self
            .sessions
            .lock()
            .await
            .iter()
            .find(|s| s.id == session_id)
            .cloned())
    }
}
