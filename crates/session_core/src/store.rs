//! Persistence seam consumed by the controller and the rating step.

use async_trait::async_trait;
use shared::{
    domain::{Session, SessionId},
    error::StoreResult,
};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts `session` and returns the id the store assigned to it. The
    /// incoming `id` is ignored.
    async fn create(&self, session: &Session) -> StoreResult<SessionId>;

    /// Session with the greatest start time; ties go to the greatest id.
    async fn most_recent(&self) -> StoreResult<Option<Session>>;

    /// Overwrites the record matching `session.id`.
    async fn update(&self, session: &Session) -> StoreResult<()>;

    async fn delete_all(&self) -> StoreResult<()>;

    /// Every session, newest first.
    async fn all(&self) -> StoreResult<Vec<Session>>;

    async fn get(&self, session_id: SessionId) -> StoreResult<Option<Session>>;
}
