//! Follow-up rating step for a just-closed session.

use std::sync::Arc;

use shared::{
    domain::{Session, SessionId, SleepQuality},
    error::StoreError,
};
use thiserror::Error;
use tracing::info;

use crate::store::SessionStore;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("quality rating {0} is outside 0..=5")]
    InvalidRating(i32),
    #[error("session {0} does not exist")]
    UnknownSession(SessionId),
    #[error("session {0} is still open")]
    SessionStillOpen(SessionId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct QualityRecorder {
    store: Arc<dyn SessionStore>,
}

impl QualityRecorder {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        session_id: SessionId,
        rating: i32,
    ) -> Result<Session, RatingError> {
        let quality = SleepQuality::from_rating(rating).ok_or(RatingError::InvalidRating(rating))?;
        let mut session = self
            .store
            .get(session_id)
            .await?
            .ok_or(RatingError::UnknownSession(session_id))?;
        if session.is_open() {
            return Err(RatingError::SessionStillOpen(session_id));
        }

        session.quality = quality.rating();
        self.store.update(&session).await?;
        info!(
            session_id = session_id.0,
            quality = quality.label(),
            "recorded sleep quality"
        );
        Ok(session)
    }
}

#[cfg(test)]
#[path = "tests/quality_tests.rs"]
mod tests;
