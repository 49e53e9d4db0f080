use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreErrorKind {
    Io,
    Constraint,
    NotFound,
}

/// Failure of any session store operation.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Io, message)
    }

    pub fn constraint(message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Constraint, message)
    }

    pub fn missing(session_id: SessionId) -> Self {
        Self::new(
            StoreErrorKind::NotFound,
            format!("no session with id {session_id}"),
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_error_names_the_id() {
        let err = StoreError::missing(SessionId(42));
        assert_eq!(err.kind, StoreErrorKind::NotFound);
        assert_eq!(err.to_string(), "NotFound: no session with id 42");
    }
}
