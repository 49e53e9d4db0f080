//! Backend commands queued from the control thread to the backend worker.

use shared::domain::SessionId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCommand {
    StartSession,
    StopSession,
    ClearHistory,
    AcknowledgeNavigation,
    AcknowledgeNotice,
    Refresh,
    RateSession { session_id: SessionId, rating: i32 },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSession => "start_session",
            Self::StopSession => "stop_session",
            Self::ClearHistory => "clear_history",
            Self::AcknowledgeNavigation => "acknowledge_navigation",
            Self::AcknowledgeNotice => "acknowledge_notice",
            Self::Refresh => "refresh",
            Self::RateSession { .. } => "rate_session",
        }
    }
}
