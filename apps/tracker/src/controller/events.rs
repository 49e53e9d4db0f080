//! UI/backend events and error modeling for the terminal tracker.

use session_core::SessionSnapshot;
use shared::domain::Session;

#[derive(Debug)]
pub enum UiEvent {
    /// One line typed by the user.
    Input(String),
    InputClosed,
    Info(String),
    StateChanged(SessionSnapshot),
    Rated(Session),
    Error(UiError),
    BackendStopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Storage,
    Busy,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Tracking,
    Rating,
    Input,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("queue is full")
            || message_lower.contains("not running")
            || message_lower.contains("cancelled")
        {
            UiErrorCategory::Busy
        } else if message_lower.contains("outside 0..=5")
            || message_lower.contains("does not exist")
            || message_lower.contains("still open")
            || message_lower.contains("unknown command")
            || message_lower.contains("invalid")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("sqlite")
            || message_lower.contains("database")
            || message_lower.contains("store")
            || message_lower.contains("io:")
            || message_lower.contains("constraint")
        {
            UiErrorCategory::Storage
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category,
            UiErrorCategory::Busy | UiErrorCategory::Storage
        ) && self.context != UiErrorContext::BackendStartup
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Storage => "Storage",
        UiErrorCategory::Busy => "Busy",
        UiErrorCategory::Validation => "Input",
        UiErrorCategory::Unknown => "Unexpected",
    }
}
