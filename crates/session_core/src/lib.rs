//! Core of the sleep tracker: the session state machine, the store seam it
//! drives, and the rating and history-formatting steps around it.

pub mod clock;
pub mod controller;
pub mod format;
pub mod quality;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{
    ControllerConfig, ControllerError, ControllerResult, Operation, SessionController,
    SessionEvent, SessionSnapshot,
};
pub use format::{HistoryFormatter, PlainHistoryFormatter};
pub use quality::{QualityRecorder, RatingError};
pub use store::SessionStore;

#[cfg(test)]
mod test_support;
