//! Terminal presentation: turns backend events into printed lines and typed
//! commands into backend commands.

use std::io::{self, Write};

use crossbeam_channel::Sender;
use session_core::{format::format_duration, PlainHistoryFormatter, SessionSnapshot};
use shared::domain::{Session, SessionId, SleepQuality};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::{
    events::{err_label, UiError, UiErrorCategory, UiErrorContext, UiEvent},
    input::{parse_action, InputError, UserAction, HELP_TEXT},
    orchestration::dispatch_backend_command,
};

pub struct TrackerApp<W: Write> {
    out: W,
    cmd_tx: Sender<BackendCommand>,
    formatter: PlainHistoryFormatter,
    status: String,
    snapshot: Option<SessionSnapshot>,
    awaiting_rating: Option<SessionId>,
    last_prompted: Option<SessionId>,
    notice_shown: bool,
    backend_stopped: bool,
    quit_requested: bool,
}

impl<W: Write> TrackerApp<W> {
    pub fn new(out: W, cmd_tx: Sender<BackendCommand>) -> Self {
        Self {
            out,
            cmd_tx,
            formatter: PlainHistoryFormatter::local(),
            status: String::new(),
            snapshot: None,
            awaiting_rating: None,
            last_prompted: None,
            notice_shown: false,
            backend_stopped: false,
            quit_requested: false,
        }
    }

    /// Timestamps printed by the app use the same zone as the history text.
    pub fn with_formatter(mut self, formatter: PlainHistoryFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn should_exit(&self) -> bool {
        self.quit_requested || self.backend_stopped
    }

    pub fn awaiting_rating(&self) -> Option<SessionId> {
        self.awaiting_rating
    }

    pub fn handle(&mut self, event: UiEvent) -> io::Result<()> {
        match event {
            UiEvent::Input(line) => self.handle_input(&line),
            UiEvent::InputClosed => {
                self.quit_requested = true;
                Ok(())
            }
            UiEvent::Info(message) => writeln!(self.out, "{message}"),
            UiEvent::StateChanged(snapshot) => self.apply_snapshot(snapshot),
            UiEvent::Rated(session) => self.show_rating(&session),
            UiEvent::Error(err) => self.show_error(&err),
            UiEvent::BackendStopped => {
                self.backend_stopped = true;
                writeln!(self.out, "Backend stopped.")
            }
        }
    }

    fn handle_input(&mut self, line: &str) -> io::Result<()> {
        let action = match parse_action(line) {
            Ok(action) => action,
            Err(InputError::Empty) => return Ok(()),
            Err(err) => {
                return self.show_error(&UiError::from_message(
                    UiErrorContext::Input,
                    err.to_string(),
                ))
            }
        };

        match action {
            UserAction::Start => self.dispatch_if(
                |s| s.start_enabled,
                BackendCommand::StartSession,
                "A session is already running.",
            ),
            UserAction::Stop => self.dispatch_if(
                |s| s.stop_enabled,
                BackendCommand::StopSession,
                "No session in progress.",
            ),
            UserAction::Clear => self.dispatch_if(
                |s| s.clear_enabled,
                BackendCommand::ClearHistory,
                "Nothing to clear.",
            ),
            UserAction::Status => self.show_status(),
            UserAction::History => self.show_history(),
            UserAction::Help => writeln!(self.out, "{HELP_TEXT}"),
            UserAction::Quit => {
                self.quit_requested = true;
                Ok(())
            }
            UserAction::Rate(rating) => match self.awaiting_rating {
                Some(session_id) => {
                    self.dispatch(BackendCommand::RateSession { session_id, rating })
                }
                None => writeln!(self.out, "No session is waiting for a rating."),
            },
            UserAction::Skip => match self.awaiting_rating.take() {
                Some(session_id) => writeln!(self.out, "Session {session_id} left unrated."),
                None => writeln!(self.out, "No session is waiting for a rating."),
            },
        }
    }

    fn dispatch_if(
        &mut self,
        enabled: impl Fn(&SessionSnapshot) -> bool,
        cmd: BackendCommand,
        disabled_message: &str,
    ) -> io::Result<()> {
        match self.snapshot.as_ref().map(enabled) {
            Some(true) => self.dispatch(cmd),
            Some(false) => writeln!(self.out, "{disabled_message}"),
            None => writeln!(self.out, "Still loading your sleep data; try again shortly."),
        }
    }

    fn dispatch(&mut self, cmd: BackendCommand) -> io::Result<()> {
        if dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status) {
            return Ok(());
        }
        let status = std::mem::take(&mut self.status);
        writeln!(self.out, "{status}")
    }

    fn apply_snapshot(&mut self, snapshot: SessionSnapshot) -> io::Result<()> {
        let previous = self
            .snapshot
            .as_ref()
            .and_then(|s| s.current.as_ref())
            .map(|s| s.id);

        if let Some(current) = snapshot.current.as_ref() {
            if previous != Some(current.id) {
                match current.started_at() {
                    Some(started) => writeln!(
                        self.out,
                        "Tracking session {} since {}.",
                        current.id,
                        self.formatter.format_timestamp(started)
                    )?,
                    None => writeln!(self.out, "Tracking session {}.", current.id)?,
                }
            }
        }

        if let Some(ended) = snapshot.pending_navigation.clone() {
            if self.last_prompted != Some(ended.id) {
                self.prompt_rating(&ended)?;
                if dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::AcknowledgeNavigation,
                    &mut self.status,
                ) {
                    self.last_prompted = Some(ended.id);
                }
            }
        }

        if snapshot.pending_notice {
            if !self.notice_shown {
                writeln!(self.out, "History cleared.")?;
                self.notice_shown = dispatch_backend_command(
                    &self.cmd_tx,
                    BackendCommand::AcknowledgeNotice,
                    &mut self.status,
                );
            }
        } else {
            self.notice_shown = false;
        }

        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn prompt_rating(&mut self, ended: &Session) -> io::Result<()> {
        self.awaiting_rating = Some(ended.id);
        writeln!(
            self.out,
            "Session {} ended after {}. How did you sleep? Rate 0-5 or type 'skip':",
            ended.id,
            format_duration(ended.duration_millis())
        )?;
        for rating in 0..=5 {
            if let Some(quality) = SleepQuality::from_rating(rating) {
                writeln!(self.out, "  {rating}  {}", quality.label())?;
            }
        }
        Ok(())
    }

    fn show_rating(&mut self, session: &Session) -> io::Result<()> {
        if self.awaiting_rating == Some(session.id) {
            self.awaiting_rating = None;
        }
        let label = session
            .sleep_quality()
            .map(SleepQuality::label)
            .unwrap_or("--");
        writeln!(self.out, "Session {} rated: {label}.", session.id)
    }

    fn show_error(&mut self, err: &UiError) -> io::Result<()> {
        let retry_hint = if err.is_retryable() {
            " (try again)"
        } else {
            ""
        };
        writeln!(
            self.out,
            "[{}] {}{retry_hint}",
            err_label(err.category()),
            err.message()
        )?;
        if err.context() == UiErrorContext::Rating
            && err.category() == UiErrorCategory::Validation
            && self.awaiting_rating.is_some()
        {
            writeln!(self.out, "Enter a rating between 0 and 5, or 'skip'.")?;
        }
        Ok(())
    }

    fn show_status(&mut self) -> io::Result<()> {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return writeln!(self.out, "Still loading your sleep data.");
        };
        match snapshot.current.as_ref() {
            Some(current) => writeln!(
                self.out,
                "Session {} in progress. Type 'stop' when you wake up.",
                current.id
            ),
            None if snapshot.has_history => {
                writeln!(self.out, "Not tracking. Type 'start' to begin a session.")
            }
            None => writeln!(
                self.out,
                "No sleep data yet. Type 'start' to begin your first session."
            ),
        }
    }

    fn show_history(&mut self) -> io::Result<()> {
        let text = self
            .snapshot
            .as_ref()
            .map(|s| s.history_text.as_str())
            .unwrap_or_default();
        if text.is_empty() {
            writeln!(self.out, "No sleep data yet.")
        } else {
            writeln!(self.out, "{text}")
        }
    }
}

#[cfg(test)]
#[path = "../tests/app_tests.rs"]
mod tests;
