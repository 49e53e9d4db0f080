//! Text rendering of session history for the presentation layer.

use std::fmt::Write as _;

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use shared::domain::Session;

const HISTORY_HEADING: &str = "HERE IS YOUR SLEEP DATA";
const TIMESTAMP_FORMAT: &str = "%A %b-%d-%Y Time: %H:%M";

pub trait HistoryFormatter: Send + Sync {
    fn format_history(&self, sessions: &[Session]) -> String;
}

#[derive(Debug, Clone, Copy)]
enum Zone {
    Fixed(FixedOffset),
    /// Host time zone, resolved per timestamp so DST changes are honored.
    Local,
}

/// Renders sessions in the order given, one block per session.
#[derive(Debug, Clone)]
pub struct PlainHistoryFormatter {
    zone: Zone,
}

impl Default for PlainHistoryFormatter {
    fn default() -> Self {
        Self::with_offset(Utc.fix())
    }
}

impl PlainHistoryFormatter {
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self {
            zone: Zone::Fixed(offset),
        }
    }

    pub fn local() -> Self {
        Self { zone: Zone::Local }
    }

    pub fn format_timestamp(&self, at: DateTime<Utc>) -> String {
        match self.zone {
            Zone::Fixed(offset) => at.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
            Zone::Local => at.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    fn timestamp(&self, at: Option<DateTime<Utc>>) -> String {
        at.map_or_else(|| "--".to_string(), |at| self.format_timestamp(at))
    }
}

impl HistoryFormatter for PlainHistoryFormatter {
    fn format_history(&self, sessions: &[Session]) -> String {
        if sessions.is_empty() {
            return String::new();
        }

        let mut out = String::new();
        let _ = writeln!(out, "{HISTORY_HEADING}");
        for session in sessions {
            let _ = writeln!(out);
            let _ = writeln!(out, "Start:");
            let _ = writeln!(out, "{}", self.timestamp(session.started_at()));
            let _ = writeln!(out, "End:");
            if session.is_open() {
                let _ = writeln!(out, "in progress");
            } else {
                let _ = writeln!(out, "{}", self.timestamp(session.ended_at()));
            }
            let _ = writeln!(out, "Quality:");
            let _ = writeln!(
                out,
                "{}",
                session.sleep_quality().map_or("--", |quality| quality.label())
            );
            let _ = writeln!(out, "Hours:Minutes:Seconds");
            let _ = writeln!(out, "{}", format_duration(session.duration_millis()));
        }
        out
    }
}

pub fn format_duration(duration_millis: i64) -> String {
    let total_seconds = duration_millis.max(0) / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}
