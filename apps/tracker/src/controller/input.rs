//! Parsing of typed commands into tracker actions.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Start,
    Stop,
    Clear,
    Status,
    History,
    Help,
    Quit,
    /// Rating for the session awaiting one. Range checks happen in the backend.
    Rate(i32),
    Skip,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("empty input")]
    Empty,
    #[error("unknown command '{0}'; type 'help' for a list")]
    Unknown(String),
    #[error("invalid rating '{0}'; expected a number between 0 and 5")]
    InvalidRating(String),
}

pub const HELP_TEXT: &str = "\
commands:
  start          begin a sleep session
  stop           end the current session
  clear          delete all recorded sessions
  status         show the current session
  history        show recorded sessions
  rate <0-5>     rate the session that just ended (a bare number works too)
  skip           leave the session that just ended unrated
  help           show this list
  quit           exit the tracker";

pub fn parse_action(line: &str) -> Result<UserAction, InputError> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Err(InputError::Empty);
    };
    let head = head.to_ascii_lowercase();

    if let Ok(rating) = head.parse::<i32>() {
        return Ok(UserAction::Rate(rating));
    }

    let action = match head.as_str() {
        "start" | "sleep" => UserAction::Start,
        "stop" | "wake" => UserAction::Stop,
        "clear" => UserAction::Clear,
        "status" => UserAction::Status,
        "history" | "list" => UserAction::History,
        "help" | "?" => UserAction::Help,
        "quit" | "exit" | "q" => UserAction::Quit,
        "skip" => UserAction::Skip,
        "rate" => {
            let raw = parts.next().unwrap_or_default();
            let rating = raw
                .parse::<i32>()
                .map_err(|_| InputError::InvalidRating(raw.to_string()))?;
            UserAction::Rate(rating)
        }
        _ => return Err(InputError::Unknown(head)),
    };
    Ok(action)
}

#[cfg(test)]
#[path = "../tests/input_tests.rs"]
mod tests;
