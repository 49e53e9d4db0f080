use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(SessionId);

impl SessionId {
    /// Placeholder carried by a session that has not been inserted yet.
    pub const UNASSIGNED: SessionId = SessionId(0);
}

pub const UNRATED_QUALITY: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepQuality {
    VeryBad,
    Poor,
    SoSo,
    Ok,
    PrettyGood,
    Excellent,
}

impl SleepQuality {
    pub fn from_rating(rating: i32) -> Option<Self> {
        match rating {
            0 => Some(Self::VeryBad),
            1 => Some(Self::Poor),
            2 => Some(Self::SoSo),
            3 => Some(Self::Ok),
            4 => Some(Self::PrettyGood),
            5 => Some(Self::Excellent),
            _ => None,
        }
    }

    pub fn rating(self) -> i32 {
        match self {
            Self::VeryBad => 0,
            Self::Poor => 1,
            Self::SoSo => 2,
            Self::Ok => 3,
            Self::PrettyGood => 4,
            Self::Excellent => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::VeryBad => "Very bad",
            Self::Poor => "Poor",
            Self::SoSo => "So-so",
            Self::Ok => "OK",
            Self::PrettyGood => "Pretty good",
            Self::Excellent => "Excellent!",
        }
    }
}

/// One night of sleep. Timestamps are epoch milliseconds.
///
/// A session is open while `end_time_millis == start_time_millis`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub start_time_millis: i64,
    pub end_time_millis: i64,
    pub quality: i32,
}

impl Session {
    pub fn open_at(start_time_millis: i64) -> Self {
        Self {
            id: SessionId::UNASSIGNED,
            start_time_millis,
            end_time_millis: start_time_millis,
            quality: UNRATED_QUALITY,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_time_millis == self.start_time_millis
    }

    /// Records the close timestamp. A close that does not land strictly after
    /// the start is pushed one millisecond past it so the session reads as
    /// closed.
    pub fn close_at(&mut self, end_time_millis: i64) {
        self.end_time_millis = end_time_millis.max(self.start_time_millis.saturating_add(1));
    }

    pub fn sleep_quality(&self) -> Option<SleepQuality> {
        SleepQuality::from_rating(self.quality)
    }

    pub fn duration_millis(&self) -> i64 {
        (self.end_time_millis - self.start_time_millis).max(0)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_time_millis)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        if self.is_open() {
            return None;
        }
        DateTime::from_timestamp_millis(self.end_time_millis)
    }
}
