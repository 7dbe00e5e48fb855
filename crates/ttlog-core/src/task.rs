//! Tracked tasks and their intervals.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Format of a task identifier: the first start time, digits only.
const ID_FORMAT: &str = "%Y%m%d%H%M%S";

/// Rejected state transitions on a [`Task`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TaskError {
    /// `start` on a task whose last interval is still open.
    #[error("task is already started")]
    AlreadyOpen,

    /// `stop` on a task with no open interval.
    #[error("task is already stopped")]
    NotOpen,

    /// The identifier was requested before the task had any interval.
    #[error("task has never been started, it needs a starting date to have an id")]
    NeverStarted,
}

/// A string that is not a 14-digit task identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid task id {0:?}, expected 14 digits (YYYYMMDDHHMMSS)")]
pub struct InvalidTaskId(String);

/// A task identifier derived from a start timestamp.
///
/// Always 14 ASCII digits laid out as `YYYYMMDDHHMMSS`. Identifiers built from
/// resume references are not checked against the calendar, so
/// [`to_datetime`](Self::to_datetime) may return `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    pub fn from_datetime(time: NaiveDateTime) -> Self {
        Self(time.format(ID_FORMAT).to_string())
    }

    /// Wraps digits the grammar has already constrained to 14 ASCII digits.
    pub(crate) const fn from_digits(digits: String) -> Self {
        Self(digits)
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the identifier back into a date-time, if it names a real one.
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.0, ID_FORMAT).ok()
    }

    /// Renders the identifier as `YYYY-MM-DD HH:MM:SS`.
    pub fn pretty(&self) -> String {
        let s = &self.0;
        format!(
            "{}-{}-{} {}:{}:{}",
            &s[..4],
            &s[4..6],
            &s[6..8],
            &s[8..10],
            &s[10..12],
            &s[12..14]
        )
    }
}

impl FromStr for TaskId {
    type Err = InvalidTaskId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 14 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidTaskId(s.to_string()))
        }
    }
}

impl TryFrom<String> for TaskId {
    type Error = InvalidTaskId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TaskId> for String {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One contiguous span of work. `end` is `None` while the span is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl Interval {
    pub const fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Length of the span, or `None` while it is still open.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }
}

/// A tracked activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    description: String,
    tags: BTreeSet<String>,
    intervals: Vec<Interval>,
}

impl Task {
    /// Creates a task that has not been started yet.
    pub fn new(description: impl Into<String>, tags: BTreeSet<String>) -> Self {
        Self {
            description: description.into(),
            tags,
            intervals: Vec::new(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub const fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    /// True iff the last interval exists and has no end.
    pub fn is_open(&self) -> bool {
        self.intervals.last().is_some_and(Interval::is_open)
    }

    /// Opens a new interval at `time`.
    pub fn start(&mut self, time: NaiveDateTime) -> Result<(), TaskError> {
        if self.is_open() {
            return Err(TaskError::AlreadyOpen);
        }
        self.intervals.push(Interval {
            start: time,
            end: None,
        });
        Ok(())
    }

    /// Closes the open interval at `time`.
    pub fn stop(&mut self, time: NaiveDateTime) -> Result<(), TaskError> {
        match self.intervals.last_mut() {
            Some(interval) if interval.is_open() => {
                interval.end = Some(time);
                Ok(())
            }
            _ => Err(TaskError::NotOpen),
        }
    }

    /// The identifier derived from the first interval's start.
    pub fn identifier(&self) -> Result<TaskId, TaskError> {
        self.intervals
            .first()
            .map(|interval| TaskId::from_datetime(interval.start))
            .ok_or(TaskError::NeverStarted)
    }

    /// Sum of all closed intervals. The open interval, if any, is not counted.
    pub fn total_duration(&self) -> Duration {
        self.intervals
            .iter()
            .filter_map(Interval::duration)
            .fold(Duration::zero(), |acc, d| acc + d)
    }
}
