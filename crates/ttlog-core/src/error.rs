//! Error types for log interpretation.

use std::fmt;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::task::{TaskError, TaskId};

/// A failure while interpreting a single line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The line matches none of the recognized forms.
    #[error("incorrect syntax")]
    Syntax,

    /// A timestamp or day marker does not move time forward.
    #[error("{attempted} is not after the last recorded time {cursor}")]
    OutOfOrder {
        attempted: NaiveDateTime,
        cursor: NaiveDateTime,
    },

    /// A timestamped line appeared before any day marker.
    #[error("task initialized before day declaration")]
    UninitializedDay,

    /// A stop line with no open task.
    #[error("no task to stop")]
    NoOpenTask,

    /// A resume-by-time line whose timestamp matches no task.
    #[error("no task started on {}", .0.pretty())]
    UnknownTaskReference(TaskId),

    /// A resume-last line with neither a current nor a previous task.
    #[error("no task to resume")]
    NoTaskToResume,

    /// A day marker naming a date that does not exist.
    #[error("invalid date {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    /// A time of day outside 00:00:00..=23:59:59.
    #[error("invalid time {hour:02}:{minute:02}:{second:02}")]
    InvalidTime { hour: u32, minute: u32, second: u32 },

    /// A task state transition was rejected.
    #[error(transparent)]
    Task(#[from] TaskError),
}

/// Stable label for each failure condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Syntax,
    OutOfOrder,
    UninitializedDay,
    NoOpenTask,
    UnknownTaskReference,
    NoTaskToResume,
    InvalidDate,
    InvalidTime,
    AlreadyOpen,
    NotOpen,
    NeverStarted,
}

impl ErrorKind {
    /// String representation used in machine-readable output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::OutOfOrder => "out_of_order",
            Self::UninitializedDay => "uninitialized_day",
            Self::NoOpenTask => "no_open_task",
            Self::UnknownTaskReference => "unknown_task_reference",
            Self::NoTaskToResume => "no_task_to_resume",
            Self::InvalidDate => "invalid_date",
            Self::InvalidTime => "invalid_time",
            Self::AlreadyOpen => "already_open",
            Self::NotOpen => "not_open",
            Self::NeverStarted => "never_started",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ParseError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax => ErrorKind::Syntax,
            Self::OutOfOrder { .. } => ErrorKind::OutOfOrder,
            Self::UninitializedDay => ErrorKind::UninitializedDay,
            Self::NoOpenTask => ErrorKind::NoOpenTask,
            Self::UnknownTaskReference(_) => ErrorKind::UnknownTaskReference,
            Self::NoTaskToResume => ErrorKind::NoTaskToResume,
            Self::InvalidDate { .. } => ErrorKind::InvalidDate,
            Self::InvalidTime { .. } => ErrorKind::InvalidTime,
            Self::Task(TaskError::AlreadyOpen) => ErrorKind::AlreadyOpen,
            Self::Task(TaskError::NotOpen) => ErrorKind::NotOpen,
            Self::Task(TaskError::NeverStarted) => ErrorKind::NeverStarted,
        }
    }
}

/// A [`ParseError`] tagged with the 1-based line it occurred on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {source}")]
pub struct LogError {
    pub line: usize,
    #[source]
    pub source: ParseError,
}

impl LogError {
    pub const fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reference_names_the_timestamp() {
        let id: TaskId = "20240101090000".parse().unwrap();
        let err = ParseError::UnknownTaskReference(id);
        assert_eq!(err.to_string(), "no task started on 2024-01-01 09:00:00");
    }

    #[test]
    fn task_errors_keep_their_message_and_kind() {
        let err = ParseError::from(TaskError::AlreadyOpen);
        assert_eq!(err.to_string(), "task is already started");
        assert_eq!(err.kind(), ErrorKind::AlreadyOpen);
    }

    #[test]
    fn log_error_reports_line_number() {
        let err = LogError {
            line: 3,
            source: ParseError::Syntax,
        };
        assert_eq!(err.to_string(), "line 3: incorrect syntax");
        assert_eq!(err.kind().as_str(), "syntax");
    }
}
