//! Core logic for plain-text time logs.
//!
//! This crate contains:
//! - Line grammar: classifying each log line into one of its five forms
//! - Tasks: described, tagged activities with start/stop intervals
//! - Tracker: the interpreter that turns lines into a consistent timeline
//! - Summary: per-task and per-tag totals for presentation

mod error;
pub mod line;
pub mod summary;
pub mod task;
mod tracker;

pub use error::{ErrorKind, LogError, ParseError};
pub use line::{Line, TaskRef, TimeOfDay, classify, extract_tags};
pub use summary::{Summary, TaskSummary, format_duration, summarize};
pub use task::{Interval, InvalidTaskId, Task, TaskError, TaskId};
pub use tracker::{TaskHandle, Timelog, Tracker, parse_lines};
