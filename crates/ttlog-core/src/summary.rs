//! Time totals per task and per tag.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::task::TaskId;
use crate::tracker::Timelog;

/// Totals for one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskSummary {
    pub id: TaskId,
    pub description: String,
    pub tags: BTreeSet<String>,

    /// Sum of closed intervals in milliseconds.
    pub total_ms: i64,

    /// Whether the task was still running when the log ended.
    pub open: bool,
}

/// Totals for a whole log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Tasks in start order.
    pub tasks: Vec<TaskSummary>,

    /// Time per tag. A task counts toward every tag it carries.
    pub by_tag: BTreeMap<String, i64>,

    /// Time across all tasks (each task counted once).
    pub total_ms: i64,
}

/// Computes totals for a parsed log. Open intervals contribute nothing.
pub fn summarize(log: &Timelog) -> Summary {
    let mut summary = Summary::default();

    for (id, task) in log.tasks() {
        let total_ms = task.total_duration().num_milliseconds();

        for tag in task.tags() {
            *summary.by_tag.entry(tag.clone()).or_insert(0) += total_ms;
        }
        summary.total_ms += total_ms;

        summary.tasks.push(TaskSummary {
            id,
            description: task.description().to_string(),
            tags: task.tags().clone(),
            total_ms,
            open: task.is_open(),
        });
    }

    summary
}

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are shown as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
