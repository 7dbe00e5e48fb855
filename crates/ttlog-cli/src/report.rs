//! Reading a log file and printing its tasks.
//!
//! Lines are streamed from disk into a [`Tracker`]; the first bad line stops
//! the run with a [`LogError`] carrying its 1-based number.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use ttlog_core::{LogError, Summary, Task, Timelog, Tracker, format_duration, summarize};

use crate::{Config, OutputFormat};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Interprets every line from `reader`.
///
/// I/O failures are returned as plain errors; grammar or ordering failures
/// are returned as a [`LogError`] that callers can downcast to.
pub fn read_log<R: BufRead>(reader: R) -> Result<Timelog> {
    let mut tracker = Tracker::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        tracker
            .process_line(&line)
            .map_err(|source| LogError {
                line: idx + 1,
                source,
            })?;
    }

    let log = tracker.into_timelog();
    tracing::debug!(tasks = log.len(), cursor = ?log.cursor(), "log parsed");
    Ok(log)
}

fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn format_task_line(task: &Task) -> String {
    let mut line = task.description().to_string();
    for tag in task.tags() {
        write!(line, " #{tag}").unwrap();
    }
    line
}

/// Formats the human-readable report output.
pub fn format_report(log: &Timelog, summary: &Summary, show_intervals: bool) -> String {
    let mut output = String::new();

    if summary.tasks.is_empty() {
        writeln!(output, "No tasks recorded.").unwrap();
        return output;
    }

    for ((id, task), totals) in log.tasks().zip(&summary.tasks) {
        let open = if totals.open { " (open)" } else { "" };
        writeln!(
            output,
            "{id}  {}  {}{open}",
            format_task_line(task),
            format_duration(totals.total_ms)
        )
        .unwrap();

        if show_intervals {
            for interval in task.intervals() {
                let end = interval
                    .end
                    .map_or_else(|| "(open)".to_string(), format_time);
                writeln!(output, "  {} - {end}", format_time(interval.start)).unwrap();
            }
        }
    }

    if !summary.by_tag.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "Tags:").unwrap();
        for (tag, ms) in &summary.by_tag {
            writeln!(output, "  {tag}  {}", format_duration(*ms)).unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "Total: {}", format_duration(summary.total_ms)).unwrap();

    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    tasks: &'a Timelog,
    totals: JsonTotals<'a>,
}

#[derive(Serialize)]
struct JsonTotals<'a> {
    by_task: BTreeMap<String, i64>,
    by_tag: &'a BTreeMap<String, i64>,
    total_ms: i64,
}

/// Formats the log as JSON.
pub fn format_report_json(log: &Timelog, summary: &Summary) -> Result<String> {
    let report = JsonReport {
        tasks: log,
        totals: JsonTotals {
            by_task: summary
                .tasks
                .iter()
                .map(|t| (t.id.to_string(), t.total_ms))
                .collect(),
            by_tag: &summary.by_tag,
            total_ms: summary.total_ms,
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

// ========== Public Interface ==========

/// Reads the log at `path` and writes the report to `writer`.
pub fn run<W: Write>(writer: &mut W, path: &Path, config: &Config, json: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let log = read_log(BufReader::new(file))?;
    let summary = summarize(&log);

    let format = if json { OutputFormat::Json } else { config.format };
    match format {
        OutputFormat::Json => writeln!(writer, "{}", format_report_json(&log, &summary)?)?,
        OutputFormat::Text => write!(writer, "{}", format_report(&log, &summary, config.show_intervals))?,
    }

    Ok(())
}
