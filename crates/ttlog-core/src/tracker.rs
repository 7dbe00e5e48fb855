//! Line-by-line interpreter for time logs.
//!
//! The tracker keeps a single date-time cursor that only moves forward, the
//! task that is currently open and the one that was open before it. Tasks live
//! in an arena owned by the tracker; current/previous are [`TaskHandle`]s into it.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{LogError, ParseError};
use crate::line::{Line, TaskRef, TimeOfDay, classify};
use crate::task::{Task, TaskId};

/// Index of a task inside a [`Tracker`] or [`Timelog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(usize);

/// Interpreter state for one log.
#[derive(Debug, Default)]
pub struct Tracker {
    /// `None` until the first day marker.
    cursor: Option<NaiveDateTime>,
    /// True until a timestamped line lands on the current day.
    day_is_empty: bool,
    current: Option<TaskHandle>,
    previous: Option<TaskHandle>,
    tasks: Vec<Task>,
    ids: HashMap<TaskId, TaskHandle>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn cursor(&self) -> Option<NaiveDateTime> {
        self.cursor
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.current.map(|handle| &self.tasks[handle.0])
    }

    pub fn previous_task(&self) -> Option<&Task> {
        self.previous.map(|handle| &self.tasks[handle.0])
    }

    pub fn task(&self, id: &TaskId) -> Option<&Task> {
        self.ids.get(id).map(|handle| &self.tasks[handle.0])
    }

    /// Interprets one raw line.
    ///
    /// On error the tracker may have advanced its cursor; callers are
    /// expected to abandon the run.
    pub fn process_line(&mut self, line: &str) -> Result<(), ParseError> {
        match classify(line)? {
            Line::Blank => {
                tracing::trace!("skipping blank or comment line");
                Ok(())
            }
            Line::Day(date) => self.change_day(date),
            Line::NewTask {
                time,
                description,
                tags,
            } => self.new_task(time, Task::new(description, tags)),
            Line::Stop(time) => self.stop(time),
            Line::ResumeAt { time, target } => self.resume_at(time, target),
            Line::ResumeLast(time) => self.resume_last(time),
        }
    }

    /// Finishes the run and hands over the task registry.
    pub fn into_timelog(self) -> Timelog {
        Timelog {
            tasks: self.tasks,
            ids: self.ids,
            cursor: self.cursor,
        }
    }

    /// Moves the cursor to `time` on the current day.
    fn advance(&mut self, time: TimeOfDay) -> Result<NaiveDateTime, ParseError> {
        let cursor = self.cursor.ok_or(ParseError::UninitializedDay)?;
        let candidate = time.on(cursor.date())?;

        if candidate < cursor || (candidate == cursor && !self.day_is_empty) {
            return Err(ParseError::OutOfOrder {
                attempted: candidate,
                cursor,
            });
        }

        self.cursor = Some(candidate);
        self.day_is_empty = false;
        Ok(candidate)
    }

    /// Closes the current task if it is open. Returns whether anything was closed.
    fn stop_current(&mut self, at: NaiveDateTime) -> Result<bool, ParseError> {
        let Some(handle) = self.current else {
            return Ok(false);
        };
        let task = &mut self.tasks[handle.0];
        if !task.is_open() {
            return Ok(false);
        }
        task.stop(at)?;
        tracing::debug!(task = %task.description(), %at, "task stopped");
        Ok(true)
    }

    /// Makes `handle` the current task and opens an interval on it.
    fn start(&mut self, handle: TaskHandle, at: NaiveDateTime) -> Result<(), ParseError> {
        if self.current != Some(handle) {
            self.previous = self.current;
            self.current = Some(handle);
        }
        let task = &mut self.tasks[handle.0];
        task.start(at)?;
        tracing::debug!(task = %task.description(), %at, "task started");
        Ok(())
    }

    fn change_day(&mut self, date: NaiveDate) -> Result<(), ParseError> {
        let midnight = date.and_time(NaiveTime::MIN);
        if let Some(cursor) = self.cursor {
            if midnight <= cursor {
                return Err(ParseError::OutOfOrder {
                    attempted: midnight,
                    cursor,
                });
            }
        }

        tracing::debug!(%date, "day started");
        self.cursor = Some(midnight);
        self.day_is_empty = true;
        Ok(())
    }

    fn new_task(&mut self, time: TimeOfDay, task: Task) -> Result<(), ParseError> {
        let at = self.advance(time)?;

        self.stop_current(at)?;

        let handle = TaskHandle(self.tasks.len());
        self.tasks.push(task);
        self.start(handle, at)?;

        let id = self.tasks[handle.0].identifier()?;
        self.ids.insert(id, handle);
        Ok(())
    }

    fn stop(&mut self, time: TimeOfDay) -> Result<(), ParseError> {
        let at = self.advance(time)?;
        if self.stop_current(at)? {
            Ok(())
        } else {
            Err(ParseError::NoOpenTask)
        }
    }

    fn resume_at(&mut self, time: TimeOfDay, target: TaskRef) -> Result<(), ParseError> {
        let at = self.advance(time)?;

        let id = target.task_id(at.date());
        let Some(&handle) = self.ids.get(&id) else {
            return Err(ParseError::UnknownTaskReference(id));
        };

        self.stop_current(at)?;
        self.start(handle, at)
    }

    fn resume_last(&mut self, time: TimeOfDay) -> Result<(), ParseError> {
        let at = self.advance(time)?;

        let target = if self.stop_current(at)? {
            self.previous
        } else {
            self.current
        };
        let handle = target.ok_or(ParseError::NoTaskToResume)?;

        self.stop_current(at)?;
        self.start(handle, at)
    }
}

/// Interprets a whole log, stopping at the first bad line.
pub fn parse_lines<I, S>(lines: I) -> Result<Timelog, LogError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut tracker = Tracker::new();
    for (idx, line) in lines.into_iter().enumerate() {
        tracker
            .process_line(line.as_ref())
            .map_err(|source| LogError {
                line: idx + 1,
                source,
            })?;
    }
    Ok(tracker.into_timelog())
}

/// The tasks of a fully interpreted log.
#[derive(Debug, Clone, Default)]
pub struct Timelog {
    tasks: Vec<Task>,
    ids: HashMap<TaskId, TaskHandle>,
    cursor: Option<NaiveDateTime>,
}

impl Timelog {
    /// Tasks in the order they were first started.
    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &Task)> {
        self.tasks
            .iter()
            .filter_map(|task| task.identifier().ok().map(|id| (id, task)))
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.ids.get(id).map(|handle| &self.tasks[handle.0])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The last time the log reached.
    pub const fn cursor(&self) -> Option<NaiveDateTime> {
        self.cursor
    }
}

#[derive(Serialize)]
struct TaskEntry<'a> {
    id: TaskId,
    #[serde(flatten)]
    task: &'a Task,
}

impl Serialize for Timelog {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.tasks().map(|(id, task)| TaskEntry { id, task }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::error::ErrorKind;
    use crate::task::Interval;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn id(s: &str) -> TaskId {
        s.parse().unwrap()
    }

    fn parse(input: &str) -> Result<Timelog, LogError> {
        parse_lines(input.lines())
    }

    fn closed(start: NaiveDateTime, end: NaiveDateTime) -> Interval {
        Interval {
            start,
            end: Some(end),
        }
    }

    fn open(start: NaiveDateTime) -> Interval {
        Interval { start, end: None }
    }

    #[test]
    fn single_task_with_tag() {
        let log = parse("2024-01-01:\n0900 write spec #docs\n1030.").unwrap();

        assert_eq!(log.len(), 1);
        let task = log.get(&id("20240101090000")).unwrap();
        assert_eq!(task.description(), "write spec");
        assert_eq!(task.tags(), &BTreeSet::from(["docs".to_string()]));
        assert_eq!(task.intervals(), &[closed(at(1, 9, 0), at(1, 10, 30))]);
    }

    #[test]
    fn resume_last_goes_back_to_previous_task() {
        let log = parse("2024-01-01:\n0900 task a\n0905 task b\n0910^").unwrap();

        let a = log.get(&id("20240101090000")).unwrap();
        let b = log.get(&id("20240101090500")).unwrap();
        assert_eq!(
            a.intervals(),
            &[closed(at(1, 9, 0), at(1, 9, 5)), open(at(1, 9, 10))]
        );
        assert_eq!(b.intervals(), &[closed(at(1, 9, 5), at(1, 9, 10))]);
    }

    #[test]
    fn resume_last_after_stop_reopens_stopped_task() {
        let log = parse("2024-01-01:\n0900 task a\n0905 task b\n0910.\n0915^").unwrap();

        let b = log.get(&id("20240101090500")).unwrap();
        assert_eq!(
            b.intervals(),
            &[closed(at(1, 9, 5), at(1, 9, 10)), open(at(1, 9, 15))]
        );
    }

    #[test]
    fn resume_last_toggles_between_two_tasks() {
        let log = parse("2024-01-01:\n0900 task a\n0905 task b\n0910^\n0915^").unwrap();

        let b = log.get(&id("20240101090500")).unwrap();
        assert_eq!(
            b.intervals(),
            &[closed(at(1, 9, 5), at(1, 9, 10)), open(at(1, 9, 15))]
        );
    }

    #[test]
    fn resume_by_time_on_same_day() {
        let log = parse("2024-01-01:\n0900 task a\n0905.\n0910^0900").unwrap();

        let a = log.get(&id("20240101090000")).unwrap();
        assert_eq!(
            a.intervals(),
            &[closed(at(1, 9, 0), at(1, 9, 5)), open(at(1, 9, 10))]
        );
    }

    #[test]
    fn resume_by_time_with_explicit_date() {
        let log = parse(
            "2024-01-01:\n0900 task a\n1700.\n2024-01-02:\n0800 task b\n0830^2024-01-01T0900",
        )
        .unwrap();

        let a = log.get(&id("20240101090000")).unwrap();
        assert_eq!(
            a.intervals(),
            &[closed(at(1, 9, 0), at(1, 17, 0)), open(at(2, 8, 30))]
        );
        let b = log.get(&id("20240102080000")).unwrap();
        assert_eq!(b.intervals(), &[closed(at(2, 8, 0), at(2, 8, 30))]);
    }

    #[test]
    fn same_timestamp_on_non_empty_day_is_out_of_order() {
        let err = parse("2024-01-01:\n0900 task a\n0900 task b").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), ErrorKind::OutOfOrder);
    }

    #[test]
    fn earlier_timestamp_is_out_of_order() {
        let err = parse("2024-01-01:\n0900 task a\n0859.").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(
            err.source,
            ParseError::OutOfOrder {
                attempted: at(1, 8, 59),
                cursor: at(1, 9, 0),
            }
        );
    }

    #[test]
    fn first_event_may_start_at_midnight() {
        let log = parse("2024-01-01:\n0000 night shift\n0100.").unwrap();
        let task = log.get(&id("20240101000000")).unwrap();
        assert_eq!(task.intervals(), &[closed(at(1, 0, 0), at(1, 1, 0))]);
    }

    #[test]
    fn second_event_at_midnight_is_out_of_order() {
        let err = parse("2024-01-01:\n0000 a\n0000.").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), ErrorKind::OutOfOrder);
    }

    #[test]
    fn unknown_reference_names_the_timestamp() {
        let err = parse("2024-01-01:\n0900 task a\n0910^0800").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(
            err.source,
            ParseError::UnknownTaskReference(id("20240101080000"))
        );
        assert_eq!(
            err.source.to_string(),
            "no task started on 2024-01-01 08:00:00"
        );
    }

    #[test]
    fn timestamp_before_day_marker_is_uninitialized() {
        let err = parse("# header\n0900 task a").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.source, ParseError::UninitializedDay);
    }

    #[test]
    fn day_marker_must_move_forward() {
        let err = parse("2024-01-02:\n2024-01-01:").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfOrder);

        let err = parse("2024-01-01:\n0900 a\n2024-01-01:").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.kind(), ErrorKind::OutOfOrder);
    }

    #[test]
    fn stop_without_open_task() {
        let err = parse("2024-01-01:\n0900 a\n0910.\n0920.").unwrap_err();
        assert_eq!(err.line, 4);
        assert_eq!(err.source, ParseError::NoOpenTask);

        let err = parse("2024-01-01:\n0900.").unwrap_err();
        assert_eq!(err.source, ParseError::NoOpenTask);
    }

    #[test]
    fn resume_last_with_nothing_to_resume() {
        let err = parse("2024-01-01:\n0900^").unwrap_err();
        assert_eq!(err.source, ParseError::NoTaskToResume);

        // Only one task so far and it is still open: no previous task.
        let err = parse("2024-01-01:\n0900 a\n0910^").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.source, ParseError::NoTaskToResume);
    }

    #[test]
    fn invalid_time_is_reported() {
        let err = parse("2024-01-01:\n2460 a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidTime);
    }

    #[test]
    fn syntax_error_carries_line_number() {
        let err = parse("2024-01-01:\n0900 a\nnonsense").unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.source, ParseError::Syntax);
    }

    #[test]
    fn new_task_closes_current_one() {
        let log = parse("2024-01-01:\n0900 a\n0930 b").unwrap();
        let a = log.get(&id("20240101090000")).unwrap();
        let b = log.get(&id("20240101093000")).unwrap();
        assert!(!a.is_open());
        assert!(b.is_open());
        assert_eq!(a.intervals(), &[closed(at(1, 9, 0), at(1, 9, 30))]);
    }

    #[test]
    fn tracker_exposes_current_and_previous() {
        let mut tracker = Tracker::new();
        for line in ["2024-01-01:", "0900 a", "0930 b"] {
            tracker.process_line(line).unwrap();
        }
        assert_eq!(tracker.current_task().unwrap().description(), "b");
        assert_eq!(tracker.previous_task().unwrap().description(), "a");
        assert_eq!(tracker.cursor(), Some(at(1, 9, 30)));
        assert!(tracker.task(&id("20240101090000")).is_some());
    }

    #[test]
    fn cursor_never_moves_backwards() {
        let lines = [
            "2024-01-01:",
            "0900 a",
            "",
            "# note",
            "0930 b #x",
            "1000^",
            "1015.",
            "2024-01-02:",
            "0800^0800",
        ];
        let mut tracker = Tracker::new();
        let mut last = None;
        for (idx, line) in lines.iter().enumerate() {
            let result = tracker.process_line(line);
            if idx < lines.len() - 1 {
                result.unwrap();
            } else {
                // Nothing started at 08:00 on the second day.
                assert_eq!(result.unwrap_err().kind(), ErrorKind::UnknownTaskReference);
            }
            assert!(tracker.cursor() >= last);
            last = tracker.cursor();
        }
    }

    #[test]
    fn intervals_never_overlap() {
        let log = parse(
            "2024-01-01:\n0900 a\n0915 b\n0930^\n0945^0915\n1000.\n2024-01-02:\n0900^2024-01-01T0900\n0930 c",
        )
        .unwrap();

        let mut all: Vec<Interval> = log
            .tasks()
            .flat_map(|(_, task)| task.intervals().iter().copied())
            .collect();
        all.sort_by_key(|interval| interval.start);
        for pair in all.windows(2) {
            let end = pair[0].end.expect("only the final interval may be open");
            assert!(end <= pair[1].start);
        }
        for (_, task) in log.tasks() {
            let open = task.intervals().iter().filter(|i| i.is_open()).count();
            assert!(open <= 1);
            if open == 1 {
                assert!(task.intervals().last().unwrap().is_open());
            }
        }
    }

    #[test]
    fn ids_round_trip_to_first_start() {
        let log = parse("2024-01-01:\n0900 a\n093015 b\n1000^0900").unwrap();
        for (id, task) in log.tasks() {
            assert_eq!(id.to_datetime(), Some(task.intervals()[0].start));
        }
        assert_eq!(
            log.tasks().map(|(id, _)| id.pretty()).collect::<Vec<_>>(),
            vec!["2024-01-01 09:00:00", "2024-01-01 09:30:15"]
        );
    }

    #[test]
    fn timelog_serializes_tasks_with_ids() {
        let log = parse("2024-01-01:\n0900 write spec #docs\n1030.").unwrap();
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "id": "20240101090000",
                "description": "write spec",
                "tags": ["docs"],
                "intervals": [{"start": "2024-01-01T09:00:00", "end": "2024-01-01T10:30:00"}],
            }])
        );
    }
}
