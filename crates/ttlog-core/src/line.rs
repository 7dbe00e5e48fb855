//! Line grammar for time logs.
//!
//! Every line of a log is exactly one of:
//!
//! ```text
//! # comment                       blank or comment, ignored
//! 2024-01-01:                     day marker
//! 0900 write spec #docs           new task (seconds optional: 090000)
//! 1030.                           stop the open task
//! 1100^0900                       resume the task started at 09:00 today
//! 1100^2023-12-31T1700            resume the task started at that date-time
//! 1130^                           resume the task that was active before
//! ```
//!
//! Any form may end with a trailing comment (`<space or tab>#<space or tab>...`).
//!
//! Classification looks at fixed columns before any pattern is applied. The
//! fifth character decides the time precision: a digit means `HHMMSS`, anything
//! else means `HHMM`. The character right after the time then selects the form.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};

use crate::error::ParseError;
use crate::task::TaskId;

/// Trailing comment accepted on every line form.
macro_rules! with_comment {
    ($pattern:literal) => {
        concat!($pattern, r"(?:[ \t]+#[ \t].*)?$")
    };
}

static DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(with_comment!(r"^([0-9]{4})-([0-9]{2})-([0-9]{2}):")).unwrap()
});

static NEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(with_comment!(r"^([0-9]{2})([0-9]{2})([0-9]{2})?[ \t]+(.+?)")).unwrap()
});

static STOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(with_comment!(r"^([0-9]{2})([0-9]{2})([0-9]{2})?\.")).unwrap()
});

static RESUME_LAST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(with_comment!(r"^([0-9]{2})([0-9]{2})([0-9]{2})?\^+")).unwrap()
});

static RESUME_AT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(with_comment!(
        r"^([0-9]{2})([0-9]{2})([0-9]{2})?\^(?:([0-9]{4})-([0-9]{2})-([0-9]{2})T)?([0-9]{2})([0-9]{2})([0-9]{2})?"
    ))
    .unwrap()
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[ \t])#([A-Za-z0-9_]+)").unwrap());

/// A wall-clock time as written in the log. Not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeOfDay {
    pub hour: u32,
    pub minute: u32,
    /// `None` when the line used minute precision.
    pub second: Option<u32>,
}

impl TimeOfDay {
    pub const fn hms(hour: u32, minute: u32, second: u32) -> Self {
        Self {
            hour,
            minute,
            second: Some(second),
        }
    }

    pub const fn hm(hour: u32, minute: u32) -> Self {
        Self {
            hour,
            minute,
            second: None,
        }
    }

    fn second_or_zero(&self) -> u32 {
        self.second.unwrap_or(0)
    }

    /// Places this time on `date`.
    pub fn on(&self, date: NaiveDate) -> Result<NaiveDateTime, ParseError> {
        date.and_hms_opt(self.hour, self.minute, self.second_or_zero())
            .ok_or(ParseError::InvalidTime {
                hour: self.hour,
                minute: self.minute,
                second: self.second_or_zero(),
            })
    }

    fn digits(&self) -> String {
        format!(
            "{:02}{:02}{:02}",
            self.hour,
            self.minute,
            self.second_or_zero()
        )
    }
}

/// The target of a resume-by-time line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskRef {
    /// Explicit `(year, month, day)`; `None` means the current day.
    pub date: Option<(u32, u32, u32)>,
    pub time: TimeOfDay,
}

impl TaskRef {
    /// The identifier this reference points at when read on `today`.
    ///
    /// The digits are copied as written, so an impossible date simply yields
    /// an identifier no task can have.
    pub fn task_id(&self, today: NaiveDate) -> TaskId {
        let date = self.date.map_or_else(
            || today.format("%Y%m%d").to_string(),
            |(year, month, day)| format!("{year:04}{month:02}{day:02}"),
        );
        TaskId::from_digits(date + &self.time.digits())
    }
}

/// One classified log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Empty line or comment.
    Blank,
    /// Sets the active calendar day.
    Day(NaiveDate),
    /// Opens a new task, closing the current one.
    NewTask {
        time: TimeOfDay,
        description: String,
        tags: BTreeSet<String>,
    },
    /// Closes the current task.
    Stop(TimeOfDay),
    /// Reopens the task whose id matches `target`.
    ResumeAt { time: TimeOfDay, target: TaskRef },
    /// Reopens the task active before the current one.
    ResumeLast(TimeOfDay),
}

/// Classifies a raw line. The line is not trimmed first.
pub fn classify(line: &str) -> Result<Line, ParseError> {
    if line.is_empty() || line.starts_with("# ") || line.starts_with("#\t") {
        return Ok(Line::Blank);
    }

    let head: Vec<char> = line.chars().take(8).collect();
    let Some(&fifth) = head.get(4) else {
        return Err(ParseError::Syntax);
    };
    if fifth.is_ascii_digit() && head.len() < 7 {
        return Err(ParseError::Syntax);
    }

    if fifth == '-' {
        return parse_day(line);
    }

    // Column right after HHMM or HHMMSS.
    let i = if fifth.is_ascii_digit() { 6 } else { 4 };

    match head[i] {
        ' ' | '\t' => parse_new_task(line),
        '.' => parse_stop(line),
        '^' if head.get(i + 1).is_some_and(char::is_ascii_digit) => parse_resume_at(line),
        _ => parse_resume_last(line),
    }
}

fn number(caps: &Captures<'_>, group: usize) -> Result<u32, ParseError> {
    caps.get(group)
        .ok_or(ParseError::Syntax)?
        .as_str()
        .parse()
        .map_err(|_| ParseError::Syntax)
}

fn optional_number(caps: &Captures<'_>, group: usize) -> Result<Option<u32>, ParseError> {
    caps.get(group)
        .map(|m| m.as_str().parse().map_err(|_| ParseError::Syntax))
        .transpose()
}

/// Reads `HH`, `MM` and the optional `SS` starting at capture group `first`.
fn time_at(caps: &Captures<'_>, first: usize) -> Result<TimeOfDay, ParseError> {
    Ok(TimeOfDay {
        hour: number(caps, first)?,
        minute: number(caps, first + 1)?,
        second: optional_number(caps, first + 2)?,
    })
}

fn parse_day(line: &str) -> Result<Line, ParseError> {
    let caps = DAY_RE.captures(line).ok_or(ParseError::Syntax)?;
    let year = number(&caps, 1)?;
    let month = number(&caps, 2)?;
    let day = number(&caps, 3)?;
    let year = i32::try_from(year).map_err(|_| ParseError::Syntax)?;

    NaiveDate::from_ymd_opt(year, month, day)
        .map(Line::Day)
        .ok_or(ParseError::InvalidDate { year, month, day })
}

fn parse_new_task(line: &str) -> Result<Line, ParseError> {
    let caps = NEW_RE.captures(line).ok_or(ParseError::Syntax)?;
    let time = time_at(&caps, 1)?;
    let raw = caps.get(4).ok_or(ParseError::Syntax)?.as_str();
    let (description, tags) = extract_tags(raw);

    Ok(Line::NewTask {
        time,
        description,
        tags,
    })
}

fn parse_stop(line: &str) -> Result<Line, ParseError> {
    let caps = STOP_RE.captures(line).ok_or(ParseError::Syntax)?;
    Ok(Line::Stop(time_at(&caps, 1)?))
}

fn parse_resume_at(line: &str) -> Result<Line, ParseError> {
    let caps = RESUME_AT_RE.captures(line).ok_or(ParseError::Syntax)?;
    let time = time_at(&caps, 1)?;

    let date = match optional_number(&caps, 4)? {
        Some(year) => Some((year, number(&caps, 5)?, number(&caps, 6)?)),
        None => None,
    };
    let target = TaskRef {
        date,
        time: time_at(&caps, 7)?,
    };

    Ok(Line::ResumeAt { time, target })
}

fn parse_resume_last(line: &str) -> Result<Line, ParseError> {
    let caps = RESUME_LAST_RE.captures(line).ok_or(ParseError::Syntax)?;
    Ok(Line::ResumeLast(time_at(&caps, 1)?))
}

/// Splits `#tag` tokens out of a task description.
///
/// A tag is `#` followed by letters, digits or underscores, with a space or tab
/// (or the edge of the description) on both sides. Tags are removed together
/// with the whitespace in front of them and the rest is trimmed.
pub fn extract_tags(description: &str) -> (String, BTreeSet<String>) {
    let mut tags = BTreeSet::new();
    let mut stripped = String::with_capacity(description.len());
    let mut last = 0;

    for caps in TAG_RE.captures_iter(description) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
            continue;
        };
        let bounded = description[whole.end()..]
            .chars()
            .next()
            .is_none_or(|c| c == ' ' || c == '\t');
        if !bounded {
            continue;
        }

        stripped.push_str(&description[last..whole.start()]);
        last = whole.end();
        tags.insert(name.as_str().to_string());
    }
    stripped.push_str(&description[last..]);

    (stripped.trim().to_string(), tags)
}
