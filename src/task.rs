//! Task records as handed to the core by a [`TaskStore`](crate::store::TaskStore).
//!
//! The core treats tasks as read-only snapshots. Attributes it does not
//! model (arbitrary user-defined fields) ride along in [`Task::extra`] so a
//! store can write the record back without losing data.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Deleted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Deleted => "deleted",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" | "waiting" | "recurring" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "deleted" => Ok(TaskStatus::Deleted),
            other => Err(Error::InvalidTaskRecord(format!("unknown status '{other}'"))),
        }
    }
}

/// A schedulable unit of work.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    /// Working-set id; `None` or `Some(0)` marks a placeholder.
    pub id: Option<u32>,
    pub uuid: Uuid,
    pub description: String,
    pub project: Option<String>,
    pub status: TaskStatus,
    pub scheduled: Option<NaiveDateTime>,
    pub estimate: Option<Duration>,
    /// Set while the task is started.
    pub active_start: Option<NaiveDateTime>,
    pub timebox_estimate: Option<u32>,
    pub timebox_real: Option<u32>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Task {
    pub fn has_placeholder_id(&self) -> bool {
        matches!(self.id, None | Some(0))
    }

    /// The id as shown in the id column, blank for placeholders.
    pub fn display_id(&self) -> String {
        match self.id {
            Some(id) if id != 0 => id.to_string(),
            _ => String::new(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_active(&self) -> bool {
        self.active_start.is_some()
    }
}

/// Parse an ISO-8601 duration such as `PT1H11M` or `P1DT2H`.
///
/// Years and months are taken as 365 and 30 days.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let invalid = || Error::InvalidTaskRecord(format!("invalid duration '{raw}'"));

    let body = raw.strip_prefix('P').ok_or_else(invalid)?;
    if body.is_empty() {
        return Err(invalid());
    }
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) if !time.is_empty() => (date, Some(time)),
        Some(_) => return Err(invalid()),
        None => (body, None),
    };

    let mut total = Duration::zero();
    for (value, unit) in duration_components(date_part).ok_or_else(invalid)? {
        let step = match unit {
            'Y' => value.checked_mul(365).and_then(Duration::try_days),
            'M' => value.checked_mul(30).and_then(Duration::try_days),
            'W' => Duration::try_weeks(value),
            'D' => Duration::try_days(value),
            _ => return Err(invalid()),
        };
        total = step.and_then(|s| total.checked_add(&s)).ok_or_else(invalid)?;
    }
    if let Some(time_part) = time_part {
        for (value, unit) in duration_components(time_part).ok_or_else(invalid)? {
            let step = match unit {
                'H' => Duration::try_hours(value),
                'M' => Duration::try_minutes(value),
                'S' => Duration::try_seconds(value),
                _ => return Err(invalid()),
            };
            total = step.and_then(|s| total.checked_add(&s)).ok_or_else(invalid)?;
        }
    }
    Ok(total)
}

fn duration_components(part: &str) -> Option<Vec<(i64, char)>> {
    let mut components = Vec::new();
    let mut digits = String::new();
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if digits.is_empty() {
                return None;
            }
            components.push((digits.parse().ok()?, c));
            digits.clear();
        }
    }
    if !digits.is_empty() {
        return None;
    }
    Some(components)
}

/// Format a duration the way Taskwarrior stores duration UDAs.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::from("P");
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || seconds > 0 || days == 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if seconds > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{seconds}S"));
        }
    }
    out
}
