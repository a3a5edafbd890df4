//! Derived per-task temporal state.
//!
//! Every function here is pure over `(task, next_task, now)`. Callers read
//! the clock once per refresh and pass the same `now` to every task so a
//! frame never mixes two instants.

use chrono::{NaiveDateTime, Timelike};

use crate::task::Task;

/// The derived view of a task at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    pub scheduled_end: Option<NaiveDateTime>,
    pub has_explicit_time: bool,
    pub is_active: bool,
    pub should_be_active: bool,
    pub is_overdue: bool,
    pub is_completed: bool,
}

impl TimeSlot {
    pub fn derive(task: &Task, next_task: Option<&Task>, now: NaiveDateTime) -> Self {
        Self {
            scheduled_end: scheduled_end(task),
            has_explicit_time: task.scheduled.is_some_and(has_explicit_time),
            is_active: task.is_active(),
            should_be_active: should_be_active(task, next_task, now),
            is_overdue: is_overdue(task, now),
            is_completed: task.is_completed(),
        }
    }
}

/// `scheduled + estimate`, when both are known and the sum is a valid
/// datetime.
pub fn scheduled_end(task: &Task) -> Option<NaiveDateTime> {
    task.scheduled?.checked_add_signed(task.estimate?)
}

/// False only for exact midnight, which the backend uses for date-only
/// schedules.
pub fn has_explicit_time(scheduled: NaiveDateTime) -> bool {
    !(scheduled.hour() == 0
        && scheduled.minute() == 0
        && scheduled.second() == 0
        && scheduled.nanosecond() == 0)
}

/// `now` within `[scheduled, scheduled_end)`, or within
/// `[scheduled, next_task.scheduled)` when the task has no estimate.
pub fn should_be_active(task: &Task, next_task: Option<&Task>, now: NaiveDateTime) -> bool {
    let Some(start) = task.scheduled else {
        return false;
    };
    let end = match scheduled_end(task) {
        Some(end) => end,
        None => match next_task.and_then(|next| next.scheduled) {
            Some(next_start) => next_start,
            None => return false,
        },
    };
    start <= now && now < end
}

/// Past its end (or its start, without an estimate) and not completed.
pub fn is_overdue(task: &Task, now: NaiveDateTime) -> bool {
    if task.is_completed() {
        return false;
    }
    let Some(start) = task.scheduled else {
        return false;
    };
    match scheduled_end(task) {
        Some(end) => now > end,
        None => now > start,
    }
}
