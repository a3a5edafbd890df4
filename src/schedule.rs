//! Time-bucketing over the tasks of a date range.
//!
//! The task list is pulled from the store lazily and cached as a whole;
//! [`Schedule::clear_cache`] drops it and the next read re-queries. Nothing
//! here mutates a loaded list in place.

use std::collections::{BTreeMap, HashMap};
use std::time::SystemTime;

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::store::TaskStore;
use crate::task::Task;
use crate::{tlog_debug, Result};

/// Hour key (`"00"`..`"23"`) to tasks.
pub type HourSlots = BTreeMap<String, Vec<Task>>;
/// ISO date key (`"2019-10-12"`) to its hours.
pub type TimeSlots = BTreeMap<String, HourSlots>;

/// Task fields whose rendered width drives the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Description,
    Project,
}

impl Column {
    fn width(&self, task: &Task) -> usize {
        match self {
            Column::Id => task.id.map_or(0, |id| id.to_string().len()),
            Column::Description => task.description.chars().count(),
            Column::Project => task.project.as_deref().map_or(0, |p| p.chars().count()),
        }
    }
}

pub struct Schedule {
    store: Box<dyn TaskStore>,
    scheduled_after: NaiveDateTime,
    scheduled_before: NaiveDateTime,
    include_completed: bool,
    cache: Option<Vec<Task>>,
}

impl Schedule {
    pub fn new(
        store: Box<dyn TaskStore>,
        scheduled_after: NaiveDateTime,
        scheduled_before: NaiveDateTime,
        include_completed: bool,
    ) -> Self {
        Self {
            store,
            scheduled_after,
            scheduled_before,
            include_completed,
            cache: None,
        }
    }

    pub fn scheduled_after(&self) -> NaiveDateTime {
        self.scheduled_after
    }

    pub fn scheduled_before(&self) -> NaiveDateTime {
        self.scheduled_before
    }

    /// Re-query the store and replace the cached task list.
    ///
    /// On failure the cache stays empty and the error is returned as is.
    pub fn reload(&mut self) -> Result<()> {
        self.cache = None;
        let mut tasks = self.store.query(
            self.scheduled_after,
            self.scheduled_before,
            self.include_completed,
        )?;
        tasks.retain(|t| t.scheduled.is_some());
        tasks.sort_by_key(|t| t.scheduled);
        tlog_debug!(
            "Schedule::reload {}..{} -> {} tasks",
            self.scheduled_after,
            self.scheduled_before,
            tasks.len()
        );
        self.cache = Some(tasks);
        Ok(())
    }

    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.cache.is_some()
    }

    /// Scheduled tasks in ascending `scheduled` order, loading on first use.
    pub fn tasks(&mut self) -> Result<&[Task]> {
        if self.cache.is_none() {
            self.reload()?;
        }
        Ok(self.cache.as_deref().unwrap_or_default())
    }

    /// Every calendar day of the range, inclusive on both ends.
    pub fn days(&self) -> Vec<NaiveDate> {
        let last = self.scheduled_before.date();
        self.scheduled_after
            .date()
            .iter_days()
            .take_while(|day| *day <= last)
            .collect()
    }

    pub fn get_time_slots(&mut self) -> Result<TimeSlots> {
        let days = self.days();
        Ok(bucket(self.tasks()?, &days))
    }

    /// Widest rendering of `column` over all tasks; 0 when there are none.
    pub fn get_max_length(&mut self, column: Column) -> Result<usize> {
        Ok(self
            .tasks()?
            .iter()
            .map(|t| column.width(t))
            .max()
            .unwrap_or(0))
    }

    pub fn get_column_offsets(&mut self) -> Result<[usize; 6]> {
        let max_id = self.get_max_length(Column::Id)?;
        let max_project = self.get_max_length(Column::Project)?;
        Ok(column_offsets(max_id, max_project))
    }

    pub fn get_next_task(&mut self, task: &Task) -> Result<Option<Task>> {
        Ok(next_task(self.tasks()?, task).cloned())
    }

    pub fn get_timebox_estimate_count(&mut self) -> Result<u32> {
        Ok(self
            .tasks()?
            .iter()
            .map(|t| t.timebox_estimate.unwrap_or(0))
            .sum())
    }

    pub fn get_timebox_real_count(&mut self) -> Result<u32> {
        Ok(self.tasks()?.iter().map(|t| t.timebox_real.unwrap_or(0)).sum())
    }

    /// The last started task that carries a timebox estimate.
    pub fn get_active_timeboxed_task(&mut self) -> Result<Option<Task>> {
        Ok(self
            .tasks()?
            .iter()
            .rev()
            .find(|t| t.is_active() && t.timebox_estimate.is_some())
            .cloned())
    }

    /// Book one finished timebox on `task`, stop it and drop the cache.
    pub fn record_timebox(&mut self, task: &Task) -> Result<()> {
        let mut updated = task.clone();
        updated.timebox_real = Some(task.timebox_real.unwrap_or(0) + 1);
        self.clear_cache();
        self.store.save(&updated)?;
        self.store.stop(&updated)?;
        tlog_debug!(
            "Schedule::record_timebox uuid={} real={:?}",
            task.uuid,
            updated.timebox_real
        );
        Ok(())
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.store.last_modified()
    }
}

/// `[hour, id, time, timebox, project, description]` start columns.
pub fn column_offsets(max_id_len: usize, max_project_len: usize) -> [usize; 6] {
    let id = 5;
    let time = id + max_id_len + 1;
    let timebox = time + 12;
    let project = timebox + 10;
    let description = project + (max_project_len + 1).max(8);
    [0, id, time, timebox, project, description]
}

/// The first task scheduled strictly later than `task`.
///
/// `tasks` must be sorted by `scheduled`; among equal timestamps the
/// earliest in order wins.
pub fn next_task<'a>(tasks: &'a [Task], task: &Task) -> Option<&'a Task> {
    let start = task.scheduled?;
    tasks
        .iter()
        .find(|candidate| candidate.scheduled.is_some_and(|s| s > start))
}

/// Group sorted tasks into day and hour buckets for `days`.
///
/// Every hour of every day is present, possibly empty. Tasks outside
/// `days` are dropped; bucket order follows `tasks` order.
pub fn bucket(tasks: &[Task], days: &[NaiveDate]) -> TimeSlots {
    let mut grouped: HashMap<(NaiveDate, u32), Vec<Task>> = HashMap::new();
    for task in tasks {
        if let Some(scheduled) = task.scheduled {
            grouped
                .entry((scheduled.date(), scheduled.hour()))
                .or_default()
                .push(task.clone());
        }
    }

    days.iter()
        .map(|day| {
            let hours = (0..24)
                .map(|hour| {
                    let slot = grouped.remove(&(*day, hour)).unwrap_or_default();
                    (format!("{hour:02}"), slot)
                })
                .collect();
            (day.format("%Y-%m-%d").to_string(), hours)
        })
        .collect()
}
