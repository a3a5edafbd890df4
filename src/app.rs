//! Refresh loop.
//!
//! One cooperative loop on the main thread: read a key, scroll or reload
//! as asked, re-pull from the store when the interval has elapsed, rebuild
//! the frame and hand it to the painter. A store outage keeps the last
//! good frame on screen and is retried on the next interval.

use std::thread;
use std::time::{Duration, SystemTime};

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

use crate::hooks::{HookRunner, TaskSnapshot, ON_PROGRESS};
use crate::layout::compute_offsets;
use crate::paint::{Key, Painter, Renderer};
use crate::render::{self, BufferOptions, DrawInstruction};
use crate::schedule::{next_task, Schedule};
use crate::task::Task;
use crate::timeslot::TimeSlot;
use crate::{tlog, tlog_debug, tlog_warn, Result};

/// Pause between ticks.
pub const TICK_SLEEP: Duration = Duration::from_millis(20);

/// Rows kept in view when paging.
const PAGE_OVERLAP: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Totals {
    tasks: usize,
    timebox_real: u32,
    timebox_estimate: u32,
}

pub struct App {
    schedule: Schedule,
    painter: Painter,
    options: BufferOptions,
    refresh_interval: Duration,
    hooks: Option<Box<dyn HookRunner>>,
    last_refresh: Option<NaiveDateTime>,
    last_stamp: Option<SystemTime>,
    current_task: Option<Uuid>,
    stale: Option<String>,
    totals: Totals,
}

impl App {
    pub fn new(
        schedule: Schedule,
        options: BufferOptions,
        refresh_interval: Duration,
        hooks: Option<Box<dyn HookRunner>>,
    ) -> Self {
        Self {
            schedule,
            painter: Painter::new(),
            options,
            refresh_interval,
            hooks,
            last_refresh: None,
            last_stamp: None,
            current_task: None,
            stale: None,
            totals: Totals::default(),
        }
    }

    pub fn painter(&self) -> &Painter {
        &self.painter
    }

    /// Message of the last failed refresh, while the frame is stale.
    pub fn stale(&self) -> Option<&str> {
        self.stale.as_deref()
    }

    /// Run until the user quits.
    pub fn run(&mut self, renderer: &mut dyn Renderer) -> Result<()> {
        tlog!(
            "Refresh loop started: {} .. {}, every {:?}",
            self.schedule.scheduled_after(),
            self.schedule.scheduled_before(),
            self.refresh_interval
        );
        loop {
            let now = Local::now().naive_local();
            if self.tick(renderer, now)? == TickOutcome::Quit {
                tlog!("Quit requested");
                return Ok(());
            }
            thread::sleep(TICK_SLEEP);
        }
    }

    /// One pass of the loop, with `now` fixed for the whole frame.
    pub fn tick(&mut self, renderer: &mut dyn Renderer, now: NaiveDateTime) -> Result<TickOutcome> {
        let mut reload = false;
        let mut force = false;

        if let Some(key) = renderer.read_key_nonblocking()? {
            let (rows, _) = renderer.dimensions();
            let page = rows.saturating_sub(PAGE_OVERLAP).max(1) as isize;
            let delta = match key {
                Key::Quit => return Ok(TickOutcome::Quit),
                Key::Up => -1,
                Key::Down => 1,
                Key::PageUp => -page,
                Key::PageDown => page,
                Key::Refresh => {
                    reload = true;
                    0
                }
                Key::Resize => {
                    reload = true;
                    force = true;
                    0
                }
                Key::Other => 0,
            };
            if delta != 0 {
                self.painter.scroll(delta);
                let footnote = self.footnote();
                self.painter.paint(renderer, true, &footnote)?;
                return Ok(TickOutcome::Continue);
            }
        }

        if reload || self.refresh_due(now) {
            self.refresh(renderer, now, reload, force)?;
        }
        Ok(TickOutcome::Continue)
    }

    fn refresh_due(&self, now: NaiveDateTime) -> bool {
        let Some(last) = self.last_refresh else {
            return true;
        };
        // a clock that went backwards counts as due
        match (now - last).to_std() {
            Ok(elapsed) => elapsed >= self.refresh_interval,
            Err(_) => true,
        }
    }

    fn refresh(
        &mut self,
        renderer: &mut dyn Renderer,
        now: NaiveDateTime,
        reload: bool,
        force: bool,
    ) -> Result<()> {
        self.last_refresh = Some(now);

        let stamp = self.schedule.last_modified();
        if reload || stamp.is_none() || stamp != self.last_stamp {
            tlog_debug!("Store changed or reload requested, dropping cache");
            self.schedule.clear_cache();
        }

        match self.rebuild(renderer, now) {
            Ok(buffer) => {
                self.last_stamp = stamp;
                if self.stale.take().is_some() {
                    tlog!("Store reachable again");
                }
                self.painter.replace_buffer(buffer);
            }
            Err(e) if !e.is_fatal() => {
                tlog_warn!("Refresh failed, keeping previous frame: {}", e);
                self.last_stamp = None;
                self.stale = Some(e.to_string());
            }
            Err(e) => return Err(e),
        }

        let footnote = self.footnote();
        self.painter.paint(renderer, force, &footnote)?;
        Ok(())
    }

    fn rebuild(&mut self, renderer: &dyn Renderer, now: NaiveDateTime) -> Result<Vec<DrawInstruction>> {
        self.track_timebox(now)?;
        self.track_progress(now)?;

        let dims = renderer.dimensions();
        let offsets = compute_offsets(&mut self.schedule, dims.1)?;
        let buffer = render::build(&mut self.schedule, &offsets, now, &self.options, dims)?;

        self.totals = Totals {
            tasks: self.schedule.tasks()?.len(),
            timebox_real: self.schedule.get_timebox_real_count()?,
            timebox_estimate: self.schedule.get_timebox_estimate_count()?,
        };
        Ok(buffer)
    }

    /// Book a timebox once the active timeboxed task has run its length.
    fn track_timebox(&mut self, now: NaiveDateTime) -> Result<()> {
        let Some(task) = self.schedule.get_active_timeboxed_task()? else {
            return Ok(());
        };
        let Some(start) = task.active_start else {
            return Ok(());
        };
        let length = chrono::Duration::minutes(i64::from(self.options.timebox.time));
        match start.checked_add_signed(length) {
            Some(end) if end <= now => {}
            _ => return Ok(()),
        }

        match self.schedule.record_timebox(&task) {
            Ok(()) => tlog!("Timebox finished for task {}", task.display_id()),
            Err(e) => tlog_warn!("Failed to record timebox for {}: {}", task.uuid, e),
        }
        Ok(())
    }

    /// Fire the progress hook when the task that should be running changes.
    fn track_progress(&mut self, now: NaiveDateTime) -> Result<()> {
        let current = due_task(self.schedule.tasks()?, now);
        let uuid = current.as_ref().map(|t| t.uuid);
        if uuid == self.current_task {
            return Ok(());
        }
        self.current_task = uuid;

        let (Some(task), Some(hooks)) = (current, self.hooks.as_mut()) else {
            return Ok(());
        };
        tlog_debug!("Task {} should now be in progress", task.uuid);
        hooks.dispatch(ON_PROGRESS, &TaskSnapshot::from(&task));
        Ok(())
    }

    fn footnote(&self) -> String {
        let mut line = format!(
            "{} tasks | timebox {}/{}",
            self.totals.tasks, self.totals.timebox_real, self.totals.timebox_estimate
        );
        if let Some(stale) = &self.stale {
            line.push_str(&format!(" | stale: {}", stale));
        }
        line
    }
}

/// First task that should be running at `now` and has not been started
/// or finished.
pub fn due_task(tasks: &[Task], now: NaiveDateTime) -> Option<Task> {
    tasks
        .iter()
        .filter(|t| !t.is_completed() && !t.is_active())
        .find(|t| TimeSlot::derive(t, next_task(tasks, t), now).should_be_active)
        .cloned()
}
