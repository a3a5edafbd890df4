//! Render buffer construction.
//!
//! Turns the bucketed schedule into an ordered list of [`DrawInstruction`]s.
//! Rows are absolute grid rows (row 0 is the column header); scrolling and
//! clipping to the viewport happen later in [`crate::paint`]. Nothing here
//! touches the terminal.

use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::config::TimeboxConfig;
use crate::layout::{Offsets, GLYPH_COLUMN};
use crate::schedule::{next_task, Schedule, TimeSlots};
use crate::task::Task;
use crate::timeslot::TimeSlot;
use crate::Result;

pub const TASK_GLYPH: &str = "○";
pub const DIVIDER_GLYPH: &str = "─";

/// Column where row fills start; hour and glyph sit to the left of it.
const FILL_COLUMN: usize = 5;

/// Semantic cell styles; the renderer maps them to colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStyle {
    Default,
    DefaultAlternate,
    Header,
    Hour,
    HourCurrent,
    Divider,
    DividerToday,
    Glyph,
    Active,
    ShouldBeActive,
    ShouldBeActiveAlternate,
    Overdue,
    OverdueAlternate,
    Completed,
    CompletedAlternate,
    Footnote,
    Placeholder,
}

impl CellStyle {
    /// Row style by priority: completed, active, should-be-active,
    /// overdue, default.
    pub fn for_task(slot: &TimeSlot, alternate: bool) -> Self {
        let pick = |plain, alt| if alternate { alt } else { plain };
        if slot.is_completed {
            pick(CellStyle::Completed, CellStyle::CompletedAlternate)
        } else if slot.is_active {
            CellStyle::Active
        } else if slot.should_be_active {
            pick(CellStyle::ShouldBeActive, CellStyle::ShouldBeActiveAlternate)
        } else if slot.is_overdue {
            pick(CellStyle::Overdue, CellStyle::OverdueAlternate)
        } else {
            CellStyle::zebra(alternate)
        }
    }

    pub fn zebra(alternate: bool) -> Self {
        if alternate {
            CellStyle::DefaultAlternate
        } else {
            CellStyle::Default
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawInstruction {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub style: CellStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BufferOptions {
    pub hide_empty: bool,
    pub hide_projects: bool,
    pub timebox: TimeboxConfig,
}

/// Number of grid rows a buffer spans.
pub fn row_count(buffer: &[DrawInstruction]) -> usize {
    buffer.iter().map(|i| i.row + 1).max().unwrap_or(0)
}

/// Build the draw instructions for one frame. `terminal_dims` is
/// `(rows, cols)`; rows past the viewport are still emitted.
///
/// Returns an empty buffer when the schedule has no tasks.
pub fn build(
    schedule: &mut Schedule,
    offsets: &Offsets,
    now: NaiveDateTime,
    options: &BufferOptions,
    terminal_dims: (usize, usize),
) -> Result<Vec<DrawInstruction>> {
    let (_, width) = terminal_dims;
    let slots = schedule.get_time_slots()?;
    let tasks = schedule.tasks()?;
    Ok(build_from(tasks, &slots, offsets, now, options, width))
}

/// [`build`] over already loaded data.
pub fn build_from(
    tasks: &[Task],
    slots: &TimeSlots,
    offsets: &Offsets,
    now: NaiveDateTime,
    options: &BufferOptions,
    width: usize,
) -> Vec<DrawInstruction> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let mut grid = Grid::new(width);
    draw_header(&mut grid, offsets, options);
    grid.next_row();

    let today = now.date();
    for (day_key, hours) in slots {
        let Ok(day) = NaiveDate::parse_from_str(day_key, "%Y-%m-%d") else {
            continue;
        };
        let is_today = day == today;
        draw_divider(&mut grid, offsets, day, is_today);
        grid.next_row();

        let mut alternate = true;
        for (hour_key, bucket) in hours {
            let current_hour =
                is_today && hour_key.parse::<u32>().is_ok_and(|h| h == now.hour());
            let hour_style = if current_hour {
                CellStyle::HourCurrent
            } else {
                CellStyle::Hour
            };

            if bucket.is_empty() {
                if !options.hide_empty {
                    grid.fill(CellStyle::zebra(alternate));
                    grid.put(offsets.hour(), hour_key, hour_style);
                    grid.next_row();
                    alternate = !alternate;
                }
                continue;
            }

            for (index, task) in bucket.iter().enumerate() {
                let slot = TimeSlot::derive(task, next_task(tasks, task), now);
                let style = CellStyle::for_task(&slot, alternate);
                grid.fill(style);
                if index == 0 {
                    grid.put(offsets.hour(), hour_key, hour_style);
                }
                draw_task(&mut grid, offsets, options, task, &slot, style);
                grid.next_row();
                alternate = !alternate;
            }
        }
    }

    grid.into_instructions()
}

fn draw_header(grid: &mut Grid, offsets: &Offsets, options: &BufferOptions) {
    grid.put(offsets.id(), "ID", CellStyle::Header);
    grid.put(offsets.time(), "Time", CellStyle::Header);
    grid.put(offsets.timebox(), "Timebox", CellStyle::Header);
    if options.hide_projects {
        grid.put(offsets.project(), "Description", CellStyle::Header);
    } else {
        grid.put(offsets.project(), "Project", CellStyle::Header);
        grid.put(offsets.description(), "Description", CellStyle::Header);
    }
}

fn draw_divider(grid: &mut Grid, offsets: &Offsets, day: NaiveDate, is_today: bool) {
    let lead = offsets.time().saturating_sub(1);
    grid.put(0, &DIVIDER_GLYPH.repeat(lead), CellStyle::Divider);

    let label = format!(" {} ", day.format("%a %d %b %Y"));
    let label_style = if is_today {
        CellStyle::DividerToday
    } else {
        CellStyle::Divider
    };
    grid.put(lead, &label, label_style);

    let tail = lead + label.chars().count();
    grid.put(
        tail,
        &DIVIDER_GLYPH.repeat(grid.width.saturating_sub(tail)),
        CellStyle::Divider,
    );
}

fn draw_task(
    grid: &mut Grid,
    offsets: &Offsets,
    options: &BufferOptions,
    task: &Task,
    slot: &TimeSlot,
    style: CellStyle,
) {
    grid.put(GLYPH_COLUMN, TASK_GLYPH, CellStyle::Glyph);

    if !task.has_placeholder_id() {
        grid.put(offsets.id(), &task.display_id(), style);
    }

    if let Some(time) = time_cell(task, slot) {
        grid.put(offsets.time(), &time, style);
    }

    let timebox = timebox_cell(task, &options.timebox);
    if !timebox.is_empty() {
        grid.put(offsets.timebox(), &timebox, style);
    }

    let description_col = if options.hide_projects {
        offsets.project()
    } else {
        if let Some(project) = &task.project {
            grid.put(offsets.project(), &clip(project, offsets.project_width()), style);
        }
        offsets.description()
    };
    grid.put(description_col, &task.description, style);
}

/// `HH:MM` or `HH:MM-HH:MM`; `None` for date-only schedules.
pub fn time_cell(task: &Task, slot: &TimeSlot) -> Option<String> {
    let start = task.scheduled?;
    if !slot.has_explicit_time {
        return None;
    }
    let start = start.format("%H:%M");
    Some(match slot.scheduled_end {
        Some(end) => format!("{}-{}", start, end.format("%H:%M")),
        None => start.to_string(),
    })
}

/// Done, over-estimate and pending glyph runs for the timebox counters.
pub fn timebox_cell(task: &Task, glyphs: &TimeboxConfig) -> String {
    let estimate = task.timebox_estimate.unwrap_or(0) as usize;
    let real = task.timebox_real.unwrap_or(0) as usize;

    let mut cell = glyphs.done_glyph.repeat(real.min(estimate));
    cell.push_str(&glyphs.underestimated_glyph.repeat(real.saturating_sub(estimate)));
    cell.push_str(&glyphs.pending_glyph.repeat(estimate.saturating_sub(real)));
    cell
}

/// First `max` characters of `s`.
pub fn clip(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// Accumulates instructions row by row, clipping each to the width.
struct Grid {
    width: usize,
    row: usize,
    out: Vec<DrawInstruction>,
}

impl Grid {
    fn new(width: usize) -> Self {
        Self {
            width,
            row: 0,
            out: Vec::new(),
        }
    }

    fn put(&mut self, col: usize, text: &str, style: CellStyle) {
        if col >= self.width {
            return;
        }
        let text = clip(text, self.width - col);
        if text.is_empty() {
            return;
        }
        self.out.push(DrawInstruction {
            row: self.row,
            col,
            text,
            style,
        });
    }

    /// Background for the whole row right of the glyph.
    fn fill(&mut self, style: CellStyle) {
        let blank = " ".repeat(self.width.saturating_sub(FILL_COLUMN));
        self.put(FILL_COLUMN, &blank, style);
    }

    fn next_row(&mut self) {
        self.row += 1;
    }

    fn into_instructions(self) -> Vec<DrawInstruction> {
        self.out
    }
}
