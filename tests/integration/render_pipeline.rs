//! Buffer building and painting through a recording renderer.

use tasksched::config::TimeboxConfig;
use tasksched::layout::compute_offsets;
use tasksched::paint::{Painter, PLACEHOLDER_TEXT};
use tasksched::render::{self, row_count, BufferOptions, CellStyle, DrawInstruction};
use tasksched::store::MemoryStore;
use tasksched::{Schedule, TaskStatus};

use crate::fixtures::{at, schedule_over, task, three_day_tasks, RecordingRenderer};

fn options() -> BufferOptions {
    BufferOptions {
        hide_empty: true,
        hide_projects: false,
        timebox: TimeboxConfig::default(),
    }
}

fn frame(schedule: &mut Schedule, opts: &BufferOptions, now: chrono::NaiveDateTime, cols: usize) -> Vec<DrawInstruction> {
    let offsets = compute_offsets(schedule, cols).unwrap();
    render::build(schedule, &offsets, now, opts, (40, cols)).unwrap()
}

/// Given a three-day schedule
/// When it is rendered with empty hours hidden
/// Then each day gets a divider followed by its task rows
#[test]
fn test_dividers_and_task_rows() {
    let store = MemoryStore::new(three_day_tasks());
    let mut schedule = schedule_over(&store, 1, 1);
    let buffer = frame(&mut schedule, &options(), at(0, 12, 0), 80);

    let mut r = RecordingRenderer::new(40, 80);
    let mut painter = Painter::new();
    painter.replace_buffer(buffer.clone());
    painter.paint(&mut r, false, "5 tasks").unwrap();

    // header, 3 dividers, 5 tasks
    assert_eq!(row_count(&buffer), 9);
    assert!(r.line(0).contains("Description"));
    assert!(r.line(1).contains("Fri 11 Oct 2019"));
    assert!(r.line(1).starts_with('─'));
    assert!(r.line(3).contains("Sat 12 Oct 2019"));
    assert!(r.line(4).starts_with("09 ○ 2 09:00-10:11"));
    assert!(r.line(4).ends_with("morning writing"));
    assert!(r.line(7).contains("Sun 13 Oct 2019"));
    assert!(r.line(8).contains("08:00"));
    assert_eq!(r.visible().last().map(String::as_str), Some("5 tasks"));
}

/// Today's divider label is highlighted; other days are not.
#[test]
fn test_today_divider_style() {
    let store = MemoryStore::new(three_day_tasks());
    let mut schedule = schedule_over(&store, 1, 1);
    let buffer = frame(&mut schedule, &options(), at(0, 12, 0), 80);

    let labels: Vec<(String, CellStyle)> = buffer
        .iter()
        .filter(|i| i.text.contains("2019"))
        .map(|i| (i.text.clone(), i.style))
        .collect();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0].1, CellStyle::Divider);
    assert_eq!(labels[1].1, CellStyle::DividerToday);
    assert_eq!(labels[2].1, CellStyle::Divider);
}

/// Row styles follow the clock passed in, not the wall clock.
#[test]
fn test_styles_follow_now() {
    let mut done = task(1, "done", at(0, 8, 0), Some(30));
    done.status = TaskStatus::Completed;
    let tasks = vec![
        done,
        task(2, "missed", at(0, 9, 0), Some(30)),
        task(3, "current", at(0, 10, 0), Some(60)),
        task(4, "upcoming", at(0, 13, 0), Some(30)),
    ];
    let store = MemoryStore::new(tasks);
    let mut schedule = schedule_over(&store, 0, 0);
    let buffer = frame(&mut schedule, &options(), at(0, 10, 30), 80);
    let style = |text: &str| buffer.iter().find(|i| i.text == text).unwrap().style;

    assert_eq!(style("done"), CellStyle::CompletedAlternate);
    assert_eq!(style("missed"), CellStyle::Overdue);
    assert_eq!(style("current"), CellStyle::ShouldBeActiveAlternate);
    assert_eq!(style("upcoming"), CellStyle::Default);

    let later = frame(&mut schedule, &options(), at(0, 13, 10), 80);
    let style = |text: &str| later.iter().find(|i| i.text == text).unwrap().style;
    assert_eq!(style("current"), CellStyle::OverdueAlternate);
    assert_eq!(style("upcoming"), CellStyle::ShouldBeActive);
}

/// Started tasks render as active regardless of the clock.
#[test]
fn test_started_task_is_active() {
    let mut started = task(1, "started", at(0, 9, 0), Some(30));
    started.active_start = Some(at(0, 9, 5));
    let store = MemoryStore::new(vec![started]);
    let mut schedule = schedule_over(&store, 0, 0);
    let buffer = frame(&mut schedule, &options(), at(0, 11, 0), 80);

    let row = buffer.iter().find(|i| i.text == "started").unwrap();
    assert_eq!(row.style, CellStyle::Active);
}

/// Timebox glyphs appear in the timebox column.
#[test]
fn test_timebox_column() {
    let mut boxed = task(1, "boxed", at(0, 9, 0), Some(50));
    boxed.timebox_estimate = Some(2);
    boxed.timebox_real = Some(1);
    let store = MemoryStore::new(vec![boxed]);
    let mut schedule = schedule_over(&store, 0, 0);
    let offsets = compute_offsets(&mut schedule, 80).unwrap();
    let buffer = render::build(&mut schedule, &offsets, at(0, 8, 0), &options(), (40, 80)).unwrap();

    let cell = buffer.iter().find(|i| i.col == offsets.timebox() && i.row == 2).unwrap();
    assert_eq!(cell.text, "◼◻");
}

/// With empty hours shown, every hour of the day gets a row.
#[test]
fn test_all_hours_when_not_hidden() {
    let store = MemoryStore::new(vec![task(1, "only", at(0, 9, 0), None)]);
    let mut schedule = schedule_over(&store, 0, 0);
    let opts = BufferOptions {
        hide_empty: false,
        ..options()
    };
    let buffer = frame(&mut schedule, &opts, at(0, 7, 15), 60);
    assert_eq!(row_count(&buffer), 26);

    let mut r = RecordingRenderer::new(30, 60);
    let mut painter = Painter::new();
    painter.replace_buffer(buffer);
    painter.paint(&mut r, false, "").unwrap();
    assert_eq!(r.line(2), "00");
    assert_eq!(r.style_at(9, 0), Some(CellStyle::HourCurrent));
    assert_eq!(r.style_at(10, 0), Some(CellStyle::Hour));
}

/// An empty schedule paints the placeholder.
#[test]
fn test_empty_schedule_shows_placeholder() {
    let store = MemoryStore::new(Vec::new());
    let mut schedule = schedule_over(&store, 0, 0);
    let buffer = frame(&mut schedule, &options(), at(0, 9, 0), 80);
    assert!(buffer.is_empty());

    let mut r = RecordingRenderer::new(10, 80);
    let mut painter = Painter::new();
    painter.replace_buffer(buffer);
    painter.paint(&mut r, false, "0 tasks").unwrap();
    assert_eq!(r.line(0), PLACEHOLDER_TEXT);
    assert_eq!(r.line(9), "0 tasks");
}

/// A changed task only rewrites its own row.
#[test]
fn test_incremental_repaint() {
    let store = MemoryStore::new(three_day_tasks());
    let mut schedule = schedule_over(&store, 1, 1);
    let mut r = RecordingRenderer::new(40, 80);
    let mut painter = Painter::new();

    painter.replace_buffer(frame(&mut schedule, &options(), at(0, 12, 0), 80));
    painter.paint(&mut r, false, "f").unwrap();
    let first_writes = r.writes;

    let mut tasks = store.tasks();
    tasks[3].description = "wrap up early".to_string();
    store.set_tasks(tasks);
    schedule.clear_cache();
    painter.replace_buffer(frame(&mut schedule, &options(), at(0, 12, 0), 80));
    painter.paint(&mut r, false, "f").unwrap();

    assert!(r.line(6).ends_with("wrap up early"));
    assert!(r.writes - first_writes < first_writes / 2);
    assert_eq!(r.clears, 0);
}

/// Dropping rows clears the stale tail.
#[test]
fn test_shrinking_schedule_clears() {
    let store = MemoryStore::new(three_day_tasks());
    let mut schedule = schedule_over(&store, 1, 1);
    let mut r = RecordingRenderer::new(40, 80);
    let mut painter = Painter::new();

    painter.replace_buffer(frame(&mut schedule, &options(), at(0, 12, 0), 80));
    painter.paint(&mut r, false, "f").unwrap();

    let mut tasks = store.tasks();
    tasks.truncate(2);
    store.set_tasks(tasks);
    schedule.clear_cache();
    painter.replace_buffer(frame(&mut schedule, &options(), at(0, 12, 0), 80));
    painter.paint(&mut r, false, "f").unwrap();

    assert_eq!(r.clears, 1);
    assert!(!r.contains("wrap up"));
}

/// Scrolling shifts the flushed window; scrolling above the top is a no-op.
#[test]
fn test_scroll_window() {
    let store = MemoryStore::new(vec![task(1, "only", at(0, 9, 0), None)]);
    let mut schedule = schedule_over(&store, 0, 0);
    let opts = BufferOptions {
        hide_empty: false,
        ..options()
    };
    let mut r = RecordingRenderer::new(10, 60);
    let mut painter = Painter::new();
    painter.replace_buffer(frame(&mut schedule, &opts, at(0, 7, 0), 60));
    painter.paint(&mut r, false, "f").unwrap();
    assert!(!r.contains("only"));

    painter.scroll(-1);
    assert_eq!(painter.scroll_offset(), 0);

    painter.scroll(5);
    painter.paint(&mut r, true, "f").unwrap();
    assert_eq!(r.flushes.last(), Some(&(5, 0, 15, 60)));
    assert!(r.contains("only"));
    assert_eq!(r.visible().last().map(String::as_str), Some("f"));
}

/// Scrolling past the end of the grid leaves a single footnote on screen.
#[test]
fn test_scroll_past_grid_keeps_one_footnote() {
    let buffer: Vec<DrawInstruction> = (0..10)
        .map(|row| DrawInstruction {
            row,
            col: 5,
            text: format!("row{row}"),
            style: CellStyle::Default,
        })
        .collect();
    let mut r = RecordingRenderer::new(4, 40);
    let mut painter = Painter::new();
    painter.replace_buffer(buffer);
    painter.paint(&mut r, false, "FOOT").unwrap();

    painter.scroll(8);
    painter.paint(&mut r, true, "FOOT").unwrap();
    painter.scroll(1);
    painter.paint(&mut r, true, "FOOT").unwrap();

    assert_eq!(r.visible(), vec!["     row9", "", "", "FOOT"]);
}
