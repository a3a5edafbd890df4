//! Refresh loop behavior: keys, reload cadence, degraded refreshes,
//! hook dispatch and timebox bookkeeping.

use std::time::Duration;

use chrono::NaiveDateTime;

use tasksched::app::{App, TickOutcome};
use tasksched::config::TimeboxConfig;
use tasksched::hooks::{HookRunner, ON_PROGRESS};
use tasksched::paint::Key;
use tasksched::render::BufferOptions;
use tasksched::store::MemoryStore;

use crate::fixtures::{at, schedule_over, task, three_day_tasks, RecordingHooks, RecordingRenderer};

fn app(store: &MemoryStore, hooks: Option<RecordingHooks>) -> App {
    let options = BufferOptions {
        hide_empty: true,
        hide_projects: false,
        timebox: TimeboxConfig::default(),
    };
    let hooks = hooks.map(|h| Box::new(h) as Box<dyn HookRunner>);
    App::new(schedule_over(store, 0, 0), options, Duration::from_secs(1), hooks)
}

fn secs(base: NaiveDateTime, seconds: i64) -> NaiveDateTime {
    base + chrono::Duration::seconds(seconds)
}

fn footnote(r: &RecordingRenderer) -> String {
    r.visible().last().cloned().unwrap_or_default()
}

/// Given a store with today's tasks
/// When the loop ticks once
/// Then the grid and footnote are on screen, and `q` quits
#[test]
fn test_first_tick_paints_and_quit_exits() {
    let store = MemoryStore::new(three_day_tasks());
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);

    assert_eq!(app.tick(&mut r, at(0, 12, 0)).unwrap(), TickOutcome::Continue);
    assert!(r.contains("morning writing"));
    assert!(r.contains("wrap up"));
    assert_eq!(footnote(&r), "3 tasks | timebox 0/0");

    r.press(Key::Quit);
    assert_eq!(app.tick(&mut r, at(0, 12, 0)).unwrap(), TickOutcome::Quit);
}

/// The store is only re-queried when its modification stamp moves.
#[test]
fn test_requery_only_on_store_change() {
    let store = MemoryStore::new(three_day_tasks());
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);
    let noon = at(0, 12, 0);

    app.tick(&mut r, noon).unwrap();
    app.tick(&mut r, secs(noon, 5)).unwrap();
    assert_eq!(store.query_count(), 1);

    let mut tasks = store.tasks();
    tasks[2].description = "afternoon review".to_string();
    store.set_tasks(tasks);
    app.tick(&mut r, secs(noon, 10)).unwrap();
    assert_eq!(store.query_count(), 2);
    assert!(r.contains("afternoon review"));
}

/// Nothing is refreshed before the interval elapses.
#[test]
fn test_refresh_waits_for_interval() {
    let store = MemoryStore::new(three_day_tasks());
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);
    let noon = at(0, 12, 0);

    app.tick(&mut r, noon).unwrap();
    let flushes = r.flushes.len();
    store.set_tasks(Vec::new());

    app.tick(&mut r, noon + chrono::Duration::milliseconds(500)).unwrap();
    assert_eq!(store.query_count(), 1);
    assert_eq!(r.flushes.len(), flushes);
    assert!(r.contains("morning writing"));
}

/// An unreachable store keeps the last frame and flags it as stale.
#[test]
fn test_backend_outage_keeps_previous_frame() {
    let store = MemoryStore::new(three_day_tasks());
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);
    let noon = at(0, 12, 0);

    app.tick(&mut r, noon).unwrap();
    let frame = app.painter().current().to_vec();

    store.set_unavailable(true);
    r.press(Key::Refresh);
    assert_eq!(app.tick(&mut r, secs(noon, 2)).unwrap(), TickOutcome::Continue);
    assert!(app.stale().is_some());
    assert_eq!(app.painter().current(), frame.as_slice());
    assert!(r.contains("morning writing"));
    assert!(footnote(&r).contains("stale"));

    store.set_unavailable(false);
    app.tick(&mut r, secs(noon, 4)).unwrap();
    assert!(app.stale().is_none());
    assert_eq!(footnote(&r), "3 tasks | timebox 0/0");
}

/// Scroll keys move the viewport without touching the store.
#[test]
fn test_scroll_keys() {
    let store = MemoryStore::new(three_day_tasks());
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);
    let noon = at(0, 12, 0);
    app.tick(&mut r, noon).unwrap();

    r.press(Key::Down);
    app.tick(&mut r, noon).unwrap();
    assert_eq!(app.painter().scroll_offset(), 1);
    assert_eq!(r.flushes.last(), Some(&(1, 0, 25, 80)));

    r.press(Key::Up);
    app.tick(&mut r, noon).unwrap();
    r.press(Key::Up);
    app.tick(&mut r, noon).unwrap();
    assert_eq!(app.painter().scroll_offset(), 0);

    r.press(Key::PageDown);
    app.tick(&mut r, noon).unwrap();
    assert_eq!(app.painter().scroll_offset(), 20);

    r.press(Key::PageUp);
    app.tick(&mut r, noon).unwrap();
    assert_eq!(app.painter().scroll_offset(), 0);
    assert_eq!(store.query_count(), 1);
}

/// A resize reloads and repaints at the new width.
#[test]
fn test_resize_reloads() {
    let store = MemoryStore::new(three_day_tasks());
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);
    let noon = at(0, 12, 0);
    app.tick(&mut r, noon).unwrap();

    r.cols = 100;
    r.press(Key::Resize);
    app.tick(&mut r, noon).unwrap();
    assert_eq!(store.query_count(), 2);
    assert_eq!(r.flushes.last(), Some(&(0, 0, 24, 100)));
}

/// The progress hook fires once per change of the due task.
#[test]
fn test_progress_hook_fires_on_change() {
    let store = MemoryStore::new(vec![
        task(1, "first block", at(0, 9, 0), Some(60)),
        task(2, "second block", at(0, 10, 0), Some(60)),
    ]);
    let hooks = RecordingHooks::default();
    let mut app = app(&store, Some(hooks.clone()));
    let mut r = RecordingRenderer::new(24, 80);

    app.tick(&mut r, at(0, 9, 10)).unwrap();
    app.tick(&mut r, at(0, 9, 20)).unwrap();
    let events = hooks.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, ON_PROGRESS);
    assert_eq!(events[0].1.description, "first block");

    app.tick(&mut r, at(0, 10, 5)).unwrap();
    let events = hooks.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].1.description, "second block");
    assert_eq!(events[1].1.id, Some(2));
}

/// No hook fires while nothing is due.
#[test]
fn test_no_hook_between_tasks() {
    let store = MemoryStore::new(vec![task(1, "later", at(0, 15, 0), Some(30))]);
    let hooks = RecordingHooks::default();
    let mut app = app(&store, Some(hooks.clone()));
    let mut r = RecordingRenderer::new(24, 80);

    app.tick(&mut r, at(0, 12, 0)).unwrap();
    assert!(hooks.events().is_empty());
}

/// A started timeboxed task gets its timebox booked and is stopped.
#[test]
fn test_timebox_is_recorded_after_length() {
    let mut boxed = task(1, "focus", at(0, 11, 30), Some(60));
    boxed.active_start = Some(at(0, 11, 30));
    boxed.timebox_estimate = Some(2);
    let uuid = boxed.uuid;
    let store = MemoryStore::new(vec![boxed]);
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);

    app.tick(&mut r, at(0, 12, 0)).unwrap();

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].timebox_real, Some(1));
    assert_eq!(store.stopped(), vec![uuid]);
    assert!(store.tasks()[0].active_start.is_none());
    assert_eq!(footnote(&r), "1 tasks | timebox 1/2");
}

/// A timebox still running is left alone.
#[test]
fn test_timebox_not_recorded_early() {
    let mut boxed = task(1, "focus", at(0, 11, 50), Some(60));
    boxed.active_start = Some(at(0, 11, 50));
    boxed.timebox_estimate = Some(2);
    let store = MemoryStore::new(vec![boxed]);
    let mut app = app(&store, None);
    let mut r = RecordingRenderer::new(24, 80);

    app.tick(&mut r, at(0, 12, 0)).unwrap();
    assert!(store.saved().is_empty());
    assert!(store.stopped().is_empty());
}
