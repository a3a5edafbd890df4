//! Diff/paint driver.
//!
//! Holds the last painted buffer and the user's scroll offset, and pushes
//! only what changed through the [`Renderer`] seam. Instruction rows are
//! absolute; the renderer keeps an off-screen pad and `flush` shows the
//! window starting at the scroll offset.

use std::collections::BTreeMap;

use crate::render::{clip, row_count, CellStyle, DrawInstruction};
use crate::{tlog_debug, Result};

/// Rows kept at the bottom of the viewport for the footnote.
pub const FOOTER_ROWS: usize = 1;

pub const PLACEHOLDER_TEXT: &str = "No tasks to display.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Quit,
    Up,
    Down,
    PageUp,
    PageDown,
    Resize,
    Refresh,
    Other,
}

/// Terminal capability the core draws through.
pub trait Renderer {
    fn clear(&mut self) -> Result<()>;

    /// Write styled text into the pad. May fail with `RenderFailure` when
    /// the cell is out of bounds.
    fn write(&mut self, row: usize, col: usize, text: &str, style: CellStyle) -> Result<()>;

    /// Show pad rows `row_start..row_end`, columns `col_start..col_end`.
    fn flush(
        &mut self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> Result<()>;

    /// `(rows, cols)` of the visible terminal.
    fn dimensions(&self) -> (usize, usize);

    fn read_key_nonblocking(&mut self) -> Result<Option<Key>>;

    /// Restore the terminal. Safe to call more than once.
    fn teardown(&mut self);
}

#[derive(Debug, Default)]
pub struct Painter {
    previous: Vec<DrawInstruction>,
    previous_footnote: Option<String>,
    current: Vec<DrawInstruction>,
    scroll_offset: usize,
}

impl Painter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the next frame. The last painted frame stays as the diff base.
    pub fn replace_buffer(&mut self, buffer: Vec<DrawInstruction>) {
        self.current = buffer;
    }

    pub fn current(&self) -> &[DrawInstruction] {
        &self.current
    }

    pub fn scroll(&mut self, delta: isize) {
        self.scroll_offset = self.scroll_offset.saturating_add_signed(delta);
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Paint the current buffer. Returns whether anything was drawn.
    ///
    /// Without `force`, rows identical to the last painted frame are left
    /// alone; if nothing changed at all the call is a no-op.
    pub fn paint(&mut self, renderer: &mut dyn Renderer, force: bool, footnote: &str) -> Result<bool> {
        let (rows, cols) = renderer.dimensions();
        let unchanged = self.current == self.previous
            && self.previous_footnote.as_deref() == Some(footnote);
        if !force && unchanged {
            return Ok(false);
        }

        if self.current.is_empty() {
            renderer.clear()?;
            write_clipped(renderer, self.scroll_offset, 0, PLACEHOLDER_TEXT, CellStyle::Placeholder, cols);
        } else {
            let mut force = force;
            if row_count(&self.current) < row_count(&self.previous) {
                tlog_debug!(
                    "Buffer shrank from {} to {} rows, clearing",
                    row_count(&self.previous),
                    row_count(&self.current)
                );
                renderer.clear()?;
                force = true;
            }
            self.paint_rows(renderer, force, rows, cols);
        }

        self.paint_footnote(renderer, footnote, rows, cols);
        renderer.flush(self.scroll_offset, 0, self.scroll_offset + rows, cols)?;

        self.previous = self.current.clone();
        self.previous_footnote = Some(footnote.to_string());
        Ok(true)
    }

    fn paint_rows(&self, renderer: &mut dyn Renderer, force: bool, rows: usize, cols: usize) {
        let first = self.scroll_offset;
        let last = first + rows.saturating_sub(FOOTER_ROWS);
        let before = group_rows(&self.previous);
        let after = group_rows(&self.current);

        let mut rewritten = 0;
        for row in first..last {
            let instructions = after.get(&row);
            // A forced paint also blanks rows past the grid, where an
            // earlier footnote may still sit in the pad.
            if !force && (instructions.is_none() || before.get(&row) == instructions) {
                continue;
            }
            write_clipped(renderer, row, 0, &" ".repeat(cols), CellStyle::Default, cols);
            for ins in instructions.into_iter().flatten() {
                write_clipped(renderer, ins.row, ins.col, &ins.text, ins.style, cols);
            }
            rewritten += 1;
        }
        tlog_debug!("Painted {} rows (force={})", rewritten, force);
    }

    fn paint_footnote(&self, renderer: &mut dyn Renderer, footnote: &str, rows: usize, cols: usize) {
        if rows == 0 {
            return;
        }
        let row = self.scroll_offset + rows - 1;
        let line = format!("{:<width$}", footnote, width = cols);
        write_clipped(renderer, row, 0, &line, CellStyle::Footnote, cols);
    }
}

fn group_rows(buffer: &[DrawInstruction]) -> BTreeMap<usize, Vec<&DrawInstruction>> {
    let mut rows: BTreeMap<usize, Vec<&DrawInstruction>> = BTreeMap::new();
    for ins in buffer {
        rows.entry(ins.row).or_default().push(ins);
    }
    rows
}

/// Write that clamps to the width and swallows per-cell failures.
fn write_clipped(
    renderer: &mut dyn Renderer,
    row: usize,
    col: usize,
    text: &str,
    style: CellStyle,
    cols: usize,
) {
    if col >= cols {
        return;
    }
    let text = clip(text, cols - col);
    if let Err(e) = renderer.write(row, col, &text, style) {
        tlog_debug!("Skipping write at {},{}: {}", row, col, e);
    }
}
