//! Terminal renderer backed by ratatui and crossterm.
//!
//! Writes land in an off-screen pad buffer; `flush` copies the scrolled
//! window of the pad into a ratatui frame. Raw mode and the alternate
//! screen are held for the renderer's lifetime and released on
//! [`Renderer::teardown`] or drop, whichever comes first.

use std::io::{self, stdout, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::buffer::Buffer;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::paint::{Key, Renderer};
use crate::render::CellStyle;
use crate::{tlog_debug, Error, Result};

// Color tokens (256-color palette indices)
const COLOR_TEXT: Color = Color::Indexed(20);
const COLOR_BACKGROUND: Color = Color::Black;
const COLOR_BACKGROUND_ALT: Color = Color::Indexed(234);
const COLOR_HOUR: Color = Color::Indexed(8);
const COLOR_COMPLETED: Color = Color::Indexed(19);
const COLOR_ACTIVE: Color = Color::Green;
const COLOR_OVERDUE: Color = Color::Yellow;
const COLOR_DIVIDER: Color = Color::Indexed(240);
const COLOR_TODAY: Color = Color::Cyan;
const COLOR_FOOTNOTE: Color = Color::Gray;

fn base(alternate: bool) -> Style {
    let bg = if alternate {
        COLOR_BACKGROUND_ALT
    } else {
        COLOR_BACKGROUND
    };
    Style::default().bg(bg)
}

/// Concrete colors for a semantic cell style.
pub fn style_for(style: CellStyle) -> Style {
    match style {
        CellStyle::Default => base(false).fg(COLOR_TEXT),
        CellStyle::DefaultAlternate => base(true).fg(COLOR_TEXT),
        CellStyle::Header => Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::UNDERLINED),
        CellStyle::Hour => Style::default().fg(COLOR_HOUR),
        CellStyle::HourCurrent => Style::default().fg(Color::Black).bg(COLOR_ACTIVE),
        CellStyle::Divider => Style::default().fg(COLOR_DIVIDER),
        CellStyle::DividerToday => Style::default()
            .fg(COLOR_TODAY)
            .add_modifier(Modifier::BOLD),
        CellStyle::Glyph => Style::default().fg(COLOR_HOUR),
        CellStyle::Active => Style::default().fg(Color::Black).bg(COLOR_ACTIVE),
        CellStyle::ShouldBeActive => base(false).fg(COLOR_ACTIVE),
        CellStyle::ShouldBeActiveAlternate => base(true).fg(COLOR_ACTIVE),
        CellStyle::Overdue => base(false).fg(COLOR_OVERDUE),
        CellStyle::OverdueAlternate => base(true).fg(COLOR_OVERDUE),
        CellStyle::Completed => base(false).fg(COLOR_COMPLETED),
        CellStyle::CompletedAlternate => base(true).fg(COLOR_COMPLETED),
        CellStyle::Footnote => Style::default()
            .fg(COLOR_FOOTNOTE)
            .add_modifier(Modifier::DIM),
        CellStyle::Placeholder => Style::default().fg(COLOR_FOOTNOTE),
    }
}

pub fn map_key(key: KeyEvent) -> Key {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Key::Quit;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Key::Quit,
        KeyCode::Char('j') | KeyCode::Down => Key::Down,
        KeyCode::Char('k') | KeyCode::Up => Key::Up,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::Char('r') => Key::Refresh,
        _ => Key::Other,
    }
}

pub struct CrosstermRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pad: Buffer,
    active: bool,
}

impl CrosstermRenderer {
    /// Enter raw mode and the alternate screen.
    pub fn acquire() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        let mut renderer = Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout()))?,
            pad: Buffer::empty(Rect::ZERO),
            active: true,
        };
        renderer.terminal.hide_cursor()?;
        renderer.terminal.clear()?;
        Ok(renderer)
    }

    /// Grow the pad so `row` fits; a width change starts a fresh pad.
    fn reserve(&mut self, row: usize, cols: usize) -> Result<()> {
        let width = u16::try_from(cols)
            .map_err(|_| Error::RenderFailure(format!("terminal width {} too large", cols)))?;
        let height = u16::try_from(row + 1)
            .map_err(|_| Error::RenderFailure(format!("row {} beyond pad capacity", row)))?;

        let area = self.pad.area;
        if area.width != width {
            let rows = area.height.max(height);
            self.pad = Buffer::empty(Rect::new(0, 0, width, rows));
        } else if area.height < height {
            self.pad.resize(Rect::new(0, 0, width, height));
        }
        Ok(())
    }
}

impl Renderer for CrosstermRenderer {
    fn clear(&mut self) -> Result<()> {
        self.pad.reset();
        Ok(())
    }

    fn write(&mut self, row: usize, col: usize, text: &str, style: CellStyle) -> Result<()> {
        let (_, cols) = self.dimensions();
        if col >= cols {
            return Err(Error::RenderFailure(format!(
                "column {} outside width {}",
                col, cols
            )));
        }
        self.reserve(row, cols)?;
        // both fit in u16 after reserve
        let (x, y) = (col as u16, row as u16);
        self.pad.set_stringn(x, y, text, cols - col, style_for(style));
        Ok(())
    }

    fn flush(
        &mut self,
        row_start: usize,
        col_start: usize,
        row_end: usize,
        col_end: usize,
    ) -> Result<()> {
        let pad = &self.pad;
        self.terminal.draw(|frame| {
            let area = frame.area();
            let screen = frame.buffer_mut();
            for (y, pad_row) in (row_start..row_end).enumerate().take(area.height as usize) {
                let Ok(pad_row) = u16::try_from(pad_row) else {
                    break;
                };
                for (x, pad_col) in (col_start..col_end).enumerate().take(area.width as usize) {
                    let Ok(pad_col) = u16::try_from(pad_col) else {
                        break;
                    };
                    let Some(cell) = pad.cell(Position::new(pad_col, pad_row)) else {
                        continue;
                    };
                    if let Some(target) = screen.cell_mut(Position::new(x as u16, y as u16)) {
                        *target = cell.clone();
                    }
                }
            }
        })?;
        Ok(())
    }

    fn dimensions(&self) -> (usize, usize) {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => (rows as usize, cols as usize),
            Err(_) => (24, 80),
        }
    }

    fn read_key_nonblocking(&mut self) -> Result<Option<Key>> {
        if !event::poll(Duration::ZERO)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => Some(map_key(key)),
            Event::Resize(cols, rows) => {
                tlog_debug!("Terminal resized to {}x{}", cols, rows);
                Some(Key::Resize)
            }
            _ => None,
        })
    }

    fn teardown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        let _ = self.terminal.show_cursor();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

impl Drop for CrosstermRenderer {
    fn drop(&mut self) {
        self.teardown();
    }
}
