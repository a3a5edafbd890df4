//! Column layout for the schedule grid.

use crate::schedule::Schedule;
use crate::Result;

/// Column where the decorative glyph sits, between hour and id.
pub const GLYPH_COLUMN: usize = 3;

/// Start columns of the grid, non-decreasing and within the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offsets([usize; 6]);

impl Offsets {
    /// Clamp raw offsets to a terminal `width` columns wide.
    ///
    /// The project column never takes more than an eighth of the width.
    pub fn clamp(raw: [usize; 6], width: usize) -> Self {
        let mut offsets = raw;
        let max_project_width = width / 8;
        if offsets[5].saturating_sub(offsets[4]) > max_project_width {
            offsets[5] = offsets[4] + max_project_width;
        }

        let mut floor = 0;
        for offset in offsets.iter_mut() {
            *offset = (*offset).max(floor).min(width);
            floor = *offset;
        }
        Self(offsets)
    }

    pub fn as_array(&self) -> [usize; 6] {
        self.0
    }

    pub fn hour(&self) -> usize {
        self.0[0]
    }

    pub fn id(&self) -> usize {
        self.0[1]
    }

    pub fn time(&self) -> usize {
        self.0[2]
    }

    pub fn timebox(&self) -> usize {
        self.0[3]
    }

    pub fn project(&self) -> usize {
        self.0[4]
    }

    pub fn description(&self) -> usize {
        self.0[5]
    }

    /// Room for project text, keeping one column of padding.
    pub fn project_width(&self) -> usize {
        self.description()
            .saturating_sub(self.project())
            .saturating_sub(1)
    }
}

pub fn compute_offsets(schedule: &mut Schedule, terminal_width: usize) -> Result<Offsets> {
    Ok(Offsets::clamp(schedule.get_column_offsets()?, terminal_width))
}
