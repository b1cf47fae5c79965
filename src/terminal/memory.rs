use std::io;

use image::RgbImage;

use super::{ScreenCell, TerminalDevice, DEFAULT_FOREGROUND};
use crate::error::{Error, Result};
use crate::grid::{Grid, Size};
use crate::palette::PaletteColor;
use crate::raster::Rasterizer;
use crate::snapshot::{Region, ScreenReader};

/// One glyph written through [`TerminalDevice::write_glyph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWrite {
    pub col: u16,
    pub row: u16,
    pub glyph: char,
    pub color: PaletteColor,
}

/// A terminal that lives entirely in memory and records every glyph write.
#[derive(Debug, Clone)]
pub struct MemoryTerminal {
    cells: Grid<ScreenCell>,
    cursor: (u16, u16),
    fg: PaletteColor,
    writes: Vec<CellWrite>,
    rasterizer: Rasterizer,
    fail_next_read: Option<i32>,
}

impl MemoryTerminal {
    pub fn new(size: Size) -> Self {
        Self {
            cells: Grid::filled(size, ScreenCell::default()),
            cursor: (0, 0),
            fg: DEFAULT_FOREGROUND,
            writes: Vec::new(),
            rasterizer: Rasterizer::blocks(1, 1),
            fail_next_read: None,
        }
    }

    /// A terminal already showing `lines` in the default color.
    pub fn with_lines(lines: &[&str]) -> Option<Self> {
        let text = Grid::from_lines(lines)?;
        let mut term = Self::new(text.size());
        term.cells = text.map(|c| ScreenCell::new(*c, DEFAULT_FOREGROUND));
        Some(term)
    }

    pub fn with_rasterizer(mut self, rasterizer: Rasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Make the next read fail as if the OS returned `code`.
    pub fn fail_next_read(&mut self, code: i32) {
        self.fail_next_read = Some(code);
    }

    pub fn cells(&self) -> &Grid<ScreenCell> {
        &self.cells
    }

    pub fn set_cell(&mut self, col: u16, row: u16, cell: ScreenCell) {
        if let Some(slot) = self.cells.get_mut(col, row) {
            *slot = cell;
        }
    }

    pub fn cursor(&self) -> (u16, u16) {
        self.cursor
    }

    pub fn writes(&self) -> &[CellWrite] {
        &self.writes
    }

    /// Drain the write log.
    pub fn take_writes(&mut self) -> Vec<CellWrite> {
        std::mem::take(&mut self.writes)
    }

    fn out_of_bounds(&self, col: u16, row: u16) -> Error {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("cell ({}, {}) is outside the {} terminal", col, row, self.cells.size()),
        ))
    }
}

impl ScreenReader for MemoryTerminal {
    fn read_region(&mut self, region: Region) -> Result<Grid<char>> {
        if let Some(code) = self.fail_next_read.take() {
            return Err(Error::buffer_read_os(&io::Error::from_raw_os_error(code)));
        }
        if !region.fits_within(self.cells.size()) {
            return Err(Error::buffer_read(format!(
                "region {}x{} at ({}, {}) exceeds the {} buffer",
                region.width,
                region.height,
                region.x,
                region.y,
                self.cells.size()
            )));
        }
        let mut out = Vec::with_capacity(region.size().area());
        for row in region.y..region.y + region.height {
            for col in region.x..region.x + region.width {
                out.push(self.cells.get(col, row).map(|c| c.glyph).unwrap_or(' '));
            }
        }
        Grid::from_cells(region.size(), out).ok_or_else(|| Error::buffer_read("snapshot size does not match region"))
    }
}

impl TerminalDevice for MemoryTerminal {
    fn size(&self) -> Size {
        self.cells.size()
    }

    fn move_to(&mut self, col: u16, row: u16) -> Result<()> {
        if self.cells.get(col, row).is_none() {
            return Err(self.out_of_bounds(col, row));
        }
        self.cursor = (col, row);
        Ok(())
    }

    fn set_foreground(&mut self, color: PaletteColor) -> Result<()> {
        self.fg = color;
        Ok(())
    }

    fn write_glyph(&mut self, glyph: char) -> Result<()> {
        let (col, row) = self.cursor;
        let cell = ScreenCell::new(glyph, self.fg);
        match self.cells.get_mut(col, row) {
            Some(slot) => *slot = cell,
            None => return Err(self.out_of_bounds(col, row)),
        }
        self.writes.push(CellWrite {
            col,
            row,
            glyph,
            color: self.fg,
        });
        if col + 1 < self.cells.size().width {
            self.cursor = (col + 1, row);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbImage> {
        Ok(self.rasterizer.render(&self.cells))
    }
}
