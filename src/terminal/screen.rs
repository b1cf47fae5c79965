use vte::{Params, Perform};

use super::{ScreenCell, DEFAULT_FOREGROUND};
use crate::error::{Error, Result};
use crate::grid::{Grid, Size};
use crate::palette::{quantize, PaletteColor};
use crate::snapshot::Region;

/// Display memory of an ANSI terminal, driven by a `vte` parser.
///
/// Only what a full-screen cell renderer emits is interpreted: printable
/// characters, cursor movement, erase, and foreground SGR. The screen never
/// scrolls; output past the last row overwrites it.
#[derive(Debug, Clone)]
pub struct Screen {
    cells: Grid<ScreenCell>,
    col: u16,
    row: u16,
    pending_wrap: bool,
    fg: PaletteColor,
}

impl Screen {
    pub fn new(size: Size) -> Self {
        Self {
            cells: Grid::filled(size, ScreenCell::default()),
            col: 0,
            row: 0,
            pending_wrap: false,
            fg: DEFAULT_FOREGROUND,
        }
    }

    pub fn size(&self) -> Size {
        self.cells.size()
    }

    pub fn cells(&self) -> &Grid<ScreenCell> {
        &self.cells
    }

    /// Cursor as (column, row).
    pub fn cursor(&self) -> (u16, u16) {
        (self.col, self.row)
    }

    pub fn foreground(&self) -> PaletteColor {
        self.fg
    }

    /// Characters inside `region`.
    pub fn read(&self, region: Region) -> Result<Grid<char>> {
        if !region.fits_within(self.size()) {
            return Err(Error::buffer_read(format!(
                "region {}x{} at ({}, {}) exceeds the {} screen buffer",
                region.width,
                region.height,
                region.x,
                region.y,
                self.size()
            )));
        }
        let mut out = Vec::with_capacity(region.size().area());
        for row in region.y..region.y + region.height {
            for col in region.x..region.x + region.width {
                out.push(self.cells.get(col, row).map(|c| c.glyph).unwrap_or(' '));
            }
        }
        Grid::from_cells(region.size(), out)
            .ok_or_else(|| Error::buffer_read("snapshot size does not match region"))
    }

    fn last_col(&self) -> u16 {
        self.size().width.saturating_sub(1)
    }

    fn last_row(&self) -> u16 {
        self.size().height.saturating_sub(1)
    }

    fn goto(&mut self, col: u16, row: u16) {
        self.col = col.min(self.last_col());
        self.row = row.min(self.last_row());
        self.pending_wrap = false;
    }

    fn blank(&self) -> ScreenCell {
        ScreenCell::new(' ', self.fg)
    }

    fn erase(&mut self, from: (u16, u16), to: (u16, u16)) {
        if self.size().is_empty() {
            return;
        }
        let width = self.size().width as usize;
        let start = from.1 as usize * width + from.0 as usize;
        let end = to.1 as usize * width + to.0 as usize;
        let blank = self.blank();
        for i in start..=end.min(self.size().area().saturating_sub(1)) {
            let (col, row) = ((i % width) as u16, (i / width) as u16);
            if let Some(cell) = self.cells.get_mut(col, row) {
                *cell = blank;
            }
        }
    }

    fn apply_sgr(&mut self, params: &Params) {
        // semicolon and colon forms flatten to the same sequence
        let codes: Vec<u16> = params.iter().flat_map(|p| p.iter().copied()).collect();
        if codes.is_empty() {
            self.fg = DEFAULT_FOREGROUND;
            return;
        }
        let mut i = 0;
        while i < codes.len() {
            match codes[i] {
                0 | 39 => self.fg = DEFAULT_FOREGROUND,
                n @ 30..=37 => self.fg = PaletteColor::from_ansi_index(n - 30).unwrap_or(self.fg),
                n @ 90..=97 => self.fg = PaletteColor::from_ansi_index(n - 90 + 8).unwrap_or(self.fg),
                38 => match codes.get(i + 1) {
                    Some(5) => {
                        if let Some(color) = codes.get(i + 2).and_then(|n| PaletteColor::from_ansi_index(*n)) {
                            self.fg = color;
                        }
                        i += 2;
                    }
                    Some(2) => {
                        if let (Some(r), Some(g), Some(b)) = (codes.get(i + 2), codes.get(i + 3), codes.get(i + 4)) {
                            let px = image::Rgb([*r as u8, *g as u8, *b as u8]);
                            self.fg = quantize(px);
                        }
                        i += 4;
                    }
                    _ => {}
                },
                _ => {}
            }
            i += 1;
        }
    }
}

fn first_param(params: &Params, index: usize, default: u16) -> u16 {
    match params.iter().nth(index).and_then(|p| p.first().copied()) {
        Some(0) | None => default,
        Some(n) => n,
    }
}

impl Perform for Screen {
    fn print(&mut self, c: char) {
        if self.size().is_empty() {
            return;
        }
        if self.pending_wrap {
            self.col = 0;
            self.row = (self.row + 1).min(self.last_row());
            self.pending_wrap = false;
        }
        let cell = ScreenCell::new(c, self.fg);
        if let Some(slot) = self.cells.get_mut(self.col, self.row) {
            *slot = cell;
        }
        if self.col >= self.last_col() {
            self.pending_wrap = true;
        } else {
            self.col += 1;
        }
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                self.row = (self.row + 1).min(self.last_row());
                self.pending_wrap = false;
            }
            b'\r' => {
                self.col = 0;
                self.pending_wrap = false;
            }
            0x08 => {
                self.col = self.col.saturating_sub(1);
                self.pending_wrap = false;
            }
            _ => {}
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        // private modes (`?25l`, `?1049h`) arrive with an intermediate
        if ignore || !intermediates.is_empty() {
            return;
        }
        match action {
            'H' | 'f' => {
                let row = first_param(params, 0, 1) - 1;
                let col = first_param(params, 1, 1) - 1;
                self.goto(col, row);
            }
            'A' => self.goto(self.col, self.row.saturating_sub(first_param(params, 0, 1))),
            'B' => self.goto(self.col, self.row.saturating_add(first_param(params, 0, 1))),
            'C' => self.goto(self.col.saturating_add(first_param(params, 0, 1)), self.row),
            'D' => self.goto(self.col.saturating_sub(first_param(params, 0, 1)), self.row),
            'G' => self.goto(first_param(params, 0, 1) - 1, self.row),
            'd' => self.goto(self.col, first_param(params, 0, 1) - 1),
            'J' => {
                let end = (self.last_col(), self.last_row());
                match params.iter().next().and_then(|p| p.first().copied()).unwrap_or(0) {
                    0 => self.erase((self.col, self.row), end),
                    1 => self.erase((0, 0), (self.col, self.row)),
                    2 | 3 => self.erase((0, 0), end),
                    _ => {}
                }
            }
            'K' => {
                let row = self.row;
                match params.iter().next().and_then(|p| p.first().copied()).unwrap_or(0) {
                    0 => self.erase((self.col, row), (self.last_col(), row)),
                    1 => self.erase((0, row), (self.col, row)),
                    2 => self.erase((0, row), (self.last_col(), row)),
                    _ => {}
                }
            }
            'm' => self.apply_sgr(params),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(screen: &mut Screen, bytes: &[u8]) {
        let mut parser = vte::Parser::new();
        parser.advance(screen, bytes);
    }

    fn text(screen: &Screen) -> Vec<String> {
        screen.read(Region::full(screen.size())).unwrap().lines()
    }

    #[test]
    fn prints_at_cursor_position() {
        let mut screen = Screen::new(Size::new(4, 2));
        feed(&mut screen, b"\x1b[2;3Hx");
        assert_eq!(text(&screen), vec!["    ", "  x "]);
        assert_eq!(screen.cursor(), (3, 1));
    }

    #[test]
    fn sgr_256_and_classic_forms_set_the_foreground() {
        let mut screen = Screen::new(Size::new(3, 1));
        feed(&mut screen, b"\x1b[38;5;1ma\x1b[92mb\x1b[0mc");
        let cells = screen.cells();
        assert_eq!(cells.get(0, 0).unwrap().color, PaletteColor::DarkRed);
        assert_eq!(cells.get(1, 0).unwrap().color, PaletteColor::Green);
        assert_eq!(cells.get(2, 0).unwrap().color, DEFAULT_FOREGROUND);
    }

    #[test]
    fn truecolor_sgr_is_quantized() {
        let mut screen = Screen::new(Size::new(1, 1));
        feed(&mut screen, b"\x1b[38;2;255;255;255m@");
        assert_eq!(screen.cells().get(0, 0).unwrap().color, PaletteColor::White);
    }

    #[test]
    fn private_modes_are_ignored() {
        let mut screen = Screen::new(Size::new(2, 1));
        feed(&mut screen, b"\x1b[?1049h\x1b[?25lok");
        assert_eq!(text(&screen), vec!["ok"]);
    }

    #[test]
    fn last_column_defers_wrap_and_never_scrolls() {
        let mut screen = Screen::new(Size::new(2, 2));
        feed(&mut screen, b"\x1b[2;1Hab");
        assert_eq!(screen.cursor(), (1, 1));
        feed(&mut screen, b"c");
        // no row below: the wrap lands back on the last row
        assert_eq!(text(&screen), vec!["  ", "cb"]);
    }

    #[test]
    fn clear_screen_and_erase_line() {
        let mut screen = Screen::new(Size::new(3, 2));
        feed(&mut screen, b"abcdef");
        assert_eq!(text(&screen), vec!["abc", "def"]);
        feed(&mut screen, b"\x1b[1;2H\x1b[K");
        assert_eq!(text(&screen), vec!["a  ", "def"]);
        feed(&mut screen, b"\x1b[2J");
        assert_eq!(text(&screen), vec!["   ", "   "]);
    }

    #[test]
    fn read_outside_buffer_fails() {
        let screen = Screen::new(Size::new(3, 2));
        let err = screen.read(Region::new(1, 0, 3, 1)).unwrap_err();
        assert!(matches!(err, Error::BufferRead { code: None, .. }));
        assert_eq!(screen.read(Region::new(1, 1, 2, 1)).unwrap().lines(), vec!["  "]);
    }

    #[test]
    fn zero_width_screen_ignores_erase_and_print() {
        let mut screen = Screen::new(Size::new(0, 3));
        feed(&mut screen, b"\x1b[2J\x1b[K\x1b[1Jab");
        assert_eq!(screen.cursor(), (0, 0));
        assert!(screen.cells().cells().is_empty());
    }
}
