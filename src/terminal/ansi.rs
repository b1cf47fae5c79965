use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::queue;
use image::RgbImage;

use super::{Screen, TerminalDevice};
use crate::error::{Error, Result};
use crate::grid::{Grid, Size};
use crate::palette::PaletteColor;
use crate::raster::Rasterizer;
use crate::snapshot::{Region, ScreenReader};

/// Passes bytes through to the real output and interprets the same bytes
/// into the display memory.
struct Tee<W> {
    out: W,
    parser: vte::Parser,
    screen: Screen,
}

impl<W: Write> Write for Tee<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.out.write(buf)?;
        self.parser.advance(&mut self.screen, &buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// A terminal driven by ANSI escape sequences.
///
/// Every byte written goes both to `W` and through a `vte` parser into a
/// [`Screen`]. That screen is a mirror of the emitted sequences, not the
/// terminal's own memory: POSIX terminals cannot be read back. On Windows a
/// `ConsoleReader` can be attached with `attach_console`, and reads then
/// come from the console screen buffer while the mirror still backs
/// [`capture`](TerminalDevice::capture).
///
/// Reads flush `W` first; a failing flush is reported as a buffer read
/// error because the display can no longer be trusted.
pub struct AnsiTerminal<W: Write> {
    tee: Tee<W>,
    size: Size,
    rasterizer: Rasterizer,
    active: bool,
    #[cfg(windows)]
    console: Option<super::ConsoleReader>,
}

impl<W: Write> AnsiTerminal<W> {
    pub fn new(out: W, size: Size, rasterizer: Rasterizer) -> Self {
        Self {
            tee: Tee {
                out,
                parser: vte::Parser::new(),
                screen: Screen::new(size),
            },
            size,
            rasterizer,
            active: false,
            #[cfg(windows)]
            console: None,
        }
    }

    /// Serve reads from the console screen buffer instead of the mirror.
    #[cfg(windows)]
    pub fn attach_console(&mut self, reader: super::ConsoleReader) {
        self.console = Some(reader);
    }

    /// Switch to the alternate screen, hide the cursor and clear.
    pub fn enter(&mut self) -> Result<()> {
        queue!(self.tee, EnterAlternateScreen, Hide, ResetColor, Clear(ClearType::All), MoveTo(0, 0))?;
        self.tee.flush()?;
        self.active = true;
        log::debug!("entered alternate screen at {}", self.size);
        Ok(())
    }

    /// Undo [`enter`](Self::enter). Also runs on drop.
    pub fn leave(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        queue!(self.tee, ResetColor, Show, LeaveAlternateScreen)?;
        self.tee.flush()?;
        log::debug!("left alternate screen");
        Ok(())
    }

    pub fn screen(&self) -> &Screen {
        &self.tee.screen
    }

    /// The underlying writer, e.g. to inspect emitted bytes.
    pub fn get_ref(&self) -> &W {
        &self.tee.out
    }
}

impl<W: Write> Drop for AnsiTerminal<W> {
    fn drop(&mut self) {
        if let Err(e) = self.leave() {
            log::warn!("failed to restore terminal: {}", e);
        }
    }
}

impl<W: Write> ScreenReader for AnsiTerminal<W> {
    fn read_region(&mut self, region: Region) -> Result<Grid<char>> {
        self.tee.flush().map_err(|e| Error::buffer_read_os(&e))?;
        if !region.fits_within(self.size) {
            return Err(Error::buffer_read(format!(
                "region {}x{} at ({}, {}) is outside the {} terminal",
                region.width, region.height, region.x, region.y, self.size
            )));
        }
        #[cfg(windows)]
        if let Some(console) = self.console.as_mut() {
            return console.read_region(region);
        }
        self.tee.screen.read(region)
    }
}

impl<W: Write> TerminalDevice for AnsiTerminal<W> {
    fn size(&self) -> Size {
        self.size
    }

    fn move_to(&mut self, col: u16, row: u16) -> Result<()> {
        queue!(self.tee, MoveTo(col, row))?;
        Ok(())
    }

    fn set_foreground(&mut self, color: PaletteColor) -> Result<()> {
        queue!(self.tee, SetForegroundColor(color.to_crossterm()))?;
        Ok(())
    }

    fn write_glyph(&mut self, glyph: char) -> Result<()> {
        queue!(self.tee, Print(glyph))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.tee.flush()?;
        Ok(())
    }

    fn capture(&mut self) -> Result<RgbImage> {
        self.tee.flush()?;
        Ok(self.rasterizer.render(self.tee.screen.cells()))
    }
}
